//! Severity mapping.
//!
//! Translates a normalised [`Severity`] or a discrete [`Level`] into the
//! native parameter of each corruption family.  The ratio form is affine,
//! `native = ratio * (max - min) + min`; the level form looks up fixed
//! breakpoints.  Both tables are reproduced verbatim so that severities stay
//! comparable across experiments.
//!
//! | Family | Ratio range | Level 1..5 |
//! |---|---|---|
//! | RGB / HSV shift | blend ratio = severity | 0.02, 0.2, 0.5, 0.65, 1.0 |
//! | Blur | kernel 7–107 (odd) | 7, 17, 37, 67, 107 |
//! | Noise | sigma 20–200 | 20, 50, 100, 150, 200 |
//! | Distortion | coefficient 1–500 | 1, 10, 50, 200, 500 |

use robustcam_types::{ColorChannel, Direction, Level, Operation, Severity};
use serde::Serialize;

pub const BLUR_KERNEL_RANGE: (f64, f64) = (7.0, 107.0);
pub const NOISE_SIGMA_RANGE: (f64, f64) = (20.0, 200.0);
pub const DISTORTION_RANGE: (f64, f64) = (1.0, 500.0);

/// Blend ratios for channel shifts (and combined scenarios) per level.
pub const RATIO_LEVELS: [f64; 5] = [0.02, 0.2, 0.5, 0.65, 1.0];
pub const BLUR_LEVELS: [usize; 5] = [7, 17, 37, 67, 107];
pub const NOISE_LEVELS: [f64; 5] = [20.0, 50.0, 100.0, 150.0, 200.0];
pub const DISTORTION_LEVELS: [f64; 5] = [1.0, 10.0, 50.0, 200.0, 500.0];

fn affine(ratio: f64, (min, max): (f64, f64)) -> f64 {
    ratio * (max - min) + min
}

/// Blur kernel size for `severity`: truncated, then bumped to the next odd
/// value.  Always odd and within `[7, 107]`.
pub fn blur_kernel_size(severity: Severity) -> usize {
    let k = affine(severity.ratio(), BLUR_KERNEL_RANGE) as usize;
    if k % 2 == 0 { k + 1 } else { k }
}

/// Noise standard deviation for `severity` (`r * 180 + 20`).
pub fn noise_sigma(severity: Severity) -> f64 {
    affine(severity.ratio(), NOISE_SIGMA_RANGE)
}

/// Radial distortion coefficient for `severity` (`r * 499 + 1`).
pub fn distortion_coefficient(severity: Severity) -> f64 {
    affine(severity.ratio(), DISTORTION_RANGE)
}

/// An operation with its native parameter resolved.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "family", rename_all = "snake_case")]
pub enum Perturbation {
    Shift {
        channel: ColorChannel,
        direction: Direction,
        ratio: f64,
    },
    Blur {
        kernel_size: usize,
    },
    Noise {
        sigma: f64,
    },
    Distort {
        coefficient: f64,
    },
    Clean,
}

impl Perturbation {
    /// Resolve `operation` at a continuous severity.
    pub fn from_ratio(operation: Operation, severity: Severity) -> Self {
        match operation {
            Operation::Shift { channel, direction } => Perturbation::Shift {
                channel,
                direction,
                ratio: severity.ratio(),
            },
            Operation::Blur => Perturbation::Blur {
                kernel_size: blur_kernel_size(severity),
            },
            Operation::Noise => Perturbation::Noise {
                sigma: noise_sigma(severity),
            },
            Operation::Distort => Perturbation::Distort {
                coefficient: distortion_coefficient(severity),
            },
            Operation::Clean => Perturbation::Clean,
        }
    }

    /// Resolve `operation` at a discrete evaluation level.
    pub fn from_level(operation: Operation, level: Level) -> Self {
        let i = level.index();
        match operation {
            Operation::Shift { channel, direction } => Perturbation::Shift {
                channel,
                direction,
                ratio: RATIO_LEVELS[i],
            },
            Operation::Blur => Perturbation::Blur {
                kernel_size: BLUR_LEVELS[i],
            },
            Operation::Noise => Perturbation::Noise {
                sigma: NOISE_LEVELS[i],
            },
            Operation::Distort => Perturbation::Distort {
                coefficient: DISTORTION_LEVELS[i],
            },
            Operation::Clean => Perturbation::Clean,
        }
    }

    pub fn operation(&self) -> Operation {
        match *self {
            Perturbation::Shift {
                channel, direction, ..
            } => Operation::Shift { channel, direction },
            Perturbation::Blur { .. } => Operation::Blur,
            Perturbation::Noise { .. } => Operation::Noise,
            Perturbation::Distort { .. } => Operation::Distort,
            Perturbation::Clean => Operation::Clean,
        }
    }
}
