//! `robustcam-types` – shared vocabulary for the perturbation engine.
//!
//! Every crate in the workspace speaks in terms of the types defined here:
//! which [`Operation`] to apply, how strongly ([`Severity`] or [`Level`]),
//! and what can go wrong ([`PerturbError`]).
//!
//! Operations are a tagged enum over {family, channel, direction} rather than
//! free-form strings.  The historical name strings (`"R-low"`, `"R darker"`,
//! `"perturb_r_low"`, …) are still accepted at the boundary through
//! [`Operation::from_str`][std::str::FromStr].

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ────────────────────────────────────────────────────────────────────────────
// Errors
// ────────────────────────────────────────────────────────────────────────────

/// Precondition violations detected at the perturbation call boundary.
///
/// All operations are deterministic given their inputs and random seed, so
/// none of these are retryable.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PerturbError {
    #[error("Invalid image shape {shape:?}: expected (height, width, 3) with non-zero extents")]
    InvalidImageShape { shape: Vec<usize> },

    #[error("Invalid severity {value}: expected {expected}")]
    InvalidSeverity { value: String, expected: String },

    #[error("Unknown perturbation operation: {0}")]
    UnknownOperation(String),
}

impl PerturbError {
    pub(crate) fn ratio(value: f64) -> Self {
        Self::InvalidSeverity {
            value: value.to_string(),
            expected: "a ratio in [0, 1]".to_string(),
        }
    }

    pub(crate) fn level(value: impl fmt::Display) -> Self {
        Self::InvalidSeverity {
            value: value.to_string(),
            expected: "a level in 1..=5".to_string(),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Channels and directions
// ────────────────────────────────────────────────────────────────────────────

/// Colour space a channel shift operates in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ColorSpace {
    Rgb,
    Hsv,
}

/// One of the six shiftable channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ColorChannel {
    R,
    G,
    B,
    H,
    S,
    V,
}

impl ColorChannel {
    pub fn space(self) -> ColorSpace {
        match self {
            ColorChannel::R | ColorChannel::G | ColorChannel::B => ColorSpace::Rgb,
            ColorChannel::H | ColorChannel::S | ColorChannel::V => ColorSpace::Hsv,
        }
    }

    /// Position of the channel along the colour axis of its colour space.
    pub fn index(self) -> usize {
        match self {
            ColorChannel::R | ColorChannel::H => 0,
            ColorChannel::G | ColorChannel::S => 1,
            ColorChannel::B | ColorChannel::V => 2,
        }
    }

    /// Upper end of the channel's 8-bit range.  Hue uses the 0–180 half-degree
    /// convention.
    pub fn max_value(self) -> f32 {
        match self {
            ColorChannel::H => 180.0,
            _ => 255.0,
        }
    }

    pub fn letter(self) -> &'static str {
        match self {
            ColorChannel::R => "R",
            ColorChannel::G => "G",
            ColorChannel::B => "B",
            ColorChannel::H => "H",
            ColorChannel::S => "S",
            ColorChannel::V => "V",
        }
    }
}

/// Which way a channel shift pushes the channel value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// Blend toward zero.
    Lower,
    /// Blend toward the channel maximum.
    Raise,
    /// Coin-flip between [`Direction::Lower`] and [`Direction::Raise`] on
    /// every call.
    Random,
}

// ────────────────────────────────────────────────────────────────────────────
// Operations
// ────────────────────────────────────────────────────────────────────────────

/// Corruption family.  Determines how a severity maps to native parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Family {
    Rgb,
    Hsv,
    Blur,
    Noise,
    Distort,
    Clean,
}

/// A named perturbation operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Operation {
    Shift {
        channel: ColorChannel,
        direction: Direction,
    },
    Blur,
    Noise,
    Distort,
    /// Zero-perturbation baseline.
    Clean,
}

const fn shift(channel: ColorChannel, direction: Direction) -> Operation {
    Operation::Shift { channel, direction }
}

impl Operation {
    /// The canonical 15-operation set in registry order.
    pub const CANONICAL: [Operation; 15] = [
        shift(ColorChannel::R, Direction::Lower),
        shift(ColorChannel::R, Direction::Raise),
        shift(ColorChannel::G, Direction::Lower),
        shift(ColorChannel::G, Direction::Raise),
        shift(ColorChannel::B, Direction::Lower),
        shift(ColorChannel::B, Direction::Raise),
        shift(ColorChannel::H, Direction::Lower),
        shift(ColorChannel::H, Direction::Raise),
        shift(ColorChannel::S, Direction::Lower),
        shift(ColorChannel::S, Direction::Raise),
        shift(ColorChannel::V, Direction::Lower),
        shift(ColorChannel::V, Direction::Raise),
        Operation::Blur,
        Operation::Noise,
        Operation::Distort,
    ];

    /// The six random-direction channel shifts.
    pub const RANDOM_DIRECTION: [Operation; 6] = [
        shift(ColorChannel::R, Direction::Random),
        shift(ColorChannel::G, Direction::Random),
        shift(ColorChannel::B, Direction::Random),
        shift(ColorChannel::H, Direction::Random),
        shift(ColorChannel::S, Direction::Random),
        shift(ColorChannel::V, Direction::Random),
    ];

    pub fn family(self) -> Family {
        match self {
            Operation::Shift { channel, .. } => match channel.space() {
                ColorSpace::Rgb => Family::Rgb,
                ColorSpace::Hsv => Family::Hsv,
            },
            Operation::Blur => Family::Blur,
            Operation::Noise => Family::Noise,
            Operation::Distort => Family::Distort,
            Operation::Clean => Family::Clean,
        }
    }

    /// Registry name, e.g. `"R-low"`, `"V-high"`, `"blur"`.
    pub fn name(self) -> String {
        match self {
            Operation::Shift { channel, direction } => match direction {
                Direction::Lower => format!("{}-low", channel.letter()),
                Direction::Raise => format!("{}-high", channel.letter()),
                Direction::Random => channel.letter().to_string(),
            },
            Operation::Blur => "blur".to_string(),
            Operation::Noise => "noise".to_string(),
            Operation::Distort => "distort".to_string(),
            Operation::Clean => "clean".to_string(),
        }
    }

    /// Label used by evaluation sweeps (`"R darker"`, `"S lighter"`, …).
    ///
    /// Random-direction shifts have no evaluation label since a sweep must be
    /// reproducible per case.
    pub fn evaluation_label(self) -> Option<String> {
        match self {
            Operation::Shift { channel, direction } => match direction {
                Direction::Lower => Some(format!("{} darker", channel.letter())),
                Direction::Raise => Some(format!("{} lighter", channel.letter())),
                Direction::Random => None,
            },
            other => Some(other.name()),
        }
    }

    fn legacy_function_name(self) -> String {
        match self {
            Operation::Clean => "clean".to_string(),
            Operation::Shift { channel, direction } => {
                let letter = channel.letter().to_lowercase();
                match direction {
                    Direction::Lower => format!("perturb_{letter}_low"),
                    Direction::Raise => format!("perturb_{letter}_high"),
                    Direction::Random => format!("perturb_{letter}"),
                }
            }
            other => format!("perturb_{}", other.name()),
        }
    }

    fn all() -> impl Iterator<Item = Operation> {
        Self::CANONICAL
            .into_iter()
            .chain(Self::RANDOM_DIRECTION)
            .chain(std::iter::once(Operation::Clean))
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

impl FromStr for Operation {
    type Err = PerturbError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Operation::all()
            .find(|op| {
                op.name() == trimmed
                    || op.evaluation_label().as_deref() == Some(trimmed)
                    || op.legacy_function_name() == trimmed
            })
            .ok_or_else(|| PerturbError::UnknownOperation(s.to_string()))
    }
}

impl TryFrom<String> for Operation {
    type Error = PerturbError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Operation> for String {
    fn from(op: Operation) -> Self {
        op.name()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Severity and levels
// ────────────────────────────────────────────────────────────────────────────

/// Normalised corruption intensity ("dist_ratio") in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct Severity(f64);

impl Severity {
    pub const MIN: Severity = Severity(0.0);
    pub const MAX: Severity = Severity(1.0);

    /// Validate `ratio`.  NaN and values outside `[0, 1]` are rejected with
    /// [`PerturbError::InvalidSeverity`].
    pub fn new(ratio: f64) -> Result<Self, PerturbError> {
        if (0.0..=1.0).contains(&ratio) {
            Ok(Self(ratio))
        } else {
            Err(PerturbError::ratio(ratio))
        }
    }

    pub fn ratio(self) -> f64 {
        self.0
    }

    /// Half the severity, as used by the combined-perturbation compositor.
    pub fn half(self) -> Self {
        Self(self.0 / 2.0)
    }
}

impl TryFrom<f64> for Severity {
    type Error = PerturbError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Severity> for f64 {
    fn from(s: Severity) -> Self {
        s.0
    }
}

/// Discrete severity level used by structured evaluation sweeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Level(u8);

impl Level {
    pub const ALL: [Level; 5] = [Level(1), Level(2), Level(3), Level(4), Level(5)];

    pub fn new(level: u8) -> Result<Self, PerturbError> {
        if (1..=5).contains(&level) {
            Ok(Self(level))
        } else {
            Err(PerturbError::level(level))
        }
    }

    /// Zero-based position into a five-entry level table.
    pub fn index(self) -> usize {
        usize::from(self.0 - 1)
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Level {
    type Err = PerturbError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<u8>()
            .map_err(|_| PerturbError::level(s))
            .and_then(Level::new)
    }
}

impl TryFrom<u8> for Level {
    type Error = PerturbError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Level> for u8 {
    fn from(level: Level) -> Self {
        level.0
    }
}
