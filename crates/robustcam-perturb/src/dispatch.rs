//! Single-call dispatch: `perturb` (ratio form) and `perturb_at_level`
//! (discrete evaluation form).
//!
//! Name strings are parsed into [`Operation`] once at the boundary; from
//! there on dispatch is a `match` over the resolved [`Perturbation`].

use ndarray::ArrayView3;
use rand::Rng;
use robustcam_types::{Level, Operation, PerturbError, Severity};

use crate::image::{PerturbedImage, check_image};
use crate::primitives::{channel_shift, clean, gaussian_blur, gaussian_noise, lens_distort};
use crate::severity::Perturbation;

impl Perturbation {
    /// Run the resolved perturbation on a channel-last image, producing a
    /// channel-first result.
    pub fn apply<R: Rng>(
        &self,
        image: ArrayView3<u8>,
        rng: &mut R,
    ) -> Result<PerturbedImage, PerturbError> {
        let out = match *self {
            Perturbation::Shift {
                channel,
                direction,
                ratio,
            } => PerturbedImage::U8(channel_shift(image, channel, direction, ratio, rng)?),
            Perturbation::Blur { kernel_size } => {
                PerturbedImage::U8(gaussian_blur(image, kernel_size)?)
            }
            Perturbation::Noise { sigma } => PerturbedImage::F32(gaussian_noise(image, sigma, rng)?),
            Perturbation::Distort { coefficient } => {
                PerturbedImage::U8(lens_distort(image, coefficient)?)
            }
            Perturbation::Clean => PerturbedImage::U8(clean(image)?),
        };
        Ok(out)
    }
}

/// Apply the operation named `method` at severity ratio `severity`.
///
/// # Errors
///
/// - [`PerturbError::UnknownOperation`] for an unrecognised name.
/// - [`PerturbError::InvalidSeverity`] when `severity` is outside `[0, 1]`.
/// - [`PerturbError::InvalidImageShape`] for a malformed image.
///
/// # Example
///
/// ```
/// use ndarray::Array3;
/// use rand::SeedableRng;
/// use rand::rngs::StdRng;
///
/// let image = Array3::<u8>::from_elem((66, 200, 3), 90);
/// let mut rng = StdRng::seed_from_u64(0);
/// let out = robustcam_perturb::perturb(image.view(), "R-high", 0.5, &mut rng).unwrap();
/// assert_eq!(out.dim(), (3, 66, 200));
/// ```
pub fn perturb<R: Rng>(
    image: ArrayView3<u8>,
    method: &str,
    severity: f64,
    rng: &mut R,
) -> Result<PerturbedImage, PerturbError> {
    let op: Operation = method.parse()?;
    let severity = Severity::new(severity)?;
    perturb_operation(image, op, severity, rng)
}

/// Typed variant of [`perturb`].
pub fn perturb_operation<R: Rng>(
    image: ArrayView3<u8>,
    op: Operation,
    severity: Severity,
    rng: &mut R,
) -> Result<PerturbedImage, PerturbError> {
    check_image(&image)?;
    Perturbation::from_ratio(op, severity).apply(image, rng)
}

/// Apply the operation named `method` at evaluation level `level` (1..=5).
///
/// # Errors
///
/// As for [`perturb`]; a level outside `1..=5` is
/// [`PerturbError::InvalidSeverity`].
pub fn perturb_at_level<R: Rng>(
    image: ArrayView3<u8>,
    method: &str,
    level: u8,
    rng: &mut R,
) -> Result<PerturbedImage, PerturbError> {
    let op: Operation = method.parse()?;
    let level = Level::new(level)?;
    perturb_operation_at_level(image, op, level, rng)
}

/// Typed variant of [`perturb_at_level`].
pub fn perturb_operation_at_level<R: Rng>(
    image: ArrayView3<u8>,
    op: Operation,
    level: Level,
    rng: &mut R,
) -> Result<PerturbedImage, PerturbError> {
    check_image(&image)?;
    Perturbation::from_level(op, level).apply(image, rng)
}
