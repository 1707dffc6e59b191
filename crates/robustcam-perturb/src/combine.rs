//! Combined ("unseen") perturbations.
//!
//! Three rounds, each drawing one operation uniformly from the registry and
//! applying it to the *clean* input at half the requested severity.  Each
//! perturbed copy is averaged with the running image and truncated back to
//! 8-bit.  Independent of the batch orchestrator's cyclic state.

use ndarray::{Array3, ArrayView3, Zip};
use rand::Rng;
use robustcam_types::{PerturbError, Severity};
use tracing::debug;

use crate::image::{check_image, saturate_u8, to_channel_first, to_channel_last};
use crate::registry::PerturbationRegistry;
use crate::severity::Perturbation;

/// Blending rounds per combined image.
pub const COMBINE_ROUNDS: usize = 3;

/// Combine perturbations from the canonical registry at ratio `severity`.
///
/// Returns a channel-first 8-bit image with the input's dimensions.
///
/// # Example
///
/// ```
/// use ndarray::Array3;
/// use rand::SeedableRng;
/// use rand::rngs::StdRng;
///
/// let image = Array3::<u8>::from_elem((4, 6, 3), 200);
/// let out = robustcam_perturb::combine(image.view(), 0.5, &mut StdRng::seed_from_u64(1)).unwrap();
/// assert_eq!(out.dim(), (3, 4, 6));
/// ```
pub fn combine<R: Rng>(image: ArrayView3<u8>, severity: f64, rng: &mut R) -> Result<Array3<u8>, PerturbError> {
    combine_with(image, Severity::new(severity)?, &PerturbationRegistry::canonical(), rng)
}

/// Combine perturbations drawn from `registry`.
pub fn combine_with<R: Rng>(
    image: ArrayView3<u8>,
    severity: Severity,
    registry: &PerturbationRegistry,
    rng: &mut R,
) -> Result<Array3<u8>, PerturbError> {
    check_image(&image)?;
    let half = severity.half();
    let mut running = image.to_owned();

    for round in 0..COMBINE_ROUNDS {
        let operation = registry.sample(rng);
        let perturbed = Perturbation::from_ratio(operation, half).apply(image, rng)?;
        let layer = to_channel_last(perturbed.to_f32().view());
        running = Zip::from(&running)
            .and(&layer)
            .map_collect(|&base, &top| saturate_u8((f32::from(base) + top) / 2.0));
        debug!(round, %operation, severity = half.ratio(), "blended perturbation");
    }

    Ok(to_channel_first(running.view()))
}
