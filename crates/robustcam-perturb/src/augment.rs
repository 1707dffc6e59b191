//! Batch augmentation under a training curriculum.
//!
//! [`BatchAugmenter::augment_batch`] assigns one operation per image using the
//! registry's shuffled cyclic policy, draws an independent severity per image
//! from `[0, cap]`, applies it and casts the result to 8-bit.
//!
//! All random draws (block shuffles, severities, per-image seeds for noise and
//! random directions) happen sequentially up front.  The apply step then runs
//! in parallel with rayon and stays deterministic for a fixed seed.

use ndarray::{Array3, Array4, ArrayView3, ArrayView4, Axis};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use robustcam_types::{Operation, PerturbError, Severity};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::image::{check_image, validate_shape};
use crate::registry::{MethodSet, PerturbationRegistry};
use crate::severity::{Perturbation, RATIO_LEVELS};

/// How per-image severities are drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntensityMode {
    /// Uniform in `[0, curriculum cap]`.
    #[default]
    Uniform,
    /// One of the five level ratios, chosen uniformly; the cap is ignored.
    Static,
}

/// Augmentation settings, typically loaded from the `[augment]` config table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AugmentConfig {
    #[serde(default)]
    pub method_set: MethodSet,
    #[serde(default)]
    pub intensity: IntensityMode,
}

/// What will be applied to one batch position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlannedAugmentation {
    pub operation: Operation,
    pub severity: Severity,
    /// Seed for the image's own generator (noise samples, random directions).
    pub seed: u64,
}

/// Stateful batch augmenter holding the registry and the random generator.
///
/// # Example
///
/// ```
/// use ndarray::Array4;
/// use robustcam_perturb::BatchAugmenter;
///
/// let batch = Array4::<u8>::from_elem((30, 8, 8, 3), 120);
/// let mut augmenter = BatchAugmenter::seeded(42);
/// let out = augmenter.augment_batch(batch.view(), 1.0).unwrap();
/// assert_eq!(out.dim(), (30, 3, 8, 8));
/// ```
#[derive(Debug)]
pub struct BatchAugmenter<R: Rng = StdRng> {
    registry: PerturbationRegistry,
    intensity: IntensityMode,
    rng: R,
}

impl BatchAugmenter<StdRng> {
    /// Canonical registry, uniform intensity, generator seeded from `seed`.
    pub fn seeded(seed: u64) -> Self {
        Self::with_rng(AugmentConfig::default(), StdRng::seed_from_u64(seed))
    }

    /// Build from configuration.  Without a seed the generator is seeded from
    /// OS entropy and runs are not reproducible.
    pub fn from_config(config: AugmentConfig, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self::with_rng(config, rng)
    }
}

impl<R: Rng> BatchAugmenter<R> {
    pub fn with_rng(config: AugmentConfig, rng: R) -> Self {
        Self {
            registry: PerturbationRegistry::from_method_set(config.method_set),
            intensity: config.intensity,
            rng,
        }
    }

    pub fn registry(&self) -> &PerturbationRegistry {
        &self.registry
    }

    /// Draw the assignment for `n` batch positions.
    ///
    /// # Errors
    ///
    /// [`PerturbError::InvalidSeverity`] when `cap` is outside `[0, 1]`.
    pub fn plan_batch(&mut self, n: usize, cap: f64) -> Result<Vec<PlannedAugmentation>, PerturbError> {
        let cap = Severity::new(cap)?;
        let operations = self.registry.cyclic_assignment(n, &mut self.rng);
        let mut plans = Vec::with_capacity(n);
        for (i, operation) in operations.into_iter().enumerate() {
            let severity = self.draw_severity(cap)?;
            let seed = self.rng.next_u64();
            debug!(position = i, %operation, severity = severity.ratio(), "planned augmentation");
            plans.push(PlannedAugmentation {
                operation,
                severity,
                seed,
            });
        }
        Ok(plans)
    }

    /// Augment a channel-last batch `(n, h, w, 3)` into a channel-first 8-bit
    /// batch `(n, 3, h, w)`.
    ///
    /// # Errors
    ///
    /// - [`PerturbError::InvalidImageShape`] when the per-image shape is not
    ///   `(h, w, 3)`.
    /// - [`PerturbError::InvalidSeverity`] when `cap` is outside `[0, 1]`.
    pub fn augment_batch(&mut self, batch: ArrayView4<u8>, cap: f64) -> Result<Array4<u8>, PerturbError> {
        let (n, h, w, c) = batch.dim();
        validate_shape(&[h, w, c])?;
        let plans = self.plan_batch(n, cap)?;
        if n == 0 {
            return Ok(Array4::zeros((0, c, h, w)));
        }

        let outputs = plans
            .par_iter()
            .enumerate()
            .map(|(i, plan)| {
                let mut image_rng = StdRng::seed_from_u64(plan.seed);
                Perturbation::from_ratio(plan.operation, plan.severity)
                    .apply(batch.index_axis(Axis(0), i), &mut image_rng)
                    .map(|out| out.into_u8())
            })
            .collect::<Result<Vec<Array3<u8>>, PerturbError>>()?;

        let views: Vec<ArrayView3<u8>> = outputs.iter().map(|a| a.view()).collect();
        let stacked = ndarray::stack(Axis(0), &views).map_err(|_| PerturbError::InvalidImageShape {
            shape: vec![n, h, w, c],
        })?;
        info!(batch = n, cap, operations = self.registry.len(), "augmented batch");
        Ok(stacked)
    }

    /// Augment a single image with one uniformly chosen operation at a
    /// severity drawn from `[0, cap]`.  Returns channel-first 8-bit.
    pub fn augment_one(&mut self, image: ArrayView3<u8>, cap: f64) -> Result<Array3<u8>, PerturbError> {
        check_image(&image)?;
        let cap = Severity::new(cap)?;
        let operation = self.registry.sample(&mut self.rng);
        let severity = self.draw_severity(cap)?;
        debug!(%operation, severity = severity.ratio(), "random augmentation");
        Perturbation::from_ratio(operation, severity)
            .apply(image, &mut self.rng)
            .map(|out| out.into_u8())
    }

    fn draw_severity(&mut self, cap: Severity) -> Result<Severity, PerturbError> {
        let ratio = match self.intensity {
            IntensityMode::Uniform => self.rng.gen_range(0.0..=cap.ratio()),
            IntensityMode::Static => *RATIO_LEVELS.choose(&mut self.rng).unwrap_or(&RATIO_LEVELS[0]),
        };
        Severity::new(ratio)
    }
}

/// Augment `batch` with the canonical registry and uniform intensity, drawing
/// all randomness from `rng`.
pub fn augment_batch<R: Rng>(batch: ArrayView4<u8>, cap: f64, rng: &mut R) -> Result<Array4<u8>, PerturbError> {
    BatchAugmenter::with_rng(AugmentConfig::default(), rng).augment_batch(batch, cap)
}
