//! `robustcam-perturb` – synthetic image perturbation engine.
//!
//! Corrupts camera frames for curriculum-style augmentation during training
//! and for structured robustness evaluation across discrete severity levels.
//!
//! # Modules
//!
//! - [`primitives`] – the corruption families: RGB/HSV channel shift,
//!   Gaussian blur, additive Gaussian noise, lens distortion, and the clean
//!   baseline.  Channel-last in, channel-first out.
//! - [`severity`] – maps a [`Severity`] ratio or a [`Level`] to each family's
//!   native parameter, yielding a resolved [`Perturbation`].
//! - [`registry`] – [`PerturbationRegistry`]: ordered operation set with
//!   uniform sampling and shuffled cyclic assignment; [`MethodSet`] presets.
//! - [`augment`] – [`BatchAugmenter`]: balanced per-batch augmentation under
//!   a curriculum cap.
//! - [`combine`] – averaged multi-perturbation images for unseen scenarios.
//! - [`sweep`] – [`EvaluationSweep`]: clean / single / combined evaluation
//!   cases.
//! - [`color`] – 8-bit RGB ↔ HSV conversion (hue in half-degrees).
//! - [`image`] – shape validation, layout helpers and [`PerturbedImage`].
//!
//! # Randomness
//!
//! Nothing in this crate touches a process-global generator.  Every function
//! that needs randomness takes an `&mut impl Rng`; seed a
//! [`rand::rngs::StdRng`] for reproducible runs.

pub mod augment;
pub mod color;
pub mod combine;
pub mod dispatch;
pub mod image;
pub mod primitives;
pub mod registry;
pub mod severity;
pub mod sweep;

pub use augment::{AugmentConfig, BatchAugmenter, IntensityMode, PlannedAugmentation, augment_batch};
pub use combine::{COMBINE_ROUNDS, combine, combine_with};
pub use dispatch::{perturb, perturb_at_level, perturb_operation, perturb_operation_at_level};
pub use image::{Image, PerturbedImage};
pub use registry::{MethodSet, PerturbationRegistry};
pub use severity::Perturbation;
pub use sweep::{EvaluationSweep, Scenario};

pub use robustcam_types::{
    ColorChannel, ColorSpace, Direction, Family, Level, Operation, PerturbError, Severity,
};
