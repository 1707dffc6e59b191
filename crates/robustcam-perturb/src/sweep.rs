//! Structured robustness evaluation.
//!
//! An [`EvaluationSweep`] enumerates the clean baseline, every registry
//! operation at every level, and the combined perturbation at every level.

use ndarray::ArrayView3;
use rand::Rng;
use robustcam_types::{Level, Operation, PerturbError, Severity};
use serde::Serialize;

use crate::combine::combine_with;
use crate::image::PerturbedImage;
use crate::registry::PerturbationRegistry;
use crate::severity::{Perturbation, RATIO_LEVELS};

/// One evaluation case.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "scenario", rename_all = "snake_case")]
pub enum Scenario {
    Clean,
    Single { operation: Operation, level: Level },
    Combined { level: Level },
}

impl Scenario {
    /// Stable label, e.g. `"clean"`, `"R darker/3"`, `"combined/5"`.
    pub fn label(&self) -> String {
        match self {
            Scenario::Clean => "clean".to_string(),
            Scenario::Single { operation, level } => {
                let name = operation.evaluation_label().unwrap_or_else(|| operation.name());
                format!("{name}/{level}")
            }
            Scenario::Combined { level } => format!("combined/{level}"),
        }
    }

    /// The resolved native parameter for single-operation and clean cases.
    pub fn perturbation(&self) -> Option<Perturbation> {
        match *self {
            Scenario::Clean => Some(Perturbation::Clean),
            Scenario::Single { operation, level } => Some(Perturbation::from_level(operation, level)),
            Scenario::Combined { .. } => None,
        }
    }
}

/// Enumerates and runs evaluation scenarios over a registry.
#[derive(Debug, Clone, Default)]
pub struct EvaluationSweep {
    registry: PerturbationRegistry,
}

impl EvaluationSweep {
    pub fn new(registry: PerturbationRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &PerturbationRegistry {
        &self.registry
    }

    /// Clean first, then operation-major singles, then combined levels.
    pub fn scenarios(&self) -> Vec<Scenario> {
        let mut cases = vec![Scenario::Clean];
        for &operation in self.registry.operations() {
            cases.extend(
                Level::ALL
                    .into_iter()
                    .map(|level| Scenario::Single { operation, level }),
            );
        }
        cases.extend(Level::ALL.into_iter().map(|level| Scenario::Combined { level }));
        cases
    }

    /// Run one scenario on a channel-last image.
    ///
    /// A single-operation case whose operation is not in this sweep's
    /// registry is [`PerturbError::UnknownOperation`].
    pub fn run<R: Rng>(
        &self,
        image: ArrayView3<u8>,
        scenario: &Scenario,
        rng: &mut R,
    ) -> Result<PerturbedImage, PerturbError> {
        match scenario {
            Scenario::Combined { level } => {
                let severity = Severity::new(RATIO_LEVELS[level.index()])?;
                combine_with(image, severity, &self.registry, rng).map(PerturbedImage::U8)
            }
            Scenario::Single { operation, .. } if !self.registry.contains(*operation) => {
                Err(PerturbError::UnknownOperation(operation.name()))
            }
            other => other
                .perturbation()
                .unwrap_or(Perturbation::Clean)
                .apply(image, rng),
        }
    }
}
