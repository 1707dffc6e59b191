//! Perturbation registry.
//!
//! An ordered, non-empty list of [`Operation`]s.  Selection probability is
//! always uniform; the order only matters for reproducing a shuffled cyclic
//! assignment from a fixed seed.

use std::fmt;
use std::str::FromStr;

use rand::Rng;
use rand::seq::SliceRandom;
use robustcam_types::{ColorSpace, Operation};
use serde::{Deserialize, Serialize};

/// Preset operation subsets used for ablation runs.
///
/// All subsets are restricted to training-time augmentation; evaluation
/// always covers the full canonical set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MethodSet {
    /// The canonical 15 operations.
    #[default]
    Full,
    /// Six random-direction channel shifts plus blur, noise and distortion.
    RandomDirection,
    NoHsv,
    NoRgb,
    NoBlurNoiseDistort,
    NoBlurDistort,
    RgbNoise,
    HsvNoise,
    RgbOnly,
    HsvOnly,
}

impl MethodSet {
    pub const ALL: [MethodSet; 10] = [
        MethodSet::Full,
        MethodSet::RandomDirection,
        MethodSet::NoHsv,
        MethodSet::NoRgb,
        MethodSet::NoBlurNoiseDistort,
        MethodSet::NoBlurDistort,
        MethodSet::RgbNoise,
        MethodSet::HsvNoise,
        MethodSet::RgbOnly,
        MethodSet::HsvOnly,
    ];

    pub fn name(self) -> &'static str {
        match self {
            MethodSet::Full => "full",
            MethodSet::RandomDirection => "random_direction",
            MethodSet::NoHsv => "no_hsv",
            MethodSet::NoRgb => "no_rgb",
            MethodSet::NoBlurNoiseDistort => "no_blur_noise_distort",
            MethodSet::NoBlurDistort => "no_blur_distort",
            MethodSet::RgbNoise => "rgb_noise",
            MethodSet::HsvNoise => "hsv_noise",
            MethodSet::RgbOnly => "rgb_only",
            MethodSet::HsvOnly => "hsv_only",
        }
    }

    /// Operations in this preset, in canonical order.
    pub fn operations(self) -> Vec<Operation> {
        if self == MethodSet::RandomDirection {
            let mut ops = Operation::RANDOM_DIRECTION.to_vec();
            ops.extend([Operation::Blur, Operation::Noise, Operation::Distort]);
            return ops;
        }
        Operation::CANONICAL
            .into_iter()
            .filter(|op| self.includes(*op))
            .collect()
    }

    fn includes(self, op: Operation) -> bool {
        let space = match op {
            Operation::Shift { channel, .. } => Some(channel.space()),
            _ => None,
        };
        let rgb = space == Some(ColorSpace::Rgb);
        let hsv = space == Some(ColorSpace::Hsv);
        let noise = op == Operation::Noise;
        match self {
            MethodSet::Full | MethodSet::RandomDirection => true,
            MethodSet::NoHsv => !hsv,
            MethodSet::NoRgb => !rgb,
            MethodSet::NoBlurNoiseDistort => rgb || hsv,
            MethodSet::NoBlurDistort => rgb || hsv || noise,
            MethodSet::RgbNoise => rgb || noise,
            MethodSet::HsvNoise => hsv || noise,
            MethodSet::RgbOnly => rgb,
            MethodSet::HsvOnly => hsv,
        }
    }
}

impl fmt::Display for MethodSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for MethodSet {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MethodSet::ALL
            .into_iter()
            .find(|set| set.name() == s.trim())
            .ok_or_else(|| format!("unknown method set '{s}'"))
    }
}

/// An ordered, non-empty collection of operations.
#[derive(Debug, Clone, PartialEq)]
pub struct PerturbationRegistry {
    operations: Vec<Operation>,
}

impl Default for PerturbationRegistry {
    fn default() -> Self {
        Self::canonical()
    }
}

impl PerturbationRegistry {
    /// The canonical 15-operation registry.
    pub fn canonical() -> Self {
        Self {
            operations: Operation::CANONICAL.to_vec(),
        }
    }

    pub fn from_method_set(set: MethodSet) -> Self {
        Self {
            operations: set.operations(),
        }
    }

    /// Build a registry from an explicit list.  Returns `None` when `operations`
    /// is empty.
    pub fn from_operations(operations: Vec<Operation>) -> Option<Self> {
        if operations.is_empty() {
            None
        } else {
            Some(Self { operations })
        }
    }

    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    pub fn contains(&self, op: Operation) -> bool {
        self.operations.contains(&op)
    }

    /// Pick one operation uniformly at random.
    pub fn sample<R: Rng>(&self, rng: &mut R) -> Operation {
        self.operations[rng.gen_range(0..self.operations.len())]
    }

    /// Assign an operation to each of `n` consecutive positions.
    ///
    /// The working order is reshuffled at the start of every block of
    /// `len()` positions, and position `i` takes slot `i mod len()`.  Every
    /// complete block therefore uses each operation exactly once.
    pub fn cyclic_assignment<R: Rng>(&self, n: usize, rng: &mut R) -> Vec<Operation> {
        let m = self.operations.len();
        let mut order = self.operations.clone();
        let mut assigned = Vec::with_capacity(n);
        for i in 0..n {
            if i % m == 0 {
                order.shuffle(rng);
            }
            assigned.push(order[i % m]);
        }
        assigned
    }
}
