//! Subcommand implementations.
//!
//! Each command loads its frames, runs the engine and writes PNGs into the
//! configured output directory.  Everything returns [`RunError`] so `main`
//! can report failures uniformly.

use chrono::{DateTime, Utc};
use ndarray::{Array4, Axis};
use rand::SeedableRng;
use rand::rngs::StdRng;
use robustcam_perturb::{AugmentConfig, BatchAugmenter, EvaluationSweep, Perturbation, Scenario};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::Config;
use crate::error::RunError;
use crate::frames::{derived_path, load_rgb, save_channel_first, slug};

/// File name of the sweep manifest inside the output directory.
pub const MANIFEST_FILE: &str = "manifest.json";

/// Settings shared by every subcommand.
#[derive(Debug, Clone)]
pub struct RunContext {
    pub out_dir: PathBuf,
    pub seed: Option<u64>,
    pub augment: AugmentConfig,
}

impl RunContext {
    /// Resolve the context from the loaded config; `out` overrides
    /// `output_dir`.
    pub fn from_config(cfg: &Config, out: Option<PathBuf>) -> Self {
        Self {
            out_dir: out.unwrap_or_else(|| cfg.output_dir.clone()),
            seed: cfg.seed,
            augment: cfg.augment,
        }
    }

    fn rng(&self) -> StdRng {
        match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// sweep
// ─────────────────────────────────────────────────────────────────────────────

/// Record of one evaluation sweep, written as `manifest.json`.
#[derive(Debug, Serialize)]
pub struct SweepManifest {
    pub run_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub source: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    pub cases: Vec<ManifestEntry>,
}

#[derive(Debug, Serialize)]
pub struct ManifestEntry {
    pub index: usize,
    pub label: String,
    pub file: String,
    pub scenario: Scenario,
    /// Native parameter of single-operation cases.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub perturbation: Option<Perturbation>,
    /// True when the engine produced float output that was saturated on save.
    pub saturated: bool,
}

/// Run every evaluation case on `source`.
pub fn sweep(source: &Path, ctx: &RunContext) -> Result<SweepManifest, RunError> {
    let image = load_rgb(source)?;
    fs::create_dir_all(&ctx.out_dir)?;

    let mut rng = ctx.rng();
    let sweep = EvaluationSweep::default();
    let mut cases = Vec::new();
    for (index, scenario) in sweep.scenarios().into_iter().enumerate() {
        let label = scenario.label();
        let out = sweep.run(image.view(), &scenario, &mut rng)?;
        let saturated = out.is_float();
        let file = format!("{index:03}_{}.png", slug(&label));
        save_channel_first(&ctx.out_dir.join(&file), out.into_u8().view())?;
        debug!(index, %label, "wrote sweep case");
        cases.push(ManifestEntry {
            index,
            label,
            file,
            scenario,
            perturbation: scenario.perturbation(),
            saturated,
        });
    }

    let manifest = SweepManifest {
        run_id: Uuid::new_v4(),
        created_at: Utc::now(),
        source: source.to_path_buf(),
        seed: ctx.seed,
        cases,
    };
    fs::write(ctx.out_dir.join(MANIFEST_FILE), serde_json::to_string_pretty(&manifest)?)?;
    info!(run_id = %manifest.run_id, cases = manifest.cases.len(), "sweep complete");
    Ok(manifest)
}

// ─────────────────────────────────────────────────────────────────────────────
// augment
// ─────────────────────────────────────────────────────────────────────────────

/// Augment equally sized frames as one batch under curriculum cap `cap`.
/// Returns the written paths in input order.
pub fn augment(sources: &[PathBuf], cap: f64, ctx: &RunContext) -> Result<Vec<PathBuf>, RunError> {
    let (first, rest) = sources.split_first().ok_or(RunError::EmptyBatch)?;
    let head = load_rgb(first)?;
    let (h, w, c) = head.dim();

    let mut batch = Array4::<u8>::zeros((sources.len(), h, w, c));
    batch.index_axis_mut(Axis(0), 0).assign(&head);
    for (i, path) in rest.iter().enumerate() {
        let frame = load_rgb(path)?;
        let (fh, fw, _) = frame.dim();
        if (fh, fw) != (h, w) {
            return Err(RunError::SizeMismatch {
                path: path.clone(),
                expected: (h, w),
                found: (fh, fw),
            });
        }
        batch.index_axis_mut(Axis(0), i + 1).assign(&frame);
    }

    let mut augmenter = BatchAugmenter::from_config(ctx.augment, ctx.seed);
    let out = augmenter.augment_batch(batch.view(), cap)?;

    fs::create_dir_all(&ctx.out_dir)?;
    let mut written = Vec::with_capacity(sources.len());
    for (i, source) in sources.iter().enumerate() {
        let path = derived_path(&ctx.out_dir, &format!("aug{i:03}"), source);
        save_channel_first(&path, out.index_axis(Axis(0), i))?;
        written.push(path);
    }
    info!(
        frames = written.len(),
        cap,
        method_set = %ctx.augment.method_set,
        operations = augmenter.registry().len(),
        "augmentation written"
    );
    Ok(written)
}

// ─────────────────────────────────────────────────────────────────────────────
// combine / perturb
// ─────────────────────────────────────────────────────────────────────────────

/// Write one combined perturbation of `source` at ratio `severity`.
pub fn combine(source: &Path, severity: f64, ctx: &RunContext) -> Result<PathBuf, RunError> {
    let image = load_rgb(source)?;
    let out = robustcam_perturb::combine(image.view(), severity, &mut ctx.rng())?;
    fs::create_dir_all(&ctx.out_dir)?;
    let path = derived_path(&ctx.out_dir, "combined", source);
    save_channel_first(&path, out.view())?;
    Ok(path)
}

/// How `perturb` chooses its strength.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Strength {
    Ratio(f64),
    Level(u8),
}

/// Apply the single operation `method` to `source`.
pub fn perturb(source: &Path, method: &str, strength: Strength, ctx: &RunContext) -> Result<PathBuf, RunError> {
    let image = load_rgb(source)?;
    let mut rng = ctx.rng();
    let out = match strength {
        Strength::Ratio(ratio) => robustcam_perturb::perturb(image.view(), method, ratio, &mut rng)?,
        Strength::Level(level) => robustcam_perturb::perturb_at_level(image.view(), method, level, &mut rng)?,
    };
    fs::create_dir_all(&ctx.out_dir)?;
    let path = derived_path(&ctx.out_dir, &slug(method), source);
    save_channel_first(&path, out.into_u8().view())?;
    Ok(path)
}
