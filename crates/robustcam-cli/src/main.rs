//! `robustcam` – command line front end for the perturbation engine.
//!
//! Subcommands:
//!
//! - `init` – write the effective configuration to the config file.
//! - `sweep <image>` – every evaluation case (clean, 15 operations × 5
//!   levels, combined × 5) plus a `manifest.json`.
//! - `augment <images...> --cap C` – one balanced training batch.
//! - `combine <image> --severity R` – an unseen combined perturbation.
//! - `perturb <image> --method M (--severity R | --level L)` – a single
//!   operation.
//!
//! Settings come from `~/.robustcam/config.toml` (or `--config`), then
//! `ROBUSTCAM_*` environment overrides, then command-line flags.

mod commands;
mod config;
mod error;
mod frames;

use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::debug;

use commands::{RunContext, Strength};
use error::RunError;

#[derive(Parser, Debug)]
#[command(name = "robustcam", version, about = "Synthetic camera perturbations for robustness training and evaluation")]
struct Cli {
    /// Config file (defaults to ~/.robustcam/config.toml).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Output directory (overrides the config's output_dir).
    #[arg(short, long, global = true)]
    out: Option<PathBuf>,

    /// Generator seed (overrides the config's seed).
    #[arg(long, global = true)]
    seed: Option<u64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write the effective configuration to the config file.
    Init,
    /// Run the full evaluation sweep on one image.
    Sweep { image: PathBuf },
    /// Augment equally sized images as one batch.
    Augment {
        #[arg(required = true)]
        images: Vec<PathBuf>,
        /// Curriculum cap in [0, 1].
        #[arg(long)]
        cap: f64,
    },
    /// Average three random half-severity perturbations.
    Combine {
        image: PathBuf,
        #[arg(long)]
        severity: f64,
    },
    /// Apply one named operation.
    Perturb {
        image: PathBuf,
        /// Operation name, e.g. `R-low`, `blur`, `H darker`.
        #[arg(short, long)]
        method: String,
        /// Severity ratio in [0, 1].
        #[arg(long, conflicts_with = "level", required_unless_present = "level")]
        severity: Option<f64>,
        /// Evaluation level 1..=5.
        #[arg(long)]
        level: Option<u8>,
    },
}

fn main() -> ExitCode {
    // ── Structured logging ────────────────────────────────────────────────
    // RUST_LOG selects the filter (default "info"); ROBUSTCAM_LOG_FORMAT=json
    // switches to newline-delimited JSON.
    let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_level));

    if std::env::var("ROBUSTCAM_LOG_FORMAT").as_deref() == Ok("json") {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .compact()
            .init();
    }

    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", "error:".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), RunError> {
    let path = cli.config.unwrap_or_else(config::config_path);
    let cfg = resolve_config(&path, cli.seed)?;
    let ctx = RunContext::from_config(&cfg, cli.out);

    match cli.command {
        Command::Init => {
            config::save_to(&cfg, &path).map_err(RunError::Config)?;
            println!("  {} config written to {}", "✓".green(), path.display().to_string().bold());
        }
        Command::Sweep { image } => {
            let manifest = commands::sweep(&image, &ctx)?;
            println!(
                "  {} {} cases written to {}",
                "✓".green(),
                manifest.cases.len(),
                ctx.out_dir.display().to_string().bold()
            );
            println!("  run id {}", manifest.run_id.to_string().dimmed());
        }
        Command::Augment { images, cap } => {
            let written = commands::augment(&images, cap, &ctx)?;
            println!(
                "  {} {} augmented frame(s) in {} ({})",
                "✓".green(),
                written.len(),
                ctx.out_dir.display().to_string().bold(),
                ctx.augment.method_set
            );
        }
        Command::Combine { image, severity } => {
            let path = commands::combine(&image, severity, &ctx)?;
            println!("  {} {}", "✓".green(), path.display().to_string().bold());
        }
        Command::Perturb {
            image,
            method,
            severity,
            level,
        } => {
            let strength = match (severity, level) {
                (Some(ratio), _) => Strength::Ratio(ratio),
                (None, Some(level)) => Strength::Level(level),
                (None, None) => Strength::Ratio(0.0),
            };
            let path = commands::perturb(&image, &method, strength, &ctx)?;
            println!("  {} {}", "✓".green(), path.display().to_string().bold());
        }
    }
    Ok(())
}

/// Load `path` (defaults when absent), then apply the `--seed` flag.  A file
/// that exists but does not parse is an error.
fn resolve_config(path: &Path, seed: Option<u64>) -> Result<config::Config, RunError> {
    let mut cfg = config::load_or_default(path).map_err(RunError::Config)?;
    if seed.is_some() {
        cfg.seed = seed;
    }
    debug!(config = %path.display(), seed = ?cfg.seed, "configuration resolved");
    Ok(cfg)
}
