use robustcam_types::PerturbError;
use std::path::PathBuf;
use thiserror::Error;

/// Failures surfaced by the `robustcam` subcommands.
#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Perturb(#[from] PerturbError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("manifest error: {0}")]
    Manifest(#[from] serde_json::Error),

    #[error("config error: {0}")]
    Config(String),

    #[error("{path} is {found:?} (h, w) but the batch is {expected:?}")]
    SizeMismatch {
        path: PathBuf,
        expected: (usize, usize),
        found: (usize, usize),
    },

    #[error("no input images given")]
    EmptyBatch,

    #[error("pixel buffer does not match frame size for {0}")]
    Buffer(PathBuf),
}
