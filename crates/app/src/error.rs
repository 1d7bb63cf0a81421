//! Driver errors

use std::path::PathBuf;

use deformation::DeformError;
use deformlab_config::ConfigError;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("deformation failed: {0}")]
    Deform(#[from] DeformError),

    #[error("failed to read script {path}: {source}")]
    ScriptRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid script {path}: {source}")]
    ScriptParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to encode report: {0}")]
    Report(#[source] serde_json::Error),

    #[error("failed to write report {path}: {source}")]
    Output {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
