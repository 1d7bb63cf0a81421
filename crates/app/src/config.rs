//! Command line arguments and configuration resolution

use std::path::PathBuf;

use clap::Parser;
use deformlab_config::HarnessConfig;
use tracing::info;

use crate::error::AppError;

/// Compare ARAP deformation backends on a shared grid without a window.
#[derive(Debug, Clone, Parser)]
#[command(name = "deformlab", version, about)]
pub struct Args {
    /// JSON harness configuration; defaults are used when omitted
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// JSON input script; a built-in demo runs when omitted
    #[arg(long)]
    pub script: Option<PathBuf>,

    /// Where to write the JSON report (stdout when omitted)
    #[arg(long)]
    pub output: Option<PathBuf>,

    /// Log filter used when RUST_LOG is not set
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

impl Args {
    /// Load the configuration file, or fall back to defaults.
    pub fn harness_config(&self) -> Result<HarnessConfig, AppError> {
        match &self.config {
            Some(path) => {
                info!("Loading configuration from {}", path.display());
                Ok(HarnessConfig::load(path)?)
            }
            None => Ok(HarnessConfig::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_flags() {
        let args = Args::parse_from([
            "deformlab",
            "--script",
            "drag.json",
            "--output",
            "out.json",
            "--log-level",
            "debug",
        ]);
        assert_eq!(args.script, Some(PathBuf::from("drag.json")));
        assert_eq!(args.output, Some(PathBuf::from("out.json")));
        assert_eq!(args.log_level, "debug");
        assert!(args.config.is_none());
    }

    #[test]
    fn test_defaults_without_config() {
        let args = Args::parse_from(["deformlab"]);
        assert_eq!(args.log_level, "info");
        let config = args.harness_config().unwrap();
        assert_eq!(config.backends.len(), 4);
    }

    #[test]
    fn test_missing_config_file() {
        let args = Args::parse_from(["deformlab", "--config", "/nonexistent/deformlab.json"]);
        assert!(matches!(
            args.harness_config(),
            Err(AppError::Config(deformlab_config::ConfigError::Io { .. }))
        ));
    }
}
