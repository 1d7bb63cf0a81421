//! Shared configuration for deformlab
//!
//! This crate provides the single source of truth for the base grid, the
//! display the grid is laid out on, selection radius behavior, solver
//! parameters and the ordered list of deformation backends to compare.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default display width in pixels
pub const DEFAULT_WIDTH: u32 = 1024;

/// Default display height in pixels
pub const DEFAULT_HEIGHT: u32 = 768;

/// Default selection radius in mesh units
pub const DEFAULT_RADIUS: f64 = 40.0;

/// Smallest selection radius the scroll wheel can reach
pub const MIN_RADIUS: f64 = 3.0;

/// Radius change per scroll notch
pub const RADIUS_SCROLL_STEP: f64 = 3.0;

/// Errors raised while loading a configuration file
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Display configuration the grid is centered on
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Window width in logical pixels
    pub width: u32,
    /// Window height in logical pixels
    pub height: u32,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
        }
    }
}

impl DisplayConfig {
    /// Create a new display config with the given dimensions
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Get width as f64 for layout calculations
    pub fn width_f64(&self) -> f64 {
        self.width as f64
    }

    /// Get height as f64 for layout calculations
    pub fn height_f64(&self) -> f64 {
        self.height as f64
    }
}

/// Base grid dimensions.
///
/// The grid spans `width` × `height` mesh units split into `cols` × `rows`
/// vertices. Cell size is `width / cols` by `height / rows`, so the last
/// column sits one cell short of the nominal width.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    pub rows: usize,
    pub cols: usize,
    pub width: f64,
    pub height: f64,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            rows: 20,
            cols: 35,
            width: 600.0,
            height: 350.0,
        }
    }
}

impl GridConfig {
    /// Horizontal spacing between neighboring vertices
    pub fn cell_width(&self) -> f64 {
        self.width / self.cols as f64
    }

    /// Vertical spacing between neighboring vertices
    pub fn cell_height(&self) -> f64 {
        self.height / self.rows as f64
    }

    /// Position of vertex 0: the grid is centered on the display's
    /// top-left quadrant.
    pub fn origin(&self, display: &DisplayConfig) -> [f64; 2] {
        [
            display.width_f64() / 4.0 - self.width / 2.0,
            display.height_f64() / 4.0 - self.height / 2.0,
        ]
    }
}

/// Pointer selection radius behavior
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionConfig {
    /// Radius at startup
    pub initial_radius: f64,
    /// Lower clamp applied after every scroll
    pub min_radius: f64,
    /// Radius change per scroll unit
    pub scroll_step: f64,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            initial_radius: DEFAULT_RADIUS,
            min_radius: MIN_RADIUS,
            scroll_step: RADIUS_SCROLL_STEP,
        }
    }
}

/// Numerical parameters shared by the solver backends
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    /// Maximum local/global iterations per ARAP solve (default: 5)
    pub arap_iterations: usize,
    /// Relative energy change below which ARAP iterations stop early (default: 1e-4)
    pub arap_tolerance: f64,
    /// Rotation smoothing weight for SR-ARAP (default: 0.2)
    pub sre_arap_alpha: f64,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            arap_iterations: 5,
            arap_tolerance: 1e-4,
            sre_arap_alpha: 0.2,
        }
    }
}

/// Deformation strategy behind one backend slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    /// Spokes-only ARAP with cotangent weights
    OriginalArap,
    /// ARAP over spokes and rims of every incident triangle
    SpokesAndRims,
    /// Smoothed-rotation enhanced ARAP
    SrArap,
    /// Linear 2D similarity model
    Puppet,
    /// Moves control vertices only
    Identity,
}

impl BackendKind {
    /// Display name used in logs and reports
    pub fn label(self) -> &'static str {
        match self {
            BackendKind::OriginalArap => "ORIGINAL_ARAP",
            BackendKind::SpokesAndRims => "SPOKES_AND_RIMS",
            BackendKind::SrArap => "SRE_ARAP",
            BackendKind::Puppet => "PUPPET",
            BackendKind::Identity => "IDENTITY",
        }
    }
}

/// Top-level harness configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    pub display: DisplayConfig,
    pub grid: GridConfig,
    pub selection: SelectionConfig,
    pub solver: SolverConfig,
    /// Backends in display order; the first one is used for drag picking
    pub backends: Vec<BackendKind>,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            display: DisplayConfig::default(),
            grid: GridConfig::default(),
            selection: SelectionConfig::default(),
            solver: SolverConfig::default(),
            backends: vec![
                BackendKind::OriginalArap,
                BackendKind::SpokesAndRims,
                BackendKind::SrArap,
                BackendKind::Puppet,
            ],
        }
    }
}

impl HarnessConfig {
    /// Parse a configuration from JSON. Missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a JSON configuration file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = HarnessConfig::default();
        assert_eq!(config.display.width, DEFAULT_WIDTH);
        assert_eq!(config.display.height, DEFAULT_HEIGHT);
        assert_eq!(config.grid.rows, 20);
        assert_eq!(config.grid.cols, 35);
        assert_eq!(config.selection.initial_radius, DEFAULT_RADIUS);
        assert_eq!(config.backends.len(), 4);
        assert_eq!(config.backends[0], BackendKind::OriginalArap);
    }

    #[test]
    fn test_grid_layout() {
        let grid = GridConfig::default();
        let display = DisplayConfig::default();
        assert!((grid.cell_width() - 600.0 / 35.0).abs() < 1e-12);
        assert!((grid.cell_height() - 17.5).abs() < 1e-12);

        let [x, y] = grid.origin(&display);
        assert!((x - (256.0 - 300.0)).abs() < 1e-12);
        assert!((y - (192.0 - 175.0)).abs() < 1e-12);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = HarnessConfig::from_json_str(
            r#"{ "grid": { "rows": 3, "cols": 3 }, "backends": ["identity", "sr_arap"] }"#,
        )
        .unwrap();
        assert_eq!(config.grid.rows, 3);
        assert_eq!(config.grid.cols, 3);
        assert_eq!(config.grid.width, 600.0);
        assert_eq!(config.solver.arap_iterations, 5);
        assert_eq!(
            config.backends,
            vec![BackendKind::Identity, BackendKind::SrArap]
        );
    }

    #[test]
    fn test_invalid_json_is_rejected() {
        let err = HarnessConfig::from_json_str(r#"{ "grid": { "rows": "many" } }"#);
        assert!(matches!(err, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_missing_file() {
        let err = HarnessConfig::load("/nonexistent/deformlab.json");
        assert!(matches!(err, Err(ConfigError::Io { .. })));
    }
}
