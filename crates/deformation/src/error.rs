//! Error types for the deformation core.

use thiserror::Error;

/// Result type alias using [`DeformError`].
pub type Result<T> = std::result::Result<T, DeformError>;

/// Errors raised by construction or by a desynchronized caller.
///
/// Apart from the grid construction variants these indicate a bug in the
/// caller, typically a control point set and a backend disagreeing about
/// which vertices exist or are pinned.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DeformError {
    /// Grid needs at least one row and one column.
    #[error("invalid grid dimensions: {rows} rows x {cols} columns")]
    InvalidGrid { rows: usize, cols: usize },

    /// Cell dimensions must be finite and positive.
    #[error("invalid grid cell size: {width} x {height}")]
    InvalidCellSize { width: f64, height: f64 },

    /// A vertex index beyond the mesh was passed to a backend.
    #[error("vertex {vertex} out of range for mesh with {count} vertices")]
    VertexOutOfRange { vertex: usize, count: usize },

    /// A target position was staged for a vertex that is not pinned.
    #[error("vertex {vertex} is not a control vertex")]
    NotAControlVertex { vertex: usize },

    /// A control vertex lies outside the backend's region of interest.
    #[error("control vertex {vertex} is outside the region of interest")]
    OutsideRegionOfInterest { vertex: usize },

    /// Drag deltas are only accepted after `begin_deformation`.
    #[error("deformation is not active")]
    NotActive,

    /// A backend returned a position buffer of the wrong length.
    #[error("backend {backend} returned {actual} positions, expected {expected}")]
    BufferMismatch {
        backend: String,
        expected: usize,
        actual: usize,
    },
}

/// Recoverable preprocessing failure: the linear system for the current
/// region of interest and control set is ill-posed.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PreprocessError {
    #[error("region of interest is empty")]
    EmptyRegionOfInterest,

    #[error("no control vertices")]
    NoControlVertices,

    #[error("{actual} control vertices, at least {required} required")]
    InsufficientControlVertices { required: usize, actual: usize },

    #[error("system with {unknowns} unknowns is not positive definite")]
    SingularSystem { unknowns: usize },
}
