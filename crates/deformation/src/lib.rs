//! ARAP deformation comparison core for deformlab.
//!
//! This crate keeps several independently-stateful deformation backends in
//! lockstep on one base grid mesh:
//! - Control point selection with radius picking
//! - Backend lifecycle: region of interest, control vertices, preprocessing
//! - Drag deltas turned into per-backend target positions
//! - Dirty-flag gated solve and copy-out into drawable meshes
//!
//! # Architecture
//!
//! Pointer events enter through [`DeformationSession`], which asks the
//! [`InteractionModeController`] what the current mode does with them and
//! routes the result either to the [`ControlPointSet`] or to the
//! [`DeformationCoordinator`]. Once per tick [`DeformationSession::update`]
//! lets [`OutputMeshSync`] solve every backend and refresh the
//! [`DeformedMesh`] buffers, but only when something marked the scene dirty.
//!
//! ## Key Components
//!
//! - **Grid**: fixed-topology base mesh shared by all backends
//! - **Backend**: the [`DeformationBackend`] capability set and its variants
//! - **Control points**: the single source of truth for pinned vertices
//! - **Coordinator**: Idle → Ready → Active lifecycle across backends
//! - **Output**: coalesced recompute into render buffers
//! - **Modes**: add / remove / deform / view gesture mapping

pub mod backend;
pub mod control_points;
pub mod coordinator;
pub mod error;
pub mod grid;
pub mod modes;
pub mod output;
pub mod session;
pub mod types;

pub use backend::{
    ArapBackend, ArapVariant, DeformationBackend, IdentityBackend, PuppetBackend, build_backend,
};
pub use control_points::{ControlPointSet, SelectionRadius};
pub use coordinator::{BackendStatus, CoordinatorState, DeformationCoordinator, PreprocessReport};
pub use error::{DeformError, PreprocessError, Result};
pub use grid::{GridMesh, GridMeshBuilder};
pub use modes::{GestureAction, InteractionMode, InteractionModeController, PointerEvent};
pub use output::{DeformedMesh, OutputMeshSync, SyncReport};
pub use session::DeformationSession;
pub use types::{DirtyFlag, VertexId};
