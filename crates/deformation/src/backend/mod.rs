//! Deformation backend capability set.
//!
//! Every strategy being compared sits behind [`DeformationBackend`]. The
//! coordinator only ever talks to this trait; variant-specific code is
//! confined to [`build_backend`] and the implementing modules.
//!
//! Lifecycle of one backend:
//! 1. `set_region_of_interest` once at startup
//! 2. `reset_control_state` + `set_control_vertices` + `preprocess` on every
//!    entry into deform mode
//! 3. any number of `set_target_position` followed by one `solve` per tick

mod arap;
mod identity;
mod puppet;
mod sparse;
mod state;

pub use arap::{ArapBackend, ArapParams, ArapVariant};
pub use identity::IdentityBackend;
pub use puppet::PuppetBackend;
pub use state::BackendState;

use deformlab_config::{BackendKind, SolverConfig};
use glam::DVec3;
use std::fmt::Debug;

use crate::error::{PreprocessError, Result};
use crate::grid::GridMesh;
use crate::types::VertexId;

/// Uniform interface over one deformation algorithm.
pub trait DeformationBackend: Debug {
    /// Name shown next to this backend's output.
    fn name(&self) -> &str;

    /// Number of vertices in the backend's copy of the mesh.
    fn vertex_count(&self) -> usize;

    /// Declare which vertices the solver may move.
    fn set_region_of_interest(&mut self, vertices: &[VertexId]) -> Result<()>;

    /// Replace the pinned set. Invalidates any previous preprocessing.
    fn set_control_vertices(&mut self, vertices: &[VertexId]) -> Result<()>;

    /// Factorize the system for the current region and control set.
    ///
    /// On failure the backend keeps its current geometry and `solve` does
    /// nothing until a later call succeeds.
    fn preprocess(&mut self) -> std::result::Result<(), PreprocessError>;

    /// Stage a desired position for a control vertex; applied by the next
    /// `solve`.
    fn set_target_position(&mut self, vertex: VertexId, position: DVec3) -> Result<()>;

    /// Recompute every free vertex from the staged targets. Does nothing when
    /// no target changed since the last solve.
    fn solve(&mut self);

    /// Clear staged targets and the control set; keeps the region of
    /// interest and the current geometry.
    fn reset_control_state(&mut self);

    /// Whether `vertex` is in the current control set.
    fn is_control_vertex(&self, vertex: VertexId) -> bool;

    /// Current deformed positions, indexed by vertex.
    fn current_positions(&self) -> &[DVec3];

    /// Staged target of a control vertex if one is pending, otherwise the
    /// vertex's current position.
    fn control_position(&self, vertex: VertexId) -> Result<DVec3>;

    /// Whether the last `preprocess` succeeded and nothing invalidated it.
    fn is_preprocessed(&self) -> bool;
}

/// Construct the backend for one configured slot.
pub fn build_backend(
    kind: BackendKind,
    mesh: &GridMesh,
    solver: &SolverConfig,
) -> Box<dyn DeformationBackend> {
    let params = ArapParams {
        iterations: solver.arap_iterations,
        tolerance: solver.arap_tolerance,
    };
    let name = kind.label();
    match kind {
        BackendKind::OriginalArap => {
            Box::new(ArapBackend::new(name, mesh, ArapVariant::Spokes, params))
        }
        BackendKind::SpokesAndRims => {
            Box::new(ArapBackend::new(name, mesh, ArapVariant::SpokesAndRims, params))
        }
        BackendKind::SrArap => Box::new(ArapBackend::new(
            name,
            mesh,
            ArapVariant::SmoothedRotation {
                alpha: solver.sre_arap_alpha,
            },
            params,
        )),
        BackendKind::Puppet => Box::new(PuppetBackend::new(name, mesh)),
        BackendKind::Identity => Box::new(IdentityBackend::new(name, mesh)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::GridMeshBuilder;

    #[test]
    fn test_build_every_kind() {
        let mesh = GridMeshBuilder::new(3, 3, 10.0, 10.0).build().unwrap();
        let solver = SolverConfig::default();
        for kind in [
            BackendKind::OriginalArap,
            BackendKind::SpokesAndRims,
            BackendKind::SrArap,
            BackendKind::Puppet,
            BackendKind::Identity,
        ] {
            let backend = build_backend(kind, &mesh, &solver);
            assert_eq!(backend.name(), kind.label());
            assert_eq!(backend.vertex_count(), 9);
            assert_eq!(backend.current_positions(), mesh.positions());
            assert!(!backend.is_preprocessed());
        }
    }
}
