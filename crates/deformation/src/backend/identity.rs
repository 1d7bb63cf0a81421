//! Rigid-identity backend: control vertices jump to their targets and every
//! other vertex stays where it is.

use glam::DVec3;

use super::{BackendState, DeformationBackend};
use crate::error::{PreprocessError, Result};
use crate::grid::GridMesh;
use crate::types::VertexId;

#[derive(Debug, Clone)]
pub struct IdentityBackend {
    name: String,
    state: BackendState,
}

impl IdentityBackend {
    pub fn new(name: impl Into<String>, mesh: &GridMesh) -> Self {
        Self {
            name: name.into(),
            state: BackendState::new(mesh.positions()),
        }
    }
}

impl DeformationBackend for IdentityBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn vertex_count(&self) -> usize {
        self.state.vertex_count()
    }

    fn set_region_of_interest(&mut self, vertices: &[VertexId]) -> Result<()> {
        self.state.set_region_of_interest(vertices)
    }

    fn set_control_vertices(&mut self, vertices: &[VertexId]) -> Result<()> {
        self.state.set_control_vertices(vertices)
    }

    fn preprocess(&mut self) -> std::result::Result<(), PreprocessError> {
        self.state.check_preprocess(1)?;
        self.state.mark_preprocessed();
        Ok(())
    }

    fn set_target_position(&mut self, vertex: VertexId, position: DVec3) -> Result<()> {
        self.state.stage_target(vertex, position)
    }

    fn solve(&mut self) {
        if !self.state.needs_solve() {
            return;
        }
        let controls: Vec<usize> = self.state.controls().iter().map(|v| v.index()).collect();
        for index in controls {
            let target = self.state.fixed_position(index);
            self.state.positions_mut()[index] = target;
        }
        self.state.finish_solve();
    }

    fn reset_control_state(&mut self) {
        self.state.reset_controls();
    }

    fn is_control_vertex(&self, vertex: VertexId) -> bool {
        self.state.is_control_vertex(vertex)
    }

    fn current_positions(&self) -> &[DVec3] {
        self.state.positions()
    }

    fn control_position(&self, vertex: VertexId) -> Result<DVec3> {
        self.state.control_position(vertex)
    }

    fn is_preprocessed(&self) -> bool {
        self.state.is_preprocessed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DeformError;
    use crate::grid::GridMeshBuilder;

    fn prepared(controls: &[VertexId]) -> (GridMesh, IdentityBackend) {
        let mesh = GridMeshBuilder::new(3, 3, 10.0, 10.0).build().unwrap();
        let mut backend = IdentityBackend::new("identity", &mesh);
        backend.set_region_of_interest(&mesh.vertex_ids()).unwrap();
        backend.set_control_vertices(controls).unwrap();
        backend.preprocess().unwrap();
        (mesh, backend)
    }

    #[test]
    fn test_only_controls_move() {
        let (mesh, mut backend) = prepared(&[VertexId(0), VertexId(8)]);
        let rest = mesh.positions();
        backend
            .set_target_position(VertexId(0), rest[0] + DVec3::new(5.0, 0.0, 0.0))
            .unwrap();
        backend.solve();

        let positions = backend.current_positions();
        assert_eq!(positions[0], rest[0] + DVec3::new(5.0, 0.0, 0.0));
        for i in 1..9 {
            assert_eq!(positions[i], rest[i]);
        }
    }

    #[test]
    fn test_solve_without_targets_is_noop() {
        let (mesh, mut backend) = prepared(&[VertexId(4)]);
        backend.solve();
        backend.solve();
        assert_eq!(backend.current_positions(), mesh.positions());
    }

    #[test]
    fn test_out_of_range_target() {
        let (_, mut backend) = prepared(&[VertexId(4)]);
        assert_eq!(
            backend.set_target_position(VertexId(99), DVec3::ZERO),
            Err(DeformError::VertexOutOfRange { vertex: 99, count: 9 })
        );
    }

    #[test]
    fn test_preprocess_requires_controls() {
        let (_, mut backend) = prepared(&[VertexId(4)]);
        backend.reset_control_state();
        assert_eq!(backend.preprocess(), Err(PreprocessError::NoControlVertices));
        assert!(!backend.is_preprocessed());
    }
}
