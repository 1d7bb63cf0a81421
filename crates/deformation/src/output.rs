//! Dirty-flag gated solve and copy-out into drawable meshes.

use glam::{DVec3, Vec3};
use tracing::{debug, trace};

use crate::coordinator::{BackendStatus, DeformationCoordinator};
use crate::error::{DeformError, Result};
use crate::grid::GridMesh;
use crate::types::DirtyFlag;

/// Drawable copy of one backend's deformed geometry.
///
/// Shares the base grid's topology; only positions change between ticks.
#[derive(Debug, Clone, PartialEq)]
pub struct DeformedMesh {
    pub name: String,
    pub positions: Vec<Vec3>,
    pub indices: Vec<u32>,
    pub status: BackendStatus,
}

impl DeformedMesh {
    fn new(name: &str, mesh: &GridMesh) -> Self {
        Self {
            name: name.to_string(),
            positions: mesh.positions().iter().map(|p| p.as_vec3()).collect(),
            indices: mesh.triangles().iter().flatten().copied().collect(),
            status: BackendStatus::Unprepared,
        }
    }

    /// Vertex buffer contents, tightly packed `[f32; 3]`.
    pub fn position_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.positions)
    }

    /// Index buffer contents, three `u32` per triangle.
    pub fn index_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.indices)
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    fn check_len(&self, positions: &[DVec3]) -> Result<()> {
        if positions.len() != self.positions.len() {
            return Err(DeformError::BufferMismatch {
                backend: self.name.clone(),
                expected: self.positions.len(),
                actual: positions.len(),
            });
        }
        Ok(())
    }

    fn copy_from(&mut self, positions: &[DVec3]) {
        for (out, position) in self.positions.iter_mut().zip(positions) {
            *out = position.as_vec3();
        }
    }
}

/// Summary of one refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncReport {
    /// Number of refreshes so far, including this one
    pub generation: u64,
    pub meshes_refreshed: usize,
}

/// Output meshes for every backend, in coordinator order.
#[derive(Debug, Clone)]
pub struct OutputMeshSync {
    meshes: Vec<DeformedMesh>,
    generation: u64,
}

impl OutputMeshSync {
    pub fn new(mesh: &GridMesh, coordinator: &DeformationCoordinator) -> Self {
        let meshes = coordinator
            .backends()
            .map(|backend| DeformedMesh::new(backend.name(), mesh))
            .collect();
        Self {
            meshes,
            generation: 0,
        }
    }

    pub fn meshes(&self) -> &[DeformedMesh] {
        &self.meshes
    }

    pub fn mesh(&self, name: &str) -> Option<&DeformedMesh> {
        self.meshes.iter().find(|mesh| mesh.name == name)
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Per-tick entry point.
    ///
    /// Does nothing unless `dirty` is set. Otherwise solves every backend,
    /// copies its positions into the matching output mesh and clears the
    /// flag. Buffer lengths are checked for every backend before any mesh
    /// is written, so a mismatch leaves all meshes and the flag untouched.
    pub fn update(
        &mut self,
        coordinator: &mut DeformationCoordinator,
        dirty: &mut DirtyFlag,
    ) -> Result<Option<SyncReport>> {
        if !dirty.is_dirty() {
            trace!("output meshes clean, skipping solve");
            return Ok(None);
        }

        coordinator.solve_all();
        for (index, mesh) in self.meshes.iter().enumerate() {
            if let Some(backend) = coordinator.backend(index) {
                mesh.check_len(backend.current_positions())?;
            }
        }
        for (index, mesh) in self.meshes.iter_mut().enumerate() {
            let Some(backend) = coordinator.backend(index) else {
                continue;
            };
            mesh.copy_from(backend.current_positions());
            if let Some(status) = coordinator.status(index) {
                mesh.status = status.clone();
            }
        }

        dirty.clear();
        self.generation += 1;
        debug!(
            "refreshed {} output meshes (generation {})",
            self.meshes.len(),
            self.generation
        );
        Ok(Some(SyncReport {
            generation: self.generation,
            meshes_refreshed: self.meshes.len(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{DeformationBackend, IdentityBackend, build_backend};
    use crate::control_points::ControlPointSet;
    use crate::grid::GridMeshBuilder;
    use crate::types::VertexId;
    use deformlab_config::{BackendKind, SolverConfig};
    use glam::DVec2;

    fn setup(kinds: &[BackendKind]) -> (GridMesh, DeformationCoordinator, OutputMeshSync) {
        let mesh = GridMeshBuilder::new(3, 3, 10.0, 10.0).build().unwrap();
        let solver = SolverConfig::default();
        let backends = kinds
            .iter()
            .map(|&kind| build_backend(kind, &mesh, &solver))
            .collect();
        let coordinator = DeformationCoordinator::new(backends, &mesh.vertex_ids()).unwrap();
        let sync = OutputMeshSync::new(&mesh, &coordinator);
        (mesh, coordinator, sync)
    }

    #[test]
    fn test_meshes_share_topology() {
        let (mesh, _, sync) = setup(&[BackendKind::OriginalArap, BackendKind::Puppet]);
        assert_eq!(sync.meshes().len(), 2);
        for output in sync.meshes() {
            assert_eq!(output.vertex_count(), 9);
            assert_eq!(output.triangle_count(), mesh.triangle_count());
            assert_eq!(output.position_bytes().len(), 9 * 12);
            assert_eq!(output.index_bytes().len(), mesh.triangle_count() * 12);
        }
        assert!(sync.mesh("PUPPET").is_some());
    }

    #[test]
    fn test_clean_tick_skips_solve() {
        let (_, mut coordinator, mut sync) = setup(&[BackendKind::Identity]);
        let mut dirty = DirtyFlag::default();
        assert_eq!(sync.update(&mut coordinator, &mut dirty), Ok(None));
        assert_eq!(sync.generation(), 0);
    }

    #[test]
    fn test_refresh_after_begin_keeps_rest_pose() {
        let (mesh, mut coordinator, mut sync) =
            setup(&[BackendKind::OriginalArap, BackendKind::SpokesAndRims]);
        let mut controls = ControlPointSet::new();
        controls.add_near(mesh.positions(), DVec2::ZERO, 0.5);
        controls.add_near(mesh.positions(), DVec2::new(20.0, 20.0), 0.5);
        let mut dirty = DirtyFlag::default();
        coordinator.begin_deformation(&mut controls, &mut dirty).unwrap();
        assert!(dirty.is_dirty());

        let report = sync.update(&mut coordinator, &mut dirty).unwrap().unwrap();
        assert_eq!(report.meshes_refreshed, 2);
        assert!(!dirty.is_dirty());
        for output in sync.meshes() {
            assert_eq!(output.status, BackendStatus::Ready);
            for (out, rest) in output.positions.iter().zip(mesh.positions()) {
                assert!(out.distance(rest.as_vec3()) < 1e-4);
            }
        }
    }

    #[test]
    fn test_refresh_copies_deformed_positions() {
        let (mesh, mut coordinator, mut sync) = setup(&[BackendKind::Identity]);
        let mut controls = ControlPointSet::new();
        controls.add_near(mesh.positions(), DVec2::ZERO, 0.5);
        let mut dirty = DirtyFlag::default();
        coordinator.begin_deformation(&mut controls, &mut dirty).unwrap();
        coordinator
            .apply_drag(&[VertexId(0)], DVec2::new(3.0, 4.0), &mut dirty)
            .unwrap();

        sync.update(&mut coordinator, &mut dirty).unwrap();
        assert_eq!(sync.meshes()[0].positions[0], Vec3::new(3.0, 4.0, 0.0));
        assert_eq!(sync.update(&mut coordinator, &mut dirty), Ok(None));
    }

    #[test]
    fn test_mismatch_leaves_every_mesh_untouched() {
        let mesh = GridMeshBuilder::new(3, 3, 10.0, 10.0).build().unwrap();
        let small = GridMeshBuilder::new(2, 2, 10.0, 10.0).build().unwrap();
        let backends: Vec<Box<dyn DeformationBackend>> = vec![
            Box::new(IdentityBackend::new("full", &mesh)),
            Box::new(IdentityBackend::new("small", &small)),
        ];
        let mut coordinator = DeformationCoordinator::new(backends, &small.vertex_ids()).unwrap();
        let mut sync = OutputMeshSync::new(&mesh, &coordinator);
        let mut controls = ControlPointSet::new();
        controls.add_near(mesh.positions(), DVec2::ZERO, 0.5);
        let mut dirty = DirtyFlag::default();
        coordinator.begin_deformation(&mut controls, &mut dirty).unwrap();
        coordinator
            .apply_drag(&[VertexId(0)], DVec2::new(3.0, 4.0), &mut dirty)
            .unwrap();

        assert!(matches!(
            sync.update(&mut coordinator, &mut dirty),
            Err(DeformError::BufferMismatch { .. })
        ));
        assert!(dirty.is_dirty());
        assert_eq!(sync.generation(), 0);
        assert_eq!(sync.meshes()[0].positions[0], Vec3::ZERO);
        assert_eq!(sync.meshes()[0].status, BackendStatus::Unprepared);
    }

    #[test]
    fn test_buffer_mismatch_keeps_flag() {
        let mesh = GridMeshBuilder::new(3, 3, 10.0, 10.0).build().unwrap();
        let small = GridMeshBuilder::new(2, 2, 10.0, 10.0).build().unwrap();
        let backend: Box<dyn DeformationBackend> = Box::new(IdentityBackend::new("small", &small));
        let mut coordinator = DeformationCoordinator::new(vec![backend], &small.vertex_ids()).unwrap();
        let mut sync = OutputMeshSync::new(&mesh, &coordinator);
        let mut dirty = DirtyFlag::default();
        dirty.mark();

        assert_eq!(
            sync.update(&mut coordinator, &mut dirty),
            Err(DeformError::BufferMismatch {
                backend: "small".to_string(),
                expected: 9,
                actual: 4,
            })
        );
        assert!(dirty.is_dirty());
    }
}
