//! Bookkeeping shared by every backend implementation.

use glam::DVec3;

use crate::error::{DeformError, PreprocessError, Result};
use crate::types::VertexId;

/// Region of interest, control set, staged targets and current geometry.
///
/// Backends own one of these and add their numerical model on top.
#[derive(Debug, Clone)]
pub struct BackendState {
    rest: Vec<DVec3>,
    positions: Vec<DVec3>,
    in_roi: Vec<bool>,
    roi_len: usize,
    is_control: Vec<bool>,
    controls: Vec<VertexId>,
    targets: Vec<Option<DVec3>>,
    preprocessed: bool,
    pending: bool,
}

impl BackendState {
    pub fn new(rest: &[DVec3]) -> Self {
        let count = rest.len();
        Self {
            rest: rest.to_vec(),
            positions: rest.to_vec(),
            in_roi: vec![false; count],
            roi_len: 0,
            is_control: vec![false; count],
            controls: Vec::new(),
            targets: vec![None; count],
            preprocessed: false,
            pending: false,
        }
    }

    pub fn vertex_count(&self) -> usize {
        self.rest.len()
    }

    /// Index of `vertex`, or an error if it is beyond the mesh.
    pub fn check(&self, vertex: VertexId) -> Result<usize> {
        let index = vertex.index();
        if index < self.rest.len() {
            Ok(index)
        } else {
            Err(DeformError::VertexOutOfRange {
                vertex: index,
                count: self.rest.len(),
            })
        }
    }

    pub fn set_region_of_interest(&mut self, vertices: &[VertexId]) -> Result<()> {
        let mut in_roi = vec![false; self.rest.len()];
        for &vertex in vertices {
            in_roi[self.check(vertex)?] = true;
        }
        self.roi_len = in_roi.iter().filter(|&&inside| inside).count();
        self.in_roi = in_roi;
        self.preprocessed = false;
        Ok(())
    }

    /// Replace the control set. Validation happens before anything changes
    /// so a rejected call leaves the previous set intact.
    pub fn set_control_vertices(&mut self, vertices: &[VertexId]) -> Result<()> {
        for &vertex in vertices {
            let index = self.check(vertex)?;
            if !self.in_roi[index] {
                return Err(DeformError::OutsideRegionOfInterest { vertex: index });
            }
        }

        let mut controls = vertices.to_vec();
        controls.sort_unstable();
        controls.dedup();

        self.is_control.iter_mut().for_each(|flag| *flag = false);
        for &vertex in &controls {
            self.is_control[vertex.index()] = true;
        }
        for (index, target) in self.targets.iter_mut().enumerate() {
            if !self.is_control[index] {
                *target = None;
            }
        }
        self.controls = controls;
        self.preprocessed = false;
        Ok(())
    }

    pub fn stage_target(&mut self, vertex: VertexId, position: DVec3) -> Result<()> {
        let index = self.check(vertex)?;
        if !self.is_control[index] {
            return Err(DeformError::NotAControlVertex { vertex: index });
        }
        self.targets[index] = Some(position);
        self.pending = true;
        Ok(())
    }

    /// Drop targets and controls; the region of interest and current
    /// geometry are kept.
    pub fn reset_controls(&mut self) {
        self.is_control.iter_mut().for_each(|flag| *flag = false);
        self.targets.iter_mut().for_each(|target| *target = None);
        self.controls.clear();
        self.preprocessed = false;
        self.pending = false;
    }

    /// Common preconditions every model checks before factorizing.
    pub fn check_preprocess(&self, min_controls: usize) -> std::result::Result<(), PreprocessError> {
        if self.roi_len == 0 {
            return Err(PreprocessError::EmptyRegionOfInterest);
        }
        if self.controls.is_empty() {
            return Err(PreprocessError::NoControlVertices);
        }
        if self.controls.len() < min_controls {
            return Err(PreprocessError::InsufficientControlVertices {
                required: min_controls,
                actual: self.controls.len(),
            });
        }
        Ok(())
    }

    pub fn mark_preprocessed(&mut self) {
        self.preprocessed = true;
        self.pending = false;
    }

    pub fn is_preprocessed(&self) -> bool {
        self.preprocessed
    }

    /// True when a solve has work to do.
    pub fn needs_solve(&self) -> bool {
        self.preprocessed && self.pending
    }

    pub fn finish_solve(&mut self) {
        self.pending = false;
    }

    /// A vertex the solver may move: inside the region and not pinned.
    pub fn is_free(&self, index: usize) -> bool {
        self.in_roi[index] && !self.is_control[index]
    }

    pub fn is_control(&self, index: usize) -> bool {
        self.is_control[index]
    }

    /// Whether `vertex` exists and is pinned.
    pub fn is_control_vertex(&self, vertex: VertexId) -> bool {
        self.check(vertex).is_ok_and(|index| self.is_control[index])
    }

    pub fn controls(&self) -> &[VertexId] {
        &self.controls
    }

    /// Where a fixed vertex must sit during a solve: its staged target for
    /// control vertices, its current position otherwise.
    pub fn fixed_position(&self, index: usize) -> DVec3 {
        self.targets[index].unwrap_or(self.positions[index])
    }

    /// Staged target if one exists, else the current position.
    pub fn control_position(&self, vertex: VertexId) -> Result<DVec3> {
        let index = self.check(vertex)?;
        Ok(self.fixed_position(index))
    }

    pub fn rest(&self) -> &[DVec3] {
        &self.rest
    }

    pub fn positions(&self) -> &[DVec3] {
        &self.positions
    }

    pub fn positions_mut(&mut self) -> &mut [DVec3] {
        &mut self.positions
    }
}
