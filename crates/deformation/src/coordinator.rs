//! Backend lifecycle orchestration.
//!
//! The coordinator owns every backend and keeps them in lockstep:
//! - `Idle`: no control points, nothing preprocessed
//! - `Ready`: control points exist, backends not prepared for them
//! - `Active`: every backend was asked to preprocess the current control set
//!
//! A backend whose preprocessing fails stays frozen at its last geometry
//! until a later `begin_deformation` succeeds for it; the coordinator still
//! enters `Active` so the other backends remain usable.

use glam::{DVec2, DVec3};
use tracing::{debug, error, info, trace};

use crate::backend::DeformationBackend;
use crate::control_points::ControlPointSet;
use crate::error::{DeformError, PreprocessError, Result};
use crate::types::{DirtyFlag, VertexId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CoordinatorState {
    #[default]
    Idle,
    Ready,
    Active,
}

/// Outcome of the most recent preprocess for one backend.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum BackendStatus {
    /// Not preprocessed since startup or the last reset
    #[default]
    Unprepared,
    Ready,
    /// Frozen at its last valid geometry
    Failed(PreprocessError),
}

impl BackendStatus {
    pub fn is_failed(&self) -> bool {
        matches!(self, BackendStatus::Failed(_))
    }
}

/// Per-backend results of one `begin_deformation`.
#[derive(Debug, Clone, Default)]
pub struct PreprocessReport {
    pub outcomes: Vec<(String, std::result::Result<(), PreprocessError>)>,
}

impl PreprocessReport {
    pub fn all_succeeded(&self) -> bool {
        self.outcomes.iter().all(|(_, outcome)| outcome.is_ok())
    }

    pub fn failures(&self) -> impl Iterator<Item = (&str, &PreprocessError)> {
        self.outcomes
            .iter()
            .filter_map(|(name, outcome)| outcome.as_ref().err().map(|e| (name.as_str(), e)))
    }
}

#[derive(Debug)]
struct BackendSlot {
    backend: Box<dyn DeformationBackend>,
    status: BackendStatus,
}

/// Drives every backend through the preprocess -> drag -> solve lifecycle.
#[derive(Debug)]
pub struct DeformationCoordinator {
    slots: Vec<BackendSlot>,
    state: CoordinatorState,
}

impl DeformationCoordinator {
    /// Take ownership of the backends and register `roi` as every
    /// backend's region of interest.
    pub fn new(backends: Vec<Box<dyn DeformationBackend>>, roi: &[VertexId]) -> Result<Self> {
        let mut slots = Vec::with_capacity(backends.len());
        for mut backend in backends {
            backend.set_region_of_interest(roi)?;
            debug!(
                "registered backend {} with {} ROI vertices",
                backend.name(),
                roi.len()
            );
            slots.push(BackendSlot {
                backend,
                status: BackendStatus::Unprepared,
            });
        }
        Ok(Self {
            slots,
            state: CoordinatorState::Idle,
        })
    }

    pub fn state(&self) -> CoordinatorState {
        self.state
    }

    pub fn backend_count(&self) -> usize {
        self.slots.len()
    }

    pub fn backends(&self) -> impl Iterator<Item = &dyn DeformationBackend> {
        self.slots
            .iter()
            .map(|slot| &*slot.backend as &dyn DeformationBackend)
    }

    pub fn backend(&self, index: usize) -> Option<&dyn DeformationBackend> {
        self.slots.get(index).map(|slot| slot.backend.as_ref())
    }

    pub fn status(&self, index: usize) -> Option<&BackendStatus> {
        self.slots.get(index).map(|slot| &slot.status)
    }

    /// Geometry used for drag picking: the first backend's current
    /// positions.
    pub fn reference_positions(&self) -> Option<&[DVec3]> {
        self.slots
            .first()
            .map(|slot| slot.backend.current_positions())
    }

    /// Track control point edits made outside deform mode.
    pub fn control_points_changed(&mut self, controls: &ControlPointSet) {
        if self.state != CoordinatorState::Active {
            self.state = Self::resting_state(controls);
        }
    }

    /// Reset every backend, push the current control points and preprocess.
    ///
    /// Always re-preprocesses, even when already active. Preprocess
    /// failures are logged and reported but do not abort; only a
    /// control set the backends reject outright is an error.
    pub fn begin_deformation(
        &mut self,
        controls: &mut ControlPointSet,
        dirty: &mut DirtyFlag,
    ) -> Result<PreprocessReport> {
        controls.clear_drag_set();
        let points = controls.points();
        let mut report = PreprocessReport::default();

        for slot in &mut self.slots {
            slot.backend.reset_control_state();
            slot.backend.set_control_vertices(&points)?;
            let outcome = slot.backend.preprocess();
            match &outcome {
                Ok(()) => {
                    slot.status = BackendStatus::Ready;
                    debug!("{}: preprocessed {} controls", slot.backend.name(), points.len());
                }
                Err(e) => {
                    slot.status = BackendStatus::Failed(e.clone());
                    error!("{}: error in preprocessing: {}", slot.backend.name(), e);
                }
            }
            report
                .outcomes
                .push((slot.backend.name().to_string(), outcome));
        }

        self.state = CoordinatorState::Active;
        dirty.mark();
        info!(
            "deformation active with {} control points ({} of {} backends ready)",
            points.len(),
            report.outcomes.iter().filter(|(_, o)| o.is_ok()).count(),
            self.slots.len()
        );
        Ok(report)
    }

    /// Leave deform mode. The drag set is dropped; control points and
    /// backend preprocessing survive until the next `begin_deformation`.
    pub fn end_deformation(&mut self, controls: &mut ControlPointSet) {
        controls.clear_drag_set();
        self.state = Self::resting_state(controls);
        debug!("deformation ended, coordinator {:?}", self.state);
    }

    /// Stage `current + (delta.x, delta.y, 0)` as the target of every
    /// dragged vertex on every backend. Solving is left to the next tick.
    pub fn apply_drag(
        &mut self,
        dragged: &[VertexId],
        delta: DVec2,
        dirty: &mut DirtyFlag,
    ) -> Result<()> {
        if dragged.is_empty() {
            return Ok(());
        }
        if self.state != CoordinatorState::Active {
            return Err(DeformError::NotActive);
        }

        // Every target is validated before any backend is touched.
        let translation = DVec3::new(delta.x, delta.y, 0.0);
        let mut targets = Vec::with_capacity(self.slots.len());
        for slot in &self.slots {
            let mut staged = Vec::with_capacity(dragged.len());
            for &vertex in dragged {
                let current = slot.backend.control_position(vertex)?;
                if !slot.backend.is_control_vertex(vertex) {
                    return Err(DeformError::NotAControlVertex {
                        vertex: vertex.index(),
                    });
                }
                staged.push((vertex, current + translation));
            }
            targets.push(staged);
        }

        for (slot, staged) in self.slots.iter_mut().zip(targets) {
            for (vertex, target) in staged {
                slot.backend.set_target_position(vertex, target)?;
            }
        }
        trace!("staged drag {:?} for {} vertices", delta, dragged.len());
        dirty.mark();
        Ok(())
    }

    /// Solve every backend once.
    pub fn solve_all(&mut self) {
        for slot in &mut self.slots {
            slot.backend.solve();
        }
    }

    fn resting_state(controls: &ControlPointSet) -> CoordinatorState {
        if controls.is_empty() {
            CoordinatorState::Idle
        } else {
            CoordinatorState::Ready
        }
    }
}
