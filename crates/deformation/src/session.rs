//! Application context for one interactive comparison.
//!
//! [`DeformationSession`] owns every piece of mutable state and is the only
//! place input events enter. Each component still owns just its own data;
//! the session routes between them.

use deformlab_config::HarnessConfig;
use glam::DVec2;
use tracing::{debug, info, trace, warn};

use crate::backend::{DeformationBackend, build_backend};
use crate::control_points::{ControlPointSet, SelectionRadius};
use crate::coordinator::{DeformationCoordinator, PreprocessReport};
use crate::error::Result;
use crate::grid::{GridMesh, GridMeshBuilder};
use crate::modes::{GestureAction, InteractionMode, InteractionModeController, PointerEvent};
use crate::output::{DeformedMesh, OutputMeshSync, SyncReport};
use crate::types::DirtyFlag;

/// Last pointer position, for turning absolute positions into drag deltas.
#[derive(Debug, Clone, Copy, Default)]
struct PointerTracker {
    last: Option<DVec2>,
}

impl PointerTracker {
    /// Record `point` and return the displacement since the previous one.
    fn advance(&mut self, point: DVec2) -> DVec2 {
        let delta = self.last.map_or(DVec2::ZERO, |last| point - last);
        self.last = Some(point);
        delta
    }

    fn position(&self) -> Option<DVec2> {
        self.last
    }
}

#[derive(Debug)]
pub struct DeformationSession {
    mesh: GridMesh,
    controls: ControlPointSet,
    radius: SelectionRadius,
    coordinator: DeformationCoordinator,
    outputs: OutputMeshSync,
    modes: InteractionModeController,
    dirty: DirtyFlag,
    pointer: PointerTracker,
}

impl DeformationSession {
    /// Build the configured grid and one backend per configured kind.
    pub fn from_config(config: &HarnessConfig) -> Result<Self> {
        let mesh = GridMeshBuilder::from_config(&config.grid, &config.display).build()?;
        info!(
            "built {}x{} grid: {} vertices, {} triangles",
            config.grid.rows,
            config.grid.cols,
            mesh.vertex_count(),
            mesh.triangle_count()
        );
        let backends = config
            .backends
            .iter()
            .map(|&kind| build_backend(kind, &mesh, &config.solver))
            .collect();
        Self::with_backends(mesh, backends, SelectionRadius::from_config(&config.selection))
    }

    /// Session over explicit backends. Every backend's region of interest
    /// is the full vertex set.
    pub fn with_backends(
        mesh: GridMesh,
        backends: Vec<Box<dyn DeformationBackend>>,
        radius: SelectionRadius,
    ) -> Result<Self> {
        let coordinator = DeformationCoordinator::new(backends, &mesh.vertex_ids())?;
        let outputs = OutputMeshSync::new(&mesh, &coordinator);
        Ok(Self {
            mesh,
            controls: ControlPointSet::new(),
            radius,
            coordinator,
            outputs,
            modes: InteractionModeController::default(),
            dirty: DirtyFlag::default(),
            pointer: PointerTracker::default(),
        })
    }

    /// Switch modes. Entering deform always re-preprocesses every backend,
    /// leaving it drops the drag set.
    pub fn select_mode(&mut self, mode: InteractionMode) -> Result<Option<PreprocessReport>> {
        let previous = self.modes.set_mode(mode);
        if mode == InteractionMode::Deform {
            let report = self
                .coordinator
                .begin_deformation(&mut self.controls, &mut self.dirty)?;
            return Ok(Some(report));
        }
        if previous == InteractionMode::Deform {
            self.coordinator.end_deformation(&mut self.controls);
        }
        Ok(None)
    }

    /// Mode hotkeys. Unbound keys are ignored.
    pub fn key_released(&mut self, key: char) -> Result<Option<InteractionMode>> {
        let Some(mode) = InteractionMode::from_key(key) else {
            debug!("ignoring key {:?}", key);
            return Ok(None);
        };
        self.select_mode(mode)?;
        Ok(Some(mode))
    }

    /// Pointer moved with no button held. In deform mode the drag set
    /// follows the pointer so the points about to move can be highlighted.
    pub fn pointer_moved(&mut self, point: DVec2) -> Result<()> {
        self.pointer.advance(point);
        self.perform(PointerEvent::Moved, point, DVec2::ZERO)
    }

    pub fn pointer_pressed(&mut self, point: DVec2) -> Result<()> {
        self.pointer.advance(point);
        self.perform(PointerEvent::Pressed, point, DVec2::ZERO)
    }

    /// Pointer moved with the button held; the delta is taken from the
    /// previous pointer position.
    pub fn pointer_dragged(&mut self, point: DVec2) -> Result<()> {
        let delta = self.pointer.advance(point);
        self.perform(PointerEvent::Dragged, point, delta)
    }

    /// Grow or shrink the selection radius; returns the new value.
    pub fn scrolled(&mut self, amount: f64) -> f64 {
        let radius = self.radius.scroll(amount);
        debug!("selection radius {:.1}", radius);
        radius
    }

    /// Per-tick recompute. Solves and refreshes outputs only when something
    /// changed since the last tick.
    pub fn update(&mut self) -> Result<Option<SyncReport>> {
        self.outputs.update(&mut self.coordinator, &mut self.dirty)
    }

    fn perform(&mut self, event: PointerEvent, point: DVec2, delta: DVec2) -> Result<()> {
        let radius = self.radius.value();
        match self.modes.dispatch(event) {
            GestureAction::AddNear => {
                let added = self.controls.add_near(self.mesh.positions(), point, radius);
                self.controls_edited(added, "added");
            }
            GestureAction::RemoveNear => {
                let removed = self.controls.remove_near(self.mesh.positions(), point, radius);
                self.controls_edited(removed, "removed");
            }
            GestureAction::PickDragSet => {
                let positions = self
                    .coordinator
                    .reference_positions()
                    .unwrap_or(self.mesh.positions());
                let picked = self.controls.active_drag_set_near(positions, point, radius).len();
                match event {
                    PointerEvent::Pressed if picked == 0 => {
                        warn!("no control points within {:.1} of {:?}", radius, point);
                    }
                    PointerEvent::Pressed => debug!("dragging {} control points", picked),
                    _ => trace!("{} control points under the pointer", picked),
                }
            }
            GestureAction::Drag => {
                self.coordinator
                    .apply_drag(self.controls.drag_set(), delta, &mut self.dirty)?;
            }
            GestureAction::None => {}
        }
        Ok(())
    }

    fn controls_edited(&mut self, count: usize, verb: &str) {
        if count == 0 {
            return;
        }
        debug!("{} {} control points ({} total)", verb, count, self.controls.len());
        self.coordinator.control_points_changed(&self.controls);
        self.dirty.mark();
    }

    pub fn mesh(&self) -> &GridMesh {
        &self.mesh
    }

    pub fn control_points(&self) -> &ControlPointSet {
        &self.controls
    }

    pub fn radius(&self) -> f64 {
        self.radius.value()
    }

    pub fn mode(&self) -> InteractionMode {
        self.modes.mode()
    }

    pub fn coordinator(&self) -> &DeformationCoordinator {
        &self.coordinator
    }

    pub fn outputs(&self) -> &[DeformedMesh] {
        self.outputs.meshes()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty.is_dirty()
    }

    pub fn pointer_position(&self) -> Option<DVec2> {
        self.pointer.position()
    }
}
