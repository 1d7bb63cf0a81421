//! Control point selection.
//!
//! [`ControlPointSet`] is the only owner of which vertices are pinned and
//! which of those the current drag gesture moves. Picking works on the xy
//! projection of whatever positions the caller passes in: the rest mesh for
//! adding and removing, a backend's deformed geometry for drag picking.

use deformlab_config::SelectionConfig;
use glam::{DVec2, DVec3};
use std::collections::BTreeSet;

use crate::types::VertexId;

/// Whether the xy projection of `position` lies within `radius` of `point`,
/// boundary included. A negative or NaN radius contains nothing.
fn is_near(position: DVec3, point: DVec2, radius: f64) -> bool {
    radius >= 0.0 && position.truncate().distance_squared(point) <= radius * radius
}

fn within(positions: &[DVec3], point: DVec2, radius: f64) -> impl Iterator<Item = VertexId> + '_ {
    positions
        .iter()
        .enumerate()
        .filter(move |&(_, &p)| is_near(p, point, radius))
        .map(|(index, _)| VertexId::from(index))
}

/// Pinned vertices plus the subset grabbed by the current drag.
#[derive(Debug, Clone, Default)]
pub struct ControlPointSet {
    points: BTreeSet<VertexId>,
    dragged: Vec<VertexId>,
}

impl ControlPointSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add every vertex near `point` that is not yet a control point.
    ///
    /// Returns how many were added.
    pub fn add_near(&mut self, positions: &[DVec3], point: DVec2, radius: f64) -> usize {
        within(positions, point, radius)
            .filter(|&vertex| self.points.insert(vertex))
            .count()
    }

    /// Remove every control point near `point`. Removed vertices also leave
    /// the drag set. Returns how many were removed.
    pub fn remove_near(&mut self, positions: &[DVec3], point: DVec2, radius: f64) -> usize {
        let removed = within(positions, point, radius)
            .filter(|vertex| self.points.remove(vertex))
            .count();
        if removed > 0 {
            let points = &self.points;
            self.dragged.retain(|vertex| points.contains(vertex));
        }
        removed
    }

    /// Replace the drag set with the control points near `point`.
    ///
    /// `deformed` is the currently displayed geometry, so the user grabs the
    /// point where they see it rather than where it started.
    pub fn active_drag_set_near(
        &mut self,
        deformed: &[DVec3],
        point: DVec2,
        radius: f64,
    ) -> &[VertexId] {
        self.dragged = self
            .points
            .iter()
            .copied()
            .filter(|vertex| {
                deformed
                    .get(vertex.index())
                    .is_some_and(|&p| is_near(p, point, radius))
            })
            .collect();
        &self.dragged
    }

    /// Forget the current drag set; control points stay.
    pub fn clear_drag_set(&mut self) {
        self.dragged.clear();
    }

    /// Control points in ascending vertex order.
    pub fn points(&self) -> Vec<VertexId> {
        self.points.iter().copied().collect()
    }

    pub fn contains(&self, vertex: VertexId) -> bool {
        self.points.contains(&vertex)
    }

    pub fn drag_set(&self) -> &[VertexId] {
        &self.dragged
    }

    pub fn is_dragged(&self, vertex: VertexId) -> bool {
        self.dragged.contains(&vertex)
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Pointer selection radius, adjusted by scrolling.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SelectionRadius {
    value: f64,
    min: f64,
    step: f64,
}

impl SelectionRadius {
    /// A negative or NaN `min` is treated as zero.
    pub fn new(value: f64, min: f64, step: f64) -> Self {
        let min = min.max(0.0);
        Self {
            value: value.max(min),
            min,
            step,
        }
    }

    pub fn from_config(config: &SelectionConfig) -> Self {
        Self::new(config.initial_radius, config.min_radius, config.scroll_step)
    }

    /// Grow or shrink by `amount` scroll units, never below the minimum.
    pub fn scroll(&mut self, amount: f64) -> f64 {
        self.value = (self.value + amount * self.step).max(self.min);
        self.value
    }

    pub fn value(&self) -> f64 {
        self.value
    }
}

impl Default for SelectionRadius {
    fn default() -> Self {
        Self::from_config(&SelectionConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::GridMeshBuilder;

    fn positions() -> Vec<DVec3> {
        GridMeshBuilder::new(3, 3, 10.0, 10.0)
            .build()
            .unwrap()
            .positions()
            .to_vec()
    }

    #[test]
    fn test_add_then_remove_is_symmetric() {
        let positions = positions();
        for (point, radius) in [
            (DVec2::new(0.0, 0.0), 0.0),
            (DVec2::new(10.0, 10.0), 10.0),
            (DVec2::new(3.0, 17.0), 12.5),
            (DVec2::new(10.0, 10.0), 100.0),
        ] {
            let mut set = ControlPointSet::new();
            set.add_near(&positions, point, radius);
            set.remove_near(&positions, point, radius);
            assert!(set.is_empty(), "{:?} {}", point, radius);
        }
    }

    #[test]
    fn test_add_is_idempotent() {
        let positions = positions();
        let mut set = ControlPointSet::new();
        let added = set.add_near(&positions, DVec2::new(10.0, 10.0), 10.0);
        assert_eq!(added, 5);
        let once = set.points();

        assert_eq!(set.add_near(&positions, DVec2::new(10.0, 10.0), 10.0), 0);
        assert_eq!(set.points(), once);
    }

    #[test]
    fn test_radius_boundary_is_inclusive() {
        let positions = positions();
        let mut set = ControlPointSet::new();
        // Vertex 0 sits at the origin, exactly 3.0 away.
        assert_eq!(set.add_near(&positions, DVec2::new(3.0, 0.0), 3.0), 1);
        assert!(set.contains(VertexId(0)));

        let mut set = ControlPointSet::new();
        assert_eq!(set.add_near(&positions, DVec2::new(3.0, 0.0), 2.999), 0);
    }

    #[test]
    fn test_negative_radius_selects_nothing() {
        let positions = positions();
        let mut set = ControlPointSet::new();
        assert_eq!(set.add_near(&positions, DVec2::ZERO, -5.0), 0);
        assert_eq!(set.add_near(&positions, DVec2::ZERO, f64::NAN), 0);

        set.add_near(&positions, DVec2::ZERO, 0.5);
        assert_eq!(set.remove_near(&positions, DVec2::ZERO, -5.0), 0);
        assert!(set.active_drag_set_near(&positions, DVec2::ZERO, -5.0).is_empty());
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_drag_set_is_subset_of_controls() {
        let positions = positions();
        let mut set = ControlPointSet::new();
        set.add_near(&positions, DVec2::ZERO, 0.5);
        set.add_near(&positions, DVec2::new(20.0, 20.0), 0.5);

        // Vertex 1 is near but not a control point.
        let dragged = set.active_drag_set_near(&positions, DVec2::new(5.0, 0.0), 6.0);
        assert_eq!(dragged, &[VertexId(0)]);
        assert!(set.is_dragged(VertexId(0)));
        assert!(!set.is_dragged(VertexId(1)));
    }

    #[test]
    fn test_drag_set_uses_deformed_positions() {
        let rest = positions();
        let mut set = ControlPointSet::new();
        set.add_near(&rest, DVec2::ZERO, 0.5);

        let mut deformed = rest.clone();
        deformed[0] = DVec3::new(50.0, 50.0, 0.0);
        assert!(set.active_drag_set_near(&deformed, DVec2::ZERO, 1.0).is_empty());
        assert_eq!(
            set.active_drag_set_near(&deformed, DVec2::new(50.0, 50.0), 1.0),
            &[VertexId(0)]
        );
    }

    #[test]
    fn test_remove_prunes_drag_set() {
        let positions = positions();
        let mut set = ControlPointSet::new();
        set.add_near(&positions, DVec2::ZERO, 10.0);
        set.active_drag_set_near(&positions, DVec2::ZERO, 10.0);
        assert_eq!(set.drag_set().len(), 3);

        set.remove_near(&positions, DVec2::ZERO, 0.5);
        assert_eq!(set.drag_set(), &[VertexId(1), VertexId(3)]);
        set.clear_drag_set();
        assert!(set.drag_set().is_empty());
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_radius_scroll_clamps() {
        let mut radius = SelectionRadius::default();
        assert_eq!(radius.value(), 40.0);
        assert_eq!(radius.scroll(2.0), 46.0);
        assert_eq!(radius.scroll(-100.0), 3.0);
        assert_eq!(radius.scroll(1.0), 6.0);
    }

    #[test]
    fn test_radius_minimum_is_never_negative() {
        let mut radius = SelectionRadius::new(-5.0, -10.0, 1.0);
        assert_eq!(radius.value(), 0.0);
        assert_eq!(radius.scroll(-3.0), 0.0);
        assert_eq!(radius.scroll(2.0), 2.0);
    }
}
