//! Built-in demo: pin both short edges of the grid, then bend the grid by
//! dragging one of them.

use deformation::{GridMesh, InteractionMode};
use deformlab_config::SelectionConfig;
use glam::DVec2;

use super::{InputEvent, Script};

/// Drag distance per step, in mesh units
const DRAG_STEP: f64 = 10.0;

const DRAG_STEPS: usize = 6;

/// Script for `mesh`, a row-major grid with `rows` x `cols` vertices.
pub fn demo_script(mesh: &GridMesh, rows: usize, cols: usize, selection: &SelectionConfig) -> Script {
    let mut events = Vec::new();
    if rows < 2 || cols < 2 || mesh.vertex_count() != rows * cols {
        return Script { events };
    }

    let positions = mesh.positions();
    let column_length = positions[0].distance(positions[(rows - 1) * cols]);
    let row_length = positions[0].distance(positions[cols - 1]);
    let (first, last, direction): (Vec<usize>, Vec<usize>, DVec2) = if column_length <= row_length {
        (
            (0..rows).map(|row| row * cols).collect(),
            (0..rows).map(|row| row * cols + cols - 1).collect(),
            DVec2::Y,
        )
    } else {
        (
            (0..cols).collect(),
            (0..cols).map(|col| (rows - 1) * cols + col).collect(),
            DVec2::X,
        )
    };
    let point = |index: usize| [positions[index].x, positions[index].y];

    // Shrink to the minimum radius so each press picks a single vertex.
    events.push(InputEvent::Scrolled(-1.0e6));
    events.push(InputEvent::SelectMode(InteractionMode::AddControlPoints));
    for edge in [&first, &last] {
        events.push(InputEvent::PointerPressed(point(edge[0])));
        events.extend(edge[1..].iter().map(|&i| InputEvent::PointerDragged(point(i))));
    }
    events.push(InputEvent::Tick);

    // Grow the radius until it covers the whole dragged edge.
    let start = positions[last[0]].truncate();
    let end = positions[last[last.len() - 1]].truncate();
    let middle = (start + end) / 2.0;
    let reach = start.distance(end) / 2.0 + 1.0;
    if selection.scroll_step > 0.0 && reach > selection.min_radius {
        let notches = ((reach - selection.min_radius) / selection.scroll_step).ceil();
        events.push(InputEvent::Scrolled(notches));
    }
    events.push(InputEvent::SelectMode(InteractionMode::Deform));
    events.push(InputEvent::Tick);

    events.push(InputEvent::PointerPressed([middle.x, middle.y]));
    for step in 1..=DRAG_STEPS {
        let at = middle + direction * DRAG_STEP * step as f64;
        events.push(InputEvent::PointerDragged([at.x, at.y]));
        events.push(InputEvent::Tick);
    }
    events.push(InputEvent::SelectMode(InteractionMode::View));

    Script { events }
}

#[cfg(test)]
mod tests {
    use super::*;
    use deformation::GridMeshBuilder;

    #[test]
    fn test_demo_pins_short_edges() {
        let mesh = GridMeshBuilder::new(3, 5, 10.0, 10.0).build().unwrap();
        let script = demo_script(&mesh, 3, 5, &SelectionConfig::default());
        let pressed: Vec<[f64; 2]> = script
            .events
            .iter()
            .filter_map(|event| match event {
                InputEvent::PointerPressed(point) => Some(*point),
                _ => None,
            })
            .collect();
        assert_eq!(pressed[0], [0.0, 0.0]);
        assert_eq!(pressed[1], [40.0, 0.0]);
        assert_eq!(pressed[2], [40.0, 10.0]);
        assert!(script.events.contains(&InputEvent::SelectMode(InteractionMode::Deform)));
    }

    #[test]
    fn test_demo_for_degenerate_grid_is_empty() {
        let mesh = GridMeshBuilder::new(1, 4, 10.0, 10.0).build().unwrap();
        assert!(demo_script(&mesh, 1, 4, &SelectionConfig::default()).events.is_empty());
    }
}
