//! Base grid mesh construction.
//!
//! The grid is the common reference geometry for every backend. It is built
//! once at startup and its topology never changes afterwards.

use deformlab_config::{DisplayConfig, GridConfig};
use glam::{DVec2, DVec3};
use tracing::debug;

use crate::error::{DeformError, Result};
use crate::types::VertexId;

/// Indexed triangle mesh with row-major vertices.
#[derive(Debug, Clone)]
pub struct GridMesh {
    positions: Vec<DVec3>,
    triangles: Vec<[u32; 3]>,
}

impl GridMesh {
    /// Build a mesh from raw parts, checking that every triangle references
    /// an existing vertex.
    pub fn from_parts(positions: Vec<DVec3>, triangles: Vec<[u32; 3]>) -> Result<Self> {
        let count = positions.len();
        for triangle in &triangles {
            for &index in triangle {
                if index as usize >= count {
                    return Err(DeformError::VertexOutOfRange {
                        vertex: index as usize,
                        count,
                    });
                }
            }
        }
        Ok(Self {
            positions,
            triangles,
        })
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    /// Rest positions in vertex order.
    pub fn positions(&self) -> &[DVec3] {
        &self.positions
    }

    pub fn triangles(&self) -> &[[u32; 3]] {
        &self.triangles
    }

    /// Rest position of one vertex.
    pub fn position(&self, vertex: VertexId) -> Option<DVec3> {
        self.positions.get(vertex.index()).copied()
    }

    /// Every vertex of the mesh, used as the full region of interest.
    pub fn vertex_ids(&self) -> Vec<VertexId> {
        (0..self.positions.len()).map(VertexId::from).collect()
    }

    /// Total rest surface area.
    pub fn surface_area(&self) -> f64 {
        self.triangles
            .iter()
            .map(|&[a, b, c]| {
                let p0 = self.positions[a as usize];
                let p1 = self.positions[b as usize];
                let p2 = self.positions[c as usize];
                0.5 * (p1 - p0).cross(p2 - p0).length()
            })
            .sum()
    }
}

/// Builds a regular `rows` × `cols` grid of vertices with two triangles per
/// cell.
#[derive(Debug, Clone)]
pub struct GridMeshBuilder {
    rows: usize,
    cols: usize,
    cell_width: f64,
    cell_height: f64,
    origin: DVec2,
}

impl GridMeshBuilder {
    pub fn new(rows: usize, cols: usize, cell_width: f64, cell_height: f64) -> Self {
        Self {
            rows,
            cols,
            cell_width,
            cell_height,
            origin: DVec2::ZERO,
        }
    }

    /// Builder for the configured grid, placed on the configured display.
    pub fn from_config(grid: &GridConfig, display: &DisplayConfig) -> Self {
        let [x, y] = grid.origin(display);
        Self::new(grid.rows, grid.cols, grid.cell_width(), grid.cell_height())
            .with_origin(DVec2::new(x, y))
    }

    /// Position of vertex 0.
    pub fn with_origin(mut self, origin: DVec2) -> Self {
        self.origin = origin;
        self
    }

    /// Construct the mesh.
    ///
    /// Vertex `row * cols + col` sits at `origin + (col * cell_width,
    /// row * cell_height, 0)`. Each candidate triangle has its last two
    /// corners swapped when the signed angle from its first edge to its
    /// second is positive, so every triangle winds clockwise in mesh space
    /// (counter-clockwise on a y-down screen).
    pub fn build(&self) -> Result<GridMesh> {
        if self.rows == 0 || self.cols == 0 {
            return Err(DeformError::InvalidGrid {
                rows: self.rows,
                cols: self.cols,
            });
        }
        let valid = |v: f64| v.is_finite() && v > 0.0;
        if !valid(self.cell_width) || !valid(self.cell_height) {
            return Err(DeformError::InvalidCellSize {
                width: self.cell_width,
                height: self.cell_height,
            });
        }

        let mut positions = Vec::with_capacity(self.rows * self.cols);
        for row in 0..self.rows {
            for col in 0..self.cols {
                positions.push(DVec3::new(
                    self.origin.x + col as f64 * self.cell_width,
                    self.origin.y + row as f64 * self.cell_height,
                    0.0,
                ));
            }
        }

        let cols = self.cols as u32;
        let mut triangles = Vec::with_capacity(2 * (self.rows - 1) * (self.cols - 1));
        for row in 0..self.rows.saturating_sub(1) as u32 {
            for col in 0..cols - 1 {
                let top_left = row * cols + col;
                let top_right = top_left + 1;
                let bottom_left = top_left + cols;
                let bottom_right = bottom_left + 1;
                for candidate in [
                    [top_left, top_right, bottom_right],
                    [top_left, bottom_right, bottom_left],
                ] {
                    triangles.push(orient(&positions, candidate));
                }
            }
        }

        debug!(
            "built grid: {} vertices, {} triangles",
            positions.len(),
            triangles.len()
        );
        GridMesh::from_parts(positions, triangles)
    }
}

fn orient(positions: &[DVec3], [i0, i1, i2]: [u32; 3]) -> [u32; 3] {
    let p0 = positions[i0 as usize];
    let e1 = (positions[i1 as usize] - p0).truncate();
    let e2 = (positions[i2 as usize] - p0).truncate();
    let signed_angle = e1.perp_dot(e2).atan2(e1.dot(e2));
    if signed_angle > 0.0 {
        [i0, i2, i1]
    } else {
        [i0, i1, i2]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signed_area(mesh: &GridMesh, [a, b, c]: [u32; 3]) -> f64 {
        let p = mesh.positions();
        let e1 = (p[b as usize] - p[a as usize]).truncate();
        let e2 = (p[c as usize] - p[a as usize]).truncate();
        0.5 * e1.perp_dot(e2)
    }

    #[test]
    fn test_three_by_three_counts() {
        let mesh = GridMeshBuilder::new(3, 3, 10.0, 10.0).build().unwrap();
        assert_eq!(mesh.vertex_count(), 9);
        assert_eq!(mesh.triangle_count(), 8);
    }

    #[test]
    fn test_row_major_layout() {
        let mesh = GridMeshBuilder::new(2, 3, 2.0, 5.0)
            .with_origin(DVec2::new(10.0, 20.0))
            .build()
            .unwrap();
        assert_eq!(mesh.position(VertexId(0)), Some(DVec3::new(10.0, 20.0, 0.0)));
        assert_eq!(mesh.position(VertexId(2)), Some(DVec3::new(14.0, 20.0, 0.0)));
        assert_eq!(mesh.position(VertexId(3)), Some(DVec3::new(10.0, 25.0, 0.0)));
        assert_eq!(mesh.position(VertexId(6)), None);
    }

    #[test]
    fn test_triangle_count_formula() {
        for (rows, cols) in [(2, 2), (4, 7), (20, 35)] {
            let mesh = GridMeshBuilder::new(rows, cols, 1.0, 1.0).build().unwrap();
            assert_eq!(mesh.triangle_count(), 2 * (rows - 1) * (cols - 1));
        }
    }

    #[test]
    fn test_consistent_winding() {
        let mesh = GridMeshBuilder::new(4, 5, 3.0, 2.0).build().unwrap();
        for &triangle in mesh.triangles() {
            assert!(signed_area(&mesh, triangle) < 0.0, "{:?}", triangle);
        }
    }

    #[test]
    fn test_single_row_has_no_triangles() {
        let mesh = GridMeshBuilder::new(1, 4, 1.0, 1.0).build().unwrap();
        assert_eq!(mesh.vertex_count(), 4);
        assert_eq!(mesh.triangle_count(), 0);
    }

    #[test]
    fn test_invalid_parameters() {
        assert_eq!(
            GridMeshBuilder::new(0, 3, 1.0, 1.0).build().unwrap_err(),
            DeformError::InvalidGrid { rows: 0, cols: 3 }
        );
        assert!(matches!(
            GridMeshBuilder::new(3, 3, -1.0, 1.0).build(),
            Err(DeformError::InvalidCellSize { .. })
        ));
        assert!(matches!(
            GridMeshBuilder::new(3, 3, 1.0, f64::NAN).build(),
            Err(DeformError::InvalidCellSize { .. })
        ));
    }

    #[test]
    fn test_from_parts_rejects_bad_index() {
        let err = GridMesh::from_parts(vec![DVec3::ZERO; 3], vec![[0, 1, 3]]).unwrap_err();
        assert_eq!(err, DeformError::VertexOutOfRange { vertex: 3, count: 3 });
    }

    #[test]
    fn test_surface_area() {
        let mesh = GridMeshBuilder::new(3, 3, 2.0, 3.0).build().unwrap();
        assert!((mesh.surface_area() - 24.0).abs() < 1e-9);
    }

    #[test]
    fn test_from_config() {
        let grid = GridConfig::default();
        let display = DisplayConfig::default();
        let mesh = GridMeshBuilder::from_config(&grid, &display).build().unwrap();
        assert_eq!(mesh.vertex_count(), 700);
        let [x, y] = grid.origin(&display);
        assert_eq!(mesh.positions()[0], DVec3::new(x, y, 0.0));
    }
}
