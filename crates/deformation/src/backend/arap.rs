//! As-rigid-as-possible surface deformation.
//!
//! One solver covers three energies that differ only in which edges a
//! vertex's rotation is responsible for:
//! - **Spokes**: the edges from the vertex to its one-ring (Sorkine & Alexa)
//! - **SpokesAndRims**: every edge of every triangle around the vertex
//! - **SmoothedRotation**: spokes, plus a penalty on rotation differences
//!   between neighboring cells
//!
//! Solving alternates a global step (Laplacian solve for the free vertices,
//! factorized once in `preprocess`) with a local step (best rotation per cell
//! from the SVD of its edge covariance). Rotations carry over between solves
//! and start at identity after every `preprocess`.

use glam::DVec3;
use nalgebra::{DMatrix, Matrix3, Vector3};
use std::collections::BTreeMap;
use tracing::{debug, trace};

use super::sparse::SparseCholesky;
use super::{BackendState, DeformationBackend};
use crate::error::{PreprocessError, Result};
use crate::grid::GridMesh;
use crate::types::VertexId;

/// Which ARAP energy a backend minimizes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ArapVariant {
    Spokes,
    SpokesAndRims,
    /// Spokes energy plus `alpha * area * sum w_ij |R_i - R_j|^2`
    SmoothedRotation { alpha: f64 },
}

/// Iteration controls for one solve.
#[derive(Debug, Clone, Copy)]
pub struct ArapParams {
    /// Maximum local/global iterations (default: 5)
    pub iterations: usize,
    /// Stop once the relative energy change drops below this (default: 1e-4)
    pub tolerance: f64,
}

impl Default for ArapParams {
    fn default() -> Self {
        Self {
            iterations: 5,
            tolerance: 1e-4,
        }
    }
}

/// Weighted edge whose rest vector is rotated by the owning cell's rotation.
#[derive(Debug, Clone, Copy)]
struct CellEdge {
    from: usize,
    to: usize,
    weight: f64,
    rest: Vector3<f64>,
}

#[derive(Debug)]
struct Factorization {
    cholesky: Option<SparseCholesky>,
    /// Free slot -> vertex
    free: Vec<usize>,
    /// Vertex -> free slot
    slot: Vec<Option<usize>>,
}

#[derive(Debug)]
pub struct ArapBackend {
    name: String,
    variant: ArapVariant,
    params: ArapParams,
    state: BackendState,
    cells: Vec<Vec<CellEdge>>,
    spokes: Vec<Vec<(usize, f64)>>,
    /// `alpha * rest area` for the smoothed variant, zero otherwise
    smoothing: f64,
    rotations: Vec<Matrix3<f64>>,
    factor: Option<Factorization>,
}

impl ArapBackend {
    pub fn new(
        name: impl Into<String>,
        mesh: &GridMesh,
        variant: ArapVariant,
        params: ArapParams,
    ) -> Self {
        let rest = mesh.positions();
        let half_cots = half_cotangents(mesh);

        let mut edge_weights: BTreeMap<(usize, usize), f64> = BTreeMap::new();
        for &(a, b, half_cot) in half_cots.iter().flatten() {
            *edge_weights.entry((a.min(b), a.max(b))).or_insert(0.0) += half_cot;
        }
        let mut spokes = vec![Vec::new(); rest.len()];
        for (&(a, b), &weight) in &edge_weights {
            // Obtuse corners would make the Laplacian indefinite.
            let weight = weight.max(0.0);
            spokes[a].push((b, weight));
            spokes[b].push((a, weight));
        }

        let edge = |from: usize, to: usize, weight: f64| CellEdge {
            from,
            to,
            weight,
            rest: to_na(rest[from] - rest[to]),
        };

        let cells: Vec<Vec<CellEdge>> = match variant {
            ArapVariant::Spokes | ArapVariant::SmoothedRotation { .. } => spokes
                .iter()
                .enumerate()
                .map(|(i, ring)| ring.iter().map(|&(j, w)| edge(i, j, w)).collect())
                .collect(),
            ArapVariant::SpokesAndRims => {
                let mut cells = vec![Vec::new(); rest.len()];
                for (triangle, corners) in mesh.triangles().iter().zip(&half_cots) {
                    for &vertex in triangle {
                        for &(a, b, half_cot) in corners {
                            cells[vertex as usize].push(edge(a, b, half_cot.max(0.0)));
                        }
                    }
                }
                cells
            }
        };

        let smoothing = match variant {
            ArapVariant::SmoothedRotation { alpha } => alpha * mesh.surface_area(),
            _ => 0.0,
        };

        Self {
            name: name.into(),
            variant,
            params,
            state: BackendState::new(rest),
            cells,
            spokes,
            smoothing,
            rotations: vec![Matrix3::identity(); rest.len()],
            factor: None,
        }
    }

    pub fn variant(&self) -> ArapVariant {
        self.variant
    }

    fn factorize(&self) -> std::result::Result<Factorization, PreprocessError> {
        let count = self.state.vertex_count();
        let mut slot = vec![None; count];
        let mut free = Vec::new();
        for index in 0..count {
            if self.state.is_free(index) {
                slot[index] = Some(free.len());
                free.push(index);
            }
        }

        if free.is_empty() {
            return Ok(Factorization {
                cholesky: None,
                free,
                slot,
            });
        }

        let mut laplacian = Vec::with_capacity(4 * self.cells.iter().map(Vec::len).sum::<usize>());
        for edge in self.cells.iter().flatten() {
            let (a, b) = (slot[edge.from], slot[edge.to]);
            if let Some(a) = a {
                laplacian.push((a, a, edge.weight));
            }
            if let Some(b) = b {
                laplacian.push((b, b, edge.weight));
            }
            if let (Some(a), Some(b)) = (a, b) {
                laplacian.push((a, b, -edge.weight));
                laplacian.push((b, a, -edge.weight));
            }
        }

        let cholesky = SparseCholesky::from_triplets(free.len(), &laplacian)?;
        Ok(Factorization {
            cholesky: Some(cholesky),
            free,
            slot,
        })
    }

    /// Local step: best-fit rotation for every cell.
    fn fit_rotations(&mut self, positions: &[DVec3]) {
        let previous = if self.smoothing > 0.0 {
            Some(self.rotations.clone())
        } else {
            None
        };
        for (vertex, cell) in self.cells.iter().enumerate() {
            let mut covariance = Matrix3::zeros();
            for edge in cell {
                let deformed = to_na(positions[edge.from] - positions[edge.to]);
                covariance += edge.weight * edge.rest * deformed.transpose();
            }
            if let Some(previous) = &previous {
                for &(neighbor, weight) in &self.spokes[vertex] {
                    covariance += self.smoothing * weight * previous[neighbor].transpose();
                }
            }
            self.rotations[vertex] = closest_rotation(&covariance);
        }
    }

    /// Global step: solve the prefactored Laplacian for the free vertices.
    fn solve_positions(&self, factor: &Factorization, positions: &mut [DVec3]) {
        let Some(cholesky) = &factor.cholesky else {
            return;
        };
        let mut rhs = DMatrix::<f64>::zeros(factor.free.len(), 3);
        let mut add = |slot: usize, v: Vector3<f64>| {
            for axis in 0..3 {
                rhs[(slot, axis)] += v[axis];
            }
        };

        for (cell, rotation) in self.cells.iter().zip(&self.rotations) {
            for edge in cell {
                let rotated = edge.weight * (rotation * edge.rest);
                let (from, to) = (factor.slot[edge.from], factor.slot[edge.to]);
                if let Some(from) = from {
                    add(from, rotated);
                    if to.is_none() {
                        add(from, edge.weight * to_na(positions[edge.to]));
                    }
                }
                if let Some(to) = to {
                    add(to, -rotated);
                    if from.is_none() {
                        add(to, edge.weight * to_na(positions[edge.from]));
                    }
                }
            }
        }

        let solution = cholesky.solve(&rhs);
        for (slot, &vertex) in factor.free.iter().enumerate() {
            positions[vertex] = DVec3::new(
                solution[(slot, 0)],
                solution[(slot, 1)],
                solution[(slot, 2)],
            );
        }
    }

    fn energy(&self, positions: &[DVec3]) -> f64 {
        let mut total = 0.0;
        for (vertex, (cell, rotation)) in self.cells.iter().zip(&self.rotations).enumerate() {
            for edge in cell {
                let deformed = to_na(positions[edge.from] - positions[edge.to]);
                total += edge.weight * (deformed - rotation * edge.rest).norm_squared();
            }
            if self.smoothing > 0.0 {
                for &(neighbor, weight) in &self.spokes[vertex] {
                    total += self.smoothing
                        * weight
                        * (rotation - self.rotations[neighbor]).norm_squared();
                }
            }
        }
        total
    }
}

impl DeformationBackend for ArapBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn vertex_count(&self) -> usize {
        self.state.vertex_count()
    }

    fn set_region_of_interest(&mut self, vertices: &[VertexId]) -> Result<()> {
        self.factor = None;
        self.state.set_region_of_interest(vertices)
    }

    fn set_control_vertices(&mut self, vertices: &[VertexId]) -> Result<()> {
        self.factor = None;
        self.state.set_control_vertices(vertices)
    }

    fn preprocess(&mut self) -> std::result::Result<(), PreprocessError> {
        self.factor = None;
        self.state.check_preprocess(1)?;
        let factor = self.factorize()?;
        debug!(
            "{}: factorized {} free vertices",
            self.name,
            factor.free.len()
        );
        self.factor = Some(factor);
        self.rotations.fill(Matrix3::identity());
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
        let Some(factor) = self.factor.take() else {
            return;
        };

        let mut positions = self.state.positions().to_vec();
        for (index, position) in positions.iter_mut().enumerate() {
            if factor.slot[index].is_none() {
                *position = self.state.fixed_position(index);
            }
        }

        let mut previous_energy: Option<f64> = None;
        for iteration in 0..self.params.iterations {
            self.solve_positions(&factor, &mut positions);
            self.fit_rotations(&positions);
            let energy = self.energy(&positions);
            trace!("{}: iteration {} energy {:.6}", self.name, iteration, energy);
            if let Some(previous) = previous_energy {
                if (previous - energy).abs() <= self.params.tolerance * previous {
                    break;
                }
            }
            previous_energy = Some(energy);
        }

        self.state.positions_mut().copy_from_slice(&positions);
        self.factor = Some(factor);
        self.state.finish_solve();
    }

    fn reset_control_state(&mut self) {
        self.factor = None;
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

/// Per triangle, the three edges with half the cotangent of the angle
/// opposite each.
fn half_cotangents(mesh: &GridMesh) -> Vec<[(usize, usize, f64); 3]> {
    let p = mesh.positions();
    mesh.triangles()
        .iter()
        .map(|&[a, b, c]| {
            let (a, b, c) = (a as usize, b as usize, c as usize);
            [
                (a, b, 0.5 * cotangent(p[c], p[a], p[b])),
                (b, c, 0.5 * cotangent(p[a], p[b], p[c])),
                (c, a, 0.5 * cotangent(p[b], p[c], p[a])),
            ]
        })
        .collect()
}

/// Cotangent of the angle at `apex` between the rays to `a` and `b`.
fn cotangent(apex: DVec3, a: DVec3, b: DVec3) -> f64 {
    let u = a - apex;
    let v = b - apex;
    let sine = u.cross(v).length();
    if sine <= f64::EPSILON {
        0.0
    } else {
        u.dot(v) / sine
    }
}

/// Rotation `R` maximizing `trace(R * covariance)`.
fn closest_rotation(covariance: &Matrix3<f64>) -> Matrix3<f64> {
    let svd = covariance.svd(true, true);
    let (Some(mut u), Some(v_t)) = (svd.u, svd.v_t) else {
        return Matrix3::identity();
    };
    let mut rotation = v_t.transpose() * u.transpose();
    if rotation.determinant() < 0.0 {
        let smallest = svd.singular_values.imin();
        let mut column = u.column_mut(smallest);
        column *= -1.0;
        rotation = v_t.transpose() * u.transpose();
    }
    rotation
}

#[inline]
fn to_na(v: DVec3) -> Vector3<f64> {
    Vector3::new(v.x, v.y, v.z)
}
