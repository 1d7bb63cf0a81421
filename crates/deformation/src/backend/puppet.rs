//! Puppet-style 2D deformation.
//!
//! This is the linear first step of as-rigid-as-possible shape manipulation:
//! for every triangle edge, the opposite vertex is expressed in the edge's
//! own frame (`d = x * e + y * perp(e)`) and the solver keeps those local
//! coordinates as close as possible. The energy only allows similarity
//! transforms per triangle, so it needs two pinned vertices to fix rotation
//! and scale. Everything happens in the mesh's xy plane.

use glam::{DMat2, DVec2, DVec3};
use nalgebra::DMatrix;
use std::collections::BTreeMap;
use tracing::debug;

use super::sparse::SparseCholesky;
use super::{BackendState, DeformationBackend};
use crate::error::{PreprocessError, Result};
use crate::grid::GridMesh;
use crate::types::VertexId;

/// Quarter turn counter-clockwise: `(x, y) -> (-y, x)`.
const QUARTER_TURN: DMat2 = DMat2::from_cols(DVec2::new(0.0, 1.0), DVec2::new(-1.0, 0.0));

/// Rotation and scale are free with fewer pins than this.
const MIN_CONTROLS: usize = 2;

/// One residual `sum C_k * v_k` over three vertices.
type Term = [(usize, DMat2); 3];

#[derive(Debug)]
struct Factorization {
    cholesky: SparseCholesky,
    free: Vec<usize>,
    /// Free slot, fixed vertex, coupling block
    coupling: Vec<(usize, usize, DMat2)>,
}

#[derive(Debug)]
pub struct PuppetBackend {
    name: String,
    state: BackendState,
    terms: Vec<Term>,
    factor: Option<Factorization>,
}

impl PuppetBackend {
    pub fn new(name: impl Into<String>, mesh: &GridMesh) -> Self {
        let p = mesh.positions();
        let mut terms = Vec::with_capacity(mesh.triangle_count() * 3);
        for &[a, b, c] in mesh.triangles() {
            let (a, b, c) = (a as usize, b as usize, c as usize);
            for (i, j, l) in [(a, b, c), (b, c, a), (c, a, b)] {
                let edge = (p[j] - p[i]).truncate();
                let opposite = (p[l] - p[i]).truncate();
                let length_sq = edge.length_squared();
                if length_sq <= f64::EPSILON {
                    continue;
                }
                let x = opposite.dot(edge) / length_sq;
                let y = opposite.dot(edge.perp()) / length_sq;
                terms.push([
                    (i, DMat2::IDENTITY * (x - 1.0) + QUARTER_TURN * y),
                    (j, DMat2::IDENTITY * (-x) - QUARTER_TURN * y),
                    (l, DMat2::IDENTITY),
                ]);
            }
        }

        Self {
            name: name.into(),
            state: BackendState::new(p),
            terms,
            factor: None,
        }
    }

    fn factorize(&self) -> std::result::Result<Option<Factorization>, PreprocessError> {
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
            return Ok(None);
        }

        let mut blocks: BTreeMap<(usize, usize), DMat2> = BTreeMap::new();
        for term in &self.terms {
            for &(a, coefficient_a) in term {
                if slot[a].is_none() {
                    continue;
                }
                for &(b, coefficient_b) in term {
                    *blocks.entry((a, b)).or_insert(DMat2::ZERO) +=
                        coefficient_a.transpose() * coefficient_b;
                }
            }
        }

        let mut system = Vec::with_capacity(4 * blocks.len());
        let mut coupling = Vec::new();
        for (&(a, b), block) in &blocks {
            let Some(row) = slot[a] else {
                continue;
            };
            match slot[b] {
                Some(col) => {
                    for c in 0..2 {
                        for r in 0..2 {
                            system.push((2 * row + r, 2 * col + c, block.col(c)[r]));
                        }
                    }
                }
                None => coupling.push((row, b, *block)),
            }
        }

        let cholesky = SparseCholesky::from_triplets(2 * free.len(), &system)?;
        Ok(Some(Factorization {
            cholesky,
            free,
            coupling,
        }))
    }
}

impl DeformationBackend for PuppetBackend {
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
        self.state.check_preprocess(MIN_CONTROLS)?;
        self.factor = self.factorize()?;
        debug!(
            "{}: factorized {} free vertices",
            self.name,
            self.factor.as_ref().map_or(0, |f| f.free.len())
        );
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

        if let Some(factor) = &self.factor {
            let mut rhs = DMatrix::<f64>::zeros(2 * factor.free.len(), 1);
            for &(row, fixed, block) in &factor.coupling {
                let pushed = block * self.state.positions()[fixed].truncate();
                rhs[(2 * row, 0)] -= pushed.x;
                rhs[(2 * row + 1, 0)] -= pushed.y;
            }
            let solution = factor.cholesky.solve(&rhs);

            for (slot, &vertex) in factor.free.iter().enumerate() {
                let z = self.state.rest()[vertex].z;
                self.state.positions_mut()[vertex] =
                    DVec3::new(solution[(2 * slot, 0)], solution[(2 * slot + 1, 0)], z);
            }
        }
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
