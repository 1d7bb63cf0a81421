//! Sparse symmetric positive definite systems shared by the solver backends.

use nalgebra::DMatrix;
use nalgebra_sparse::factorization::CscCholesky;
use nalgebra_sparse::{CooMatrix, CscMatrix};

use crate::error::PreprocessError;

/// Sparse Cholesky factor of a system assembled from `(row, col, value)`
/// triplets.
#[derive(Debug)]
pub struct SparseCholesky {
    factor: CscCholesky<f64>,
    unknowns: usize,
}

impl SparseCholesky {
    /// Factorize the `unknowns x unknowns` matrix whose entries are the sums
    /// of the triplets at each position. Both triangles must be supplied.
    pub fn from_triplets(
        unknowns: usize,
        triplets: &[(usize, usize, f64)],
    ) -> Result<Self, PreprocessError> {
        let mut coo = CooMatrix::new(unknowns, unknowns);
        for &(row, col, value) in triplets {
            coo.push(row, col, value);
        }
        let matrix = CscMatrix::from(&coo);
        let factor = CscCholesky::factor(&matrix)
            .map_err(|_| PreprocessError::SingularSystem { unknowns })?;
        Ok(Self { factor, unknowns })
    }

    pub fn unknowns(&self) -> usize {
        self.unknowns
    }

    /// Solve for every column of `rhs` at once.
    pub fn solve(&self, rhs: &DMatrix<f64>) -> DMatrix<f64> {
        self.factor.solve(rhs)
    }
}
