use nalgebra::DMatrix;

use crate::error::SpatialError;

/// Transport costs from `m` facilities (rows) to `n` customers (columns).
///
/// Every entry is finite and non-negative; construction fails otherwise.
#[derive(Debug, Clone, PartialEq)]
pub struct CostMatrix {
    costs: DMatrix<f64>,
}

impl CostMatrix {
    /// Builds a cost matrix from row-major nested rows, one row per facility.
    ///
    /// # Errors
    ///
    /// Returns `SpatialError::InvalidInput` if there are no rows or columns, if the
    /// rows have different lengths, or if any entry is negative or non-finite.
    pub fn from_rows(rows: &[Vec<f64>]) -> Result<Self, SpatialError> {
        let n_facilities = rows.len();
        if n_facilities == 0 {
            return Err(SpatialError::invalid_input("cost matrix has no facility rows"));
        }
        let n_customers = rows[0].len();
        if let Some((i, row)) = rows.iter().enumerate().find(|(_, row)| row.len() != n_customers) {
            return Err(SpatialError::invalid_input(format!(
                "cost matrix is not rectangular: row {} has {} entries, expected {}",
                i,
                row.len(),
                n_customers
            )));
        }
        let costs = DMatrix::from_fn(n_facilities, n_customers, |i, j| rows[i][j]);
        Self::from_matrix(costs)
    }

    /// Wraps an existing `m x n` matrix after validating it.
    pub fn from_matrix(costs: DMatrix<f64>) -> Result<Self, SpatialError> {
        if costs.nrows() == 0 || costs.ncols() == 0 {
            return Err(SpatialError::invalid_input(format!(
                "cost matrix must have at least one facility and one customer, got {}x{}",
                costs.nrows(),
                costs.ncols()
            )));
        }
        for i in 0..costs.nrows() {
            for j in 0..costs.ncols() {
                let value = costs[(i, j)];
                if !value.is_finite() {
                    return Err(SpatialError::invalid_input(format!(
                        "non-finite cost {} at (facility {}, customer {})",
                        value, i, j
                    )));
                }
                if value < 0.0 {
                    return Err(SpatialError::invalid_input(format!(
                        "negative cost {} at (facility {}, customer {})",
                        value, i, j
                    )));
                }
            }
        }
        Ok(Self { costs })
    }

    pub fn n_facilities(&self) -> usize {
        self.costs.nrows()
    }

    pub fn n_customers(&self) -> usize {
        self.costs.ncols()
    }

    /// Cost between `facility` and `customer`.
    pub fn cost(&self, facility: usize, customer: usize) -> f64 {
        self.costs[(facility, customer)]
    }

    pub fn as_matrix(&self) -> &DMatrix<f64> {
        &self.costs
    }
}
