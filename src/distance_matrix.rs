use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::coordinate_set::EntityKind;
use crate::cost_matrix::CostMatrix;
use crate::error::SpatialError;

/// How a missing same-category distance `d(a, b)` is estimated from the
/// entities `c` of the opposite category, using the two-leg sums
/// `d(a, c) + d(c, b)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "policy", rename_all = "kebab-case")]
pub enum TriangulationPolicy {
    /// Smallest two-leg sum, the tightest triangle-inequality upper bound.
    Min,
    /// Mean of the `k` smallest two-leg sums.
    AverageK { k: usize },
    /// Midpoint between the upper bound `min(d(a,c) + d(c,b))` and the lower
    /// bound `max|d(a,c) - d(c,b)|` over the `k` references with the
    /// smallest two-leg sums.
    Midpoint { k: usize },
}

impl Default for TriangulationPolicy {
    fn default() -> Self {
        TriangulationPolicy::AverageK { k: 4 }
    }
}

impl TriangulationPolicy {
    fn validate(&self) -> Result<(), SpatialError> {
        match self {
            TriangulationPolicy::AverageK { k } | TriangulationPolicy::Midpoint { k } if *k == 0 => Err(
                SpatialError::invalid_input("triangulation policy needs at least one reference entity (k >= 1)"),
            ),
            _ => Ok(()),
        }
    }

    /// Estimates a distance from `(d(a, c), d(c, b))` legs. `legs` is reordered.
    fn estimate(&self, legs: &mut [(f64, f64)]) -> f64 {
        legs.sort_by(|x, y| (x.0 + x.1).total_cmp(&(y.0 + y.1)));
        match *self {
            TriangulationPolicy::Min => legs[0].0 + legs[0].1,
            TriangulationPolicy::AverageK { k } => {
                let refs = &legs[..k.min(legs.len())];
                refs.iter().map(|(ac, cb)| ac + cb).sum::<f64>() / refs.len() as f64
            }
            TriangulationPolicy::Midpoint { k } => {
                let refs = &legs[..k.min(legs.len())];
                let upper = refs[0].0 + refs[0].1;
                let lower = refs.iter().map(|(ac, cb)| (ac - cb).abs()).fold(0.0, f64::max);
                (upper + lower) / 2.0
            }
        }
    }
}

/// Symmetric `(m + n) x (m + n)` distance matrix with zero diagonal over all
/// entities, index-aligned with `kinds`.
#[derive(Debug, Clone, PartialEq)]
pub struct FullDistanceMatrix {
    distances: DMatrix<f64>,
    kinds: Vec<EntityKind>,
}

impl FullDistanceMatrix {
    /// Accepts an already complete distance matrix. `kinds` tags each row.
    ///
    /// # Errors
    ///
    /// Returns `SpatialError::InvalidInput` if the matrix is not square, does not
    /// match `kinds` in length, is not exactly symmetric, has a non-zero
    /// diagonal, or holds negative or non-finite entries.
    pub fn from_square(distances: DMatrix<f64>, kinds: Vec<EntityKind>) -> Result<Self, SpatialError> {
        let matrix = Self { distances, kinds };
        matrix.validate()?;
        Ok(matrix)
    }

    pub(crate) fn validate(&self) -> Result<(), SpatialError> {
        let d = &self.distances;
        if d.nrows() != d.ncols() {
            return Err(SpatialError::invalid_input(format!(
                "distance matrix must be square, got {}x{}",
                d.nrows(),
                d.ncols()
            )));
        }
        if d.nrows() != self.kinds.len() {
            return Err(SpatialError::invalid_input(format!(
                "distance matrix has {} rows but {} entity tags",
                d.nrows(),
                self.kinds.len()
            )));
        }
        for i in 0..d.nrows() {
            if d[(i, i)] != 0.0 {
                return Err(SpatialError::invalid_input(format!(
                    "diagonal entry ({}, {}) is {}, expected 0",
                    i,
                    i,
                    d[(i, i)]
                )));
            }
            for j in (i + 1)..d.ncols() {
                let value = d[(i, j)];
                if !value.is_finite() || value < 0.0 {
                    return Err(SpatialError::invalid_input(format!(
                        "distance ({}, {}) must be finite and non-negative, got {}",
                        i, j, value
                    )));
                }
                if value != d[(j, i)] {
                    return Err(SpatialError::invalid_input(format!(
                        "distance matrix is not symmetric at ({}, {}): {} != {}",
                        i,
                        j,
                        value,
                        d[(j, i)]
                    )));
                }
            }
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.distances.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.distances[(i, j)]
    }

    pub fn kinds(&self) -> &[EntityKind] {
        &self.kinds
    }

    pub fn as_matrix(&self) -> &DMatrix<f64> {
        &self.distances
    }
}

/// Completes a facility x customer cost matrix into a full distance matrix.
///
/// Facilities occupy indices `0..m`, customers `m..m + n`. Facility-customer
/// entries are copied from `costs`; facility-facility and customer-customer
/// entries are triangulated through the opposite category with `policy`.
/// Each unordered pair is estimated once and mirrored, so the result is
/// exactly symmetric. A category with a single entity has no same-category
/// pairs and therefore nothing to estimate.
///
/// # Errors
///
/// Returns `SpatialError::InvalidInput` if `policy` asks for zero references.
pub fn complete(costs: &CostMatrix, policy: TriangulationPolicy) -> Result<FullDistanceMatrix, SpatialError> {
    policy.validate()?;

    let m = costs.n_facilities();
    let n = costs.n_customers();
    debug!(facilities = m, customers = n, ?policy, "completing distance matrix");

    let mut distances = DMatrix::zeros(m + n, m + n);
    for i in 0..m {
        for j in 0..n {
            distances[(i, m + j)] = costs.cost(i, j);
            distances[(m + j, i)] = costs.cost(i, j);
        }
    }

    let mut legs = Vec::with_capacity(n);
    for a in 0..m {
        for b in (a + 1)..m {
            legs.clear();
            legs.extend((0..n).map(|c| (costs.cost(a, c), costs.cost(b, c))));
            let estimate = policy.estimate(&mut legs);
            distances[(a, b)] = estimate;
            distances[(b, a)] = estimate;
        }
    }

    let mut legs = Vec::with_capacity(m);
    for a in 0..n {
        for b in (a + 1)..n {
            legs.clear();
            legs.extend((0..m).map(|f| (costs.cost(f, a), costs.cost(f, b))));
            let estimate = policy.estimate(&mut legs);
            distances[(m + a, m + b)] = estimate;
            distances[(m + b, m + a)] = estimate;
        }
    }

    let kinds = std::iter::repeat(EntityKind::Facility)
        .take(m)
        .chain(std::iter::repeat(EntityKind::Customer).take(n))
        .collect();

    Ok(FullDistanceMatrix { distances, kinds })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn costs() -> CostMatrix {
        CostMatrix::from_rows(&[
            vec![1.0, 4.0, 6.0],
            vec![3.0, 2.0, 5.0],
        ])
        .unwrap()
    }

    fn assert_symmetric_zero_diagonal(matrix: &FullDistanceMatrix) {
        for i in 0..matrix.len() {
            assert_eq!(matrix.get(i, i), 0.0);
            for j in 0..matrix.len() {
                assert_eq!(matrix.get(i, j), matrix.get(j, i));
            }
        }
    }

    #[test]
    fn test_complete_min() {
        let full = complete(&costs(), TriangulationPolicy::Min).unwrap();
        assert_eq!(full.len(), 5);
        assert_symmetric_zero_diagonal(&full);

        // facility-customer block copied through
        assert_eq!(full.get(0, 2), 1.0);
        assert_eq!(full.get(1, 4), 5.0);
        assert_eq!(full.get(4, 1), 5.0);

        // facilities: sums 4, 6, 11
        assert_eq!(full.get(0, 1), 4.0);
        // customers 0 and 1: sums 5, 5
        assert_eq!(full.get(2, 3), 5.0);
        // customers 0 and 2: sums 7, 8
        assert_eq!(full.get(2, 4), 7.0);
    }

    #[test]
    fn test_complete_average_k() {
        let full = complete(&costs(), TriangulationPolicy::AverageK { k: 2 }).unwrap();
        assert_symmetric_zero_diagonal(&full);
        assert_eq!(full.get(0, 1), 5.0);
        assert_eq!(full.get(2, 4), 7.5);

        // k larger than the opposite category uses every reference
        let full = complete(&costs(), TriangulationPolicy::AverageK { k: 10 }).unwrap();
        assert_eq!(full.get(0, 1), 7.0);
    }

    #[test]
    fn test_complete_midpoint() {
        let full = complete(&costs(), TriangulationPolicy::Midpoint { k: 2 }).unwrap();
        assert_symmetric_zero_diagonal(&full);
        // refs (1,3) and (4,2): UB = 4, LB = max(2, 2) = 2
        assert_eq!(full.get(0, 1), 3.0);
    }

    #[test]
    fn test_kinds_order_facilities_first() {
        let full = complete(&costs(), TriangulationPolicy::Min).unwrap();
        assert_eq!(
            full.kinds(),
            &[
                EntityKind::Facility,
                EntityKind::Facility,
                EntityKind::Customer,
                EntityKind::Customer,
                EntityKind::Customer
            ]
        );
    }

    #[test]
    fn test_single_facility() {
        let costs = CostMatrix::from_rows(&[vec![2.0, 3.0]]).unwrap();
        let full = complete(&costs, TriangulationPolicy::default()).unwrap();
        assert_eq!(full.len(), 3);
        assert_eq!(full.get(1, 2), 5.0);
        assert_symmetric_zero_diagonal(&full);
    }

    #[test]
    fn test_rejects_zero_k() {
        let result = complete(&costs(), TriangulationPolicy::AverageK { k: 0 });
        assert!(matches!(result, Err(SpatialError::InvalidInput { .. })));
    }

    #[test]
    fn test_from_square_validation() {
        let kinds = vec![EntityKind::Facility; 2];
        assert!(FullDistanceMatrix::from_square(nalgebra::dmatrix![0.0, 1.0; 1.0, 0.0], kinds.clone()).is_ok());
        assert!(FullDistanceMatrix::from_square(nalgebra::dmatrix![0.0, 1.0; 2.0, 0.0], kinds.clone()).is_err());
        assert!(FullDistanceMatrix::from_square(nalgebra::dmatrix![1.0, 1.0; 1.0, 0.0], kinds.clone()).is_err());
        assert!(FullDistanceMatrix::from_square(nalgebra::dmatrix![0.0, -1.0; -1.0, 0.0], kinds.clone()).is_err());
        assert!(FullDistanceMatrix::from_square(nalgebra::dmatrix![0.0, 1.0, 2.0; 1.0, 0.0, 1.0], kinds).is_err());
    }

    #[test]
    fn test_policy_serde() {
        let policy: TriangulationPolicy = serde_json::from_str(r#"{"policy":"average-k","k":3}"#).unwrap();
        assert_eq!(policy, TriangulationPolicy::AverageK { k: 3 });
        let policy: TriangulationPolicy = serde_json::from_str(r#"{"policy":"min"}"#).unwrap();
        assert_eq!(policy, TriangulationPolicy::Min);
    }
}
