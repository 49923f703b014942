use nalgebra::distance;

use crate::coordinate_set::CoordinateSet;
use crate::error::SpatialError;

/// Per-point nearest neighbor distances and their mean.
#[derive(Debug, Clone, PartialEq)]
pub struct NearestNeighborReport {
    pub distances: Vec<f64>,
    /// Index of the neighbor that realises each distance. Among equidistant
    /// neighbors the lowest index is kept; the distance is the same either way.
    pub neighbors: Vec<usize>,
    pub mean: f64,
}

impl NearestNeighborReport {
    pub fn len(&self) -> usize {
        self.distances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.distances.is_empty()
    }
}

/// Brute force O(n^2) nearest neighbor search, excluding each point itself.
///
/// # Errors
///
/// Returns `SpatialError::InsufficientData` for fewer than two points.
pub fn nearest_neighbor_distances(points: &CoordinateSet) -> Result<NearestNeighborReport, SpatialError> {
    let n = points.len();
    if n < 2 {
        return Err(SpatialError::insufficient_data(
            2,
            n,
            "nearest neighbor distances need at least two points",
        ));
    }

    let p = points.points();
    let mut distances = vec![f64::INFINITY; n];
    let mut neighbors = vec![0; n];
    for i in 0..n {
        for j in (i + 1)..n {
            let d = distance(&p[i], &p[j]);
            if d < distances[i] {
                distances[i] = d;
                neighbors[i] = j;
            }
            if d < distances[j] {
                distances[j] = d;
                neighbors[j] = i;
            }
        }
    }

    let mean = distances.iter().sum::<f64>() / n as f64;
    Ok(NearestNeighborReport {
        distances,
        neighbors,
        mean,
    })
}
