//! Clark-Evans nearest neighbor test against complete spatial randomness.
//!
//! Under CSR with density `lambda = n / A` the mean nearest neighbor distance
//! has expectation `1 / (2 sqrt(lambda))` and standard error
//! `sqrt((4 - pi) / (4 pi lambda n))`. The study area `A` is the convex hull.

use std::f64::consts::{PI, SQRT_2};
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::coordinate_set::CoordinateSet;
use crate::error::SpatialError;
use crate::hull::{hull, ConvexHull};
use crate::nearest_neighbor::{nearest_neighbor_distances, NearestNeighborReport};

/// Fewest points the test is defined for.
pub const MIN_POINTS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Pattern {
    /// Neighbors closer than CSR predicts.
    Clustered,
    /// CSR cannot be rejected.
    Random,
    /// Neighbors further apart than CSR predicts.
    Even,
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Pattern::Clustered => "clustered",
            Pattern::Random => "random",
            Pattern::Even => "even",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub pattern: Pattern,
    pub z_score: f64,
    pub observed_mean_nn: f64,
    pub expected_mean_nn: f64,
    pub confidence_level: f64,
    /// Two-sided critical value of the standard normal at `confidence_level`.
    pub critical_value: f64,
    /// Two-sided p-value of `z_score`.
    pub p_value: f64,
    pub standard_error: f64,
    pub density: f64,
    pub area: f64,
    pub point_count: usize,
}

/// Classifies a point pattern from its nearest neighbor report and study region.
///
/// `z < -critical` is clustered, `z > critical` is even, anything else random.
///
/// # Errors
///
/// * `SpatialError::InvalidInput` if `confidence_level` is not inside `(0, 1)`
/// * `SpatialError::InsufficientData` for fewer than three points or a hull without area
pub fn classify(
    nn_report: &NearestNeighborReport,
    hull: &ConvexHull,
    confidence_level: f64,
) -> Result<ClassificationResult, SpatialError> {
    let critical_value = critical_value(confidence_level)?;

    let n = nn_report.len();
    if n < MIN_POINTS {
        return Err(SpatialError::insufficient_data(
            MIN_POINTS,
            n,
            "the nearest neighbor test needs at least three points",
        ));
    }
    if hull.is_degenerate() {
        return Err(SpatialError::insufficient_data(
            MIN_POINTS,
            n,
            "convex hull has zero area, point density is undefined",
        ));
    }

    let n_f = n as f64;
    let density = n_f / hull.area;
    let expected_mean_nn = 1.0 / (2.0 * density.sqrt());
    let standard_error = ((4.0 - PI) / (4.0 * PI * density * n_f)).sqrt();
    let z_score = (nn_report.mean - expected_mean_nn) / standard_error;

    let pattern = if z_score < -critical_value {
        Pattern::Clustered
    } else if z_score > critical_value {
        Pattern::Even
    } else {
        Pattern::Random
    };

    info!(
        %pattern,
        z_score,
        confidence_level,
        "point pattern classified"
    );

    Ok(ClassificationResult {
        pattern,
        z_score,
        observed_mean_nn: nn_report.mean,
        expected_mean_nn,
        confidence_level,
        critical_value,
        p_value: p_from_z(z_score),
        standard_error,
        density,
        area: hull.area,
        point_count: n,
    })
}

/// Runs the nearest neighbor statistics and hull estimate on `points`, then classifies.
pub fn classify_points(points: &CoordinateSet, confidence_level: f64) -> Result<ClassificationResult, SpatialError> {
    if points.len() < MIN_POINTS {
        return Err(SpatialError::insufficient_data(
            MIN_POINTS,
            points.len(),
            "the nearest neighbor test needs at least three points",
        ));
    }
    let report = nearest_neighbor_distances(points)?;
    let hull = hull(points);
    classify(&report, &hull, confidence_level)
}

/// Upper `(1 - confidence_level) / 2` quantile of the standard normal.
pub fn critical_value(confidence_level: f64) -> Result<f64, SpatialError> {
    if !(confidence_level > 0.0 && confidence_level < 1.0) {
        return Err(SpatialError::invalid_input(format!(
            "confidence_level must lie in (0, 1), got {}",
            confidence_level
        )));
    }
    Ok(inverse_normal_cdf(1.0 - (1.0 - confidence_level) / 2.0))
}

/// Acklam's rational approximation of the standard normal quantile,
/// relative error below 1.2e-9 on (0, 1).
fn inverse_normal_cdf(p: f64) -> f64 {
    const A: [f64; 6] = [
        -3.969683028665376e+01,
        2.209460984245205e+02,
        -2.759285104469687e+02,
        1.383577518672690e+02,
        -3.066479806614716e+01,
        2.506628277459239e+00,
    ];
    const B: [f64; 5] = [
        -5.447609879822406e+01,
        1.615858368580409e+02,
        -1.556989798598866e+02,
        6.680131188771972e+01,
        -1.328068155288572e+01,
    ];
    const C: [f64; 6] = [
        -7.784894002430293e-03,
        -3.223964580411365e-01,
        -2.400758277161838e+00,
        -2.549732539343734e+00,
        4.374664141464968e+00,
        2.938163982698783e+00,
    ];
    const D: [f64; 4] = [
        7.784695709041462e-03,
        3.224671290700398e-01,
        2.445134137142996e+00,
        3.754408661907416e+00,
    ];
    const P_LOW: f64 = 0.02425;

    let tail = |q: f64| {
        (((((C[0] * q + C[1]) * q + C[2]) * q + C[3]) * q + C[4]) * q + C[5])
            / ((((D[0] * q + D[1]) * q + D[2]) * q + D[3]) * q + 1.0)
    };

    if p < P_LOW {
        tail((-2.0 * p.ln()).sqrt())
    } else if p <= 1.0 - P_LOW {
        let q = p - 0.5;
        let r = q * q;
        (((((A[0] * r + A[1]) * r + A[2]) * r + A[3]) * r + A[4]) * r + A[5]) * q
            / (((((B[0] * r + B[1]) * r + B[2]) * r + B[3]) * r + B[4]) * r + 1.0)
    } else {
        -tail((-2.0 * (1.0 - p).ln()).sqrt())
    }
}

/// Abramowitz & Stegun 7.1.26.
fn erf_approx(x: f64) -> f64 {
    let a1 = 0.254829592;
    let a2 = -0.284496736;
    let a3 = 1.421413741;
    let a4 = -1.453152027;
    let a5 = 1.061405429;
    let p = 0.3275911;

    let sign = if x < 0.0 { -1.0 } else { 1.0 };
    let x = x.abs();
    let t = 1.0 / (1.0 + p * x);
    let y = 1.0 - (((((a5 * t + a4) * t) + a3) * t + a2) * t + a1) * t * (-x * x).exp();
    sign * y
}

fn p_from_z(z: f64) -> f64 {
    (1.0 - erf_approx(z.abs() / SQRT_2)).max(0.0)
}
