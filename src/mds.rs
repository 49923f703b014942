//! Metric multi-dimensional scaling by stress majorization (SMACOF).
//!
//! Each restart repeatedly applies the Guttman transform
//! `X <- (1/n) B(X) X` with `B_ij = -d_ij / |x_i - x_j|` for `i != j` and
//! `B_ii = -sum_j B_ij`, which never increases the raw stress
//! `sum_{i<j} (|x_i - x_j| - d_ij)^2`. The restart with the lowest final
//! stress wins.

use derive_builder::Builder;
use nalgebra::{DMatrix, Point2};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::coordinate_set::CoordinateSet;
use crate::distance_matrix::FullDistanceMatrix;
use crate::error::{ConvergenceWarning, SpatialError};
use crate::random_source::RandomSource;

/// Output dimensionality of every embedding.
pub const DIMENSIONS: usize = 2;

/// Kruskal stress-1 above which an embedding is reported as a poor fit.
const POOR_FIT_STRESS: f64 = 0.2;

/// Starting configuration for each SMACOF restart.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Initialization {
    /// Uniform random coordinates in the unit square, one draw per restart.
    #[default]
    Random,
    /// Classical (Torgerson) scaling. Deterministic, so only one restart runs.
    Classical,
}

#[derive(Builder, Debug, Clone, PartialEq)]
#[builder(build_fn(error = "anyhow::Error"))]
pub struct MdsConfig {
    #[builder(default = "DIMENSIONS")]
    pub dimensions: usize,

    #[builder(default = "3000")]
    pub max_iterations: usize,

    /// Stop once `(previous - current) / previous` stress drops below this.
    #[builder(default = "1e-9")]
    pub tolerance: f64,

    /// `None` draws a fresh seed; the seed used is reported on the result.
    #[builder(default = "Some(1)")]
    pub random_seed: Option<u64>,

    #[builder(default = "4")]
    pub n_init: usize,

    #[builder(default)]
    pub initialization: Initialization,
}

impl Default for MdsConfig {
    fn default() -> Self {
        MdsConfig {
            dimensions: DIMENSIONS,
            max_iterations: 3000,
            tolerance: 1e-9,
            random_seed: Some(1),
            n_init: 4,
            initialization: Initialization::Random,
        }
    }
}

impl MdsConfig {
    fn validate(&self) -> Result<(), SpatialError> {
        if self.dimensions != DIMENSIONS {
            return Err(SpatialError::invalid_input(format!(
                "only {}-dimensional embeddings are supported, got {}",
                DIMENSIONS, self.dimensions
            )));
        }
        if self.max_iterations == 0 {
            return Err(SpatialError::invalid_input("max_iterations must be at least 1"));
        }
        if !self.tolerance.is_finite() || self.tolerance < 0.0 {
            return Err(SpatialError::invalid_input(format!(
                "tolerance must be finite and non-negative, got {}",
                self.tolerance
            )));
        }
        if self.n_init == 0 {
            return Err(SpatialError::invalid_input("n_init must be at least 1"));
        }
        Ok(())
    }
}

/// Best embedding found across all restarts.
#[derive(Debug, Clone)]
pub struct EmbeddingResult {
    /// Centred coordinates, index-aligned with the input distance matrix.
    pub coordinates: CoordinateSet,
    /// Raw stress of `coordinates`.
    pub stress: f64,
    /// Kruskal stress-1, `sqrt(stress / sum d_ij^2)`.
    pub normalized_stress: f64,
    pub iterations: usize,
    /// Raw stress before the first and after every Guttman transform of the winning restart.
    pub stress_history: Vec<f64>,
    /// Seed that reproduces this embedding.
    pub seed: u64,
    pub warning: Option<ConvergenceWarning>,
}

impl EmbeddingResult {
    pub fn converged(&self) -> bool {
        self.warning.is_none()
    }
}

struct Run {
    x: DMatrix<f64>,
    stress: f64,
    iterations: usize,
    history: Vec<f64>,
    converged: bool,
    last_improvement: f64,
}

/// Embeds every entity of `full` in the plane.
///
/// Embeddings are only defined up to rotation, reflection and translation.
/// With `random_seed: None` independent calls return different, equally
/// valid, configurations.
///
/// # Errors
///
/// Returns `SpatialError::InvalidInput` for an empty or malformed matrix or an
/// out of range configuration. Running out of iterations is not an error;
/// it sets `EmbeddingResult::warning`.
pub fn embed(full: &FullDistanceMatrix, config: &MdsConfig) -> Result<EmbeddingResult, SpatialError> {
    full.validate()?;
    config.validate()?;
    if full.is_empty() {
        return Err(SpatialError::invalid_input("cannot embed an empty distance matrix"));
    }

    let d = full.as_matrix();
    let n = full.len();
    let seed = RandomSource::from_seed(config.random_seed).seed();
    let mut rng = RandomSource::rng(seed);

    let restarts = match config.initialization {
        Initialization::Random => config.n_init,
        Initialization::Classical => 1,
    };

    let mut best: Option<Run> = None;
    for restart in 0..restarts {
        let init = match config.initialization {
            Initialization::Random => DMatrix::from_fn(n, DIMENSIONS, |_, _| rng.gen::<f64>()),
            Initialization::Classical => classical_scaling(full),
        };
        let run = smacof(d, init, config.max_iterations, config.tolerance);
        debug!(restart, stress = run.stress, iterations = run.iterations, "smacof restart finished");
        if best.as_ref().map_or(true, |b| run.stress < b.stress) {
            best = Some(run);
        }
    }
    let best = best.ok_or_else(|| SpatialError::invalid_input("no SMACOF restart was run"))?;

    let points = best.x.row_iter().map(|row| Point2::new(row[0], row[1])).collect();
    let coordinates = CoordinateSet::new(points, full.kinds().to_vec())?.centered();

    let total: f64 = upper_pairs(n).map(|(i, j)| d[(i, j)] * d[(i, j)]).sum();
    let normalized_stress = if total > 0.0 { (best.stress / total).sqrt() } else { 0.0 };
    if normalized_stress > POOR_FIT_STRESS {
        warn!(normalized_stress, "embedding fits the distance matrix poorly");
    }

    let warning = if best.converged {
        None
    } else {
        let warning = ConvergenceWarning {
            iterations: best.iterations,
            relative_improvement: best.last_improvement,
            tolerance: config.tolerance,
        };
        warn!("{}", warning);
        Some(warning)
    };

    Ok(EmbeddingResult {
        coordinates,
        stress: best.stress,
        normalized_stress,
        iterations: best.iterations,
        stress_history: best.history,
        seed,
        warning,
    })
}

/// Raw stress of `coordinates` against `full`.
pub fn stress(full: &FullDistanceMatrix, coordinates: &CoordinateSet) -> f64 {
    let x = DMatrix::from_fn(coordinates.len(), DIMENSIONS, |i, k| coordinates.points()[i][k]);
    raw_stress(full.as_matrix(), &x)
}

/// Classical scaling: the top two eigenpairs of `-1/2 J D^2 J`, with
/// negative eigenvalues clamped to zero.
pub fn classical_scaling(full: &FullDistanceMatrix) -> DMatrix<f64> {
    let n = full.len();
    let squared = full.as_matrix().map(|v| v * v);
    let centering = DMatrix::<f64>::identity(n, n) - DMatrix::from_element(n, n, 1.0 / n as f64);
    let b = &centering * squared * &centering * -0.5;

    let eigen = b.symmetric_eigen();
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| eigen.eigenvalues[b].total_cmp(&eigen.eigenvalues[a]));

    let mut x = DMatrix::zeros(n, DIMENSIONS);
    for (k, &idx) in order.iter().take(DIMENSIONS).enumerate() {
        let scale = eigen.eigenvalues[idx].max(0.0).sqrt();
        x.set_column(k, &(eigen.eigenvectors.column(idx) * scale));
    }
    x
}

fn smacof(d: &DMatrix<f64>, mut x: DMatrix<f64>, max_iterations: usize, tolerance: f64) -> Run {
    let mut stress = raw_stress(d, &x);
    let mut history = vec![stress];
    let mut iterations = 0;
    let mut last_improvement = f64::INFINITY;
    let mut converged = stress == 0.0;

    while !converged && iterations < max_iterations {
        x = guttman_transform(d, &x);
        let next = raw_stress(d, &x);
        iterations += 1;
        history.push(next);

        last_improvement = if stress > 0.0 { (stress - next) / stress } else { 0.0 };
        stress = next;
        if last_improvement < tolerance {
            converged = true;
        }
    }

    Run {
        x,
        stress,
        iterations,
        history,
        converged,
        last_improvement,
    }
}

fn guttman_transform(d: &DMatrix<f64>, x: &DMatrix<f64>) -> DMatrix<f64> {
    let n = d.nrows();
    let mut b = DMatrix::zeros(n, n);
    for (i, j) in upper_pairs(n) {
        let dist = embedded_distance(x, i, j);
        // coincident points contribute nothing
        let ratio = if dist > 0.0 { d[(i, j)] / dist } else { 0.0 };
        b[(i, j)] = -ratio;
        b[(j, i)] = -ratio;
        b[(i, i)] += ratio;
        b[(j, j)] += ratio;
    }
    (b * x) / n as f64
}

fn raw_stress(d: &DMatrix<f64>, x: &DMatrix<f64>) -> f64 {
    upper_pairs(d.nrows())
        .map(|(i, j)| (embedded_distance(x, i, j) - d[(i, j)]).powi(2))
        .sum()
}

fn embedded_distance(x: &DMatrix<f64>, i: usize, j: usize) -> f64 {
    let dx = x[(i, 0)] - x[(j, 0)];
    let dy = x[(i, 1)] - x[(j, 1)];
    (dx * dx + dy * dy).sqrt()
}

fn upper_pairs(n: usize) -> impl Iterator<Item = (usize, usize)> {
    (0..n).flat_map(move |i| ((i + 1)..n).map(move |j| (i, j)))
}
