pub mod config;
pub mod coordinate_set;
pub mod cost_matrix;
pub mod csr;
pub mod distance_matrix;
pub mod error;
pub mod hull;
pub mod mds;
pub mod nearest_neighbor;
pub mod random_source;
pub mod store;

use tracing::{error, info};

use config::AnalysisConfig;
use coordinate_set::CoordinateSet;
use cost_matrix::CostMatrix;
use csr::{classify, ClassificationResult, MIN_POINTS};
use distance_matrix::{complete, FullDistanceMatrix};
use error::{ConvergenceWarning, SpatialError};
use hull::{hull, ConvexHull};
use mds::{embed, EmbeddingResult};
use nearest_neighbor::{nearest_neighbor_distances, NearestNeighborReport};

/// Hull, nearest neighbor statistics and CSR classification of one coordinate set.
#[derive(Debug, Clone)]
pub struct PatternReport {
    pub hull: ConvexHull,
    pub nearest_neighbors: NearestNeighborReport,
    pub classification: ClassificationResult,
}

/// Everything one analysis run produces, from completed distances to classification.
#[derive(Debug, Clone)]
pub struct AnalysisReport {
    pub distances: FullDistanceMatrix,
    pub embedding: EmbeddingResult,
    pub pattern: PatternReport,
}

impl AnalysisReport {
    pub fn coordinates(&self) -> &CoordinateSet {
        &self.embedding.coordinates
    }

    pub fn convergence_warning(&self) -> Option<&ConvergenceWarning> {
        self.embedding.warning.as_ref()
    }
}

/// Outcome of one instance in a batch. Failures are kept, not propagated.
#[derive(Debug)]
pub struct BatchOutcome {
    pub name: String,
    pub n_facilities: usize,
    pub n_customers: usize,
    pub result: Result<AnalysisReport, SpatialError>,
}

/// Runs the full pipeline on a facility x customer cost matrix.
///
/// # Arguments
///
/// * `costs` - Transport costs, rows are facilities and columns customers
/// * `config` - Completion policy, SMACOF settings, confidence level and stratum
///
/// # Returns
///
/// The completed distance matrix, the embedding (possibly carrying a
/// `ConvergenceWarning`) and the pattern classification.
///
/// # Errors
///
/// Returns `SpatialError::InvalidInput` for a bad configuration and
/// `SpatialError::InsufficientData` when the embedded points cannot be classified.
pub fn analyze(costs: &CostMatrix, config: &AnalysisConfig) -> Result<AnalysisReport, SpatialError> {
    let distances = complete(costs, config.triangulation_policy)?;
    analyze_distances(distances, config)
}

/// Same as [`analyze`] for a distance matrix that is already complete.
pub fn analyze_distances(distances: FullDistanceMatrix, config: &AnalysisConfig) -> Result<AnalysisReport, SpatialError> {
    let embedding = embed(&distances, &config.mds_config())?;
    info!(
        entities = distances.len(),
        stress = embedding.stress,
        normalized_stress = embedding.normalized_stress,
        iterations = embedding.iterations,
        seed = embedding.seed,
        "embedding finished"
    );
    let pattern = analyze_coordinates(&embedding.coordinates, config)?;
    Ok(AnalysisReport {
        distances,
        embedding,
        pattern,
    })
}

/// Classifies existing coordinates, restricted to `config.stratum`.
///
/// # Errors
///
/// Returns `SpatialError::InsufficientData` for fewer than three points in the
/// stratum or a hull without area, and `SpatialError::InvalidInput` for a
/// confidence level outside `(0, 1)`.
pub fn analyze_coordinates(coordinates: &CoordinateSet, config: &AnalysisConfig) -> Result<PatternReport, SpatialError> {
    let points = coordinates.stratum(config.stratum);
    if points.len() < MIN_POINTS {
        return Err(SpatialError::insufficient_data(
            MIN_POINTS,
            points.len(),
            format!("{:?} stratum has too few points to classify", config.stratum),
        ));
    }
    let hull = hull(&points);
    let nearest_neighbors = nearest_neighbor_distances(&points)?;
    let classification = classify(&nearest_neighbors, &hull, config.confidence_level)?;
    Ok(PatternReport {
        hull,
        nearest_neighbors,
        classification,
    })
}

/// Analyzes many named instances, continuing past per-instance failures.
///
/// # Arguments
///
/// * `instances` - `(name, cost matrix)` pairs
/// * `config` - Shared by every instance
/// * `on_update` - Called after each instance with its position and outcome
///
/// # Returns
///
/// One `BatchOutcome` per instance, in input order.
pub fn analyze_batch<I, F>(instances: I, config: &AnalysisConfig, mut on_update: F) -> Vec<BatchOutcome>
where
    I: IntoIterator<Item = (String, CostMatrix)>,
    F: FnMut(usize, &BatchOutcome),
{
    instances
        .into_iter()
        .enumerate()
        .map(|(i, (name, costs))| {
            let result = analyze(&costs, config);
            if let Err(e) = &result {
                error!(instance = %name, "analysis failed: {}", e);
            }
            let outcome = BatchOutcome {
                name,
                n_facilities: costs.n_facilities(),
                n_customers: costs.n_customers(),
                result,
            };
            on_update(i, &outcome);
            outcome
        })
        .collect()
}
