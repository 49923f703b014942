use std::path::Path;

use anyhow::{Context, Result};
use derive_builder::Builder;
use serde::{Deserialize, Serialize};

use crate::coordinate_set::Stratum;
use crate::distance_matrix::TriangulationPolicy;
use crate::mds::{Initialization, MdsConfig, DIMENSIONS};

/// Settings for one analysis run. Fields missing from a JSON config file
/// take the defaults below.
///
/// | field | default |
/// |---|---|
/// | `max_iterations` | 3000 |
/// | `tolerance` | 1e-9 |
/// | `random_seed` | `Some(1)` |
/// | `n_init` | 4 |
/// | `initialization` | `random` |
/// | `confidence_level` | 0.99 |
/// | `triangulation_policy` | `average-k`, `k = 4` |
/// | `stratum` | `all` |
#[derive(Builder, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[builder(default, build_fn(error = "anyhow::Error"))]
#[serde(default)]
pub struct AnalysisConfig {
    pub max_iterations: usize,
    pub tolerance: f64,
    pub random_seed: Option<u64>,
    pub n_init: usize,
    pub initialization: Initialization,
    pub confidence_level: f64,
    pub triangulation_policy: TriangulationPolicy,
    pub stratum: Stratum,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        let mds = MdsConfig::default();
        AnalysisConfig {
            max_iterations: mds.max_iterations,
            tolerance: mds.tolerance,
            random_seed: mds.random_seed,
            n_init: mds.n_init,
            initialization: mds.initialization,
            confidence_level: 0.99,
            triangulation_policy: TriangulationPolicy::default(),
            stratum: Stratum::All,
        }
    }
}

impl AnalysisConfig {
    /// Embedding dimensionality; not configurable.
    pub fn dimensions(&self) -> usize {
        DIMENSIONS
    }

    pub fn mds_config(&self) -> MdsConfig {
        MdsConfig {
            dimensions: DIMENSIONS,
            max_iterations: self.max_iterations,
            tolerance: self.tolerance,
            random_seed: self.random_seed,
            n_init: self.n_init,
            initialization: self.initialization,
        }
    }

    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        serde_json::from_str(&text).with_context(|| format!("Failed to parse config file {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_fills_defaults() {
        let config = AnalysisConfigBuilder::default()
            .confidence_level(0.95)
            .triangulation_policy(TriangulationPolicy::Min)
            .build()
            .unwrap();
        assert_eq!(config.confidence_level, 0.95);
        assert_eq!(config.triangulation_policy, TriangulationPolicy::Min);
        assert_eq!(config.max_iterations, 3000);
        assert_eq!(config.dimensions(), 2);
    }

    #[test]
    fn test_partial_json() {
        let config: AnalysisConfig = serde_json::from_str(
            r#"{
                "random_seed": null,
                "triangulation_policy": {"policy": "midpoint", "k": 3},
                "stratum": "customers"
            }"#,
        )
        .unwrap();
        assert_eq!(config.random_seed, None);
        assert_eq!(config.triangulation_policy, TriangulationPolicy::Midpoint { k: 3 });
        assert_eq!(config.stratum, Stratum::Customers);
        assert_eq!(config.confidence_level, 0.99);
        assert_eq!(config.n_init, 4);
    }

    #[test]
    fn test_mds_config() {
        let config = AnalysisConfig {
            max_iterations: 50,
            initialization: Initialization::Classical,
            ..AnalysisConfig::default()
        };
        let mds = config.mds_config();
        assert_eq!(mds.max_iterations, 50);
        assert_eq!(mds.initialization, Initialization::Classical);
        assert_eq!(mds.dimensions, 2);
    }
}
