use nalgebra::DMatrix;
use spatialmds::config::{AnalysisConfig, AnalysisConfigBuilder};
use spatialmds::coordinate_set::{EntityKind, Stratum};
use spatialmds::cost_matrix::CostMatrix;
use spatialmds::csr::Pattern;
use spatialmds::distance_matrix::{FullDistanceMatrix, TriangulationPolicy};
use spatialmds::error::SpatialError;
use spatialmds::mds::Initialization;
use spatialmds::{analyze, analyze_batch, analyze_coordinates, analyze_distances};

fn three_by_four() -> CostMatrix {
    CostMatrix::from_rows(&[
        vec![4.0, 7.0, 3.0, 9.0],
        vec![6.0, 2.0, 8.0, 5.0],
        vec![5.0, 6.0, 4.0, 3.0],
    ])
    .unwrap()
}

#[test]
fn test_analyze_three_by_four() {
    let config = AnalysisConfigBuilder::default().confidence_level(0.95).build().unwrap();
    let report = analyze(&three_by_four(), &config).unwrap();

    assert_eq!(report.distances.len(), 7);
    assert_eq!(report.distances.as_matrix().shape(), (7, 7));
    assert_eq!(report.coordinates().len(), 7);
    assert_eq!(&report.coordinates().kinds()[..3], &[EntityKind::Facility; 3]);
    assert_eq!(&report.coordinates().kinds()[3..], &[EntityKind::Customer; 4]);

    let label = report.pattern.classification.pattern;
    assert!(matches!(label, Pattern::Clustered | Pattern::Random | Pattern::Even));
    assert_eq!(report.pattern.classification.point_count, 7);

    let json = serde_json::to_value(&report.pattern.classification).unwrap();
    assert!(["clustered", "random", "even"].contains(&json["pattern"].as_str().unwrap()));
    for field in ["z_score", "observed_mean_nn", "expected_mean_nn", "confidence_level"] {
        assert!(json[field].is_f64(), "missing {}", field);
    }
}

#[test]
fn test_completed_matrix_is_symmetric_for_every_policy() {
    for policy in [
        TriangulationPolicy::Min,
        TriangulationPolicy::AverageK { k: 2 },
        TriangulationPolicy::Midpoint { k: 3 },
    ] {
        let config = AnalysisConfig {
            triangulation_policy: policy,
            ..AnalysisConfig::default()
        };
        let report = analyze(&three_by_four(), &config).unwrap();
        let d = report.distances.as_matrix();
        assert_eq!(d, &d.transpose());
        assert!(d.diagonal().iter().all(|&v| v == 0.0));
    }
}

#[test]
fn test_same_seed_same_result() {
    let config = AnalysisConfig::default();
    let a = analyze(&three_by_four(), &config).unwrap();
    let b = analyze(&three_by_four(), &config).unwrap();
    assert_eq!(a.coordinates(), b.coordinates());
    assert_eq!(a.pattern.classification, b.pattern.classification);
}

#[test]
fn test_euclidean_grid_is_even() {
    let pairs: Vec<[f64; 2]> = (0..5).flat_map(|i| (0..5).map(move |j| [i as f64, j as f64])).collect();
    let n = pairs.len();
    let d = DMatrix::from_fn(n, n, |i, j| {
        let dx: f64 = pairs[i][0] - pairs[j][0];
        let dy: f64 = pairs[i][1] - pairs[j][1];
        (dx * dx + dy * dy).sqrt()
    });
    let distances = FullDistanceMatrix::from_square(d, vec![EntityKind::Customer; n]).unwrap();
    let config = AnalysisConfig {
        initialization: Initialization::Classical,
        confidence_level: 0.95,
        ..AnalysisConfig::default()
    };
    let report = analyze_distances(distances, &config).unwrap();
    assert!(report.embedding.normalized_stress < 1e-6);
    assert!((report.pattern.hull.area - 16.0).abs() < 1e-6);
    assert_eq!(report.pattern.classification.pattern, Pattern::Even);
    assert!(report.pattern.classification.z_score > 10.0);
}

#[test]
fn test_too_few_entities_to_classify() {
    let costs = CostMatrix::from_rows(&[vec![3.0]]).unwrap();
    let result = analyze(&costs, &AnalysisConfig::default());
    assert!(matches!(
        result,
        Err(SpatialError::InsufficientData { required: 3, actual: 2, .. })
    ));
}

#[test]
fn test_stratified_classification() {
    let report = analyze(&three_by_four(), &AnalysisConfig::default()).unwrap();

    let customers = AnalysisConfig {
        stratum: Stratum::Customers,
        ..AnalysisConfig::default()
    };
    let pattern = analyze_coordinates(report.coordinates(), &customers).unwrap();
    assert_eq!(pattern.classification.point_count, 4);

    let facilities = AnalysisConfig {
        stratum: Stratum::Facilities,
        ..AnalysisConfig::default()
    };
    let pattern = analyze_coordinates(report.coordinates(), &facilities).unwrap();
    assert_eq!(pattern.classification.point_count, 3);
}

#[test]
fn test_invalid_confidence_level_is_rejected() {
    let config = AnalysisConfig {
        confidence_level: 1.0,
        ..AnalysisConfig::default()
    };
    assert!(matches!(
        analyze(&three_by_four(), &config),
        Err(SpatialError::InvalidInput { .. })
    ));
}

#[test]
fn test_batch_continues_after_failures() {
    let instances = vec![
        ("first".to_string(), three_by_four()),
        ("tiny".to_string(), CostMatrix::from_rows(&[vec![1.0]]).unwrap()),
        ("last".to_string(), three_by_four()),
    ];

    let mut seen = Vec::new();
    let outcomes = analyze_batch(instances, &AnalysisConfig::default(), |i, outcome| {
        seen.push((i, outcome.name.clone(), outcome.result.is_ok()));
    });

    assert_eq!(outcomes.len(), 3);
    assert_eq!(
        seen,
        vec![
            (0, "first".to_string(), true),
            (1, "tiny".to_string(), false),
            (2, "last".to_string(), true)
        ]
    );
    assert_eq!(outcomes[1].n_facilities, 1);
    assert_eq!(outcomes[2].n_customers, 4);
}
