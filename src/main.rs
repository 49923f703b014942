use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use pretty_print_nalgebra::*;
use serde::Serialize;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use spatialmds::config::AnalysisConfig;
use spatialmds::coordinate_set::{EntityKind, Stratum};
use spatialmds::csr::{ClassificationResult, Pattern};
use spatialmds::distance_matrix::{FullDistanceMatrix, TriangulationPolicy};
use spatialmds::mds::Initialization;
use spatialmds::{analyze, analyze_batch, analyze_coordinates, analyze_distances, store, AnalysisReport};

#[derive(Parser)]
#[command(name = "spatialmds", version, about = "Infer coordinates from a transport cost matrix and classify their spatial pattern")]
struct Cli {
    /// Log at debug level (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Complete, embed and classify one instance
    Analyze {
        /// JSON cost matrix: bare 2D array, {"c_ij": ...} or {"params": {"c_ij": ...}}
        input: PathBuf,

        /// Input is already a complete square distance matrix
        #[arg(long)]
        complete: bool,

        /// With --complete: how many leading rows are facilities
        #[arg(long, default_value_t = 0)]
        facilities: usize,

        /// Write the embedded coordinates here as [[x, y], ...]
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Print the completed distance matrix to stderr
        #[arg(long)]
        show_matrix: bool,

        #[command(flatten)]
        settings: Settings,
    },
    /// Classify an existing coordinates file
    Classify {
        /// JSON array of [x, y] pairs
        coordinates: PathBuf,

        /// How many leading points are facilities
        #[arg(long, default_value_t = 0)]
        facilities: usize,

        #[command(flatten)]
        settings: Settings,
    },
    /// Analyze every .json instance in a directory, one JSON row per instance
    Batch {
        dir: PathBuf,

        /// Label for the instance set column (defaults to the directory name)
        #[arg(long)]
        set: Option<String>,

        #[command(flatten)]
        settings: Settings,
    },
}

#[derive(Args)]
struct Settings {
    /// JSON config file; flags below override it
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long)]
    confidence: Option<f64>,

    #[arg(long)]
    seed: Option<u64>,

    /// Draw a fresh seed instead of the configured one
    #[arg(long, conflicts_with = "seed")]
    unseeded: bool,

    #[arg(long)]
    max_iter: Option<usize>,

    #[arg(long)]
    tolerance: Option<f64>,

    #[arg(long)]
    n_init: Option<usize>,

    #[arg(long, value_enum)]
    init: Option<InitArg>,

    #[arg(long, value_enum)]
    policy: Option<PolicyArg>,

    /// Reference entities for average-k and midpoint
    #[arg(long, default_value_t = 4)]
    k: usize,

    #[arg(long, value_enum)]
    stratum: Option<StratumArg>,
}

#[derive(Clone, Copy, ValueEnum)]
enum InitArg {
    Random,
    Classical,
}

#[derive(Clone, Copy, ValueEnum)]
enum PolicyArg {
    Min,
    AverageK,
    Midpoint,
}

#[derive(Clone, Copy, ValueEnum)]
enum StratumArg {
    All,
    Facilities,
    Customers,
}

impl Settings {
    fn resolve(&self) -> Result<AnalysisConfig> {
        let mut config = match &self.config {
            Some(path) => AnalysisConfig::from_json_file(path)?,
            None => AnalysisConfig::default(),
        };
        if let Some(confidence) = self.confidence {
            config.confidence_level = confidence;
        }
        if let Some(seed) = self.seed {
            config.random_seed = Some(seed);
        }
        if self.unseeded {
            config.random_seed = None;
        }
        if let Some(max_iter) = self.max_iter {
            config.max_iterations = max_iter;
        }
        if let Some(tolerance) = self.tolerance {
            config.tolerance = tolerance;
        }
        if let Some(n_init) = self.n_init {
            config.n_init = n_init;
        }
        if let Some(init) = self.init {
            config.initialization = match init {
                InitArg::Random => Initialization::Random,
                InitArg::Classical => Initialization::Classical,
            };
        }
        if let Some(policy) = self.policy {
            config.triangulation_policy = match policy {
                PolicyArg::Min => TriangulationPolicy::Min,
                PolicyArg::AverageK => TriangulationPolicy::AverageK { k: self.k },
                PolicyArg::Midpoint => TriangulationPolicy::Midpoint { k: self.k },
            };
        }
        if let Some(stratum) = self.stratum {
            config.stratum = match stratum {
                StratumArg::All => Stratum::All,
                StratumArg::Facilities => Stratum::Facilities,
                StratumArg::Customers => Stratum::Customers,
            };
        }
        Ok(config)
    }
}

#[derive(Serialize)]
struct AnalysisSummary<'a> {
    entities: usize,
    stress: f64,
    normalized_stress: f64,
    iterations: usize,
    converged: bool,
    seed: u64,
    hull_area: f64,
    #[serde(flatten)]
    classification: &'a ClassificationResult,
}

impl<'a> AnalysisSummary<'a> {
    fn from_report(report: &'a AnalysisReport) -> Self {
        AnalysisSummary {
            entities: report.distances.len(),
            stress: report.embedding.stress,
            normalized_stress: report.embedding.normalized_stress,
            iterations: report.embedding.iterations,
            converged: report.embedding.converged(),
            seed: report.embedding.seed,
            hull_area: report.pattern.hull.area,
            classification: &report.pattern.classification,
        }
    }
}

#[derive(Serialize)]
struct BatchRow {
    set: String,
    instance: String,
    facilities: usize,
    customers: usize,
    z_score: Option<f64>,
    pattern: Option<Pattern>,
    error: Option<String>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "spatialmds=debug" } else { "spatialmds=info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)))
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Analyze {
            input,
            complete,
            facilities,
            output,
            show_matrix,
            settings,
        } => {
            let config = settings.resolve()?;
            let report = if complete {
                let rows = store::read_matrix_rows(&input)?;
                let distances = square_matrix(&rows, facilities)?;
                analyze_distances(distances, &config)?
            } else {
                let costs = store::read_cost_matrix(&input)?;
                analyze(&costs, &config)?
            };

            if show_matrix {
                let matrix = report.distances.as_matrix().clone();
                eprintln!("distance matrix: {}", pretty_print!(&matrix));
            }
            if let Some(path) = output {
                store::write_coordinates(&path, report.coordinates())?;
                info!(path = %path.display(), "coordinates written");
            }
            println!("{}", serde_json::to_string_pretty(&AnalysisSummary::from_report(&report))?);
        }
        Command::Classify {
            coordinates,
            facilities,
            settings,
        } => {
            let config = settings.resolve()?;
            let points = store::read_coordinates(&coordinates, facilities)?;
            let pattern = analyze_coordinates(&points, &config)?;
            println!("{}", serde_json::to_string_pretty(&pattern.classification)?);
        }
        Command::Batch { dir, set, settings } => {
            let config = settings.resolve()?;
            let set = set.unwrap_or_else(|| dir_label(&dir));
            run_batch(&dir, &set, &config)?;
        }
    }

    Ok(())
}

fn square_matrix(rows: &[Vec<f64>], facilities: usize) -> Result<FullDistanceMatrix> {
    let n = rows.len();
    if facilities > n {
        bail!("--facilities {} exceeds the {} rows of the matrix", facilities, n);
    }
    if let Some(row) = rows.iter().find(|row| row.len() != n) {
        bail!("complete distance matrix must be square: {} rows but a row of length {}", n, row.len());
    }
    let matrix = nalgebra::DMatrix::from_fn(n, n, |i, j| rows[i][j]);
    let kinds = (0..n)
        .map(|i| if i < facilities { EntityKind::Facility } else { EntityKind::Customer })
        .collect();
    Ok(FullDistanceMatrix::from_square(matrix, kinds)?)
}

fn dir_label(dir: &Path) -> String {
    dir.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| dir.display().to_string())
}

fn run_batch(dir: &Path, set: &str, config: &AnalysisConfig) -> Result<()> {
    let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)
        .with_context(|| format!("Failed to list {}", dir.display()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.extension().map_or(false, |ext| ext == "json"))
        .collect();
    paths.sort();

    let mut instances = Vec::with_capacity(paths.len());
    for path in paths.iter() {
        let name = path.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default();
        match store::read_cost_matrix(path) {
            Ok(costs) => instances.push((name, costs)),
            Err(e) => {
                warn!(instance = %name, "skipping unreadable instance: {:#}", e);
                print_row(&BatchRow {
                    set: set.to_string(),
                    instance: name,
                    facilities: 0,
                    customers: 0,
                    z_score: None,
                    pattern: None,
                    error: Some(format!("{:#}", e)),
                })?;
            }
        }
    }

    let total = instances.len();
    let mut failed = 0;
    analyze_batch(instances, config, |i, outcome| {
        let (z_score, pattern, error) = match &outcome.result {
            Ok(report) => (
                Some(report.pattern.classification.z_score),
                Some(report.pattern.classification.pattern),
                None,
            ),
            Err(e) => {
                failed += 1;
                (None, None, Some(e.to_string()))
            }
        };
        let row = BatchRow {
            set: set.to_string(),
            instance: outcome.name.clone(),
            facilities: outcome.n_facilities,
            customers: outcome.n_customers,
            z_score,
            pattern,
            error,
        };
        if let Err(e) = print_row(&row) {
            warn!("failed to print row: {}", e);
        }
        info!(done = i + 1, total, "instance analyzed");
    });

    if failed > 0 {
        warn!(failed, total, "some instances failed");
    }
    Ok(())
}

fn print_row(row: &BatchRow) -> Result<()> {
    println!("{}", serde_json::to_string(row)?);
    Ok(())
}
