//! faultline CLI entry point.
//!
//! Computes a polarization time series from a JSON statement file and
//! writes the result series as JSON.

use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use clap::Parser;
use faultline_core::{Algorithm, AttributeType, Kernel, PolarizationConfig, Statement, TimeWindow};
use faultline_engine::{KernelAggregator, MemorySource, PolarizationEngine};
use serde::Deserialize;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::PathBuf;

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser, Debug)]
#[command(name = "faultline")]
#[command(version = VERSION)]
#[command(about = "Polarization time series over coded statement networks", long_about = None)]
struct Args {
    /// Input statement file (JSON)
    ///
    /// Either a plain array of statements or an object with `statements`
    /// and an optional `dataTypes` map declaring integer/boolean variables.
    #[arg(short, long)]
    input: PathBuf,

    /// Output path for the result series (JSON); stdout if omitted
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// First variable: the node class of the networks
    #[arg(long, default_value = "actor")]
    variable1: String,

    /// Treat variable1 as a document-level attribute
    #[arg(long)]
    variable1_document: bool,

    /// Second variable: the projection runs over its labels
    #[arg(long, default_value = "concept")]
    variable2: String,

    /// Treat variable2 as a document-level attribute
    #[arg(long)]
    variable2_document: bool,

    /// Optional qualifier variable
    #[arg(long)]
    qualifier: Option<String>,

    /// Treat the qualifier as a document-level attribute
    #[arg(long)]
    qualifier_document: bool,

    /// Optimization strategy: genetic or greedy
    #[arg(long, value_enum, default_value = "greedy")]
    algorithm: CliAlgorithm,

    /// Number of clusters (usually 2 for bipolarization)
    #[arg(long, default_value = "2")]
    clusters: usize,

    /// Number of parent solutions for the genetic algorithm
    #[arg(long, default_value = "50")]
    parents: usize,

    /// Maximum genetic iterations if no convergence
    #[arg(long, default_value = "1000")]
    iterations: usize,

    /// Share of elite solutions retained per generation, in [0, 1]
    #[arg(long, default_value = "0.1")]
    elite_share: f64,

    /// Share of membership pair-swaps mutated per child, in [0, 1]
    #[arg(long, default_value = "0.1")]
    mutation_share: f64,

    /// Sliding window granularity: no, minutes, hours, days, weeks, months, years
    #[arg(long, value_enum, default_value = "no")]
    time_window: CliTimeWindow,

    /// Window size in units of the granularity (even; 0 without a window)
    #[arg(long, default_value = "0")]
    window_size: u32,

    /// Kernel function: uniform, triangular, epanechnikov, gaussian
    #[arg(long, value_enum, default_value = "uniform")]
    kernel: CliKernel,

    /// Shift the slicing range inward by half a window on both ends
    #[arg(long)]
    indent_time: bool,

    /// Divide quality scores by their theoretical maximum
    #[arg(long)]
    normalize: bool,

    /// Master RNG seed; 0 draws a nondeterministic seed
    #[arg(long, default_value = "0")]
    seed: u64,

    /// Lower bound of the analyzed range (e.g. 2020-01-01T00:00:00)
    #[arg(long)]
    start: Option<NaiveDateTime>,

    /// Upper bound of the analyzed range
    #[arg(long)]
    stop: Option<NaiveDateTime>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum CliAlgorithm {
    Genetic,
    Greedy,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum CliTimeWindow {
    No,
    Minutes,
    Hours,
    Days,
    Weeks,
    Months,
    Years,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum CliKernel {
    Uniform,
    Triangular,
    Epanechnikov,
    Gaussian,
}

impl From<CliAlgorithm> for Algorithm {
    fn from(value: CliAlgorithm) -> Self {
        match value {
            CliAlgorithm::Genetic => Algorithm::Genetic,
            CliAlgorithm::Greedy => Algorithm::Greedy,
        }
    }
}

impl From<CliTimeWindow> for TimeWindow {
    fn from(value: CliTimeWindow) -> Self {
        match value {
            CliTimeWindow::No => TimeWindow::No,
            CliTimeWindow::Minutes => TimeWindow::Minutes,
            CliTimeWindow::Hours => TimeWindow::Hours,
            CliTimeWindow::Days => TimeWindow::Days,
            CliTimeWindow::Weeks => TimeWindow::Weeks,
            CliTimeWindow::Months => TimeWindow::Months,
            CliTimeWindow::Years => TimeWindow::Years,
        }
    }
}

impl From<CliKernel> for Kernel {
    fn from(value: CliKernel) -> Self {
        match value {
            CliKernel::Uniform => Kernel::Uniform,
            CliKernel::Triangular => Kernel::Triangular,
            CliKernel::Epanechnikov => Kernel::Epanechnikov,
            CliKernel::Gaussian => Kernel::Gaussian,
        }
    }
}

/// On-disk statement file: a plain statement array, or an object with an
/// attribute-type declaration alongside.
#[derive(Deserialize)]
#[serde(untagged)]
enum StatementFile {
    Bare(Vec<Statement>),
    Tagged {
        statements: Vec<Statement>,
        #[serde(default, rename = "dataTypes")]
        data_types: HashMap<String, AttributeType>,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();

    env_logger::Builder::from_default_env()
        .filter_level(if args.verbose {
            log::LevelFilter::Debug
        } else {
            log::LevelFilter::Info
        })
        .init();

    let file = File::open(&args.input)
        .with_context(|| format!("Failed to open statement file '{}'", args.input.display()))?;
    let parsed: StatementFile = serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("Failed to parse '{}'", args.input.display()))?;
    let (statements, data_types) = match parsed {
        StatementFile::Bare(statements) => (statements, HashMap::new()),
        StatementFile::Tagged {
            statements,
            data_types,
        } => (statements, data_types),
    };
    log::info!("Loaded {} statements", statements.len());

    let config = PolarizationConfig {
        algorithm: args.algorithm.into(),
        num_clusters: args.clusters,
        num_parents: args.parents,
        num_iterations: args.iterations,
        elite_share: args.elite_share,
        mutation_share: args.mutation_share,
        time_window: args.time_window.into(),
        window_size: args.window_size,
        kernel: args.kernel.into(),
        indent_time: args.indent_time,
        normalize_scores: args.normalize,
        random_seed: args.seed,
        start: args.start,
        stop: args.stop,
        variable1: args.variable1,
        variable1_document: args.variable1_document,
        variable2: args.variable2,
        variable2_document: args.variable2_document,
        qualifier: args.qualifier,
        qualifier_document: args.qualifier_document,
    };

    let source = MemorySource::new(statements, data_types).with_bounds(args.start, args.stop);
    let mut engine = PolarizationEngine::new(config);
    let engine_config = engine.config().clone();
    let aggregator = KernelAggregator::new(
        engine_config.kernel,
        engine_config.time_window,
        engine_config.window_size,
    );

    let series = engine.compute(&source, &aggregator)?;
    log::info!("Computed {} time slices", series.len());

    match args.output {
        Some(path) => {
            let file = File::create(&path)
                .with_context(|| format!("Failed to create '{}'", path.display()))?;
            serde_json::to_writer_pretty(BufWriter::new(file), &series)?;
            log::info!("Results written to {}", path.display());
        }
        None => {
            serde_json::to_writer_pretty(std::io::stdout().lock(), &series)?;
            println!();
        }
    }

    Ok(())
}
