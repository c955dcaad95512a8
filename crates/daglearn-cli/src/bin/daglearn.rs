//! Daglearn CLI - learn Bayesian network structure from a CSV dataset.
//!
//! Usage:
//!   daglearn <data.csv> <out.gph>                 # Full strategy suite
//!   daglearn <data.csv> <out.gph> --seed 7        # Reproducible run
//!   daglearn <data.csv> <out.gph> --dry-run       # Configuration only

use std::path::PathBuf;
use std::process;
use std::time::Duration;

use clap::Parser;
use tracing::info;

use daglearn_core::engine::serialize;
use daglearn_core::{
    DiscreteDataset, LearnError, RunSummary, SearchConfig, Strategy, StructureLearner,
};

#[derive(Parser)]
#[command(name = "daglearn")]
#[command(version)]
#[command(about = "Learn a Bayesian network structure from discrete tabular data")]
#[command(
    long_about = "Scores candidate DAGs with a Bayesian-Dirichlet marginal likelihood and \
searches the structure space with hill climbing, tabu search, simulated annealing, and a \
genetic strategy, keeping the best structure found."
)]
struct Cli {
    /// Input CSV file (header row names the variables)
    #[arg(value_name = "INPUT_CSV")]
    input: PathBuf,

    /// Destination edge-list file
    #[arg(value_name = "OUTPUT_GPH")]
    output: PathBuf,

    /// JSON summary path (default: <output stem>_summary.json next to the output)
    #[arg(long, value_name = "PATH")]
    summary: Option<PathBuf>,

    /// Maximum number of parents per variable
    #[arg(long, value_name = "N")]
    max_parents: Option<usize>,

    /// Uniform Dirichlet pseudo-count per value
    #[arg(long, value_name = "ALPHA")]
    pseudo_count: Option<f64>,

    /// Iteration budget for hill climbing and tabu search
    #[arg(long, value_name = "N")]
    max_iterations: Option<u64>,

    /// Random restarts for hill climbing
    #[arg(long, value_name = "N")]
    restarts: Option<usize>,

    /// Wall-clock deadline in seconds for the whole run
    #[arg(long, value_name = "SECS")]
    deadline_secs: Option<f64>,

    /// Random seed (fixed seed gives byte-identical output)
    #[arg(long, value_name = "SEED")]
    seed: Option<u64>,

    /// Comma-separated strategies: hill, tabu, annealing, genetic
    #[arg(long, value_name = "LIST")]
    strategies: Option<String>,

    /// Cap on candidate moves evaluated per iteration
    #[arg(long, value_name = "N")]
    candidate_limit: Option<usize>,

    /// Load the dataset and print the effective configuration, then exit
    #[arg(long)]
    dry_run: bool,

    /// Suppress progress logging
    #[arg(short, long)]
    quiet: bool,
}

fn build_config(cli: &Cli, dataset: &DiscreteDataset) -> Result<SearchConfig, LearnError> {
    let mut config = SearchConfig::scaled_for(dataset.num_vars(), dataset.num_rows());
    if let Some(v) = cli.max_parents {
        config.max_parents = v;
    }
    if let Some(v) = cli.pseudo_count {
        config.pseudo_count = v;
    }
    if let Some(v) = cli.max_iterations {
        config.max_iterations = v;
    }
    if let Some(v) = cli.restarts {
        config.hill_restarts = v;
    }
    if let Some(v) = cli.deadline_secs {
        config.deadline = Some(Duration::from_secs_f64(v.max(0.0)));
    }
    if let Some(v) = cli.seed {
        config.seed = v;
    }
    if let Some(v) = cli.candidate_limit {
        config.candidate_limit = Some(v);
    }
    if let Some(list) = &cli.strategies {
        let parsed: Result<Vec<Strategy>, LearnError> =
            list.split(',').map(str::parse).collect();
        config.strategies = parsed?;
    }
    Ok(config)
}

fn summary_path(cli: &Cli) -> PathBuf {
    cli.summary.clone().unwrap_or_else(|| {
        let stem = cli
            .output
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "run".to_string());
        cli.output.with_file_name(format!("{}_summary.json", stem))
    })
}

fn run(cli: &Cli) -> Result<(), LearnError> {
    let dataset = DiscreteDataset::from_csv_path(&cli.input)?;
    info!(
        input = %cli.input.display(),
        variables = dataset.num_vars(),
        rows = dataset.num_rows(),
        "dataset loaded"
    );

    let config = build_config(cli, &dataset)?;
    if cli.dry_run {
        println!("Dataset: {}", cli.input.display());
        println!("Variables: {}", dataset.num_vars());
        println!("Rows: {}", dataset.num_rows());
        println!("Cardinalities: {:?}", dataset.cardinalities());
        println!("Configuration: {:#?}", config);
        return Ok(());
    }

    let learner = StructureLearner::new(&dataset, config)?;
    let outcome = learner.learn()?;
    info!(
        strategy = %outcome.strategy,
        score = outcome.score,
        edges = outcome.dag.edge_count(),
        iterations = outcome.iterations,
        elapsed_secs = outcome.elapsed.as_secs_f64(),
        "search finished"
    );

    if let Some(dir) = cli.output.parent() {
        if !dir.as_os_str().is_empty() {
            std::fs::create_dir_all(dir)?;
        }
    }
    serialize::write_edge_list_path(&cli.output, &dataset, &outcome.dag)?;
    info!(output = %cli.output.display(), "edge list written");

    let summary = RunSummary::new(&dataset, learner.config(), &outcome)?;
    let summary_file = summary_path(cli);
    summary.write_json_path(&summary_file)?;
    info!(summary = %summary_file.display(), "summary written");

    println!(
        "Best structure: {} edges, score {:.6} ({})",
        outcome.dag.edge_count(),
        outcome.score,
        outcome.strategy
    );
    Ok(())
}

fn main() {
    let cli = Cli::parse();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(if cli.quiet { "warn" } else { "info" })
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    if let Err(e) = run(&cli) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}
