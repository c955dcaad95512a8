//! # Daglearn Core
//!
//! Core engine for learning discrete Bayesian network structure from
//! tabular observational data: a decomposable Bayesian-Dirichlet score,
//! memoized per-family evaluation, and a suite of bounded local search
//! strategies over cycle-safe DAG state.

pub mod engine;

// Re-export commonly used types
pub use engine::cache::{CacheStats, ScoreCache};
pub use engine::dag::DagState;
pub use engine::dataset::{DiscreteDataset, VarId, Variable};
pub use engine::errors::LearnError;
pub use engine::score::LocalScorer;
pub use engine::search::{
    learn_structure, LearnOutcome, SearchConfig, Strategy, StructureLearner,
};
pub use engine::serialize::RunSummary;

/// Load a dataset from a comma-separated file and learn a structure with
/// defaults scaled to its size.
///
/// This is a convenience function that combines dataset loading,
/// configuration scaling, and the full strategy suite.
pub fn learn_from_csv_path(
    path: impl AsRef<std::path::Path>,
) -> Result<(DiscreteDataset, LearnOutcome), LearnError> {
    let dataset = DiscreteDataset::from_csv_path(path)?;
    let config = SearchConfig::scaled_for(dataset.num_vars(), dataset.num_rows());
    let outcome = learn_structure(&dataset, config)?;
    Ok((dataset, outcome))
}
