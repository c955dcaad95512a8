//! Rendering learned structures to their output artifacts.
//!
//! Two artifacts leave the engine: an edge list (one `parent, child` line
//! per directed edge, consumed by an external visualizer) and a JSON run
//! summary (consumed by an external reporter). Neither writer mutates graph
//! state. The edge-list reader exists so a written structure can be loaded
//! back for comparison or retry.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use serde::Serialize;
use std::collections::BTreeMap;

use crate::engine::cache::CacheStats;
use crate::engine::dag::DagState;
use crate::engine::dataset::DiscreteDataset;
use crate::engine::errors::LearnError;
use crate::engine::search::{LearnOutcome, SearchConfig, Strategy, StrategyRun};

/// Writes the edge list: parents in variable order, children sorted within
/// each parent, so output is deterministic for a given structure.
pub fn write_edge_list<W: Write>(
    writer: &mut W,
    dataset: &DiscreteDataset,
    dag: &DagState,
) -> Result<(), LearnError> {
    for (parent, child) in dag.edges() {
        writeln!(writer, "{}, {}", dataset.name(parent)?, dataset.name(child)?)?;
    }
    Ok(())
}

/// Writes the edge list to a file path.
pub fn write_edge_list_path(
    path: impl AsRef<Path>,
    dataset: &DiscreteDataset,
    dag: &DagState,
) -> Result<(), LearnError> {
    let mut writer = BufWriter::new(File::create(path.as_ref())?);
    write_edge_list(&mut writer, dataset, dag)?;
    writer.flush()?;
    Ok(())
}

/// Reads an edge list back into a graph over the dataset's variables.
///
/// Blank lines are skipped; a line without exactly two comma-separated
/// names, or naming an unknown variable, fails with a schema error.
pub fn read_edge_list<R: BufRead>(
    reader: R,
    dataset: &DiscreteDataset,
    max_parents: usize,
) -> Result<DagState, LearnError> {
    let mut dag = DagState::new(dataset.num_vars(), max_parents);
    for (line_no, line) in reader.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let mut parts = trimmed.split(',').map(str::trim);
        let (parent, child) = match (parts.next(), parts.next(), parts.next()) {
            (Some(p), Some(c), None) if !p.is_empty() && !c.is_empty() => (p, c),
            _ => {
                return Err(LearnError::Schema(format!(
                    "malformed edge on line {}: '{}'",
                    line_no + 1,
                    trimmed
                )))
            }
        };
        let parent = dataset
            .var_by_name(parent)
            .ok_or_else(|| LearnError::Schema(format!("unknown variable '{}'", parent)))?;
        let child = dataset
            .var_by_name(child)
            .ok_or_else(|| LearnError::Schema(format!("unknown variable '{}'", child)))?;
        dag.add_edge(parent, child)?;
    }
    Ok(dag)
}

/// Reads an edge list from a file path.
pub fn read_edge_list_path(
    path: impl AsRef<Path>,
    dataset: &DiscreteDataset,
    max_parents: usize,
) -> Result<DagState, LearnError> {
    read_edge_list(BufReader::new(File::open(path.as_ref())?), dataset, max_parents)
}

#[derive(Debug, Clone, Serialize)]
struct DatasetStats {
    num_vars: usize,
    num_rows: usize,
    variable_names: Vec<String>,
    cardinalities: Vec<usize>,
}

#[derive(Debug, Clone, Serialize)]
struct ResultStats {
    strategy: Strategy,
    score: f64,
    num_edges: usize,
    /// Parent names per variable, keyed by variable name.
    parents: BTreeMap<String, Vec<String>>,
    edges: Vec<(String, String)>,
}

#[derive(Debug, Clone, Serialize)]
struct Timing {
    elapsed_secs: f64,
    iterations: u64,
    restarts_used: usize,
}

/// The run summary record, serialized as pretty JSON for the external
/// reporting collaborator.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    dataset: DatasetStats,
    config: SearchConfig,
    results: ResultStats,
    strategy_runs: Vec<StrategyRun>,
    timing: Timing,
    cache: CacheStats,
}

impl RunSummary {
    /// Assembles the summary from a finished run. Read-only over all inputs.
    pub fn new(
        dataset: &DiscreteDataset,
        config: &SearchConfig,
        outcome: &LearnOutcome,
    ) -> Result<Self, LearnError> {
        let mut parents = BTreeMap::new();
        for v in dataset.var_ids() {
            let names: Result<Vec<String>, LearnError> = outcome
                .dag
                .parents(v)
                .iter()
                .map(|&p| Ok(dataset.name(p)?.to_string()))
                .collect();
            parents.insert(dataset.name(v)?.to_string(), names?);
        }
        let edges: Result<Vec<(String, String)>, LearnError> = outcome
            .dag
            .edges()
            .into_iter()
            .map(|(p, c)| Ok((dataset.name(p)?.to_string(), dataset.name(c)?.to_string())))
            .collect();

        Ok(RunSummary {
            dataset: DatasetStats {
                num_vars: dataset.num_vars(),
                num_rows: dataset.num_rows(),
                variable_names: dataset
                    .variables()
                    .iter()
                    .map(|v| v.name.clone())
                    .collect(),
                cardinalities: dataset.cardinalities(),
            },
            config: config.clone(),
            results: ResultStats {
                strategy: outcome.strategy,
                score: outcome.score,
                num_edges: outcome.dag.edge_count(),
                parents,
                edges: edges?,
            },
            strategy_runs: outcome.strategy_runs.clone(),
            timing: Timing {
                elapsed_secs: outcome.elapsed.as_secs_f64(),
                iterations: outcome.iterations,
                restarts_used: outcome.restarts_used,
            },
            cache: outcome.cache,
        })
    }

    /// Pretty JSON rendering of the summary.
    pub fn to_json_string(&self) -> Result<String, LearnError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Writes the summary to a file path.
    pub fn write_json_path(&self, path: impl AsRef<Path>) -> Result<(), LearnError> {
        let mut writer = BufWriter::new(File::create(path.as_ref())?);
        writer.write_all(self.to_json_string()?.as_bytes())?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        Ok(())
    }
}
