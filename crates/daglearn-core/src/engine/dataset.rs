//! Discretized dataset table and sufficient statistics.
//!
//! ## Key Components
//!
//! - **Variable**: a named discrete column with an ordered, finite domain
//!   (contiguous integer range or sorted labels), cardinality >= 2
//! - **DiscreteDataset**: an immutable, column-major table of domain indices
//!   built once from a CSV source or from explicit parts
//! - **FamilyCounts**: joint counts of one child variable against every
//!   observed configuration of a candidate parent set
//!
//! ## Design
//!
//! Cells are stored as `u32` domain indices (`0..cardinality`), not raw
//! values, so counting never touches string data. `family_counts` encodes
//! parent configurations in mixed radix and returns them sorted by
//! configuration index, which keeps downstream floating-point accumulation
//! order-deterministic across runs.
//!
//! The table is read-only after construction and safe to share across
//! concurrent scorer invocations.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use rustc_hash::FxHashMap;
use serde::Serialize;
use smallvec::SmallVec;

use crate::engine::errors::LearnError;

/// Largest domain accepted for a single column.
///
/// Discretized inputs have small domains; a column exceeding this bound is
/// almost certainly continuous data that was never discretized, and counting
/// tables over it would be enormous.
const MAX_CARDINALITY: usize = 1024;

/// A unique identifier for a variable (a dataset column).
///
/// VarId implements Ord/PartialOrd for stable, deterministic iteration.
/// Uses u32 internally for efficient storage and indexing.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize)]
pub struct VarId(pub u32);

impl VarId {
    /// Returns the id as a `usize` index into per-variable storage.
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// The ordered, finite domain of a discrete variable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Domain {
    /// Contiguous integer range `lo..=hi` (value `v` maps to index `v - lo`).
    Numeric { lo: i64, hi: i64 },
    /// Sorted distinct labels (label maps to its position).
    Labeled { labels: Vec<String> },
}

impl Domain {
    /// Number of values in the domain.
    pub fn cardinality(&self) -> usize {
        match self {
            Domain::Numeric { lo, hi } => (hi - lo + 1) as usize,
            Domain::Labeled { labels } => labels.len(),
        }
    }

    /// Renders the domain value at `index` for diagnostics.
    pub fn value_at(&self, index: usize) -> String {
        match self {
            Domain::Numeric { lo, .. } => (lo + index as i64).to_string(),
            Domain::Labeled { labels } => labels
                .get(index)
                .cloned()
                .unwrap_or_else(|| format!("<out-of-domain:{}>", index)),
        }
    }
}

/// A named discrete variable. Immutable once the dataset is loaded.
#[derive(Debug, Clone, Serialize)]
pub struct Variable {
    /// Column name from the header row.
    pub name: String,
    /// Ordered, finite domain of the column.
    pub domain: Domain,
}

impl Variable {
    /// Convenience constructor for a variable with a `0..card` numeric domain.
    pub fn with_cardinality(name: impl Into<String>, cardinality: usize) -> Self {
        Variable {
            name: name.into(),
            domain: Domain::Numeric {
                lo: 0,
                hi: cardinality.saturating_sub(1) as i64,
            },
        }
    }

    /// Number of values this variable can take.
    pub fn cardinality(&self) -> usize {
        self.domain.cardinality()
    }
}

/// Joint counts for one parent-set configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigCounts {
    /// Mixed-radix encoding of the parent configuration.
    pub config: u64,
    /// Per-child-value counts under this configuration.
    pub counts: Vec<u64>,
    /// Total rows matching this configuration.
    pub total: u64,
}

/// Sufficient statistics for scoring one (child, parent set) family.
///
/// Only configurations observed in the data appear; entries are sorted by
/// `config` so that any accumulation over them is order-deterministic.
#[derive(Debug, Clone)]
pub struct FamilyCounts {
    /// Cardinality of the child variable.
    pub child_cardinality: usize,
    /// Observed parent configurations with per-child-value counts.
    pub configs: Vec<ConfigCounts>,
}

impl FamilyCounts {
    /// Total row mass across all observed configurations.
    pub fn row_mass(&self) -> u64 {
        self.configs.iter().map(|c| c.total).sum()
    }
}

/// An immutable in-memory view of discretized observations.
///
/// Rows are samples; columns are named discrete variables with known
/// cardinalities. Row count and column set are fixed after construction,
/// and every stored cell is a valid domain index for its column.
#[derive(Debug, Clone)]
pub struct DiscreteDataset {
    variables: Vec<Variable>,
    name_index: FxHashMap<String, VarId>,
    /// Column-major storage of domain indices; `columns[v][r]` is row r of
    /// variable v.
    columns: Vec<Vec<u32>>,
    num_rows: usize,
}

impl DiscreteDataset {
    /// Builds a dataset from declared variables and row-major domain indices.
    ///
    /// Every cell must be a valid index into its column's declared domain;
    /// a value at or beyond the cardinality fails with a schema error, as do
    /// ragged rows, duplicate variable names, cardinalities below 2, and an
    /// empty row set.
    pub fn from_parts(variables: Vec<Variable>, rows: &[Vec<u32>]) -> Result<Self, LearnError> {
        if variables.is_empty() {
            return Err(LearnError::Schema("dataset has no variables".into()));
        }
        if rows.is_empty() {
            return Err(LearnError::Schema("dataset has no rows".into()));
        }

        let mut name_index = FxHashMap::default();
        for (i, var) in variables.iter().enumerate() {
            if var.cardinality() < 2 {
                return Err(LearnError::Schema(format!(
                    "variable '{}' has cardinality {} (minimum is 2)",
                    var.name,
                    var.cardinality()
                )));
            }
            if var.cardinality() > MAX_CARDINALITY {
                return Err(LearnError::Schema(format!(
                    "variable '{}' has cardinality {} (maximum is {}); is the data discretized?",
                    var.name,
                    var.cardinality(),
                    MAX_CARDINALITY
                )));
            }
            if name_index
                .insert(var.name.clone(), VarId(i as u32))
                .is_some()
            {
                return Err(LearnError::Schema(format!(
                    "duplicate variable name '{}'",
                    var.name
                )));
            }
        }

        let num_vars = variables.len();
        let mut columns = vec![Vec::with_capacity(rows.len()); num_vars];
        for (r, row) in rows.iter().enumerate() {
            if row.len() != num_vars {
                return Err(LearnError::Schema(format!(
                    "row {} has {} cells, expected {}",
                    r,
                    row.len(),
                    num_vars
                )));
            }
            for (v, &cell) in row.iter().enumerate() {
                let card = variables[v].cardinality() as u32;
                if cell >= card {
                    return Err(LearnError::Schema(format!(
                        "row {} value {} outside domain of '{}' (cardinality {})",
                        r, cell, variables[v].name, card
                    )));
                }
                columns[v].push(cell);
            }
        }

        Ok(DiscreteDataset {
            variables,
            name_index,
            columns,
            num_rows: rows.len(),
        })
    }

    /// Loads a dataset from a comma-separated file with a header row.
    pub fn from_csv_path(path: impl AsRef<Path>) -> Result<Self, LearnError> {
        let file = File::open(path.as_ref())?;
        Self::from_csv_reader(BufReader::new(file))
    }

    /// Loads a dataset from any comma-separated source with a header row.
    ///
    /// Columns whose cells all parse as integers get a contiguous numeric
    /// domain `min..=max`; any other column gets a sorted label domain over
    /// its distinct values. Empty cells and ragged rows fail with a schema
    /// error before any value is committed.
    pub fn from_csv_reader<R: BufRead>(reader: R) -> Result<Self, LearnError> {
        let mut lines = reader.lines();
        let header = loop {
            match lines.next() {
                Some(line) => {
                    let line = line?;
                    if !line.trim().is_empty() {
                        break line;
                    }
                }
                None => return Err(LearnError::Schema("input is empty".into())),
            }
        };

        let names: Vec<String> = header.split(',').map(|s| s.trim().to_string()).collect();
        if names.iter().any(|n| n.is_empty()) {
            return Err(LearnError::Schema("header contains an empty name".into()));
        }

        let mut cells: Vec<Vec<String>> = Vec::new();
        for (line_no, line) in lines.enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let row: Vec<String> = line.split(',').map(|s| s.trim().to_string()).collect();
            if row.len() != names.len() {
                return Err(LearnError::Schema(format!(
                    "data line {} has {} cells, expected {}",
                    line_no + 2,
                    row.len(),
                    names.len()
                )));
            }
            if row.iter().any(|c| c.is_empty()) {
                return Err(LearnError::Schema(format!(
                    "data line {} contains an empty cell",
                    line_no + 2
                )));
            }
            cells.push(row);
        }
        if cells.is_empty() {
            return Err(LearnError::Schema("dataset has no data rows".into()));
        }

        let mut variables = Vec::with_capacity(names.len());
        let mut rows: Vec<Vec<u32>> = vec![Vec::with_capacity(names.len()); cells.len()];
        for (v, name) in names.iter().enumerate() {
            let raw: Vec<&str> = cells.iter().map(|row| row[v].as_str()).collect();
            let parsed: Option<Vec<i64>> = raw.iter().map(|s| s.parse::<i64>().ok()).collect();
            match parsed {
                Some(values) => {
                    let lo = *values.iter().min().expect("non-empty column");
                    let hi = *values.iter().max().expect("non-empty column");
                    variables.push(Variable {
                        name: name.clone(),
                        domain: Domain::Numeric { lo, hi },
                    });
                    for (r, value) in values.iter().enumerate() {
                        rows[r].push((value - lo) as u32);
                    }
                }
                None => {
                    let mut labels: Vec<String> = raw.iter().map(|s| s.to_string()).collect();
                    labels.sort_unstable();
                    labels.dedup();
                    for (r, cell) in raw.iter().enumerate() {
                        let idx = labels
                            .binary_search_by(|label| label.as_str().cmp(*cell))
                            .expect("label table covers every cell");
                        rows[r].push(idx as u32);
                    }
                    variables.push(Variable {
                        name: name.clone(),
                        domain: Domain::Labeled { labels },
                    });
                }
            }
        }

        Self::from_parts(variables, &rows)
    }

    /// Number of variables (columns).
    pub fn num_vars(&self) -> usize {
        self.variables.len()
    }

    /// Number of observations (rows).
    pub fn num_rows(&self) -> usize {
        self.num_rows
    }

    /// All variables in column order.
    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    /// All variable ids in column order.
    pub fn var_ids(&self) -> impl Iterator<Item = VarId> + '_ {
        (0..self.variables.len() as u32).map(VarId)
    }

    /// Looks up a variable, failing with a schema error when unknown.
    pub fn variable(&self, id: VarId) -> Result<&Variable, LearnError> {
        self.variables
            .get(id.index())
            .ok_or_else(|| LearnError::Schema(format!("unknown variable id {:?}", id)))
    }

    /// The name of a variable.
    pub fn name(&self, id: VarId) -> Result<&str, LearnError> {
        Ok(self.variable(id)?.name.as_str())
    }

    /// Resolves a variable by name.
    pub fn var_by_name(&self, name: &str) -> Option<VarId> {
        self.name_index.get(name).copied()
    }

    /// The cardinality of a variable's domain.
    pub fn cardinality(&self, id: VarId) -> Result<usize, LearnError> {
        Ok(self.variable(id)?.cardinality())
    }

    /// Cardinalities of all variables in column order.
    pub fn cardinalities(&self) -> Vec<usize> {
        self.variables.iter().map(|v| v.cardinality()).collect()
    }

    /// Computes joint counts of `child` against every observed configuration
    /// of `parents`.
    ///
    /// Parent configurations are encoded in mixed radix over the parents in
    /// the order given; the result is sorted by that encoding. Fails with a
    /// schema error for unknown ids, and with a domain error when the child
    /// appears among its own parents or the configuration space overflows
    /// the 64-bit encoding.
    pub fn family_counts(
        &self,
        child: VarId,
        parents: &[VarId],
    ) -> Result<FamilyCounts, LearnError> {
        let child_cardinality = self.cardinality(child)?;
        if parents.contains(&child) {
            return Err(LearnError::Domain(format!(
                "variable '{}' cannot be its own parent",
                self.name(child)?
            )));
        }

        // Mixed-radix strides over the parent domains.
        let mut strides: SmallVec<[u64; 4]> = SmallVec::with_capacity(parents.len());
        let mut radix: u64 = 1;
        for &p in parents {
            let card = self.cardinality(p)? as u64;
            strides.push(radix);
            radix = radix.checked_mul(card).ok_or_else(|| {
                LearnError::Domain(format!(
                    "parent configuration space of '{}' overflows the encoding",
                    self.variables[child.index()].name
                ))
            })?;
        }

        let child_col = &self.columns[child.index()];
        let mut table: FxHashMap<u64, Vec<u64>> = FxHashMap::default();
        for r in 0..self.num_rows {
            let mut config: u64 = 0;
            for (k, &p) in parents.iter().enumerate() {
                config += self.columns[p.index()][r] as u64 * strides[k];
            }
            let counts = table
                .entry(config)
                .or_insert_with(|| vec![0; child_cardinality]);
            counts[child_col[r] as usize] += 1;
        }

        let mut configs: Vec<ConfigCounts> = table
            .into_iter()
            .map(|(config, counts)| {
                let total = counts.iter().sum();
                ConfigCounts {
                    config,
                    counts,
                    total,
                }
            })
            .collect();
        // Sorted for order-deterministic accumulation downstream.
        configs.sort_unstable_by_key(|c| c.config);

        Ok(FamilyCounts {
            child_cardinality,
            configs,
        })
    }
}
