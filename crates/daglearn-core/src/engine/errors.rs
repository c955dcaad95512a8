//! Error types for structure learning.

use thiserror::Error;

/// Errors that can occur during dataset loading, scoring, or search.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new error variants
/// in the future without breaking changes.
///
/// `Cycle` and `DegreeLimit` are routine during search: the controller
/// discards the rejected candidate and moves on. `Schema` and `Io` are fatal
/// to a run. `Domain` reaching the controller means an internal invariant
/// was violated.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum LearnError {
    /// Malformed or inconsistent input data (unknown variable, value outside
    /// its column's domain, ragged row, duplicate header).
    #[error("schema error: {0}")]
    Schema(String),

    /// Scoring request outside configured limits (parent set too large,
    /// non-positive pseudo-count, configuration space overflow).
    #[error("domain error: {0}")]
    Domain(String),

    /// Rejected mutation: the edge would close a directed cycle.
    #[error("cycle error: {0}")]
    Cycle(String),

    /// Rejected mutation: the child's in-degree would exceed the maximum.
    #[error("degree limit error: {0}")]
    DegreeLimit(String),

    /// Output write failure.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal error (programmer error, not user error).
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<serde_json::Error> for LearnError {
    fn from(err: serde_json::Error) -> Self {
        LearnError::Internal(format!("summary serialization failed: {}", err))
    }
}
