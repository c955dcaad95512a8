//! The structure-learning engine.
//!
//! This module provides:
//! - **errors**: Error types for loading, scoring, and search failures
//! - **dataset**: Immutable discretized table and sufficient statistics
//! - **score**: Bayesian-Dirichlet local scoring of one variable
//! - **cache**: Memoized local scores keyed by canonical parent sets
//! - **dag**: Mutable DAG state with cycle-safe edge mutation
//! - **search**: Bounded local search strategies over structures
//! - **serialize**: Edge-list and summary output artifacts

pub mod cache;
pub mod dag;
pub mod dataset;
pub mod errors;
pub mod score;
pub mod search;
pub mod serialize;
