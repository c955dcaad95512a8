//! Bounded local search over DAG structures.
//!
//! ## Key Components
//!
//! - **SearchConfig**: every knob of the search suite, with
//!   problem-size-scaled defaults via [`SearchConfig::scaled_for`]
//! - **Move**: a single-edge mutation (add, remove, reverse) with a total
//!   order used for deterministic tie-breaking
//! - **Engine**: shared machinery - candidate enumeration, batched delta
//!   evaluation through the score cache, cooperative deadline checks
//! - **StructureLearner**: runs the configured strategies in a fixed order
//!   and keeps the best structure found
//!
//! ## Strategies
//!
//! - `hill`: greedy ascent with seeded random restarts
//! - `tabu`: best-admissible move with a FIFO tenure list and aspiration
//! - `anneal`: Metropolis acceptance under a geometric cooling schedule
//! - `genetic`: population search with elites, tournaments, and repair
//!
//! ## Determinism
//!
//! Candidate enumeration order is fixed, equal-delta ties resolve through
//! the `Move` ordering (add before remove before reverse, then by
//! (parent, child)), and every random decision flows from one seeded
//! generator per strategy. Two runs with the same seed produce identical
//! structures.

mod anneal;
mod genetic;
mod hill;
mod tabu;

use std::time::{Duration, Instant};

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rustc_hash::FxHashSet;
use serde::Serialize;
use smallvec::SmallVec;
use tracing::{debug, info};

use crate::engine::cache::{CacheStats, ScoreCache, ScoreKey};
use crate::engine::dag::{DagState, ParentVec};
use crate::engine::dataset::{DiscreteDataset, VarId};
use crate::engine::errors::LearnError;
use crate::engine::score::{CountSummary, LocalScorer, DEFAULT_PSEUDO_COUNT};

/// Minimum improvement treated as a genuine score gain.
pub(crate) const DELTA_EPSILON: f64 = 1e-9;

/// A search strategy in the suite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// Greedy hill climbing with random restarts.
    Hill,
    /// Tabu search over the same move space.
    Tabu,
    /// Simulated annealing.
    Annealing,
    /// Genetic population search.
    Genetic,
}

impl Strategy {
    /// Canonical run order of the full suite.
    pub const ALL: [Strategy; 4] = [
        Strategy::Hill,
        Strategy::Tabu,
        Strategy::Annealing,
        Strategy::Genetic,
    ];

    fn seed_offset(self) -> u64 {
        match self {
            Strategy::Hill => 0,
            Strategy::Tabu => 1,
            Strategy::Annealing => 2,
            Strategy::Genetic => 3,
        }
    }
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Strategy::Hill => "hill",
            Strategy::Tabu => "tabu",
            Strategy::Annealing => "annealing",
            Strategy::Genetic => "genetic",
        };
        f.write_str(name)
    }
}

impl std::str::FromStr for Strategy {
    type Err = LearnError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "hill" | "hill_climbing" => Ok(Strategy::Hill),
            "tabu" => Ok(Strategy::Tabu),
            "annealing" | "anneal" | "sa" => Ok(Strategy::Annealing),
            "genetic" | "ga" => Ok(Strategy::Genetic),
            other => Err(LearnError::Domain(format!(
                "unknown strategy '{}' (expected hill, tabu, annealing, or genetic)",
                other
            ))),
        }
    }
}

mod serde_duration_secs {
    use serde::Serializer;
    use std::time::Duration;

    pub fn serialize<S>(value: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(d) => serializer.serialize_some(&d.as_secs_f64()),
            None => serializer.serialize_none(),
        }
    }
}

/// Configuration surface of the search suite.
#[derive(Debug, Clone, Serialize)]
pub struct SearchConfig {
    /// Maximum in-degree of any variable.
    pub max_parents: usize,
    /// Uniform Dirichlet pseudo-count per child value.
    pub pseudo_count: f64,
    /// Iteration budget for hill climbing and tabu search.
    pub max_iterations: u64,
    /// Random restarts granted to hill climbing after local optima.
    pub hill_restarts: usize,
    /// Iterations a reversed move stays forbidden in tabu search.
    pub tabu_tenure: usize,
    /// Proposal budget for simulated annealing.
    pub sa_iterations: u64,
    /// Annealing start temperature.
    pub sa_start_temp: f64,
    /// Annealing end temperature.
    pub sa_end_temp: f64,
    /// Genetic population size.
    pub ga_population: usize,
    /// Genetic generation budget.
    pub ga_generations: usize,
    /// Fraction of the population retained as elites each generation.
    pub ga_elite_frac: f64,
    /// Per-offspring mutation probability.
    pub ga_mutation_rate: f64,
    /// Per-offspring crossover probability.
    pub ga_crossover_rate: f64,
    /// Cap on candidate moves evaluated per iteration (seeded subsample).
    pub candidate_limit: Option<usize>,
    /// Wall-clock deadline for the whole suite, checked between iterations.
    #[serde(with = "serde_duration_secs")]
    pub deadline: Option<Duration>,
    /// Random seed; fixes every stochastic decision of the run.
    pub seed: u64,
    /// Score cache capacity; `None` is unbounded.
    pub cache_capacity: Option<usize>,
    /// Strategies to run; executed in canonical order regardless of the
    /// order given here.
    pub strategies: Vec<Strategy>,
}

impl SearchConfig {
    /// Defaults scaled to the problem size, mirroring how budgets grow with
    /// variable and row counts.
    pub fn scaled_for(num_vars: usize, num_rows: usize) -> Self {
        let n = num_vars.max(1);
        SearchConfig {
            max_parents: if n <= 4 {
                (n - 1).max(1)
            } else if num_rows < 500 {
                3
            } else {
                4
            },
            pseudo_count: DEFAULT_PSEUDO_COUNT,
            max_iterations: (200 * n as u64).clamp(500, 20_000),
            hill_restarts: if n <= 10 { 8 } else { 4 },
            tabu_tenure: (2 * n).clamp(8, 64),
            sa_iterations: (400 * n as u64).clamp(2_000, 40_000),
            sa_start_temp: 2.0,
            sa_end_temp: 0.05,
            ga_population: (4 * n).clamp(16, 96),
            ga_generations: 40,
            ga_elite_frac: 0.2,
            ga_mutation_rate: 0.25,
            ga_crossover_rate: 0.8,
            candidate_limit: if n > 40 { Some(8_000) } else { None },
            deadline: None,
            seed: 17,
            cache_capacity: None,
            strategies: Strategy::ALL.to_vec(),
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        SearchConfig::scaled_for(8, 1_000)
    }
}

/// A single-edge mutation.
///
/// The derived ordering (variant first, then (parent, child)) is the
/// deterministic tie-breaking rule for equal-delta candidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Move {
    /// Insert `parent -> child`.
    Add { parent: VarId, child: VarId },
    /// Delete `parent -> child`.
    Remove { parent: VarId, child: VarId },
    /// Turn `parent -> child` into `child -> parent`.
    Reverse { parent: VarId, child: VarId },
}

impl Move {
    /// The move that undoes this one; tabu search forbids it for a tenure.
    pub fn inverse(self) -> Move {
        match self {
            Move::Add { parent, child } => Move::Remove { parent, child },
            Move::Remove { parent, child } => Move::Add { parent, child },
            Move::Reverse { parent, child } => Move::Reverse {
                parent: child,
                child: parent,
            },
        }
    }
}

/// Mutable run state threaded through a strategy's loop: the current graph,
/// its running total score, and the iteration counter.
#[derive(Debug, Clone)]
pub struct SearchState {
    pub dag: DagState,
    pub score: f64,
    pub iterations: u64,
}

/// Outcome of one strategy run.
#[derive(Debug, Clone)]
pub struct StrategyOutcome {
    pub strategy: Strategy,
    pub dag: DagState,
    pub score: f64,
    pub iterations: u64,
    pub elapsed: Duration,
    pub restarts: usize,
}

/// Per-strategy summary line for reporting.
#[derive(Debug, Clone, Serialize)]
pub struct StrategyRun {
    pub strategy: Strategy,
    pub score: f64,
    pub iterations: u64,
    pub elapsed_secs: f64,
    pub restarts: usize,
}

/// Final result of a learning run.
#[derive(Debug, Clone)]
pub struct LearnOutcome {
    /// Best structure found across the suite.
    pub dag: DagState,
    /// Its total network score.
    pub score: f64,
    /// The strategy that produced it.
    pub strategy: Strategy,
    /// Iterations executed across all strategies.
    pub iterations: u64,
    /// Wall-clock time of the whole run.
    pub elapsed: Duration,
    /// Hill-climbing restarts consumed.
    pub restarts_used: usize,
    /// Per-strategy details in run order.
    pub strategy_runs: Vec<StrategyRun>,
    /// Score cache behavior over the run.
    pub cache: CacheStats,
}

/// Shared machinery handed to each strategy: the scorer, the cache, the
/// configuration, and the run clock.
pub(crate) struct Engine<'a> {
    pub scorer: LocalScorer<'a>,
    pub cache: ScoreCache,
    pub config: &'a SearchConfig,
    started: Instant,
}

impl<'a> Engine<'a> {
    fn new(scorer: LocalScorer<'a>, config: &'a SearchConfig) -> Self {
        Engine {
            scorer,
            cache: ScoreCache::new(config.cache_capacity),
            config,
            started: Instant::now(),
        }
    }

    /// Cooperative deadline check, run between iterations.
    pub fn deadline_reached(&self) -> bool {
        self.config
            .deadline
            .map_or(false, |d| self.started.elapsed() >= d)
    }

    /// An empty graph over the dataset's variables.
    pub fn empty_dag(&self) -> DagState {
        DagState::new(self.scorer.dataset().num_vars(), self.config.max_parents)
    }

    /// Total network score of `dag`, served through the cache.
    pub fn total_score(&mut self, dag: &DagState) -> Result<f64, LearnError> {
        let scorer = self.scorer;
        let mut total = 0.0;
        for v in scorer.dataset().var_ids() {
            total += self.cache.lookup_or_compute(v, dag.parents(v), &scorer)?;
        }
        Ok(total)
    }

    /// The affected endpoints of `mv` with their post-move parent sets.
    /// Decomposability: only these variables' local terms change.
    fn move_families(dag: &DagState, mv: Move) -> SmallVec<[(VarId, ParentVec); 2]> {
        let mut out = SmallVec::new();
        match mv {
            Move::Add { parent, child } => {
                let mut ps: ParentVec = dag.parents(child).iter().copied().collect();
                ps.push(parent);
                ps.sort_unstable();
                out.push((child, ps));
            }
            Move::Remove { parent, child } => {
                let ps: ParentVec = dag
                    .parents(child)
                    .iter()
                    .copied()
                    .filter(|&p| p != parent)
                    .collect();
                out.push((child, ps));
            }
            Move::Reverse { parent, child } => {
                let child_ps: ParentVec = dag
                    .parents(child)
                    .iter()
                    .copied()
                    .filter(|&p| p != parent)
                    .collect();
                out.push((child, child_ps));
                let mut parent_ps: ParentVec = dag.parents(parent).iter().copied().collect();
                parent_ps.push(child);
                parent_ps.sort_unstable();
                out.push((parent, parent_ps));
            }
        }
        out
    }

    /// Score delta of a single move against the current graph.
    pub fn delta(&mut self, dag: &DagState, mv: Move) -> Result<f64, LearnError> {
        let scorer = self.scorer;
        let mut delta = 0.0;
        for (v, new_parents) in Self::move_families(dag, mv) {
            let new = self.cache.lookup_or_compute(v, &new_parents, &scorer)?;
            let old = self.cache.lookup_or_compute(v, dag.parents(v), &scorer)?;
            delta += new - old;
        }
        Ok(delta)
    }

    /// Every legal single-edge mutation of `dag`, in a fixed enumeration
    /// order. Cycle and degree constraints are pre-checked, so applying an
    /// enumerated move cannot be rejected.
    pub fn enumerate_moves(&self, dag: &DagState) -> Vec<Move> {
        let n = dag.num_vars();
        let max_parents = self.config.max_parents;
        let mut moves = Vec::new();
        for p in 0..n {
            let parent = VarId(p as u32);
            for c in 0..n {
                if p == c {
                    continue;
                }
                let child = VarId(c as u32);
                if dag.has_edge(parent, child) {
                    moves.push(Move::Remove { parent, child });
                    if dag.in_degree(parent) < max_parents
                        && !dag.reversal_creates_cycle(parent, child)
                    {
                        moves.push(Move::Reverse { parent, child });
                    }
                } else if !dag.has_edge(child, parent)
                    && dag.in_degree(child) < max_parents
                    && !dag.would_create_cycle(parent, child)
                {
                    moves.push(Move::Add { parent, child });
                }
            }
        }
        moves
    }

    /// Enumerated moves, subsampled to the configured candidate limit.
    /// Subsampling is the only stochastic step and draws from the strategy's
    /// seeded generator; the survivors are re-sorted so tie-breaking stays
    /// canonical.
    pub fn candidate_moves(&self, dag: &DagState, rng: &mut StdRng) -> Vec<Move> {
        let mut moves = self.enumerate_moves(dag);
        if let Some(limit) = self.config.candidate_limit {
            if moves.len() > limit {
                moves.shuffle(rng);
                moves.truncate(limit);
                moves.sort_unstable();
            }
        }
        moves
    }

    #[cfg(feature = "parallel")]
    fn compute_missing(
        &self,
        keys: Vec<ScoreKey>,
    ) -> Result<Vec<(ScoreKey, (f64, CountSummary))>, LearnError> {
        use rayon::prelude::*;
        let scorer = self.scorer;
        keys.into_par_iter()
            .map(|key| {
                let computed = scorer.score_with_counts(key.child(), key.parents())?;
                Ok((key, computed))
            })
            .collect::<Result<Vec<_>, LearnError>>()
    }

    #[cfg(not(feature = "parallel"))]
    fn compute_missing(
        &self,
        keys: Vec<ScoreKey>,
    ) -> Result<Vec<(ScoreKey, (f64, CountSummary))>, LearnError> {
        let scorer = self.scorer;
        keys.into_iter()
            .map(|key| {
                let computed = scorer.score_with_counts(key.child(), key.parents())?;
                Ok((key, computed))
            })
            .collect::<Result<Vec<_>, LearnError>>()
    }

    /// Evaluates the score delta of every candidate move.
    ///
    /// Missing local scores are computed first (in parallel when the
    /// `parallel` feature is on); workers only read the immutable dataset
    /// and return thread-local results, and the cache is written on this
    /// thread when they are merged. Deltas are then read back through the
    /// cache, so results are bit-identical regardless of worker count.
    pub fn evaluate_moves(
        &mut self,
        dag: &DagState,
        moves: &[Move],
    ) -> Result<Vec<(Move, f64)>, LearnError> {
        let mut seen: FxHashSet<ScoreKey> = FxHashSet::default();
        let mut missing: Vec<ScoreKey> = Vec::new();
        for &mv in moves {
            for (v, new_parents) in Self::move_families(dag, mv) {
                for key in [
                    ScoreKey::new(v, &new_parents),
                    ScoreKey::new(v, dag.parents(v)),
                ] {
                    if !self.cache.contains(&key) && seen.insert(key.clone()) {
                        missing.push(key);
                    }
                }
            }
        }

        let computed = self.compute_missing(missing)?;
        for (key, (score, summary)) in computed {
            self.cache.insert(key, score, summary);
        }

        let mut out = Vec::with_capacity(moves.len());
        for &mv in moves {
            out.push((mv, self.delta(dag, mv)?));
        }
        Ok(out)
    }

    /// The best strictly improving candidate, ties broken by `Move` order.
    pub fn best_improving(evaluated: &[(Move, f64)]) -> Option<(Move, f64)> {
        let mut best: Option<(Move, f64)> = None;
        for &(mv, delta) in evaluated {
            if delta <= DELTA_EPSILON {
                continue;
            }
            match best {
                None => best = Some((mv, delta)),
                Some((best_mv, best_delta)) => {
                    if delta > best_delta + DELTA_EPSILON
                        || ((delta - best_delta).abs() <= DELTA_EPSILON && mv < best_mv)
                    {
                        best = Some((mv, delta));
                    }
                }
            }
        }
        best
    }

    /// Applies an enumerated move. Constraint rejections cannot occur for
    /// moves produced by `enumerate_moves`; any that do surface are
    /// propagated as the internal invariant violations they are.
    pub fn apply_move(dag: &mut DagState, mv: Move) -> Result<(), LearnError> {
        match mv {
            Move::Add { parent, child } => dag.add_edge(parent, child),
            Move::Remove { parent, child } => dag.remove_edge(parent, child),
            Move::Reverse { parent, child } => dag.reverse_edge(parent, child),
        }
    }

    /// A seeded perturbation of `dag`: a short walk of random legal moves,
    /// used to restart hill climbing away from a local optimum.
    pub fn perturb(&self, dag: &DagState, rng: &mut StdRng) -> DagState {
        let mut out = dag.clone();
        let steps = out.num_vars().max(1);
        for _ in 0..steps {
            let moves = self.enumerate_moves(&out);
            if moves.is_empty() {
                break;
            }
            let mv = moves[rng.gen_range(0..moves.len())];
            if Self::apply_move(&mut out, mv).is_err() {
                break;
            }
        }
        out
    }
}

/// Drives the configured strategy suite over one dataset.
pub struct StructureLearner<'a> {
    dataset: &'a DiscreteDataset,
    config: SearchConfig,
}

impl<'a> StructureLearner<'a> {
    /// Creates a learner, validating the configuration against the dataset.
    pub fn new(dataset: &'a DiscreteDataset, config: SearchConfig) -> Result<Self, LearnError> {
        if config.strategies.is_empty() {
            return Err(LearnError::Domain(
                "at least one search strategy must be configured".into(),
            ));
        }
        if config.max_parents == 0 {
            return Err(LearnError::Domain(
                "maximum in-degree must be at least 1".into(),
            ));
        }
        // Scorer construction validates the pseudo-count.
        LocalScorer::new(dataset, config.pseudo_count, config.max_parents)?;
        Ok(StructureLearner { dataset, config })
    }

    /// The effective configuration.
    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// Runs the configured strategies in canonical order, sharing one score
    /// cache, and returns the best structure found.
    ///
    /// Ties between strategies keep the earliest; a deadline reached before
    /// any strategy completes yields the empty graph (the best structure
    /// observed so far) rather than an error.
    pub fn learn(&self) -> Result<LearnOutcome, LearnError> {
        let scorer = LocalScorer::new(
            self.dataset,
            self.config.pseudo_count,
            self.config.max_parents,
        )?;
        let mut engine = Engine::new(scorer, &self.config);

        let mut outcomes: Vec<StrategyOutcome> = Vec::new();
        for strategy in Strategy::ALL {
            if !self.config.strategies.contains(&strategy) {
                continue;
            }
            if engine.deadline_reached() {
                debug!(%strategy, "deadline reached before strategy start");
                break;
            }
            let mut rng = StdRng::seed_from_u64(
                self.config
                    .seed
                    .wrapping_add(strategy.seed_offset().wrapping_mul(0x9E37_79B9_7F4A_7C15)),
            );
            let outcome = match strategy {
                Strategy::Hill => hill::run(&mut engine, &mut rng)?,
                Strategy::Tabu => tabu::run(&mut engine, &mut rng)?,
                Strategy::Annealing => anneal::run(&mut engine, &mut rng)?,
                Strategy::Genetic => genetic::run(&mut engine, &mut rng)?,
            };
            info!(
                %strategy,
                score = outcome.score,
                iterations = outcome.iterations,
                edges = outcome.dag.edge_count(),
                "strategy finished"
            );
            outcomes.push(outcome);
        }

        let elapsed = engine.started.elapsed();
        let mut iterations = 0;
        let mut restarts_used = 0;
        let mut strategy_runs = Vec::with_capacity(outcomes.len());
        for o in &outcomes {
            iterations += o.iterations;
            restarts_used += o.restarts;
            strategy_runs.push(StrategyRun {
                strategy: o.strategy,
                score: o.score,
                iterations: o.iterations,
                elapsed_secs: o.elapsed.as_secs_f64(),
                restarts: o.restarts,
            });
        }

        let best = outcomes.into_iter().reduce(|best, next| {
            if next.score > best.score + DELTA_EPSILON {
                next
            } else {
                best
            }
        });

        match best {
            Some(best) => Ok(LearnOutcome {
                dag: best.dag,
                score: best.score,
                strategy: best.strategy,
                iterations,
                elapsed,
                restarts_used,
                strategy_runs,
                cache: engine.cache.stats(),
            }),
            None => {
                // Deadline expired before any strategy ran: the empty graph
                // is the best structure observed so far.
                let dag = engine.empty_dag();
                let score = engine.total_score(&dag)?;
                Ok(LearnOutcome {
                    dag,
                    score,
                    strategy: self.config.strategies[0],
                    iterations: 0,
                    elapsed,
                    restarts_used: 0,
                    strategy_runs,
                    cache: engine.cache.stats(),
                })
            }
        }
    }
}

/// Convenience entry point: learn a structure with the given configuration.
pub fn learn_structure(
    dataset: &DiscreteDataset,
    config: SearchConfig,
) -> Result<LearnOutcome, LearnError> {
    StructureLearner::new(dataset, config)?.learn()
}
