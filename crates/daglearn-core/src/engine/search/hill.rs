//! Greedy hill climbing with seeded random restarts.
//!
//! Each iteration evaluates every legal single-edge mutation, accepts the
//! best strictly improving one, and stops at a local optimum. A restart
//! budget then perturbs the incumbent best with a short random walk and
//! climbs again. Within one climb the running score is non-decreasing by
//! construction.

use std::time::Instant;

use rand::rngs::StdRng;
use tracing::debug;

use crate::engine::errors::LearnError;
use crate::engine::search::{Engine, SearchState, Strategy, StrategyOutcome, DELTA_EPSILON};

pub(crate) fn run(engine: &mut Engine<'_>, rng: &mut StdRng) -> Result<StrategyOutcome, LearnError> {
    let started = Instant::now();
    let mut state = SearchState {
        dag: engine.empty_dag(),
        score: 0.0,
        iterations: 0,
    };
    state.score = engine.total_score(&state.dag)?;

    let mut best_dag = state.dag.clone();
    let mut best_score = state.score;
    let mut restarts = 0;

    while state.iterations < engine.config.max_iterations && !engine.deadline_reached() {
        let moves = engine.candidate_moves(&state.dag, rng);
        let evaluated = engine.evaluate_moves(&state.dag, &moves)?;
        match Engine::best_improving(&evaluated) {
            Some((mv, delta)) => {
                Engine::apply_move(&mut state.dag, mv)?;
                state.score += delta;
                state.iterations += 1;
                if state.score > best_score + DELTA_EPSILON {
                    best_score = state.score;
                    best_dag = state.dag.clone();
                }
            }
            None => {
                // Local optimum: restart from a perturbed incumbent, or stop.
                if restarts >= engine.config.hill_restarts {
                    break;
                }
                restarts += 1;
                state.dag = engine.perturb(&best_dag, rng);
                state.score = engine.total_score(&state.dag)?;
                debug!(
                    restart = restarts,
                    score = state.score,
                    "restarting from perturbed incumbent"
                );
            }
        }
    }

    if state.score > best_score + DELTA_EPSILON {
        best_score = state.score;
        best_dag = state.dag.clone();
    }

    Ok(StrategyOutcome {
        strategy: Strategy::Hill,
        dag: best_dag,
        score: best_score,
        iterations: state.iterations,
        elapsed: started.elapsed(),
        restarts,
    })
}
