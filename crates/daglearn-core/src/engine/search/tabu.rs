//! Tabu search over the single-edge move space.
//!
//! Unlike hill climbing, the best admissible move is taken even when it
//! worsens the score, which lets the walk leave local optima. Each accepted
//! move puts its inverse on a FIFO tabu list for a fixed tenure; a tabu move
//! is still admitted when it would beat the best score seen (aspiration).

use std::collections::VecDeque;
use std::time::Instant;

use rand::rngs::StdRng;

use crate::engine::errors::LearnError;
use crate::engine::search::{Engine, Move, SearchState, Strategy, StrategyOutcome, DELTA_EPSILON};

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
    let mut tabu: VecDeque<Move> = VecDeque::new();

    while state.iterations < engine.config.max_iterations && !engine.deadline_reached() {
        let moves = engine.candidate_moves(&state.dag, rng);
        let evaluated = engine.evaluate_moves(&state.dag, &moves)?;

        // Best admissible move: not tabu, or aspirated past the best score.
        let mut chosen: Option<(Move, f64)> = None;
        for &(mv, delta) in &evaluated {
            let aspirated = state.score + delta > best_score + DELTA_EPSILON;
            if tabu.contains(&mv) && !aspirated {
                continue;
            }
            match chosen {
                None => chosen = Some((mv, delta)),
                Some((best_mv, best_delta)) => {
                    if delta > best_delta + DELTA_EPSILON
                        || ((delta - best_delta).abs() <= DELTA_EPSILON && mv < best_mv)
                    {
                        chosen = Some((mv, delta));
                    }
                }
            }
        }

        let Some((mv, delta)) = chosen else {
            break;
        };
        Engine::apply_move(&mut state.dag, mv)?;
        state.score += delta;
        state.iterations += 1;

        tabu.push_back(mv.inverse());
        while tabu.len() > engine.config.tabu_tenure {
            tabu.pop_front();
        }

        if state.score > best_score + DELTA_EPSILON {
            best_score = state.score;
            best_dag = state.dag.clone();
        }
    }

    Ok(StrategyOutcome {
        strategy: Strategy::Tabu,
        dag: best_dag,
        score: best_score,
        iterations: state.iterations,
        elapsed: started.elapsed(),
        restarts: 0,
    })
}
