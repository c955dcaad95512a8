//! Simulated annealing over DAG structures.
//!
//! Each iteration proposes one uniformly sampled legal move and accepts it
//! when it improves the score, or with Metropolis probability `exp(d/T)`
//! when it does not. The temperature follows a geometric schedule from the
//! configured start to end value across the proposal budget.

use std::time::Instant;

use rand::rngs::StdRng;
use rand::Rng;

use crate::engine::errors::LearnError;
use crate::engine::search::{Engine, SearchState, Strategy, StrategyOutcome, DELTA_EPSILON};

/// Temperature floor; keeps the acceptance ratio well-defined.
const MIN_TEMPERATURE: f64 = 1e-9;

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

    let budget = engine.config.sa_iterations.max(1);
    let start_temp = engine.config.sa_start_temp.max(MIN_TEMPERATURE);
    let end_temp = engine
        .config
        .sa_end_temp
        .clamp(MIN_TEMPERATURE, start_temp);
    let decay = if budget > 1 {
        (end_temp / start_temp).powf(1.0 / (budget - 1) as f64)
    } else {
        1.0
    };

    let mut temperature = start_temp;
    for _ in 0..budget {
        if engine.deadline_reached() {
            break;
        }
        let moves = engine.enumerate_moves(&state.dag);
        if moves.is_empty() {
            break;
        }
        let mv = moves[rng.gen_range(0..moves.len())];
        let delta = engine.delta(&state.dag, mv)?;

        let accept = delta > DELTA_EPSILON || rng.gen::<f64>() < (delta / temperature).exp();
        if accept {
            Engine::apply_move(&mut state.dag, mv)?;
            state.score += delta;
            if state.score > best_score + DELTA_EPSILON {
                best_score = state.score;
                best_dag = state.dag.clone();
            }
        }
        state.iterations += 1;
        temperature = (temperature * decay).max(MIN_TEMPERATURE);
    }

    Ok(StrategyOutcome {
        strategy: Strategy::Annealing,
        dag: best_dag,
        score: best_score,
        iterations: state.iterations,
        elapsed: started.elapsed(),
        restarts: 0,
    })
}
