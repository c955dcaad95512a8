//! Genetic search over a population of DAGs.
//!
//! Individuals are whole graphs; fitness is the total network score served
//! through the shared cache, so families rediscovered across the population
//! are never rescored. Each generation retains an elite fraction, fills the
//! rest by tournament selection with per-variable parent-set crossover, and
//! mutates offspring with one random legal move.
//!
//! Crossover assembles the child variable by variable in index order,
//! dropping any inherited parent whose edge would close a cycle or exceed
//! the in-degree cap. Those rejections are routine and recovered here; any
//! other error propagates.

use std::time::Instant;

use rand::rngs::StdRng;
use rand::Rng;

use crate::engine::dag::DagState;
use crate::engine::errors::LearnError;
use crate::engine::search::{Engine, Strategy, StrategyOutcome, DELTA_EPSILON};

const TOURNAMENT_SIZE: usize = 3;

struct Individual {
    dag: DagState,
    score: f64,
}

fn random_dag(engine: &mut Engine<'_>, rng: &mut StdRng) -> DagState {
    let mut dag = engine.empty_dag();
    let steps = rng.gen_range(0..=2 * dag.num_vars().max(1));
    for _ in 0..steps {
        let moves = engine.enumerate_moves(&dag);
        if moves.is_empty() {
            break;
        }
        let mv = moves[rng.gen_range(0..moves.len())];
        if Engine::apply_move(&mut dag, mv).is_err() {
            break;
        }
    }
    dag
}

fn crossover(
    engine: &Engine<'_>,
    a: &DagState,
    b: &DagState,
    rng: &mut StdRng,
) -> Result<DagState, LearnError> {
    let mut child = engine.empty_dag();
    for v in 0..child.num_vars() {
        let v = crate::engine::dataset::VarId(v as u32);
        let source = if rng.gen_bool(0.5) { a } else { b };
        for &p in source.parents(v) {
            match child.add_edge(p, v) {
                Ok(()) => {}
                // Repair: inherited parents that no longer fit are dropped.
                Err(LearnError::Cycle(_)) | Err(LearnError::DegreeLimit(_)) => {}
                Err(other) => return Err(other),
            }
        }
    }
    Ok(child)
}

fn mutate(engine: &Engine<'_>, dag: &mut DagState, rng: &mut StdRng) -> Result<(), LearnError> {
    let moves = engine.enumerate_moves(dag);
    if moves.is_empty() {
        return Ok(());
    }
    let mv = moves[rng.gen_range(0..moves.len())];
    Engine::apply_move(dag, mv)
}

/// Tournament winner: best score among sampled entrants, ties to the
/// lowest population index for determinism.
fn tournament(population: &[Individual], rng: &mut StdRng) -> usize {
    let mut winner = rng.gen_range(0..population.len());
    for _ in 1..TOURNAMENT_SIZE {
        let challenger = rng.gen_range(0..population.len());
        let better = population[challenger].score > population[winner].score + DELTA_EPSILON;
        let tied = (population[challenger].score - population[winner].score).abs()
            <= DELTA_EPSILON;
        if better || (tied && challenger < winner) {
            winner = challenger;
        }
    }
    winner
}

pub(crate) fn run(engine: &mut Engine<'_>, rng: &mut StdRng) -> Result<StrategyOutcome, LearnError> {
    let started = Instant::now();
    let pop_size = engine.config.ga_population.max(2);
    let elites = ((engine.config.ga_elite_frac * pop_size as f64).ceil() as usize)
        .clamp(1, pop_size);

    let mut population: Vec<Individual> = Vec::with_capacity(pop_size);
    for _ in 0..pop_size {
        let dag = random_dag(engine, rng);
        let score = engine.total_score(&dag)?;
        population.push(Individual { dag, score });
    }

    let mut generations = 0u64;
    for _ in 0..engine.config.ga_generations {
        if engine.deadline_reached() {
            break;
        }
        // Stable sort keeps equal-score order deterministic.
        population.sort_by(|a, b| b.score.partial_cmp(&a.score).expect("finite scores"));

        let mut next: Vec<Individual> = Vec::with_capacity(pop_size);
        for elite in population.iter().take(elites) {
            next.push(Individual {
                dag: elite.dag.clone(),
                score: elite.score,
            });
        }
        while next.len() < pop_size {
            let pa = tournament(&population, rng);
            let pb = tournament(&population, rng);
            let mut dag = if rng.gen::<f64>() < engine.config.ga_crossover_rate {
                crossover(engine, &population[pa].dag, &population[pb].dag, rng)?
            } else {
                population[pa].dag.clone()
            };
            if rng.gen::<f64>() < engine.config.ga_mutation_rate {
                mutate(engine, &mut dag, rng)?;
            }
            let score = engine.total_score(&dag)?;
            next.push(Individual { dag, score });
        }
        population = next;
        generations += 1;
    }

    // Best individual, ties to the earliest.
    let mut best = 0;
    for i in 1..population.len() {
        if population[i].score > population[best].score + DELTA_EPSILON {
            best = i;
        }
    }
    let winner = population.swap_remove(best);

    Ok(StrategyOutcome {
        strategy: Strategy::Genetic,
        dag: winner.dag,
        score: winner.score,
        iterations: generations,
        elapsed: started.elapsed(),
        restarts: 0,
    })
}
