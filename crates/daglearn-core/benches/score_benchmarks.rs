//! Benchmarks for family counting and Bayesian-Dirichlet scoring.
//!
//! Run with:
//! - `cargo bench --bench score_benchmarks`

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use daglearn_core::engine::dataset::{DiscreteDataset, VarId, Variable};
use daglearn_core::engine::score::LocalScorer;

/// Deterministic synthetic dataset: `num_vars` ternary columns filled from
/// a fixed linear congruential generator.
fn make_dataset(num_vars: usize, num_rows: usize, seed: u64) -> DiscreteDataset {
    let mut state = seed;
    let mut rows = Vec::with_capacity(num_rows);
    for _ in 0..num_rows {
        let mut row = Vec::with_capacity(num_vars);
        for _ in 0..num_vars {
            state = state
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            row.push(((state >> 33) % 3) as u32);
        }
        rows.push(row);
    }
    let vars = (0..num_vars)
        .map(|i| Variable::with_cardinality(format!("v{}", i), 3))
        .collect();
    DiscreteDataset::from_parts(vars, &rows).expect("synthetic dataset")
}

fn bench_family_counts(c: &mut Criterion) {
    let mut group = c.benchmark_group("family_counts");
    for rows in [1_000usize, 10_000] {
        let ds = make_dataset(8, rows, 7);
        let parents = [VarId(1), VarId(2), VarId(3)];
        group.bench_with_input(BenchmarkId::new("three_parents", rows), &ds, |b, ds| {
            b.iter(|| black_box(ds.family_counts(black_box(VarId(0)), black_box(&parents))));
        });
    }
    group.finish();
}

fn bench_local_score(c: &mut Criterion) {
    let mut group = c.benchmark_group("local_score");
    for rows in [1_000usize, 10_000] {
        let ds = make_dataset(8, rows, 11);
        let scorer = LocalScorer::new(&ds, 1.0, 4).expect("scorer");
        let parents = [VarId(1), VarId(2)];
        group.bench_with_input(BenchmarkId::new("two_parents", rows), &scorer, |b, s| {
            b.iter(|| black_box(s.score(black_box(VarId(0)), black_box(&parents))));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_family_counts, bench_local_score);
criterion_main!(benches);
