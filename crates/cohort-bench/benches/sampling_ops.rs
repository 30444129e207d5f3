//! Criterion benchmarks for the sampling primitives.

use std::hint::black_box;

use cohort_model::sampling::{binomial, departure_probabilities, multinomial, poisson};
use criterion::{criterion_group, criterion_main, Criterion};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

fn bench_binomial(c: &mut Criterion) {
    let mut rng = ChaCha8Rng::seed_from_u64(7);
    c.bench_function("binomial_small_n", |b| {
        b.iter(|| black_box(binomial(&mut rng, black_box(20), 0.3)));
    });
    c.bench_function("binomial_large_n", |b| {
        b.iter(|| black_box(binomial(&mut rng, black_box(1_000_000), 0.013)));
    });
}

fn bench_poisson(c: &mut Criterion) {
    let mut rng = ChaCha8Rng::seed_from_u64(7);
    c.bench_function("poisson_mean_35", |b| {
        b.iter(|| black_box(poisson(&mut rng, black_box(35.0))));
    });
}

fn bench_competing_hazards(c: &mut Criterion) {
    let mut rng = ChaCha8Rng::seed_from_u64(7);
    let hazards = [0.03, 0.005, 0.0001];
    let mut probs = [0.0; 4];
    let mut counts = [0u64; 4];
    c.bench_function("competing_hazards_3", |b| {
        b.iter(|| {
            let stay = departure_probabilities(&hazards, &mut probs[..3]);
            probs[3] = stay;
            multinomial(&mut rng, black_box(250_000), &probs, &mut counts);
            black_box(&counts);
        });
    });
}

criterion_group!(benches, bench_binomial, bench_poisson, bench_competing_hazards);
criterion_main!(benches);
