//! Benchmark suite for mastery-engine
//!
//! Run with: cargo bench

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion};
use mastery_engine::{compute_metrics, BktEstimator, Tier};

fn bench_update(c: &mut Criterion) {
    let estimator = BktEstimator::default();
    c.bench_function("BktEstimator::update", |b| {
        b.iter(|| estimator.update(black_box(0.5), black_box(true)))
    });
}

fn bench_bulk_update(c: &mut Criterion) {
    let estimator = BktEstimator::default();
    let observations: Vec<bool> = (0..200).map(|i| i % 4 != 0).collect();
    c.bench_function("BktEstimator::bulk_update/200", |b| {
        b.iter(|| estimator.bulk_update(black_box(0.5), black_box(&observations)))
    });
}

fn bench_compute_metrics(c: &mut Criterion) {
    let predicted: Vec<f64> = (0..1_000).map(|i| (i % 100) as f64 / 100.0).collect();
    let actual: Vec<f64> = predicted.iter().map(|p| (p * 0.9 + 0.05).min(1.0)).collect();
    let predicted_tiers: Vec<Tier> = predicted.iter().map(|&m| Tier::classify(m)).collect();
    let actual_tiers: Vec<Tier> = actual.iter().map(|&m| Tier::classify(m)).collect();

    c.bench_function("compute_metrics/1000", |b| {
        b.iter(|| {
            compute_metrics(
                black_box(&predicted),
                black_box(&actual),
                black_box(&predicted_tiers),
                black_box(&actual_tiers),
            )
        })
    });
}

criterion_group!(benches, bench_update, bench_bulk_update, bench_compute_metrics);
criterion_main!(benches);
