//! Criterion benchmarks for whole steps through the engine.

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion};
use gyre_bench::{blend_model, reference_settings, stress_settings};
use gyre_engine::ModelBuilder;
use gyre_test_utils::{noop_stage_set, test_settings};

fn bench_noop_step(c: &mut Criterion) {
    let mut model = ModelBuilder::new(test_settings())
        .stages(noop_stage_set())
        .build()
        .unwrap();
    c.bench_function("noop_step", |b| {
        b.iter(|| {
            let metrics = model.step().unwrap();
            black_box(metrics.total_us);
        });
    });
}

fn bench_blend_step_reference(c: &mut Criterion) {
    let mut model = blend_model(reference_settings().unwrap()).unwrap();
    // Warm up: first step touches every page.
    model.step().unwrap();
    c.bench_function("blend_step_reference", |b| {
        b.iter(|| {
            let metrics = model.step().unwrap();
            black_box(metrics.total_us);
        });
    });
}

fn bench_blend_step_stress(c: &mut Criterion) {
    let mut model = blend_model(stress_settings().unwrap()).unwrap();
    model.step().unwrap();
    c.bench_function("blend_step_stress", |b| {
        b.iter(|| {
            let metrics = model.step().unwrap();
            black_box(metrics.total_us);
        });
    });
}

criterion_group!(
    benches,
    bench_noop_step,
    bench_blend_step_reference,
    bench_blend_step_stress
);
criterion_main!(benches);
