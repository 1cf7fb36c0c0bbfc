//! Benchmarks for session editing paths.
//!
//! Run with: cargo bench

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use quill_core::config::SessionConfig;
use quill_core::{MemoryStore, Session, TokenMeter, find_replace, token_cost};

/// Generates a source-like text string for benchmarking.
fn generate_text(lines: usize) -> String {
    (0..lines)
        .map(|i| format!("var value{} = compute({}); // sample line for benchmarking\n", i, i))
        .collect()
}

fn session(quota: u64) -> Session<MemoryStore> {
    let config = SessionConfig {
        default_quota: quota,
        ..Default::default()
    };
    Session::open(MemoryStore::new(), config, "bench")
}

/// Benchmarks token costing of a full buffer.
fn bench_token_cost(c: &mut Criterion) {
    let mut group = c.benchmark_group("token_cost");

    for size in [100, 1000, 10000].iter() {
        let text = generate_text(*size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &text, |b, text| {
            b.iter(|| token_cost(black_box(text.as_str())))
        });
    }

    group.finish();
}

/// Benchmarks metering alone, without persistence.
fn bench_meter_charge(c: &mut Criterion) {
    let text = generate_text(1000);

    c.bench_function("meter_charge_growing", |b| {
        b.iter_with_setup(
            || TokenMeter::new(u64::MAX),
            |mut meter| {
                for end in (0..text.len()).step_by(4096) {
                    meter.charge("file1.js", black_box(&text[..end]));
                }
                black_box(meter)
            },
        )
    });
}

/// Benchmarks the full edit path: charge, update and persist.
fn bench_surface_edit(c: &mut Criterion) {
    let mut group = c.benchmark_group("surface_edit");

    for size in [100, 1000].iter() {
        let text = generate_text(*size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &text, |b, text| {
            b.iter_with_setup(
                || session(u64::MAX),
                |mut session| {
                    let outcome = session.on_surface_edit(Some(black_box(text.as_str()))).unwrap();
                    black_box(outcome)
                },
            )
        });
    }

    group.finish();
}

/// Benchmarks regex replace-all over a buffer.
fn bench_find_replace(c: &mut Criterion) {
    let mut group = c.benchmark_group("find_replace");
    let text = generate_text(10000);

    group.bench_function("literal", |b| {
        b.iter(|| find_replace(black_box(&text), "var", "let").unwrap())
    });

    group.bench_function("capture_groups", |b| {
        b.iter(|| find_replace(black_box(&text), r"value(\d+)", "v_$1").unwrap())
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_token_cost,
    bench_meter_charge,
    bench_surface_edit,
    bench_find_replace,
);
criterion_main!(benches);
