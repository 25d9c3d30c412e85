//! Criterion benchmarks for manifest building
//!
//! Building runs once per injected experiment; these keep an eye on the cost
//! of validation plus rendering for the pod and network action shapes.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use chaos_harness::crd::{DelayParams, Direction, ReorderParams};
use chaos_harness::manifest;
use chaos_harness::{Action, ChaosConfig, Experiment, Mode, Selector};

// =============================================================================
// Test Fixtures
// =============================================================================

fn selector_with_labels(count: usize) -> Selector {
    let labels: Vec<(String, String)> = (0..count)
        .map(|i| (format!("label-{i}"), format!("value-{i}")))
        .collect();
    Selector::from_labels(labels, &["default", "staging"]).unwrap()
}

fn delay_experiment(labels: usize) -> Experiment {
    let delay = DelayParams::with_jitter("100ms", "10ms", "25")
        .unwrap()
        .reorder(ReorderParams::new("10", "50", 5).unwrap());
    Experiment::builder(selector_with_labels(labels), Action::Delay(delay))
        .name("delay-bench")
        .mode(Mode::FixedPercent)
        .value("50")
        .duration("5m")
        .build()
        .unwrap()
}

// =============================================================================
// Benchmarks
// =============================================================================

fn bench_build_experiment(c: &mut Criterion) {
    c.bench_function("build_pod_kill_experiment", |b| {
        b.iter(|| {
            let selector = Selector::from_labels([("app", "web")], &["default"]).unwrap();
            black_box(
                Experiment::pod_kill(selector)
                    .name("kill-web")
                    .mode(Mode::Fixed)
                    .value("2")
                    .duration("30s")
                    .build()
                    .unwrap(),
            )
        })
    });
}

fn bench_render_manifest(c: &mut Criterion) {
    let config = ChaosConfig::default();
    let mut group = c.benchmark_group("render_delay_manifest");

    for labels in [1, 8, 64] {
        let experiment = delay_experiment(labels);
        group.bench_with_input(BenchmarkId::from_parameter(labels), &experiment, |b, exp| {
            b.iter(|| black_box(manifest::build(exp, &config)))
        });
    }

    group.finish();
}

fn bench_partition_to_dynamic_object(c: &mut Criterion) {
    let config = ChaosConfig::default();
    let experiment = Experiment::network_partition(
        selector_with_labels(4),
        selector_with_labels(4),
        Direction::Both,
    )
    .name("split-bench")
    .build()
    .unwrap();

    c.bench_function("partition_to_dynamic_object", |b| {
        b.iter(|| black_box(manifest::build(&experiment, &config).to_dynamic_object().unwrap()))
    });
}

criterion_group!(
    benches,
    bench_build_experiment,
    bench_render_manifest,
    bench_partition_to_dynamic_object
);
criterion_main!(benches);
