//! Benchmarks for the router receive path
//!
//! One ingested line decodes, updates all eleven windows and builds the
//! event batch for the GUI. Snapshots are taken once per published redraw.
//!
//! Platform: Cross-platform (in-memory sinks only, CI-safe)

use cansat_ground::test_utils::{MemorySinkFactory, SAMPLE_TELEMETRY, telemetry_line};
use cansat_ground::{StationConfig, TelemetryRouter, WindowId};
use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use std::hint::black_box;

fn router(capacity: usize) -> TelemetryRouter {
    let config = StationConfig { window_capacity: capacity, ..StationConfig::default() };
    TelemetryRouter::new(&config, Box::new(MemorySinkFactory::default()))
}

fn bench_ingest_telemetry(c: &mut Criterion) {
    let mut group = c.benchmark_group("ingest_telemetry");
    group.throughput(Throughput::Elements(1));

    for capacity in [100usize, 500, 2000] {
        let mut router = router(capacity);
        group.bench_with_input(BenchmarkId::from_parameter(capacity), &capacity, |b, _| {
            b.iter(|| {
                let events = router.ingest(black_box(SAMPLE_TELEMETRY));
                black_box(events.len())
            })
        });
    }

    group.finish();
}

fn bench_ingest_mixed(c: &mut Criterion) {
    let mut lines: Vec<String> = (0..32).map(|i| telemetry_line(i, 500.0 - i as f64)).collect();
    lines.push("$MSG:{F|DESCENT} Parachute deployed".to_string());
    lines.push("garbage,,,".to_string());

    let mut router = router(500);
    let mut group = c.benchmark_group("ingest_mixed");
    group.throughput(Throughput::Elements(lines.len() as u64));
    group.bench_function("telemetry_and_control", |b| {
        b.iter(|| {
            for line in &lines {
                black_box(router.ingest(black_box(line)).count());
            }
        })
    });
    group.finish();
}

fn bench_snapshots(c: &mut Criterion) {
    let mut router = router(500);
    for i in 0..500 {
        router.ingest(&telemetry_line(i, i as f64)).for_each(drop);
    }

    let mut group = c.benchmark_group("snapshots");
    group.bench_function("single_window", |b| {
        b.iter(|| black_box(router.snapshot(black_box(WindowId::Altitude))))
    });
    group.bench_function("all_windows", |b| b.iter(|| black_box(router.snapshot_all())));
    group.finish();
}

criterion_group!(benches, bench_ingest_telemetry, bench_ingest_mixed, bench_snapshots);
criterion_main!(benches);
