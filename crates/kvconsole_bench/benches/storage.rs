//! Storage engine benchmarks.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use kvconsole_bench::generate_records;
use kvconsole_storage::{CommitRequest, Engine, EngineOptions, MemoryEngine, RedbEngine, WriteOp};
use std::ops::Bound;
use tempfile::tempdir;

fn write_ops(count: usize) -> Vec<WriteOp> {
    generate_records(count, 128)
        .into_iter()
        .map(|(key, value)| WriteOp::put(key, value))
        .collect()
}

/// Benchmark commits of 100 puts on each engine.
fn bench_commit(c: &mut Criterion) {
    let mut group = c.benchmark_group("engine_commit");
    group.throughput(Throughput::Elements(100));

    group.bench_function("memory", |b| {
        let engine = MemoryEngine::new();
        let ops = write_ops(100);
        b.iter(|| {
            engine
                .commit(CommitRequest::unconditional(black_box(&ops)))
                .unwrap();
        });
    });

    for sync in [true, false] {
        let label = if sync { "sync" } else { "eventual" };
        group.bench_with_input(BenchmarkId::new("redb", label), &sync, |b, &sync| {
            let dir = tempdir().unwrap();
            let options = EngineOptions {
                sync_on_commit: sync,
                ..EngineOptions::default()
            };
            let engine = RedbEngine::open(&dir.path().join("bench.redb"), options).unwrap();
            let ops = write_ops(100);
            b.iter(|| {
                engine
                    .commit(CommitRequest::unconditional(black_box(&ops)))
                    .unwrap();
            });
        });
    }
    group.finish();
}

/// Benchmark snapshot scans in pages of 100.
fn bench_scan(c: &mut Criterion) {
    let mut group = c.benchmark_group("engine_scan");

    let memory = MemoryEngine::new();
    memory
        .commit(CommitRequest::unconditional(&write_ops(10_000)))
        .unwrap();

    let dir = tempdir().unwrap();
    let redb = RedbEngine::open(&dir.path().join("scan.redb"), EngineOptions::default()).unwrap();
    redb.commit(CommitRequest::unconditional(&write_ops(10_000)))
        .unwrap();

    let engines: [(&str, &dyn Engine); 2] = [("memory", &memory), ("redb", &redb)];
    for (name, engine) in engines {
        group.bench_function(name, |b| {
            b.iter(|| {
                let snapshot = engine.snapshot().unwrap();
                let mut from: Option<Vec<u8>> = None;
                loop {
                    let bound = match &from {
                        Some(key) => Bound::Excluded(key.as_slice()),
                        None => Bound::Unbounded,
                    };
                    let page = snapshot.scan(bound, 100).unwrap();
                    match page.last() {
                        Some((key, _)) => from = Some(key.clone()),
                        None => break,
                    }
                    black_box(page);
                }
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_commit, bench_scan);
criterion_main!(benches);
