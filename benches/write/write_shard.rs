//! Micro-benchmarks for the per-worker write loop.
//!
//! Measures `write_shard` against both engines so harness overhead (key
//! formatting, progress updates) can be told apart from engine cost.

use std::sync::atomic::{AtomicUsize, Ordering};

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use strata_write_bench::partition::{partition, Shard};
use strata_write_bench::progress::ProgressTable;
use strata_write_bench::worker::write_shard;
use strata_write_bench::{EngineOptions, MemoryEngine, StorageEngine, StrataEngine};

const SHARD_SIZES: [usize; 3] = [100, 1_000, 10_000];

fn bench_engine<E: StorageEngine>(c: &mut Criterion) {
    let mut group = c.benchmark_group(format!("write_shard/{}", E::NAME));
    let dir = tempfile::tempdir().unwrap();
    let engine = E::open(dir.path(), &EngineOptions::default()).unwrap();
    // Fresh key range per iteration so every put is an insert.
    let next_start = AtomicUsize::new(0);

    for size in SHARD_SIZES {
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
            b.iter(|| {
                let start = next_start.fetch_add(size, Ordering::Relaxed);
                let table = ProgressTable::new(1);
                write_shard(
                    &engine,
                    Shard {
                        start,
                        end: start + size,
                    },
                    0,
                    &table,
                )
            });
        });
    }
    group.finish();
}

fn memory_engine(c: &mut Criterion) {
    bench_engine::<MemoryEngine>(c);
}

fn strata_engine(c: &mut Criterion) {
    bench_engine::<StrataEngine>(c);
}

fn partition_grid(c: &mut Criterion) {
    c.bench_function("partition/400k_x8", |b| {
        b.iter(|| partition(400_000, 8).unwrap());
    });
}

criterion_group!(benches, memory_engine, strata_engine, partition_grid);
criterion_main!(benches);
