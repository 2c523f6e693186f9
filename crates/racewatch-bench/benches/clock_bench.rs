//! Clock-transfer benchmarks.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};

use racewatch_core::clock::{self, SyncClock, ThreadClock};
use racewatch_core::slab::ChunkPool;

fn bench_acquire(c: &mut Criterion) {
    let widths: &[u32] = &[4, 64, 256, 1023];
    let mut group = c.benchmark_group("clock_acquire");

    for &width in widths {
        let pool = ChunkPool::new();
        let mut publisher = ThreadClock::new();
        for tid in 0..width {
            publisher.set(tid, u64::from(tid) + 1);
        }
        let mut sc = SyncClock::new();
        clock::release(&publisher, &mut sc, &pool);

        group.bench_with_input(BenchmarkId::new("slots", width), &sc, |b, sc| {
            let mut tc = ThreadClock::new();
            b.iter(|| {
                clock::acquire(&mut tc, criterion::black_box(sc));
            });
        });
    }
    group.finish();
}

fn bench_release(c: &mut Criterion) {
    let widths: &[u32] = &[4, 64, 256, 1023];
    let mut group = c.benchmark_group("clock_release");

    for &width in widths {
        let pool = ChunkPool::new();
        let mut tc = ThreadClock::new();
        for tid in 0..width {
            tc.set(tid, u64::from(tid) + 1);
        }
        let mut sc = SyncClock::new();

        group.bench_with_input(BenchmarkId::new("slots", width), &width, |b, _| {
            b.iter(|| {
                tc.tick(0);
                clock::release(criterion::black_box(&tc), &mut sc, &pool);
            });
        });
    }
    group.finish();
}

fn bench_release_acquire_pair(c: &mut Criterion) {
    let pool = ChunkPool::new();
    let mut publisher = ThreadClock::new();
    publisher.set(63, 1);
    let mut consumer = ThreadClock::new();
    let mut sc = SyncClock::new();

    c.bench_function("clock_release_acquire_pair", |b| {
        b.iter(|| {
            publisher.tick(0);
            clock::release(&publisher, &mut sc, &pool);
            clock::acquire(&mut consumer, &sc);
        });
    });
}

criterion_group!(
    benches,
    bench_acquire,
    bench_release,
    bench_release_acquire_pair
);
criterion_main!(benches);
