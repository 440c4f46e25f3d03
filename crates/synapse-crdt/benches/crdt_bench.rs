use criterion::{black_box, criterion_group, criterion_main, Criterion};
use synapse_crdt::{GCounter, ORSet, VectorClock};

fn wide_clock(nodes: usize, offset: u64) -> VectorClock {
    VectorClock::from_entries((0..nodes).map(|i| (format!("node-{i}"), i as u64 + offset)))
}

fn bench_clock(c: &mut Criterion) {
    let a = wide_clock(64, 0);
    let b = wide_clock(64, 1);
    c.bench_function("vector_clock_compare_64", |bench| {
        bench.iter(|| black_box(&a).compare(black_box(&b)))
    });
    c.bench_function("vector_clock_merge_64", |bench| {
        bench.iter(|| black_box(&a).merged(black_box(&b)))
    });
}

fn bench_counters(c: &mut Criterion) {
    let mut a = GCounter::new();
    let mut b = GCounter::new();
    for i in 0..64 {
        a.increment(&format!("node-{i}"), i);
        b.increment(&format!("node-{i}"), 64 - i);
    }
    c.bench_function("gcounter_merge_64", |bench| {
        bench.iter(|| black_box(&a).merged(black_box(&b)))
    });
}

fn bench_orset(c: &mut Criterion) {
    let mut a = ORSet::new();
    let mut b = ORSet::new();
    for i in 0..256 {
        a.add(format!("episode-{i}"), "A");
        b.add(format!("episode-{}", i + 128), "B");
    }
    c.bench_function("orset_merge_256", |bench| {
        bench.iter(|| black_box(&a).merged(black_box(&b)))
    });
}

criterion_group!(benches, bench_clock, bench_counters, bench_orset);
criterion_main!(benches);
