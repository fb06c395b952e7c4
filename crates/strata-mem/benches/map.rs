//! Integer map benchmarks against `hashbrown`.

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use strata_mem::{IntMap, StretchyBuf};

fn keys(count: u64) -> Vec<u64> {
    // Spread-out, non-zero keys shaped like heap addresses.
    (1..=count).map(|i| i.wrapping_mul(0x9e37_79b9_7f4a_7c15) | 8).collect()
}

fn bench_insert(c: &mut Criterion) {
    let mut group = c.benchmark_group("map_insert");

    for size in [100u64, 1_000, 100_000].iter() {
        let keys = keys(*size);

        group.bench_with_input(BenchmarkId::new("int_map", size), &keys, |b, keys| {
            b.iter(|| {
                let mut map = IntMap::new();
                for &k in keys {
                    map.put(k, k);
                }
                black_box(map.len())
            });
        });

        group.bench_with_input(BenchmarkId::new("hashbrown", size), &keys, |b, keys| {
            b.iter(|| {
                let mut map = hashbrown::HashMap::new();
                for &k in keys {
                    map.insert(k, k);
                }
                black_box(map.len())
            });
        });
    }

    group.finish();
}

fn bench_lookup(c: &mut Criterion) {
    let mut group = c.benchmark_group("map_lookup");

    for size in [100u64, 1_000, 100_000].iter() {
        let keys = keys(*size);

        let mut ours = IntMap::new();
        let mut reference = hashbrown::HashMap::new();
        for &k in &keys {
            ours.put(k, k);
            reference.insert(k, k);
        }

        group.bench_with_input(BenchmarkId::new("int_map", size), &keys, |b, keys| {
            b.iter(|| keys.iter().map(|&k| ours.get(k)).sum::<u64>());
        });

        group.bench_with_input(BenchmarkId::new("hashbrown", size), &keys, |b, keys| {
            b.iter(|| keys.iter().map(|k| reference[k]).sum::<u64>());
        });
    }

    group.finish();
}

fn bench_buffer_push(c: &mut Criterion) {
    let mut group = c.benchmark_group("buffer_push");

    group.bench_function("stretchy_buf", |b| {
        b.iter(|| {
            let mut buf = StretchyBuf::new();
            for i in 0..10_000u64 {
                buf.push(i);
            }
            black_box(buf.len())
        });
    });

    group.bench_function("vec", |b| {
        b.iter(|| {
            let mut buf = Vec::new();
            for i in 0..10_000u64 {
                buf.push(i);
            }
            black_box(buf.len())
        });
    });

    group.finish();
}

criterion_group!(benches, bench_insert, bench_lookup, bench_buffer_push);
criterion_main!(benches);
