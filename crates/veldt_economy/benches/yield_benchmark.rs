//! Benchmark for harvest yield rolling.
//!
//! Run with: cargo bench --package veldt_economy --bench yield_benchmark

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use veldt_economy::{roll_seed, YieldRoller};
use veldt_shared::ResourceCatalog;

fn benchmark_single_roll(c: &mut Criterion) {
    let roller = YieldRoller::new(Arc::new(ResourceCatalog::builtin()));

    c.bench_function("single_harvest_roll", |b| {
        let mut version = 0u64;
        b.iter(|| {
            version = version.wrapping_add(1);
            let seed = roll_seed(42, 1_000, version);
            black_box(roller.roll(black_box(6), 120, seed))
        });
    });
}

criterion_group!(benches, benchmark_single_roll);
criterion_main!(benches);
