//! Benchmarks for scope broadcast operations.

use criterion::{Criterion, black_box, criterion_group, criterion_main};

use overscope::entity::{AccessPolicy, Tracked};
use overscope::registry::FamilyRegistry;

fn bench_enter_exit(c: &mut Criterion) {
    let registry = FamilyRegistry::new(AccessPolicy::Fallback);
    let family = registry.declare("bench").unwrap();
    let _entities: Vec<_> = (0..1_000)
        .map(|i| Tracked::new(&registry, family, i).unwrap())
        .collect();

    c.bench_function("enter_exit_1k", |bench| {
        bench.iter(|| {
            let scope = registry.enter(black_box(42));
            scope.exit();
        })
    });
}

fn bench_read(c: &mut Criterion) {
    let registry = FamilyRegistry::new(AccessPolicy::Fallback);
    let family = registry.declare("bench").unwrap();
    let entity = Tracked::new(&registry, family, 7u64).unwrap();

    c.bench_function("read", |bench| {
        bench.iter(|| black_box(entity.read().unwrap()))
    });
}

fn bench_register_and_prune(c: &mut Criterion) {
    let registry = FamilyRegistry::new(AccessPolicy::Fallback);
    let family = registry.declare("bench").unwrap();

    c.bench_function("register_and_prune", |bench| {
        bench.iter(|| {
            let entity = Tracked::new(&registry, family, black_box(1u64)).unwrap();
            drop(entity);
            // Sweep so dead handles do not accumulate across iterations.
            registry.live_count(family)
        })
    });
}

criterion_group!(
    benches,
    bench_enter_exit,
    bench_read,
    bench_register_and_prune
);
criterion_main!(benches);
