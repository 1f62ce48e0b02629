//! Benchmarks for taking instances out of pools and returning them.

#![allow(
    missing_docs,
    reason = "No need for API documentation in benchmark code"
)]

use std::hint::black_box;

use criterion::{Criterion, criterion_group, criterion_main};
use recycle_pool::{PlainStrategy, PoolConfig, PoolCore, PoolDatum, PoolRegistry, Poolable};

criterion_group!(benches, entrypoint);
criterion_main!(benches);

#[derive(Default)]
struct Particle {
    position: [f32; 3],
    velocity: [f32; 3],
}

impl Poolable for Particle {
    fn on_created(&mut self) {}

    fn on_get(&mut self) {
        self.velocity = [0.0, 1.0, 0.0];
    }

    fn on_release(&mut self) {
        self.position = [0.0; 3];
    }

    fn on_destroyed(&mut self) {}
}

fn entrypoint(c: &mut Criterion) {
    let mut group = c.benchmark_group("rp_core");

    group.bench_function("get_release_warm", |b| {
        let datum = PoolDatum::plain("particle").with_initial_size(1);
        let mut pool: PoolCore<Particle, _> = PoolCore::new(&datum, PlainStrategy::new());

        b.iter(|| {
            let particle = pool.get();
            pool.release(black_box(particle));
        });
    });

    group.bench_function("get_release_hundred", |b| {
        let datum = PoolDatum::plain("particle").with_initial_size(100);
        let mut pool: PoolCore<Particle, _> = PoolCore::new(&datum, PlainStrategy::new());

        b.iter(|| {
            let particles = (0..100).map(|_| pool.get()).collect::<Vec<_>>();
            for particle in particles {
                pool.release(particle);
            }
        });
    });

    group.bench_function("construct_cold", |b| {
        b.iter(|| {
            let mut pool: PoolCore<Particle, _> =
                PoolCore::new(&PoolDatum::plain("particle"), PlainStrategy::new());
            black_box(pool.get())
        });
    });

    group.finish();

    let mut group = c.benchmark_group("rp_registry");

    group.bench_function("get_release_by_type", |b| {
        let config = PoolConfig::new(vec![PoolDatum::plain("particle").with_initial_size(1)]);
        let registry = PoolRegistry::builder()
            .register_plain::<Particle>("particle")
            .build(&config);

        b.iter(|| {
            let particle = registry.get_plain::<Particle>().unwrap();
            registry.release_plain(black_box(particle)).unwrap();
        });
    });

    group.bench_function("release_all", |b| {
        let config = PoolConfig::new(vec![PoolDatum::plain("particle").with_initial_size(10)]);
        let registry = PoolRegistry::builder()
            .register_plain::<Particle>("particle")
            .build(&config);

        b.iter(|| {
            for _ in 0..10 {
                drop(registry.get_plain::<Particle>().unwrap());
            }
            registry.release_all_pools().unwrap();
        });
    });

    group.finish();
}
