use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use ferric_options::engines::monte_carlo::{MonteCarloConfig, MonteCarloEngine};
use ferric_options::math::{GeneratorKind, SeededNormalRng};
use ferric_options::payoff::{VanillaPayoff, compile_payoff};
use std::hint::black_box;

// Monte Carlo performance benchmarks
// Goals:
// - Compiled payoff within 2x of the native vanilla payoff
// - Xoshiro256++ should be faster than StdRng
// - Parallel batches should scale with cores

fn bench_mc_paths(c: &mut Criterion) {
    let payoff = VanillaPayoff::call(100.0);
    let mut rng = SeededNormalRng::new(42);
    let mut group = c.benchmark_group("mc_european_paths");

    for paths in [10_000_usize, 50_000, 100_000] {
        let engine = MonteCarloEngine::new(paths);
        group.bench_with_input(BenchmarkId::from_parameter(paths), &paths, |b, _| {
            b.iter(|| {
                let px = engine
                    .price_value(100.0, 1.0, 0.05, 0.2, black_box(&payoff), &mut rng)
                    .expect("pricing should succeed");
                black_box(px)
            })
        });
    }

    group.finish();
}

fn bench_mc_payoff_kind(c: &mut Criterion) {
    let mut rng = SeededNormalRng::new(42);
    let engine = MonteCarloEngine::new(50_000);
    let native = VanillaPayoff::call(100.0);
    let compiled = compile_payoff("max(s - 100, 0)").expect("payoff should compile");
    let mut group = c.benchmark_group("mc_payoff_kind");

    group.bench_function("native", |b| {
        b.iter(|| {
            black_box(
                engine
                    .price_value(100.0, 1.0, 0.05, 0.2, &native, &mut rng)
                    .expect("pricing should succeed"),
            )
        })
    });
    group.bench_function("compiled", |b| {
        b.iter(|| {
            black_box(
                engine
                    .price_value(100.0, 1.0, 0.05, 0.2, &compiled, &mut rng)
                    .expect("pricing should succeed"),
            )
        })
    });

    group.finish();
}

fn bench_mc_generator_and_parallelism(c: &mut Criterion) {
    let payoff = VanillaPayoff::call(100.0);
    let mut group = c.benchmark_group("mc_generator_parallel");

    for kind in [GeneratorKind::Xoshiro256PlusPlus, GeneratorKind::StdRng] {
        for parallel in [false, true] {
            let mut rng = SeededNormalRng::with_kind(kind, 42);
            let config = MonteCarloConfig::builder()
                .num_paths(200_000)
                .parallel(parallel)
                .build()
                .expect("benchmark config should be valid");
            let engine = MonteCarloEngine::with_config(config);
            let id = format!("{kind:?}/parallel={parallel}");
            group.bench_function(id, |b| {
                b.iter(|| {
                    black_box(
                        engine
                            .price_value(100.0, 1.0, 0.05, 0.2, &payoff, &mut rng)
                            .expect("pricing should succeed"),
                    )
                })
            });
        }
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_mc_paths,
    bench_mc_payoff_kind,
    bench_mc_generator_and_parallelism
);
criterion_main!(benches);
