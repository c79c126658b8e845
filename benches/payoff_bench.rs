use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use ferric_options::payoff::compile_payoff;
use std::hint::black_box;

const EXPRESSIONS: &[(&str, &str)] = &[
    ("vanilla", "max(s - 100, 0)"),
    ("digital", "1 if s > 100 else 0"),
    ("capped_straddle", "min(math.fabs(s - 100), 25)"),
    (
        "log_barrier",
        "math.log(s / 100) * (80 < s < 120) + math.exp(-s / 50) * (s >= 120 or 0)",
    ),
];

fn bench_compile(c: &mut Criterion) {
    let mut group = c.benchmark_group("payoff_compile");

    for &(name, source) in EXPRESSIONS {
        group.bench_with_input(BenchmarkId::from_parameter(name), source, |b, source| {
            b.iter(|| black_box(compile_payoff(black_box(source)).expect("payoff should compile")))
        });
    }

    group.finish();
}

fn bench_evaluate(c: &mut Criterion) {
    let mut group = c.benchmark_group("payoff_evaluate");

    for &(name, source) in EXPRESSIONS {
        let payoff = compile_payoff(source).expect("payoff should compile");
        group.bench_with_input(BenchmarkId::from_parameter(name), &payoff, |b, payoff| {
            b.iter(|| black_box(payoff.evaluate(black_box(105.0))))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_compile, bench_evaluate);
criterion_main!(benches);
