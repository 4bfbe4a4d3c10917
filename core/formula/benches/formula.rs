//! FILENAME: benches/formula.rs
//! Parse and evaluation throughput for representative formulas.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use formula::{Context, Engine, Value};

const FORMULAS: &[(&str, &str)] = &[
    ("arithmetic", "abc + 2e3 - bcd * (4 // 3) ** 2 % 7"),
    ("calls", "max(abc, bcd, 3) + sum([1, 2, 3, abc], start=bcd)"),
    ("subscripts", "[abc, bcd, 1, 2, 3, 4][1:-1:2][0] + (abc, bcd)[1]"),
    ("strings", "\"total: \" + \"x\" * 3"),
];

fn sample_context() -> Context {
    Context::new().with("abc", 5).with("bcd", 9)
}

fn bench_parse(c: &mut Criterion) {
    let engine = Engine::new();
    let mut group = c.benchmark_group("parse");

    for (label, formula) in FORMULAS {
        group.bench_function(BenchmarkId::new("formula", label), |b| {
            b.iter(|| {
                let expression = engine.parse(black_box(formula));
                black_box(expression)
            })
        });
    }

    let long_chain = (0..5_000).map(|i| i.to_string()).collect::<Vec<_>>().join(" + ");
    group.bench_function(BenchmarkId::new("chain", 5_000), |b| {
        b.iter(|| black_box(engine.parse(black_box(&long_chain))))
    });

    group.finish();
}

fn bench_evaluate(c: &mut Criterion) {
    let engine = Engine::new();
    let context = sample_context();
    let mut group = c.benchmark_group("evaluate");

    for (label, formula) in FORMULAS {
        let expression = match engine.parse(formula) {
            Ok(expression) => expression,
            Err(err) => {
                eprintln!("Skipping {}: {}", label, err);
                continue;
            }
        };
        group.bench_function(BenchmarkId::new("formula", label), |b| {
            b.iter(|| {
                let value: Value = expression.evaluate(Some(black_box(&context))).unwrap_or(Value::None);
                black_box(value)
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_parse, bench_evaluate);
criterion_main!(benches);
