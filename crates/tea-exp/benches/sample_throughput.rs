use criterion::{black_box, criterion_group, criterion_main, Criterion};
use tea_core::RngHandle;
use tea_exp::sample::generate;

fn bench_families(c: &mut Criterion) {
    let mut group = c.benchmark_group("sample_generation");
    let cases: &[(&str, &[f64])] = &[
        ("uniform", &[0.0, 1.0]),
        ("normal", &[4.24, 0.42]),
        ("beta", &[2.0, 5.0, 1.0, 3.0]),
        ("pareto", &[2.5, 0.0, 1.0]),
    ];
    for (name, params) in cases {
        group.bench_function(*name, |b| {
            let mut rng = RngHandle::from_seed(2024);
            b.iter(|| {
                let values = generate(name, 4096, params, &mut rng).unwrap();
                black_box(values)
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_families);
criterion_main!(benches);
