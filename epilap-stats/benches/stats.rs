use criterion::{black_box, criterion_group, criterion_main, Criterion};
use epilap_stats::correction::{correct, CorrectionMethod};
use epilap_stats::hypergeom::Hypergeometric;
use epilap_stats::testing::{fisher_exact, Alternative, ContingencyTable};

fn random_f64(n: usize, seed: u64) -> Vec<f64> {
    let mut state = seed;
    (0..n)
        .map(|_| {
            state = state.wrapping_mul(6364136223846793005).wrapping_add(1);
            (state >> 11) as f64 / (1u64 << 53) as f64
        })
        .collect()
}

fn bench_hypergeometric(c: &mut Criterion) {
    let mut group = c.benchmark_group("hypergeometric");

    let small = Hypergeometric::new(20_000, 200, 500).unwrap();
    group.bench_function("upper_tail_20k_genes", |b| {
        b.iter(|| small.upper_tail(black_box(15)))
    });

    // Base-pair universe: a 3 Gb genome.
    let genome = Hypergeometric::new(3_000_000_000, 50_000_000, 2_000_000).unwrap();
    group.bench_function("upper_tail_3gb_universe", |b| {
        b.iter(|| genome.upper_tail(black_box(34_000)))
    });

    group.finish();
}

fn bench_fisher(c: &mut Criterion) {
    let mut group = c.benchmark_group("fisher_exact");

    let table = ContingencyTable::new(120, 880, 3_000, 96_000);
    group.bench_function("greater_100k", |b| {
        b.iter(|| fisher_exact(black_box(&table), Alternative::Greater))
    });
    group.bench_function("two_sided_100k", |b| {
        b.iter(|| fisher_exact(black_box(&table), Alternative::TwoSided))
    });

    group.finish();
}

fn bench_correction(c: &mut Criterion) {
    let mut group = c.benchmark_group("correction");

    let p = random_f64(10_000, 42);
    group.bench_function("bh_10k", |b| {
        b.iter(|| correct(black_box(&p), CorrectionMethod::BenjaminiHochberg))
    });
    group.bench_function("by_10k", |b| {
        b.iter(|| correct(black_box(&p), CorrectionMethod::BenjaminiYekutieli))
    });

    group.finish();
}

criterion_group!(benches, bench_hypergeometric, bench_fisher, bench_correction);
criterion_main!(benches);
