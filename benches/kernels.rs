//! Benchmarks for the ELLPACK kernels on banded matrices

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use ellmat::{
    add, gershgorin, multiply_ab, threshold, Backend, DistributionMode, EllpackMatrix,
    EngineConfig, MatrixKind,
};

/// Creates a symmetric banded matrix with decaying off-diagonals
fn create_banded_matrix(n: usize, half_width: usize, backend: Backend) -> EllpackMatrix<f64> {
    let m = (4 * half_width + 1).min(n);
    let mut a = EllpackMatrix::with_config(
        MatrixKind::Ellpack,
        n,
        m,
        DistributionMode::Sequential,
        &EngineConfig::for_backend(backend),
    )
    .unwrap();
    for i in 0..n {
        let lo = i.saturating_sub(half_width);
        let hi = (i + half_width + 1).min(n);
        for j in lo..hi {
            let distance = i.abs_diff(j) as f64;
            a.set(i, j, if i == j { 2.0 } else { -0.5f64.powf(distance) }).unwrap();
        }
    }
    a
}

fn bench_add(c: &mut Criterion) {
    let mut group = c.benchmark_group("add");
    for &backend in &[Backend::Sequential, Backend::CpuParallel, Backend::VendorSparse] {
        let a = create_banded_matrix(4096, 4, backend);
        let b = create_banded_matrix(4096, 4, backend);
        group.bench_function(BenchmarkId::from_parameter(format!("{:?}", backend)), |bench| {
            bench.iter(|| {
                let mut out = a.clone();
                add(&mut out, black_box(&b), 1.0, -0.5, 1e-10).unwrap();
                black_box(out)
            })
        });
    }
    group.finish();
}

fn bench_multiply(c: &mut Criterion) {
    let mut group = c.benchmark_group("multiply");
    group.sample_size(20);
    for &backend in &[Backend::Sequential, Backend::CpuParallel, Backend::VendorSparse] {
        let a = create_banded_matrix(4096, 4, backend);
        let mut out = a.zeros_like().unwrap();
        group.bench_function(BenchmarkId::from_parameter(format!("{:?}", backend)), |bench| {
            bench.iter(|| multiply_ab(black_box(&a), black_box(&a), &mut out, 1e-10).unwrap())
        });
    }
    group.finish();
}

fn bench_threshold(c: &mut Criterion) {
    let a = create_banded_matrix(4096, 4, Backend::CpuParallel);
    c.bench_function("threshold", |bench| {
        bench.iter(|| {
            let mut out = a.clone();
            threshold(&mut out, black_box(0.1)).unwrap();
            black_box(out)
        })
    });
}

fn bench_gershgorin(c: &mut Criterion) {
    let a = create_banded_matrix(4096, 4, Backend::CpuParallel);
    c.bench_function("gershgorin", |bench| bench.iter(|| gershgorin(black_box(&a))));
}

criterion_group!(benches, bench_add, bench_multiply, bench_threshold, bench_gershgorin);
criterion_main!(benches);
