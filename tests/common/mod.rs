//! Shared helpers for the integration tests: dense references and test matrices

#![allow(dead_code)]

use ellmat::{Backend, DenseOrder, DistributionMode, EllpackMatrix, EngineConfig, MatrixKind};
use nalgebra::DMatrix;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

pub const TOL: f64 = 1e-12;

/// Dense row-major `n × n` copy
pub fn dense(a: &EllpackMatrix<f64>) -> Vec<f64> {
    a.to_dense(DenseOrder::RowMajor)
}

/// Dense `αA + βB`, with entries failing the threshold rule zeroed
pub fn dense_add(a: &[f64], b: &[f64], alpha: f64, beta: f64, threshold: f64) -> Vec<f64> {
    a.iter()
        .zip(b)
        .map(|(&x, &y)| keep(alpha * x + beta * y, threshold))
        .collect()
}

/// Dense `αA·B + βC`, with entries failing the threshold rule zeroed
pub fn dense_multiply(
    a: &[f64],
    b: &[f64],
    c: &[f64],
    n: usize,
    alpha: f64,
    beta: f64,
    threshold: f64,
) -> Vec<f64> {
    let mut out = vec![0.0; n * n];
    for i in 0..n {
        for j in 0..n {
            let mut sum = 0.0;
            for k in 0..n {
                sum += a[i * n + k] * b[k * n + j];
            }
            out[i * n + j] = keep(alpha * sum + beta * c[i * n + j], threshold);
        }
    }
    out
}

fn keep(v: f64, threshold: f64) -> f64 {
    if v.abs() > threshold {
        v
    } else {
        0.0
    }
}

pub fn assert_dense_close(got: &[f64], expected: &[f64], tol: f64) {
    assert_eq!(got.len(), expected.len());
    for (k, (g, e)) in got.iter().zip(expected).enumerate() {
        assert!(
            (g - e).abs() <= tol,
            "entry {} differs: got {}, expected {}",
            k,
            g,
            e
        );
    }
}

/// Empty matrix with the given kind and backend
pub fn empty(n: usize, m: usize, kind: MatrixKind, backend: Backend) -> EllpackMatrix<f64> {
    EllpackMatrix::with_config(
        kind,
        n,
        m,
        DistributionMode::Sequential,
        &EngineConfig::for_backend(backend),
    )
    .unwrap()
}

/// Symmetric banded matrix with a dominant diagonal and deterministic
/// off-diagonal values
pub fn banded(n: usize, half_width: usize, m: usize, kind: MatrixKind, backend: Backend) -> EllpackMatrix<f64> {
    let mut a = empty(n, m, kind, backend);
    for i in 0..n {
        let lo = i.saturating_sub(half_width);
        let hi = (i + half_width + 1).min(n);
        for j in lo..hi {
            let v = if i == j {
                1.0 + (i % 5) as f64
            } else {
                let (p, q) = (i.min(j), i.max(j));
                -0.25 - 0.05 * ((p * 7 + q * 3) % 4) as f64
            };
            a.set(i, j, v).unwrap();
        }
    }
    a
}

/// Random sparse matrix with at most `per_row` entries in each row, values
/// uniform in `[-1, 1)`
pub fn random_sparse(n: usize, m: usize, per_row: usize, seed: u64, kind: MatrixKind, backend: Backend) -> EllpackMatrix<f64> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut a = empty(n, m, kind, backend);
    for i in 0..n {
        for _ in 0..per_row {
            let j = rng.gen_range(0..n);
            a.set(i, j, rng.gen_range(-1.0..1.0)).unwrap();
        }
    }
    a
}

/// Eigenvalues of a symmetric dense row-major matrix, ascending
pub fn symmetric_eigenvalues(a: &[f64], n: usize) -> Vec<f64> {
    let mut eig: Vec<f64> = DMatrix::from_row_slice(n, n, a)
        .symmetric_eigen()
        .eigenvalues
        .iter()
        .copied()
        .collect();
    eig.sort_by(|x, y| x.total_cmp(y));
    eig
}
