//! Spectral bounds and normalization against a dense eigensolver

mod common;

use common::{banded, dense, symmetric_eigenvalues};
use ellmat::{
    accumulate_offdiag, gershgorin, gershgorin_global, gershgorin_partial, normalize, Backend,
    DistributionMode, EllError, EllpackMatrix, MatrixKind, SerialCommunicator, SpectralBounds,
};

#[test]
fn test_bounds_contain_spectrum() {
    for &(n, half_width) in &[(8, 1), (16, 2), (24, 3)] {
        let a = banded(n, half_width, 2 * half_width + 1, MatrixKind::Ellsort, Backend::CpuParallel);
        let bounds = gershgorin(&a);
        let eigenvalues = symmetric_eigenvalues(&dense(&a), n);

        let (lowest, highest) = (eigenvalues[0], eigenvalues[n - 1]);
        assert!(bounds.emin <= lowest + 1e-9, "{} > {}", bounds.emin, lowest);
        assert!(bounds.emax >= highest - 1e-9, "{} < {}", bounds.emax, highest);
    }
}

#[test]
fn test_normalize_maps_spectrum_into_unit_interval() {
    let mut a = banded(16, 2, 9, MatrixKind::Ellpack, Backend::Sequential);
    let before = symmetric_eigenvalues(&dense(&a), 16);
    let bounds = gershgorin(&a);

    normalize(&mut a, bounds.emin, bounds.emax).unwrap();
    let after = symmetric_eigenvalues(&dense(&a), 16);

    for &lambda in &after {
        assert!((-1e-9..=1.0 + 1e-9).contains(&lambda), "eigenvalue {}", lambda);
    }
    // Order is reversed: the lowest eigenvalue maps to the largest
    let expected_top = (bounds.emax - before[0]) / bounds.width();
    assert!((after[15] - expected_top).abs() < 1e-9);
}

#[test]
fn test_normalize_rejects_degenerate_bounds() {
    let mut a = banded(4, 1, 3, MatrixKind::Ellpack, Backend::Sequential);
    let before = dense(&a);

    assert!(matches!(
        normalize(&mut a, 2.0, 2.0),
        Err(EllError::InvalidArgument { .. })
    ));
    assert!(normalize(&mut a, f64::NEG_INFINITY, 1.0).is_err());
    assert_eq!(dense(&a), before);
}

#[test]
fn test_partial_bounds_and_row_sums() {
    let a = EllpackMatrix::<f64>::from_triplets(
        3,
        3,
        &[
            (0, 0, 2.0),
            (0, 1, 1.0),
            (1, 0, 1.0),
            (1, 1, 3.0),
            (1, 2, 1.0),
            (2, 1, 1.0),
            (2, 2, 2.0),
        ],
        DistributionMode::Sequential,
    )
    .unwrap();

    let full = gershgorin(&a);
    assert_eq!(full, SpectralBounds { emin: 1.0, emax: 5.0 });

    let first = gershgorin_partial(&a, 1).unwrap();
    assert_eq!(first, SpectralBounds { emin: 1.0, emax: 3.0 });
    assert!(gershgorin_partial(&a, 0).unwrap().is_empty());
    assert!(gershgorin_partial(&a, 4).is_err());

    assert_eq!(accumulate_offdiag(&a, false), vec![1.0, 2.0, 1.0]);
    assert_eq!(accumulate_offdiag(&a, true), vec![3.0, 5.0, 3.0]);

    let global = gershgorin_global(&a, &SerialCommunicator).unwrap();
    assert_eq!(global, full);
}

#[test]
fn test_empty_matrix_bounds() {
    let a = EllpackMatrix::<f64>::new(0, 1, DistributionMode::Sequential).unwrap();
    let bounds = gershgorin(&a);
    assert_eq!(bounds, SpectralBounds::EMPTY);
    assert!(bounds.is_empty());
}
