//! Storage-level behaviour of ELLPACK and ELLSORT matrices

mod common;

use common::{dense, empty, random_sparse};
use ellmat::{
    from_sprs_csr, to_sprs_csr, Backend, DenseOrder, DistributionMode, EllError, EllpackMatrix,
    MatrixKind,
};
use num_complex::Complex64;
use sprs::TriMat;

#[test]
fn test_ellsort_rows_stay_ordered() {
    let mut a = empty(6, 4, MatrixKind::Ellsort, Backend::Sequential);
    for &j in &[4, 1, 5, 0] {
        a.set(2, j, j as f64 + 1.0).unwrap();
    }

    let (cols, vals) = a.row(2).unwrap();
    assert_eq!(cols, &[0, 1, 4, 5]);
    assert_eq!(vals, &[1.0, 2.0, 5.0, 6.0]);

    a.set(2, 1, 0.0).unwrap();
    assert_eq!(a.row(2).unwrap().0, &[0, 4, 5]);
    assert!(a.check_invariants().is_ok());
}

#[test]
fn test_capacity_error_leaves_row_intact() {
    let mut a = empty(4, 2, MatrixKind::Ellpack, Backend::Sequential);
    a.set(0, 0, 1.0).unwrap();
    a.set(0, 3, 2.0).unwrap();

    let err = a.set(0, 1, 3.0).unwrap_err();
    assert_eq!(
        err,
        EllError::Capacity {
            row: 0,
            required: 3,
            capacity: 2
        }
    );
    assert_eq!(a.row_nonzeros(0).unwrap(), 2);
    assert_eq!(a.get(0, 3).unwrap(), 2.0);

    // Overwriting a stored entry needs no extra slot
    a.set(0, 3, 5.0).unwrap();
    assert_eq!(a.get(0, 3).unwrap(), 5.0);
}

#[test]
fn test_out_of_bounds_access() {
    let a = empty(3, 2, MatrixKind::Ellpack, Backend::Sequential);
    assert!(matches!(a.get(3, 0), Err(EllError::IndexOutOfBounds { .. })));
    assert!(matches!(a.get(0, 7), Err(EllError::IndexOutOfBounds { .. })));
    assert!(matches!(a.row(5), Err(EllError::IndexOutOfBounds { .. })));
}

#[test]
fn test_dense_kind_is_rejected() {
    let err = EllpackMatrix::<f64>::with_config(
        MatrixKind::Dense,
        4,
        4,
        DistributionMode::Sequential,
        &Default::default(),
    )
    .unwrap_err();
    assert!(matches!(err, EllError::UnsupportedKind { .. }));
}

#[test]
fn test_zero_sized_matrix() {
    let a = EllpackMatrix::<f64>::new(0, 0, DistributionMode::Sequential).unwrap();
    assert_eq!(a.nnz_total(), 0);
    assert_eq!(a.max_row_occupancy(), 0);
    assert!(a.to_dense(DenseOrder::RowMajor).is_empty());
    assert!(a.check_invariants().is_ok());
}

#[test]
fn test_resize_row_capacity() {
    let mut a = random_sparse(10, 4, 3, 7, MatrixKind::Ellpack, Backend::Sequential);
    let before = dense(&a);

    a.resize_row_capacity(9).unwrap();
    assert_eq!(a.m(), 9);
    assert_eq!(dense(&a), before);

    let occupancy = a.max_row_occupancy();
    assert!(matches!(
        a.resize_row_capacity(occupancy - 1),
        Err(EllError::Capacity { .. })
    ));
    a.resize_row_capacity(occupancy).unwrap();
    assert_eq!(dense(&a), before);
}

#[test]
fn test_dense_round_trip_in_both_orders() {
    let a = random_sparse(12, 6, 4, 11, MatrixKind::Ellpack, Backend::Sequential);
    for &order in &[DenseOrder::RowMajor, DenseOrder::ColumnMajor] {
        let buffer = a.to_dense(order);
        let back = EllpackMatrix::from_dense(12, 6, &buffer, order, 0.0).unwrap();
        assert_eq!(back.to_dense(DenseOrder::RowMajor), dense(&a));
    }
}

#[test]
fn test_copy_into_keeps_destination_layout() {
    let a = random_sparse(8, 4, 3, 3, MatrixKind::Ellpack, Backend::Sequential);
    let mut sorted = empty(8, 6, MatrixKind::Ellsort, Backend::CpuParallel);

    a.copy_into(&mut sorted).unwrap();
    assert_eq!(sorted.m(), 6);
    assert_eq!(sorted.kind(), MatrixKind::Ellsort);
    assert_eq!(dense(&sorted), dense(&a));
    assert!(sorted.check_invariants().is_ok());
}

#[test]
fn test_sprs_interop() {
    let mut tri = TriMat::new((4, 4));
    tri.add_triplet(0, 0, 1.0);
    tri.add_triplet(0, 3, 2.0);
    tri.add_triplet(2, 1, -3.0);
    tri.add_triplet(3, 3, 4.0);
    tri.add_triplet(3, 3, 1.0);
    let csr: sprs::CsMat<f64> = tri.to_csr();

    let a = from_sprs_csr(csr.clone(), 2).unwrap();
    assert_eq!(a.get(3, 3).unwrap(), 5.0);
    assert_eq!(a.row_degrees(), &[2, 0, 1, 1]);

    let back = to_sprs_csr(&a);
    assert_eq!(back.indices(), csr.indices());
    assert_eq!(back.data(), csr.data());
}

#[test]
fn test_complex_storage() {
    let mut a = EllpackMatrix::<Complex64>::new_sorted(3, 2, DistributionMode::Sequential).unwrap();
    a.set(0, 1, Complex64::new(1.0, -1.0)).unwrap();
    a.set(1, 0, Complex64::new(0.0, 2.0)).unwrap();

    let h = a.adjoint_new().unwrap();
    assert_eq!(h.get(1, 0).unwrap(), Complex64::new(1.0, 1.0));
    assert_eq!(h.get(0, 1).unwrap(), Complex64::new(0.0, -2.0));

    let text = a.format_window(0, 2, 0, 2).unwrap();
    assert_eq!(
        text,
        "  0.000+0.000i  1.000-1.000i\n  0.000+2.000i  0.000+0.000i\n"
    );
}
