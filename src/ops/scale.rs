//! Scaling without thresholding

use crate::error::Result;
use crate::matrix::EllpackMatrix;
use crate::parallel::run_rows;
use crate::scalar::Element;

/// `A ← αA` over the local rows of `A`
///
/// Zero products stay stored; scaling never changes the sparsity pattern.
pub fn scale_inplace<T: Element>(alpha: T, a: &mut EllpackMatrix<T>) -> Result<()> {
    let plan = a.plan;
    let range = a.local_rows();
    tracing::debug!(n = a.n, rows = ?range, alpha = ?alpha, "scale_inplace");

    run_rows(
        &plan,
        a.rows_mut(range),
        || (),
        || (),
        |_, mut row| {
            row.scale(alpha);
            Ok(())
        },
        |_, _| (),
    )?;
    a.mark_written();
    Ok(())
}

/// `B ← αA`
///
/// `B` keeps its kind; its capacity grows to `A`'s occupancy if needed.
pub fn scale<T: Element>(alpha: T, a: &EllpackMatrix<T>, b: &mut EllpackMatrix<T>) -> Result<()> {
    b.check_row_operand(a)?;
    let occupancy = a.max_row_occupancy();
    if b.m < occupancy {
        b.resize_row_capacity(occupancy)?;
    }
    let range = b.local_rows();
    b.copy_rows_from(a, range)?;
    scale_inplace(alpha, b)
}

/// Returns `αA` as a new matrix with the configuration of `A`
pub fn scale_new<T: Element>(alpha: T, a: &EllpackMatrix<T>) -> Result<EllpackMatrix<T>> {
    let mut b = a.clone();
    scale_inplace(alpha, &mut b)?;
    Ok(b)
}
