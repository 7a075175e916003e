//! # Threshold-aware addition
//!
//! Each local row of the output is rebuilt in a [`DenseAccumulator`]:
//! contributions are summed per column, the touched columns are rescanned
//! in the order they were first encountered, and the ones passing the
//! threshold rule are committed back into the row. A row that would need
//! more than `M` entries fails with `Capacity` and is left as it was.

use crate::accumulator::DenseAccumulator;
use crate::error::{EllError, Result};
use crate::matrix::config::Backend;
use crate::matrix::EllpackMatrix;
use crate::ops::scale::scale_inplace;
use crate::ops::vendor;
use crate::parallel::run_rows;
use crate::scalar::{is_above_threshold, Element};

/// `A ← αA + βB` over the local rows of `A`, then sparsified
///
/// The `A` side is skipped entirely when `α == 0` and the `B` side when
/// `β == 0`. `A` keeps its capacity and kind.
///
/// # Arguments
///
/// * `a` - Matrix updated in place
/// * `b` - Second operand; must hold current data for `A`'s local rows
/// * `alpha`, `beta` - Real scale factors
/// * `threshold` - Entries with magnitude `<= threshold` are dropped
///
/// # Errors
///
/// `DimensionMismatch` or `DomainMismatch` before any row is written;
/// `Capacity` if a row would exceed `M`.
pub fn add<T: Element>(
    a: &mut EllpackMatrix<T>,
    b: &EllpackMatrix<T>,
    alpha: f64,
    beta: f64,
    threshold: f64,
) -> Result<()> {
    a.check_row_operand(b)?;
    let plan = a.plan;
    let range = a.local_rows();
    tracing::debug!(
        n = a.n,
        rows = ?range,
        alpha,
        beta,
        threshold,
        backend = ?plan.backend,
        "add"
    );

    if plan.backend == Backend::VendorSparse {
        return vendor::add(a, b, alpha, beta, threshold);
    }

    let (alpha_t, beta_t) = (T::from_real(alpha), T::from_real(beta));
    let n = a.n;
    run_rows(
        &plan,
        a.rows_mut(range),
        || (DenseAccumulator::<T>::new(n), Vec::<(usize, T)>::new()),
        || (),
        |(acc, staged), mut row| {
            if alpha != 0.0 {
                for (&col, &val) in row.live_indices().iter().zip(row.live_values()) {
                    acc.accumulate(col, alpha_t * val);
                }
            }
            if beta != 0.0 {
                for (col, val) in b.row_iter(row.row()) {
                    acc.accumulate(col, beta_t * val);
                }
            }
            acc.drain_above(threshold, staged);
            row.commit(staged)
        },
        |_, _| (),
    )?;
    a.mark_written();
    Ok(())
}

/// Returns `αA + βB`, sparsified, as a new matrix configured like `A`
pub fn add_new<T: Element>(
    a: &EllpackMatrix<T>,
    b: &EllpackMatrix<T>,
    alpha: f64,
    beta: f64,
    threshold: f64,
) -> Result<EllpackMatrix<T>> {
    let mut c = a.clone();
    add(&mut c, b, alpha, beta, threshold)?;
    Ok(c)
}

/// `A ← αA + βB` like [`add`], returning a convergence measure
///
/// The measure is the sum, over every column touched in each local row, of
/// `re(y²)` with `y = A_old − B` (unscaled). It is accumulated before
/// thresholding, so dropped entries still count. Neither side is skipped
/// for a zero scale factor.
///
/// The sum covers this rank's rows only; reduce it across ranks with a
/// [`Communicator`](crate::domain::Communicator) if needed.
pub fn add_norm<T: Element>(
    a: &mut EllpackMatrix<T>,
    b: &EllpackMatrix<T>,
    alpha: f64,
    beta: f64,
    threshold: f64,
) -> Result<f64> {
    a.check_row_operand(b)?;
    let plan = a.plan;
    let range = a.local_rows();
    tracing::debug!(n = a.n, rows = ?range, alpha, beta, threshold, "add_norm");

    let (alpha_t, beta_t) = (T::from_real(alpha), T::from_real(beta));
    let n = a.n;
    let trnorm = run_rows(
        &plan,
        a.rows_mut(range),
        || (DenseAccumulator::<T>::with_residual(n), Vec::<(usize, T)>::new()),
        || 0.0,
        |(acc, staged), mut row| {
            for (&col, &val) in row.live_indices().iter().zip(row.live_values()) {
                acc.accumulate_with_residual(col, alpha_t * val, val);
            }
            for (col, val) in b.row_iter(row.row()) {
                acc.accumulate_with_residual(col, beta_t * val, T::zero() - val);
            }
            let norm = acc.drain_with_residual(threshold, staged);
            row.commit(staged)?;
            Ok(norm)
        },
        |x, y| x + y,
    )?;
    a.mark_written();
    Ok(trnorm)
}

/// `A ← A + βI` over the local rows, then sparsified
///
/// When `β ≠ 0` a stored diagonal is updated in place and a missing one is
/// appended as `(i, β)`. Every entry of the row, not just the diagonal, is
/// then filtered by `threshold`.
///
/// # Errors
///
/// `Capacity` if a full row has no diagonal entry to update.
pub fn add_identity<T: Element>(a: &mut EllpackMatrix<T>, beta: f64, threshold: f64) -> Result<()> {
    let plan = a.plan;
    let range = a.local_rows();
    tracing::debug!(n = a.n, rows = ?range, beta, threshold, "add_identity");

    let beta_t = T::from_real(beta);
    run_rows(
        &plan,
        a.rows_mut(range),
        Vec::new,
        || (),
        |staged: &mut Vec<(usize, T)>, mut row| {
            let i = row.row();
            staged.clear();
            staged.extend(
                row.live_indices()
                    .iter()
                    .copied()
                    .zip(row.live_values().iter().copied()),
            );
            if beta != 0.0 {
                match staged.iter().position(|&(col, _)| col == i) {
                    Some(slot) => staged[slot].1 += beta_t,
                    None => {
                        if staged.len() == row.capacity() {
                            return Err(EllError::capacity(i, staged.len() + 1, row.capacity()));
                        }
                        staged.push((i, beta_t));
                    }
                }
            }
            staged.retain(|&(_, val)| is_above_threshold(val, threshold));
            row.commit(staged)
        },
        |_, _| (),
    )?;
    a.mark_written();
    Ok(())
}

/// `A ← αA + βI`, then sparsified
pub fn scale_add_identity<T: Element>(
    a: &mut EllpackMatrix<T>,
    alpha: f64,
    beta: f64,
    threshold: f64,
) -> Result<()> {
    scale_inplace(T::from_real(alpha), a)?;
    add_identity(a, beta, threshold)
}
