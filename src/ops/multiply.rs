//! # Threshold-aware sparse matrix multiplication
//!
//! Row `i` of the product is formed Gustavson style: every stored `A[i,k]`
//! fans out over row `k` of `B` into a [`DenseAccumulator`]. The previous
//! row of `C` (scaled by `β`) is merged into the same accumulator, and the
//! result is sparsified and committed in one pass.
//!
//! Any row of `B` may be read while computing a local row of `C`, so a
//! distributed `B` must be synchronized first.

use crate::accumulator::DenseAccumulator;
use crate::error::Result;
use crate::matrix::config::Backend;
use crate::matrix::EllpackMatrix;
use crate::ops::{diagonal, vendor};
use crate::parallel::run_rows;
use crate::scalar::Element;

/// Fans row `i` of `A` out over `B`, scaled by `alpha`
#[inline]
fn accumulate_product<T: Element>(
    acc: &mut DenseAccumulator<T>,
    a: &EllpackMatrix<T>,
    b: &EllpackMatrix<T>,
    i: usize,
    alpha: T,
) {
    for (k, a_ik) in a.row_iter(i) {
        let scaled = alpha * a_ik;
        for (j, b_kj) in b.row_iter(k) {
            acc.accumulate(j, scaled * b_kj);
        }
    }
}

fn check_operands<T: Element>(
    a: &EllpackMatrix<T>,
    b: &EllpackMatrix<T>,
    c: &EllpackMatrix<T>,
) -> Result<()> {
    c.check_row_operand(a)?;
    c.check_full_operand(b)
}

/// `C ← αA·B + βC` over the local rows of `C`, then sparsified
///
/// The product is skipped when `α == 0` and the old `C` when `β == 0`.
///
/// # Arguments
///
/// * `a` - Left operand; must hold current data for `C`'s local rows
/// * `b` - Right operand; every row must be current
/// * `c` - Output, updated in place
/// * `alpha`, `beta` - Real scale factors
/// * `threshold` - Entries with magnitude `<= threshold` are dropped
///
/// # Errors
///
/// `DimensionMismatch` or `DomainMismatch` before any row is written;
/// `Capacity` if a row of `C` would exceed `M`.
pub fn multiply<T: Element>(
    a: &EllpackMatrix<T>,
    b: &EllpackMatrix<T>,
    c: &mut EllpackMatrix<T>,
    alpha: f64,
    beta: f64,
    threshold: f64,
) -> Result<()> {
    check_operands(a, b, c)?;
    let plan = c.plan;
    let range = c.local_rows();
    tracing::debug!(
        n = c.n,
        rows = ?range,
        alpha,
        beta,
        threshold,
        backend = ?plan.backend,
        "multiply"
    );

    if plan.backend == Backend::VendorSparse {
        return vendor::multiply(a, b, c, alpha, beta, threshold);
    }

    let (alpha_t, beta_t) = (T::from_real(alpha), T::from_real(beta));
    let n = c.n;
    run_rows(
        &plan,
        c.rows_mut(range),
        || (DenseAccumulator::<T>::new(n), Vec::<(usize, T)>::new()),
        || (),
        |(acc, staged), mut row| {
            if alpha != 0.0 {
                accumulate_product(acc, a, b, row.row(), alpha_t);
            }
            if beta != 0.0 {
                for (&col, &val) in row.live_indices().iter().zip(row.live_values()) {
                    acc.accumulate(col, beta_t * val);
                }
            }
            acc.drain_above(threshold, staged);
            row.commit(staged)
        },
        |_, _| (),
    )?;
    c.mark_written();
    Ok(())
}

/// Returns `αA·B`, sparsified, as a new matrix configured like `A`
pub fn multiply_new<T: Element>(
    a: &EllpackMatrix<T>,
    b: &EllpackMatrix<T>,
    alpha: f64,
    threshold: f64,
) -> Result<EllpackMatrix<T>> {
    let mut c = a.zeros_like()?;
    multiply(a, b, &mut c, alpha, 0.0, threshold)?;
    Ok(c)
}

/// `C ← A·B`, then sparsified
pub fn multiply_ab<T: Element>(
    a: &EllpackMatrix<T>,
    b: &EllpackMatrix<T>,
    c: &mut EllpackMatrix<T>,
    threshold: f64,
) -> Result<()> {
    multiply(a, b, c, 1.0, 0.0, threshold)
}

/// `C ← A·B` where rows that would overflow raise their own threshold
///
/// A row with more than `M` survivors keeps only its `M` largest entries by
/// magnitude (ties broken by first encounter), i.e. its cutoff is raised to
/// the magnitude of its `M`-th largest entry. Never fails with `Capacity`.
///
/// # Returns
///
/// The number of rows whose threshold was raised.
pub fn multiply_adjust_ab<T: Element>(
    a: &EllpackMatrix<T>,
    b: &EllpackMatrix<T>,
    c: &mut EllpackMatrix<T>,
    threshold: f64,
) -> Result<usize> {
    check_operands(a, b, c)?;
    let plan = c.plan;
    let range = c.local_rows();
    tracing::debug!(n = c.n, rows = ?range, threshold, "multiply_adjust_ab");

    let n = c.n;
    let adjusted = run_rows(
        &plan,
        c.rows_mut(range),
        || (DenseAccumulator::<T>::new(n), Vec::<(usize, T)>::new()),
        || 0usize,
        |(acc, staged), mut row| {
            accumulate_product(acc, a, b, row.row(), T::one());
            acc.drain_above(threshold, staged);

            let capacity = row.capacity();
            let overflow = staged.len() > capacity;
            if overflow {
                let cutoff = keep_largest(staged, capacity);
                tracing::trace!(row = row.row(), cutoff, "raised row threshold");
            }
            row.commit(staged)?;
            Ok(usize::from(overflow))
        },
        |x, y| x + y,
    )?;
    c.mark_written();
    if adjusted > 0 {
        tracing::warn!(adjusted, "rows exceeded capacity; thresholds raised");
    }
    Ok(adjusted)
}

/// Keeps the `keep` entries of largest magnitude in their current order and
/// returns the magnitude of the smallest kept one
fn keep_largest<T: Element>(entries: &mut Vec<(usize, T)>, keep: usize) -> f64 {
    if keep == 0 {
        entries.clear();
        return f64::INFINITY;
    }
    let mut order: Vec<usize> = (0..entries.len()).collect();
    order.sort_by(|&x, &y| {
        entries[y]
            .1
            .magnitude()
            .total_cmp(&entries[x].1.magnitude())
    });
    let mut kept = vec![false; entries.len()];
    for &slot in &order[..keep] {
        kept[slot] = true;
    }
    let cutoff = entries[order[keep - 1]].1.magnitude();

    let mut slot = 0;
    entries.retain(|_| {
        let keep_it = kept[slot];
        slot += 1;
        keep_it
    });
    cutoff
}

/// `X2 ← X·X`, then sparsified
///
/// # Returns
///
/// `[tr X, tr X²]` over the local rows (real parts). The trace of `X²` is
/// taken before thresholding.
pub fn multiply_x2<T: Element>(
    x: &EllpackMatrix<T>,
    x2: &mut EllpackMatrix<T>,
    threshold: f64,
) -> Result<[f64; 2]> {
    check_operands(x, x, x2)?;
    let plan = x2.plan;
    let range = x2.local_rows();
    tracing::debug!(n = x2.n, rows = ?range, threshold, "multiply_x2");

    let n = x2.n;
    let traces = run_rows(
        &plan,
        x2.rows_mut(range),
        || (DenseAccumulator::<T>::new(n), Vec::<(usize, T)>::new()),
        || [0.0f64; 2],
        |(acc, staged), mut row| {
            let i = row.row();
            accumulate_product(acc, x, x, i, T::one());
            let tr_x = diagonal(x, i).real_part();
            let tr_x2 = acc.value_at(i).map_or(0.0, |v| v.real_part());
            acc.drain_above(threshold, staged);
            row.commit(staged)?;
            Ok([tr_x, tr_x2])
        },
        |p, q| [p[0] + q[0], p[1] + q[1]],
    )?;
    x2.mark_written();
    Ok(traces)
}

/// `X ← X·X`, then sparsified
///
/// Every output row is computed from the old `X` before any row of `X` is
/// overwritten. Returns the traces of [`multiply_x2`].
pub fn square_inplace<T: Element>(x: &mut EllpackMatrix<T>, threshold: f64) -> Result<[f64; 2]> {
    let mut staged = x.zeros_like()?;
    let traces = multiply_x2(x, &mut staged, threshold)?;

    if x.distribution.is_distributed() {
        let range = x.local_rows();
        x.copy_rows_from(&staged, range)?;
    } else {
        std::mem::swap(&mut x.value, &mut staged.value);
        std::mem::swap(&mut x.index, &mut staged.index);
        std::mem::swap(&mut x.nnz, &mut staged.nnz);
    }
    Ok(traces)
}
