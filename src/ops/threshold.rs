//! Pruning of small entries

use crate::error::Result;
use crate::matrix::EllpackMatrix;
use crate::parallel::run_rows;
use crate::scalar::{is_above_threshold, Element};

/// Drops every local entry with magnitude `<= threshold`
///
/// Surviving entries keep their relative order, so ELLSORT rows stay
/// sorted. Applying the same threshold twice changes nothing.
pub fn threshold<T: Element>(a: &mut EllpackMatrix<T>, threshold: f64) -> Result<()> {
    let plan = a.plan;
    let range = a.local_rows();
    tracing::debug!(n = a.n, rows = ?range, threshold, "threshold");

    let dropped = run_rows(
        &plan,
        a.rows_mut(range),
        || (),
        || 0usize,
        |_, mut row| {
            let before = row.live_indices().len();
            let kept = row.retain(|_, val| is_above_threshold(val, threshold));
            Ok(before - kept)
        },
        |x, y| x + y,
    )?;
    tracing::trace!(dropped, "threshold done");
    a.mark_written();
    Ok(())
}

/// Returns a thresholded copy of `a`
pub fn threshold_new<T: Element>(a: &EllpackMatrix<T>, threshold_value: f64) -> Result<EllpackMatrix<T>> {
    let mut b = a.clone();
    threshold(&mut b, threshold_value)?;
    Ok(b)
}
