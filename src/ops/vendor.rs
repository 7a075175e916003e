//! Kernels routed through sprs
//!
//! Contributions of the local rows are collected as triplets in a
//! [`TriMat`], which sums duplicate positions when converted to CSR. Each
//! CSR row is then pruned by the threshold rule and committed through the
//! same row views as the native kernels, so both paths share one result
//! contract (the stored column order of an ELLPACK row may differ).

use sprs::{CsMat, TriMat};

use crate::error::Result;
use crate::matrix::EllpackMatrix;
use crate::parallel::run_rows;
use crate::scalar::{is_above_threshold, Element};

/// Prunes and commits the local rows of `target` from an assembled CSR matrix
fn commit_assembled<T: Element>(
    target: &mut EllpackMatrix<T>,
    assembled: &CsMat<T>,
    threshold: f64,
) -> Result<()> {
    let plan = target.plan;
    let range = target.local_rows();
    run_rows(
        &plan,
        target.rows_mut(range),
        Vec::<(usize, T)>::new,
        || (),
        |staged, mut row| {
            staged.clear();
            if let Some(view) = assembled.outer_view(row.row()) {
                staged.extend(
                    view.iter()
                        .map(|(col, &val)| (col, val))
                        .filter(|&(_, val)| is_above_threshold(val, threshold)),
                );
            }
            row.commit(staged)
        },
        |_, _| (),
    )?;
    target.mark_written();
    Ok(())
}

/// `A ← αA + βB`
pub(crate) fn add<T: Element>(
    a: &mut EllpackMatrix<T>,
    b: &EllpackMatrix<T>,
    alpha: f64,
    beta: f64,
    threshold: f64,
) -> Result<()> {
    let (alpha_t, beta_t) = (T::from_real(alpha), T::from_real(beta));
    let mut tri = TriMat::new((a.n, a.n));
    for i in a.local_rows() {
        if alpha != 0.0 {
            for (j, v) in a.row_iter(i) {
                tri.add_triplet(i, j, alpha_t * v);
            }
        }
        if beta != 0.0 {
            for (j, v) in b.row_iter(i) {
                tri.add_triplet(i, j, beta_t * v);
            }
        }
    }
    tracing::trace!(triplets = tri.nnz(), "assembled add through sprs");

    let assembled: CsMat<T> = tri.to_csr();
    commit_assembled(a, &assembled, threshold)
}

/// `C ← αA·B + βC`
pub(crate) fn multiply<T: Element>(
    a: &EllpackMatrix<T>,
    b: &EllpackMatrix<T>,
    c: &mut EllpackMatrix<T>,
    alpha: f64,
    beta: f64,
    threshold: f64,
) -> Result<()> {
    let (alpha_t, beta_t) = (T::from_real(alpha), T::from_real(beta));
    let mut tri = TriMat::new((c.n, c.n));
    for i in c.local_rows() {
        if alpha != 0.0 {
            for (k, a_ik) in a.row_iter(i) {
                let scaled = alpha_t * a_ik;
                for (j, b_kj) in b.row_iter(k) {
                    tri.add_triplet(i, j, scaled * b_kj);
                }
            }
        }
        if beta != 0.0 {
            for (j, v) in c.row_iter(i) {
                tri.add_triplet(i, j, beta_t * v);
            }
        }
    }
    tracing::trace!(triplets = tri.nnz(), "assembled multiply through sprs");

    let assembled: CsMat<T> = tri.to_csr();
    commit_assembled(c, &assembled, threshold)
}
