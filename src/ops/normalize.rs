//! # Spectral bounds and normalization
//!
//! Gershgorin's theorem places every eigenvalue of `A` in the union of the
//! discs centred on `A[i,i]` with radius `Σ_{j≠i} |A[i,j]|`. The union of
//! those discs projected on the real axis gives cheap bounds `[emin, emax]`,
//! which [`normalize`] uses to map the spectrum of a Hamiltonian into
//! `[0, 1]` with reversed order.

use crate::domain::Communicator;
use crate::error::{EllError, Result};
use crate::matrix::EllpackMatrix;
use crate::ops::add::add_identity;
use crate::ops::scale::scale_inplace;
use crate::parallel::reduce_rows;
use crate::scalar::Element;

/// Real interval containing every eigenvalue estimate
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpectralBounds {
    /// Lower bound
    pub emin: f64,
    /// Upper bound
    pub emax: f64,
}

impl SpectralBounds {
    /// Bounds of an empty row set: `emin = f64::MAX`, `emax = f64::MIN`
    pub const EMPTY: SpectralBounds = SpectralBounds {
        emin: f64::MAX,
        emax: f64::MIN,
    };

    /// Smallest interval containing both
    pub fn merge(self, other: SpectralBounds) -> SpectralBounds {
        SpectralBounds {
            emin: self.emin.min(other.emin),
            emax: self.emax.max(other.emax),
        }
    }

    /// Whether no row contributed
    pub fn is_empty(&self) -> bool {
        self.emin > self.emax
    }

    /// `emax - emin`
    pub fn width(&self) -> f64 {
        self.emax - self.emin
    }
}

/// Disc of row `i`: the real part of its centre, and its radius
fn row_disc<T: Element>(a: &EllpackMatrix<T>, i: usize) -> (f64, f64) {
    let mut diag = T::zero();
    let mut radius = 0.0;
    for (j, v) in a.row_iter(i) {
        if j == i {
            diag = v;
        } else {
            radius += v.magnitude();
        }
    }
    (diag.real_part(), radius)
}

fn bounds_over<T: Element>(a: &EllpackMatrix<T>, rows: std::ops::Range<usize>) -> SpectralBounds {
    reduce_rows(
        &a.plan,
        rows,
        || SpectralBounds::EMPTY,
        |i| {
            let (centre, radius) = row_disc(a, i);
            SpectralBounds {
                emin: centre - radius,
                emax: centre + radius,
            }
        },
        SpectralBounds::merge,
    )
}

/// Gershgorin bounds over the local rows of `a`
///
/// For a distributed matrix these are this rank's bounds only; see
/// [`gershgorin_global`].
pub fn gershgorin<T: Element>(a: &EllpackMatrix<T>) -> SpectralBounds {
    let range = a.local_rows();
    tracing::debug!(n = a.n, rows = ?range, "gershgorin");
    let bounds = bounds_over(a, range);
    if bounds.is_empty() {
        tracing::warn!("gershgorin over an empty row range");
    }
    bounds
}

/// Gershgorin bounds over all ranks
///
/// Local bounds are combined with the communicator's min/max reductions
/// when the matrix is distributed over more than one rank.
///
/// # Errors
///
/// `DomainMismatch` if `comm` disagrees with the matrix's rank layout.
pub fn gershgorin_global<T, C>(a: &EllpackMatrix<T>, comm: &C) -> Result<SpectralBounds>
where
    T: Element,
    C: Communicator + ?Sized,
{
    let local = gershgorin(a);
    if !a.distribution.is_distributed() || a.plan.n_ranks <= 1 {
        return Ok(local);
    }
    if comm.n_ranks() != a.plan.n_ranks || comm.rank() != a.plan.rank {
        return Err(EllError::domain_mismatch(format!(
            "communicator is rank {} of {}, matrix is rank {} of {}",
            comm.rank(),
            comm.n_ranks(),
            a.plan.rank,
            a.plan.n_ranks
        )));
    }
    Ok(SpectralBounds {
        emin: comm.min_reduce(local.emin),
        emax: comm.max_reduce(local.emax),
    })
}

/// Gershgorin bounds over rows `0..nrows`, regardless of ownership
///
/// # Errors
///
/// `IndexOutOfBounds` if `nrows > N`.
pub fn gershgorin_partial<T: Element>(a: &EllpackMatrix<T>, nrows: usize) -> Result<SpectralBounds> {
    if nrows > a.n {
        return Err(EllError::out_of_bounds(nrows, a.n + 1));
    }
    Ok(bounds_over(a, 0..nrows))
}

/// Absolute row sums of every row
///
/// Off-diagonal magnitudes only, unless `include_diag` is set.
pub fn accumulate_offdiag<T: Element>(a: &EllpackMatrix<T>, include_diag: bool) -> Vec<f64> {
    (0..a.n)
        .map(|i| {
            a.row_iter(i)
                .filter(|&(j, _)| include_diag || j != i)
                .map(|(_, v)| v.magnitude())
                .sum()
        })
        .collect()
}

/// Maps the spectrum in `[emin, emax]` onto `[0, 1]`, reversed
///
/// `A ← (emax·I − A) / (emax − emin)`, applied as a scale by
/// `-1 / (emax - emin)` followed by an identity shift of
/// `emax / (emax - emin)` with a zero threshold.
///
/// # Errors
///
/// - `InvalidArgument` when `emax == emin` or the bounds or factors are not
///   finite
/// - `Capacity` when a full local row has no diagonal entry to shift
///
/// The matrix is unchanged on error.
pub fn normalize<T: Element>(a: &mut EllpackMatrix<T>, emin: f64, emax: f64) -> Result<()> {
    let width = emax - emin;
    let scalar = -1.0 / width;
    let shift = emax / width;
    if !width.is_finite() || width == 0.0 || !scalar.is_finite() || !shift.is_finite() {
        return Err(EllError::invalid(
            "spectral bounds",
            format!("cannot normalize over [{}, {}]", emin, emax),
        ));
    }
    if shift != 0.0 {
        let full = a
            .local_rows()
            .find(|&i| a.nnz[i] == a.m && a.row_iter(i).all(|(j, _)| j != i));
        if let Some(row) = full {
            return Err(EllError::capacity(row, a.m + 1, a.m));
        }
    }
    tracing::debug!(emin, emax, scalar, shift, "normalize");

    scale_inplace(T::from_real(scalar), a)?;
    add_identity(a, shift, 0.0)
}
