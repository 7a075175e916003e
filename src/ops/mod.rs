//! Arithmetic kernels on ELLPACK/ELLSORT matrices
//!
//! Every kernel updates only the local rows of its output matrix (all rows
//! unless the matrix is distributed), row by row, through the row-parallel
//! driver in [`crate::parallel`]. Operand checks run before any row is
//! written.

pub mod add;
pub mod multiply;
pub mod normalize;
pub mod scale;
pub mod threshold;
mod vendor;

pub use add::{add, add_identity, add_new, add_norm, scale_add_identity};
pub use multiply::{
    multiply, multiply_ab, multiply_adjust_ab, multiply_new, multiply_x2, square_inplace,
};
pub use normalize::{
    accumulate_offdiag, gershgorin, gershgorin_global, gershgorin_partial, normalize,
    SpectralBounds,
};
pub use scale::{scale, scale_inplace, scale_new};
pub use threshold::{threshold, threshold_new};

use crate::matrix::EllpackMatrix;
use crate::scalar::Element;

/// Stored value at `(i, i)`, zero if absent
#[inline]
pub(crate) fn diagonal<T: Element>(a: &EllpackMatrix<T>, i: usize) -> T {
    a.row_iter(i)
        .find(|&(j, _)| j == i)
        .map_or(T::zero(), |(_, v)| v)
}
