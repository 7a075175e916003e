//! Utilities for converting between ELLPACK storage and sprs

use sprs::CsMat;

use crate::error::{EllError, Result};
use crate::matrix::config::DistributionMode;
use crate::matrix::EllpackMatrix;
use crate::scalar::Element;

/// Converts an ELLPACK matrix to sprs CsMat format (CSR, columns sorted)
pub fn to_sprs_csr<T: Element>(matrix: &EllpackMatrix<T>) -> CsMat<T> {
    let n = matrix.n();
    let mut indptr = Vec::with_capacity(n + 1);
    let mut indices = Vec::with_capacity(matrix.nnz_total());
    let mut data = Vec::with_capacity(matrix.nnz_total());
    let mut row: Vec<(usize, T)> = Vec::with_capacity(matrix.m());

    indptr.push(0);
    for i in 0..n {
        row.clear();
        row.extend(matrix.row_iter(i));
        row.sort_unstable_by_key(|&(col, _)| col);
        for &(col, val) in &row {
            indices.push(col);
            data.push(val);
        }
        indptr.push(indices.len());
    }

    CsMat::new((n, n), indptr, indices, data)
}

/// Converts sprs CsMat to an ELLPACK matrix with row capacity `m`
///
/// Explicitly stored zeros are dropped.
///
/// # Errors
///
/// `DimensionMismatch` for a non-square matrix; `Capacity` if a row has
/// more than `m` nonzeros.
pub fn from_sprs_csr<T: Element>(matrix: CsMat<T>, m: usize) -> Result<EllpackMatrix<T>> {
    // Ensure matrix is in CSR format
    let matrix = if matrix.is_csr() {
        matrix
    } else {
        matrix.to_csr()
    };

    let (rows, cols) = matrix.shape();
    if rows != cols {
        return Err(EllError::dimension_mismatch(rows, cols));
    }

    let mut out = EllpackMatrix::new(rows, m, DistributionMode::Sequential)?;
    let mut staged = Vec::with_capacity(m);
    for (mut row, vec) in out.rows_mut(0..rows).into_iter().zip(matrix.outer_iterator()) {
        staged.clear();
        staged.extend(
            vec.iter()
                .map(|(col, &val)| (col, val))
                .filter(|(_, val)| !val.is_zero()),
        );
        row.commit(&mut staged)?;
    }
    Ok(out)
}
