//! Conversions between ELLPACK storage and dense layouts
//!
//! The dense forms are pure projections: every stored entry lands at its
//! `(row, col)` position and everything else is zero. Loading a dense
//! buffer applies the threshold rule, so small entries are never stored.

use ndarray::{Array2, ArrayView2};

use crate::error::{EllError, Result};
use crate::matrix::config::{DenseOrder, DistributionMode};
use crate::matrix::EllpackMatrix;
use crate::scalar::{is_above_threshold, Element};

impl<T: Element> EllpackMatrix<T> {
    /// Dense `N × N` copy in the requested order
    pub fn to_dense(&self, order: DenseOrder) -> Vec<T> {
        let n = self.n;
        let mut dense = vec![T::zero(); n * n];
        for i in 0..n {
            for (j, v) in self.row_iter(i) {
                dense[order.offset(i, j, n)] = v;
            }
        }
        dense
    }

    /// Builds an ELLPACK matrix from a dense `N × N` buffer
    ///
    /// Entries failing the threshold rule are not stored.
    ///
    /// # Errors
    ///
    /// `DimensionMismatch` if `data` is not `N × N`; `Capacity` if a row has
    /// more than `m` surviving entries.
    pub fn from_dense(
        n: usize,
        m: usize,
        data: &[T],
        order: DenseOrder,
        threshold: f64,
    ) -> Result<Self> {
        let mut matrix = Self::new(n, m, DistributionMode::Sequential)?;
        matrix.load_dense(data, order, threshold)?;
        Ok(matrix)
    }

    /// Replaces every row with the surviving entries of a dense buffer
    ///
    /// Rows are loaded in order; on `Capacity` the rows before the failing
    /// one already hold their new contents.
    pub fn load_dense(&mut self, data: &[T], order: DenseOrder, threshold: f64) -> Result<()> {
        let n = self.n;
        if data.len() != n * n {
            return Err(EllError::dimension_mismatch(n * n, data.len()));
        }
        let mut staged = Vec::with_capacity(self.m);
        for mut row in self.rows_mut(0..n) {
            let i = row.row();
            staged.clear();
            staged.extend(
                (0..n)
                    .map(|j| (j, data[order.offset(i, j, n)]))
                    .filter(|&(_, v)| is_above_threshold(v, threshold)),
            );
            row.commit(&mut staged)?;
        }
        self.mark_written();
        Ok(())
    }

    /// Dense copy as an `ndarray` matrix
    pub fn to_ndarray(&self) -> Array2<T> {
        let mut dense = Array2::zeros((self.n, self.n));
        for i in 0..self.n {
            for (j, v) in self.row_iter(i) {
                dense[[i, j]] = v;
            }
        }
        dense
    }

    /// Builds an ELLPACK matrix from a square `ndarray` view
    ///
    /// # Errors
    ///
    /// `DimensionMismatch` for a non-square view; `Capacity` as in
    /// [`EllpackMatrix::from_dense`].
    pub fn from_ndarray(view: ArrayView2<'_, T>, m: usize, threshold: f64) -> Result<Self> {
        let (rows, cols) = view.dim();
        if rows != cols {
            return Err(EllError::dimension_mismatch(rows, cols));
        }
        let mut matrix = Self::new(rows, m, DistributionMode::Sequential)?;
        let mut staged = Vec::with_capacity(m);
        for (mut row, dense_row) in matrix.rows_mut(0..rows).into_iter().zip(view.rows()) {
            staged.clear();
            staged.extend(
                dense_row
                    .iter()
                    .copied()
                    .enumerate()
                    .filter(|&(_, v)| is_above_threshold(v, threshold)),
            );
            row.commit(&mut staged)?;
        }
        Ok(matrix)
    }

    /// Returns `Aᵀ`, configured like `A`
    ///
    /// The capacity grows to the largest column count if needed.
    pub fn transpose_new(&self) -> Result<Self> {
        self.transposed_with(|v| v)
    }

    /// Returns the conjugate transpose `Aᴴ` (equal to `Aᵀ` for real types)
    pub fn adjoint_new(&self) -> Result<Self> {
        self.transposed_with(|v| v.conj())
    }

    fn transposed_with(&self, map: impl Fn(T) -> T) -> Result<Self> {
        self.check_full_operand(self)?;
        let mut columns: Vec<Vec<(usize, T)>> = vec![Vec::new(); self.n];
        for i in 0..self.n {
            for (j, v) in self.row_iter(i) {
                columns[j].push((i, map(v)));
            }
        }

        let mut out = self.zeros_like()?;
        let widest = columns.iter().map(Vec::len).max().unwrap_or(0);
        if widest > out.m {
            out.resize_row_capacity(widest)?;
        }
        let n = out.n;
        for (mut row, column) in out.rows_mut(0..n).into_iter().zip(columns.iter_mut()) {
            row.commit(column)?;
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use num_complex::Complex64;

    #[test]
    fn test_dense_orders() {
        let a = EllpackMatrix::<f64>::from_triplets(
            2,
            2,
            &[(0, 1, 3.0), (1, 0, 4.0), (1, 1, 5.0)],
            DistributionMode::Sequential,
        )
        .unwrap();

        assert_eq!(a.to_dense(DenseOrder::RowMajor), vec![0.0, 3.0, 4.0, 5.0]);
        assert_eq!(a.to_dense(DenseOrder::ColumnMajor), vec![0.0, 4.0, 3.0, 5.0]);
    }

    #[test]
    fn test_from_dense_thresholds() {
        let dense = [1.0, 0.01, 0.0, -2.0, 0.5, 0.0, 0.0, 0.0, 0.02];
        let a = EllpackMatrix::<f64>::from_dense(3, 2, &dense, DenseOrder::RowMajor, 0.1).unwrap();

        assert_eq!(a.row_degrees(), &[1, 2, 0]);
        assert_eq!(a.get(1, 0).unwrap(), -2.0);

        let err = EllpackMatrix::<f64>::from_dense(3, 1, &dense, DenseOrder::RowMajor, 0.1)
            .unwrap_err();
        assert!(matches!(err, EllError::Capacity { row: 1, required: 2, capacity: 1 }));

        assert!(matches!(
            EllpackMatrix::<f64>::from_dense(2, 2, &dense, DenseOrder::RowMajor, 0.0),
            Err(EllError::DimensionMismatch { expected: 4, got: 9 })
        ));
    }

    #[test]
    fn test_ndarray_round_trip() {
        let dense = array![[1.0, 0.0, 2.0], [0.0, 3.0, 0.0], [4.0, 0.0, 5.0]];
        let a = EllpackMatrix::<f64>::from_ndarray(dense.view(), 2, 0.0).unwrap();

        assert_eq!(a.nnz_total(), 5);
        assert_eq!(a.to_ndarray(), dense);
        assert!(EllpackMatrix::<f64>::from_ndarray(dense.slice(ndarray::s![..2, ..]), 2, 0.0).is_err());
    }

    #[test]
    fn test_transpose_grows_capacity() {
        let a = EllpackMatrix::<f64>::from_triplets(
            3,
            1,
            &[(0, 2, 1.0), (1, 2, 2.0), (2, 2, 3.0)],
            DistributionMode::Sequential,
        )
        .unwrap();

        let t = a.transpose_new().unwrap();
        assert_eq!(t.m(), 3);
        assert_eq!(t.row(2).unwrap(), (&[0usize, 1, 2][..], &[1.0, 2.0, 3.0][..]));
        assert!(t.check_invariants().is_ok());
    }

    #[test]
    fn test_adjoint_conjugates() {
        let a = EllpackMatrix::<Complex64>::from_triplets(
            2,
            1,
            &[(0, 1, Complex64::new(1.0, 2.0))],
            DistributionMode::Sequential,
        )
        .unwrap();

        let h = a.adjoint_new().unwrap();
        assert_eq!(h.get(1, 0).unwrap(), Complex64::new(1.0, -2.0));
        assert_eq!(a.transpose_new().unwrap().get(1, 0).unwrap(), Complex64::new(1.0, 2.0));
    }
}
