//! Fixed-format text rendering of matrix windows
//!
//! Every entry is printed as a blank followed by its fixed-width form,
//! `% 1.3f` for real and `% 1.3f%+1.3fi` for complex values, one matrix row
//! per line. Windows are half-open: rows `i_l..i_u`, columns `j_l..j_u`.

use std::ops::Range;

use crate::constants::DEFAULT_PRINT_WINDOW;
use crate::error::{EllError, Result};
use crate::matrix::config::DenseOrder;
use crate::matrix::EllpackMatrix;
use crate::scalar::Element;

fn check_window(rows: &Range<usize>, cols: &Range<usize>, n: usize) -> Result<()> {
    if rows.end > n {
        return Err(EllError::out_of_bounds(rows.end, n + 1));
    }
    if cols.end > n {
        return Err(EllError::out_of_bounds(cols.end, n + 1));
    }
    Ok(())
}

fn push_row<T: Element>(out: &mut String, row: impl Iterator<Item = T>) {
    for v in row {
        out.push(' ');
        out.push_str(&v.format_entry());
    }
    out.push('\n');
}

/// Renders `v[i_l..i_u]` on a single line
pub fn format_dense_vector<T: Element>(v: &[T], i_l: usize, i_u: usize) -> Result<String> {
    if i_u > v.len() {
        return Err(EllError::out_of_bounds(i_u, v.len() + 1));
    }
    let mut out = String::new();
    push_row(&mut out, v.get(i_l..i_u).unwrap_or(&[]).iter().copied());
    Ok(out)
}

/// Renders a window of a dense `n × n` buffer stored in `order`
///
/// # Errors
///
/// - `DimensionMismatch` if `buffer` does not hold `n × n` values
/// - `IndexOutOfBounds` if an upper bound exceeds `n`
pub fn format_dense<T: Element>(
    buffer: &[T],
    n: usize,
    order: DenseOrder,
    i_l: usize,
    i_u: usize,
    j_l: usize,
    j_u: usize,
) -> Result<String> {
    let expected = n.saturating_mul(n);
    if buffer.len() != expected {
        return Err(EllError::dimension_mismatch(expected, buffer.len()));
    }
    let (rows, cols) = (i_l..i_u, j_l..j_u);
    check_window(&rows, &cols, n)?;

    let mut out = String::new();
    for i in rows {
        push_row(
            &mut out,
            cols.clone().map(|j| match order {
                DenseOrder::RowMajor => buffer[i * n + j],
                DenseOrder::ColumnMajor => buffer[j * n + i],
            }),
        );
    }
    Ok(out)
}

/// Prints [`format_dense`] to stdout
pub fn print_dense<T: Element>(
    buffer: &[T],
    n: usize,
    order: DenseOrder,
    i_l: usize,
    i_u: usize,
    j_l: usize,
    j_u: usize,
) -> Result<()> {
    print!("{}", format_dense(buffer, n, order, i_l, i_u, j_l, j_u)?);
    Ok(())
}

impl<T: Element> EllpackMatrix<T> {
    /// Renders the window rows `i_l..i_u`, columns `j_l..j_u` as dense text
    ///
    /// # Errors
    ///
    /// `IndexOutOfBounds` if an upper bound exceeds `N`.
    pub fn format_window(&self, i_l: usize, i_u: usize, j_l: usize, j_u: usize) -> Result<String> {
        let (rows, cols) = (i_l..i_u, j_l..j_u);
        check_window(&rows, &cols, self.n)?;
        tracing::debug!(?rows, ?cols, "printing matrix window");

        let mut out = String::new();
        let mut dense_row = vec![T::zero(); cols.len()];
        for i in rows {
            dense_row.iter_mut().for_each(|v| *v = T::zero());
            for (j, v) in self.row_iter(i) {
                if cols.contains(&j) {
                    dense_row[j - cols.start] = v;
                }
            }
            push_row(&mut out, dense_row.iter().copied());
        }
        Ok(out)
    }

    /// Prints [`EllpackMatrix::format_window`] to stdout
    pub fn print_window(&self, i_l: usize, i_u: usize, j_l: usize, j_u: usize) -> Result<()> {
        print!("{}", self.format_window(i_l, i_u, j_l, j_u)?);
        Ok(())
    }

    /// Prints the leading window of at most 10 × 10 entries to stdout
    pub fn print_leading(&self) -> Result<()> {
        let k = self.n.min(DEFAULT_PRINT_WINDOW);
        self.print_window(0, k, 0, k)
    }
}
