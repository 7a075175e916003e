//! Dense accumulator implementation
//!
//! A scratch array over the full column range, plus a list of the columns
//! touched in the current row. Accumulation is O(1) per contribution and
//! reset is O(row degree), so a worker can reuse one accumulator for every
//! row of its block.

use crate::accumulator::Accumulator;
use crate::scalar::{is_above_threshold, Element};

/// Dense accumulator for a single output row
pub struct DenseAccumulator<T> {
    /// The dense accumulation array
    values: Vec<T>,

    /// Flags to track which positions in the dense array are in use
    occupied: Vec<bool>,

    /// Touched columns, in first-encounter order
    col_indices: Vec<usize>,

    /// Second dense array for the residual of the norm variant; empty unless
    /// created with [`DenseAccumulator::with_residual`]
    residual: Vec<T>,
}

impl<T: Element> DenseAccumulator<T> {
    /// Create a new dense accumulator with specified column capacity
    ///
    /// # Arguments
    ///
    /// * `n_cols` - The number of columns in the output matrix
    pub fn new(n_cols: usize) -> Self {
        Self {
            values: vec![T::zero(); n_cols],
            occupied: vec![false; n_cols],
            col_indices: Vec::new(),
            residual: Vec::new(),
        }
    }

    /// Create an accumulator that also tracks a per-column residual
    pub fn with_residual(n_cols: usize) -> Self {
        Self {
            residual: vec![T::zero(); n_cols],
            ..Self::new(n_cols)
        }
    }

    /// Reset the accumulator for reuse without reallocating memory
    pub fn reset(&mut self) {
        let track_residual = !self.residual.is_empty();
        for &col in &self.col_indices {
            self.occupied[col] = false;
            self.values[col] = T::zero();
            if track_residual {
                self.residual[col] = T::zero();
            }
        }
        self.col_indices.clear();
    }

    #[inline]
    fn touch(&mut self, col: usize) {
        if !self.occupied[col] {
            self.occupied[col] = true;
            self.col_indices.push(col);
        }
    }

    /// Accumulate a single entry (column and value)
    ///
    /// # Arguments
    ///
    /// * `col` - The column index
    /// * `val` - The value to accumulate
    #[inline]
    pub fn accumulate(&mut self, col: usize, val: T) {
        self.touch(col);
        self.values[col] += val;
    }

    /// Accumulate `val` and `residual` at the same column
    ///
    /// # Panics
    ///
    /// Panics if the accumulator was not created with
    /// [`DenseAccumulator::with_residual`].
    #[inline]
    pub fn accumulate_with_residual(&mut self, col: usize, val: T, residual: T) {
        self.touch(col);
        self.values[col] += val;
        self.residual[col] += residual;
    }

    /// Accumulated value at `col`, if touched
    #[inline]
    pub fn value_at(&self, col: usize) -> Option<T> {
        self.occupied[col].then(|| self.values[col])
    }

    /// Number of distinct columns touched since the last reset
    pub fn touched(&self) -> usize {
        self.col_indices.len()
    }

    /// Touched `(column, value)` pairs in first-encounter order
    pub fn entries(&self) -> impl Iterator<Item = (usize, T)> + '_ {
        self.col_indices.iter().map(move |&col| (col, self.values[col]))
    }

    /// Moves the entries passing the threshold rule into `out` (cleared
    /// first), in first-encounter order, then resets
    pub fn drain_above(&mut self, threshold: f64, out: &mut Vec<(usize, T)>) {
        out.clear();
        out.extend(
            self.entries()
                .filter(|&(_, val)| is_above_threshold(val, threshold)),
        );
        self.reset();
    }

    /// Like [`DenseAccumulator::drain_above`], additionally returning the sum
    /// of `re(r * r)` over every touched column's residual `r`, survivors or not
    pub fn drain_with_residual(&mut self, threshold: f64, out: &mut Vec<(usize, T)>) -> f64 {
        let norm: f64 = self
            .col_indices
            .iter()
            .map(|&col| {
                let r = self.residual[col];
                (r * r).real_part()
            })
            .sum();
        self.drain_above(threshold, out);
        norm
    }
}

impl<T: Element> Accumulator<T> for DenseAccumulator<T> {
    fn reset(&mut self) {
        DenseAccumulator::reset(self)
    }

    fn accumulate(&mut self, col: usize, val: T) {
        DenseAccumulator::accumulate(self, col, val)
    }

    fn touched(&self) -> usize {
        DenseAccumulator::touched(self)
    }

    fn drain_above(&mut self, threshold: f64, out: &mut Vec<(usize, T)>) {
        DenseAccumulator::drain_above(self, threshold, out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_complex::Complex64;

    #[test]
    fn test_dense_accumulator_empty() {
        let mut accumulator = DenseAccumulator::<f64>::new(5);
        let mut out = vec![(9, 9.0)];

        accumulator.drain_above(0.0, &mut out);

        assert!(out.is_empty());
    }

    #[test]
    fn test_first_encounter_order() {
        let mut accumulator = DenseAccumulator::<f64>::new(5);

        accumulator.accumulate(3, 4.0);
        accumulator.accumulate(1, 2.0);
        accumulator.accumulate(3, 1.0);
        accumulator.accumulate(0, 1.0);

        let mut out = Vec::new();
        accumulator.drain_above(0.0, &mut out);

        // Columns come back in the order they were first seen, not sorted
        assert_eq!(out, vec![(3, 5.0), (1, 2.0), (0, 1.0)]);
    }

    #[test]
    fn test_threshold_drops_small_and_cancelled() {
        let mut accumulator = DenseAccumulator::<f64>::new(4);

        accumulator.accumulate(0, 1.0);
        accumulator.accumulate(0, -1.0);
        accumulator.accumulate(1, 0.5);
        accumulator.accumulate(2, 0.25);

        let mut out = Vec::new();
        accumulator.drain_above(0.25, &mut out);
        assert_eq!(out, vec![(1, 0.5)]);

        // Negative threshold keeps everything but exact zeros
        accumulator.accumulate(0, 1.0);
        accumulator.accumulate(0, -1.0);
        accumulator.accumulate(3, 1e-20);
        accumulator.drain_above(-1.0, &mut out);
        assert_eq!(out, vec![(3, 1e-20)]);
    }

    #[test]
    fn test_reset_clears_scratch() {
        let mut accumulator = DenseAccumulator::<f64>::new(5);

        accumulator.accumulate(1, 2.0);
        accumulator.accumulate(3, 4.0);
        accumulator.reset();
        assert_eq!(accumulator.touched(), 0);
        assert_eq!(accumulator.value_at(1), None);

        accumulator.accumulate(1, 1.0);
        assert_eq!(accumulator.value_at(1), Some(1.0));
    }

    #[test]
    fn test_residual_counts_every_touched_column() {
        let mut accumulator = DenseAccumulator::<f64>::with_residual(4);

        accumulator.accumulate_with_residual(0, 2.0, 2.0);
        accumulator.accumulate_with_residual(2, 0.1, 0.1);
        accumulator.accumulate_with_residual(2, 0.0, -3.0);

        let mut out = Vec::new();
        let norm = accumulator.drain_with_residual(1.0, &mut out);

        assert_eq!(out, vec![(0, 2.0)]);
        // 2^2 + (0.1 - 3)^2, the dropped column included
        assert!((norm - (4.0 + 2.9 * 2.9)).abs() < 1e-12);
        assert_eq!(accumulator.touched(), 0);
    }

    #[test]
    fn test_behind_trait_object() {
        let mut accumulator: Box<dyn Accumulator<f64>> = Box::new(DenseAccumulator::new(3));

        accumulator.accumulate(2, 1.5);
        accumulator.accumulate(0, -0.5);
        assert_eq!(accumulator.touched(), 2);

        let mut out = Vec::new();
        accumulator.drain_above(1.0, &mut out);
        assert_eq!(out, vec![(2, 1.5)]);
        assert_eq!(accumulator.touched(), 0);
    }

    #[test]
    fn test_complex_residual_uses_real_part_of_square() {
        let mut accumulator = DenseAccumulator::<Complex64>::with_residual(2);
        let y = Complex64::new(1.0, 2.0);

        accumulator.accumulate_with_residual(1, y, y);
        let mut out = Vec::new();
        let norm = accumulator.drain_with_residual(0.0, &mut out);

        // re((1 + 2i)^2) = 1 - 4
        assert!((norm + 3.0).abs() < 1e-12);
    }
}
