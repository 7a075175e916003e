//! Row accumulators for the add and multiply kernels
//!
//! Both kernels build an output row by summing contributions that may hit
//! the same column several times, then sparsify the result. The accumulator
//! owns the per-worker scratch for that and is reset after each row.

pub mod dense;

pub use dense::DenseAccumulator;

use crate::scalar::Element;

/// Trait for accumulators that merge the contributions to one output row
pub trait Accumulator<T: Element> {
    /// Reset the accumulator to prepare for a new row
    fn reset(&mut self);

    /// Accumulate a single entry (column and value)
    fn accumulate(&mut self, col: usize, val: T);

    /// Number of distinct columns touched since the last reset
    fn touched(&self) -> usize;

    /// Moves the entries passing the threshold rule into `out`, in the order
    /// their columns were first touched, and resets the accumulator
    fn drain_above(&mut self, threshold: f64, out: &mut Vec<(usize, T)>);
}
