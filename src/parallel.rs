//! # Row-parallel execution
//!
//! Every kernel in ellmat is row-local: output row `i` depends only on row `i`
//! of the operands (and, for multiply, on rows of `B` that are read, never
//! written). This module turns that property into parallelism with Rayon.
//!
//! The local row range of the output is split into static contiguous blocks,
//! one per worker. Each block owns disjoint mutable slices of the value,
//! index and count buffers ([`RowsMut`]), so no synchronization is needed
//! while rows are written. Each worker builds its own scratch state once
//! (typically a dense accumulator) and reuses it for every row of its block.
//! Per-row results (traces, row norms) are combined with an associative
//! reduction.

use rayon::prelude::*;
use std::ops::Range;

use crate::constants::MIN_ROWS_PER_BLOCK;
use crate::domain::split_even;
use crate::error::{EllError, Result};
use crate::matrix::config::{Backend, EngineConfig};
use crate::scalar::Element;

/// How kernels on one matrix are executed, fixed when the matrix is created
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ExecutionPlan {
    pub backend: Backend,
    pub n_threads: usize,
    pub rank: usize,
    pub n_ranks: usize,
}

impl ExecutionPlan {
    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            backend: config.backend,
            n_threads: config.system_params.n_threads.max(1),
            rank: config.distribution.rank,
            n_ranks: config.distribution.n_ranks.max(1),
        }
    }

    /// Worker blocks used for `len` rows
    pub fn workers_for(&self, len: usize) -> usize {
        match self.backend {
            Backend::Sequential => 1,
            Backend::CpuParallel | Backend::VendorSparse => {
                self.n_threads.min((len / MIN_ROWS_PER_BLOCK).max(1))
            }
        }
    }
}

/// Mutable view over the storage of one row
pub(crate) struct RowMut<'a, T> {
    row: usize,
    values: &'a mut [T],
    indices: &'a mut [usize],
    nnz: &'a mut usize,
    sorted: bool,
}

impl<'a, T: Element> RowMut<'a, T> {
    /// Global index of this row
    #[inline]
    pub fn row(&self) -> usize {
        self.row
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.values.len()
    }

    #[inline]
    pub fn live_indices(&self) -> &[usize] {
        &self.indices[..*self.nnz]
    }

    #[inline]
    pub fn live_values(&self) -> &[T] {
        &self.values[..*self.nnz]
    }

    /// Multiplies every live value by `factor`
    pub fn scale(&mut self, factor: T) {
        let live = *self.nnz;
        for v in &mut self.values[..live] {
            *v = *v * factor;
        }
    }

    /// Keeps the entries for which `keep` holds, preserving their order
    ///
    /// Returns the number of entries kept.
    pub fn retain(&mut self, mut keep: impl FnMut(usize, T) -> bool) -> usize {
        let live = *self.nnz;
        let mut write = 0;
        for read in 0..live {
            let (col, val) = (self.indices[read], self.values[read]);
            if keep(col, val) {
                self.indices[write] = col;
                self.values[write] = val;
                write += 1;
            }
        }
        *self.nnz = write;
        write
    }

    /// Replaces the row with `staged`
    ///
    /// ELLSORT rows are sorted by column first. The row is left untouched
    /// when `staged` does not fit.
    ///
    /// # Errors
    ///
    /// `Capacity` when `staged` holds more than `M` entries.
    pub fn commit(&mut self, staged: &mut [(usize, T)]) -> Result<()> {
        if staged.len() > self.values.len() {
            return Err(EllError::capacity(self.row, staged.len(), self.values.len()));
        }
        if self.sorted {
            staged.sort_unstable_by_key(|&(col, _)| col);
        }
        for (slot, &(col, val)) in staged.iter().enumerate() {
            self.indices[slot] = col;
            self.values[slot] = val;
        }
        *self.nnz = staged.len();
        Ok(())
    }
}

/// Disjoint mutable views over a contiguous block of rows
pub(crate) struct RowsMut<'a, T> {
    first_row: usize,
    width: usize,
    values: &'a mut [T],
    indices: &'a mut [usize],
    nnz: &'a mut [usize],
    sorted: bool,
}

impl<'a, T: Element> RowsMut<'a, T> {
    pub fn new(
        first_row: usize,
        width: usize,
        values: &'a mut [T],
        indices: &'a mut [usize],
        nnz: &'a mut [usize],
        sorted: bool,
    ) -> Self {
        debug_assert_eq!(values.len(), nnz.len() * width);
        debug_assert_eq!(indices.len(), nnz.len() * width);
        Self {
            first_row,
            width,
            values,
            indices,
            nnz,
            sorted,
        }
    }

    /// Number of rows in the block
    pub fn len(&self) -> usize {
        self.nnz.len()
    }

    /// Splits into rows `[0, mid)` and `[mid, len)` of the block
    pub fn split_at(self, mid: usize) -> (Self, Self) {
        let (v_lo, v_hi) = self.values.split_at_mut(mid * self.width);
        let (i_lo, i_hi) = self.indices.split_at_mut(mid * self.width);
        let (n_lo, n_hi) = self.nnz.split_at_mut(mid);
        (
            Self::new(self.first_row, self.width, v_lo, i_lo, n_lo, self.sorted),
            Self::new(self.first_row + mid, self.width, v_hi, i_hi, n_hi, self.sorted),
        )
    }

    /// Splits into `parts` contiguous near-equal blocks
    pub fn split_blocks(self, parts: usize) -> Vec<Self> {
        let mut blocks = Vec::with_capacity(parts.max(1));
        let mut rest = self;
        for range in split_even(rest.len(), parts) {
            let (block, tail) = rest.split_at(range.len());
            blocks.push(block);
            rest = tail;
        }
        blocks
    }
}

/// Iterator over the rows of a [`RowsMut`]
pub(crate) struct RowsIter<'a, T> {
    next_row: usize,
    width: usize,
    values: &'a mut [T],
    indices: &'a mut [usize],
    nnz: std::slice::IterMut<'a, usize>,
    sorted: bool,
}

impl<'a, T> Iterator for RowsIter<'a, T> {
    type Item = RowMut<'a, T>;

    fn next(&mut self) -> Option<Self::Item> {
        let nnz = self.nnz.next()?;
        let (values, rest) = std::mem::take(&mut self.values).split_at_mut(self.width);
        self.values = rest;
        let (indices, rest) = std::mem::take(&mut self.indices).split_at_mut(self.width);
        self.indices = rest;

        let row = self.next_row;
        self.next_row += 1;
        Some(RowMut {
            row,
            values,
            indices,
            nnz,
            sorted: self.sorted,
        })
    }
}

impl<'a, T> IntoIterator for RowsMut<'a, T> {
    type Item = RowMut<'a, T>;
    type IntoIter = RowsIter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        RowsIter {
            next_row: self.first_row,
            width: self.width,
            values: self.values,
            indices: self.indices,
            nnz: self.nnz.iter_mut(),
            sorted: self.sorted,
        }
    }
}

/// Runs `kernel` on every row of `rows` and reduces the per-row results
///
/// Rows are split into static blocks, one per worker. `init` builds the
/// scratch state of a worker, reused across the rows of its block.
///
/// # Errors
///
/// The first error returned by `kernel`. Rows processed before it keep
/// their new contents; the failing row is left untouched.
pub(crate) fn run_rows<'a, T, S, R, I, ID, K, C>(
    plan: &ExecutionPlan,
    rows: RowsMut<'a, T>,
    init: I,
    identity: ID,
    kernel: K,
    combine: C,
) -> Result<R>
where
    T: Element,
    R: Send,
    I: Fn() -> S + Sync,
    ID: Fn() -> R + Sync + Send,
    K: Fn(&mut S, RowMut<'a, T>) -> Result<R> + Sync,
    C: Fn(R, R) -> R + Sync + Send,
{
    let run_block = |block: RowsMut<'a, T>| -> Result<R> {
        let mut scratch = init();
        let mut acc = identity();
        for row in block {
            acc = combine(acc, kernel(&mut scratch, row)?);
        }
        Ok(acc)
    };

    let workers = plan.workers_for(rows.len());
    if workers <= 1 {
        return run_block(rows);
    }

    tracing::trace!(rows = rows.len(), workers, "dispatching row blocks");
    rows.split_blocks(workers)
        .into_par_iter()
        .map(run_block)
        .try_reduce(&identity, |a, b| Ok(combine(a, b)))
}

/// Read-only counterpart of [`run_rows`] over a row range
pub(crate) fn reduce_rows<R, ID, K, C>(
    plan: &ExecutionPlan,
    range: Range<usize>,
    identity: ID,
    kernel: K,
    combine: C,
) -> R
where
    R: Send,
    ID: Fn() -> R + Sync + Send,
    K: Fn(usize) -> R + Sync + Send,
    C: Fn(R, R) -> R + Sync + Send,
{
    let run_block = |block: Range<usize>| -> R {
        block
            .map(|offset| kernel(range.start + offset))
            .fold(identity(), &combine)
    };

    let workers = plan.workers_for(range.len());
    if workers <= 1 {
        return run_block(0..range.len());
    }
    split_even(range.len(), workers)
        .into_par_iter()
        .map(run_block)
        .reduce(&identity, &combine)
}
