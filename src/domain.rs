//! # Row-wise domain decomposition
//!
//! A [`Domain`] splits the rows `[0, N)` of a matrix into contiguous half-open
//! ranges, one per worker. The same partitioning serves two levels:
//!
//! 1. **Ranks**: a distributed matrix only updates the rows of the local
//!    rank's range. Rows owned elsewhere are brought in by an injected
//!    [`RowExchange`], and cross-rank reductions go through an injected
//!    [`Communicator`]. The matrix itself holds no transport state.
//! 2. **Threads**: within a rank, the local range is partitioned again into
//!    static blocks, one per worker thread (see `parallel.rs`).
//!
//! Writes only ever touch rows of the writer's own range, so kernels need no
//! locks. Reads of other rows (multiply's `B` operand) require those rows to
//! be current, which [`synchronize`] establishes.

use std::ops::Range;

use crate::error::{EllError, Result};
use crate::matrix::EllpackMatrix;
use crate::scalar::Element;
use crate::utils::exclusive_scan;

/// Contiguous row ownership for a set of workers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Domain {
    n_rows: usize,
    ranges: Vec<Range<usize>>,
}

/// Splits `len` items into `parts` contiguous near-equal ranges; the first
/// `len % parts` ranges get one extra item
pub(crate) fn split_even(len: usize, parts: usize) -> Vec<Range<usize>> {
    let parts = parts.max(1);
    let base = len / parts;
    let remainder = len % parts;
    let mut ranges = Vec::with_capacity(parts);
    let mut start = 0;
    for w in 0..parts {
        let size = base + usize::from(w < remainder);
        ranges.push(start..start + size);
        start += size;
    }
    ranges
}

impl Domain {
    /// Splits `n_rows` rows into `n_workers` contiguous near-equal ranges
    ///
    /// Remainder rows go to the first ranges, so range sizes differ by at most one.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` if `n_workers` is zero.
    pub fn partition(n_rows: usize, n_workers: usize) -> Result<Self> {
        if n_workers == 0 {
            return Err(EllError::invalid("n_workers", "must be at least 1"));
        }
        Ok(Self {
            n_rows,
            ranges: split_even(n_rows, n_workers),
        })
    }

    /// Splits rows into contiguous ranges of near-equal total weight
    ///
    /// Used to rebalance ownership by row degree. Falls back to
    /// [`Domain::partition`] when every weight is zero.
    pub fn balanced(weights: &[usize], n_workers: usize) -> Result<Self> {
        if n_workers == 0 {
            return Err(EllError::invalid("n_workers", "must be at least 1"));
        }
        let n_rows = weights.len();
        let prefix = exclusive_scan(weights);
        let total = prefix[n_rows];
        if total == 0 {
            return Self::partition(n_rows, n_workers);
        }

        let mut ranges = Vec::with_capacity(n_workers);
        let mut start = 0;
        for w in 0..n_workers {
            let end = if w + 1 == n_workers {
                n_rows
            } else {
                let target = (total as u128 * (w as u128 + 1) / n_workers as u128) as usize;
                prefix.partition_point(|&p| p < target).clamp(start, n_rows)
            };
            ranges.push(start..end);
            start = end;
        }
        Ok(Self { n_rows, ranges })
    }

    /// Number of rows covered
    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    /// Number of workers
    pub fn n_workers(&self) -> usize {
        self.ranges.len()
    }

    /// Half-open row range owned by `worker`
    pub fn range(&self, worker: usize) -> Result<Range<usize>> {
        self.ranges
            .get(worker)
            .cloned()
            .ok_or_else(|| EllError::out_of_bounds(worker, self.ranges.len()))
    }

    /// First row owned by `worker`
    pub fn local_row_min(&self, worker: usize) -> Result<usize> {
        Ok(self.range(worker)?.start)
    }

    /// One past the last row owned by `worker`
    pub fn local_row_max(&self, worker: usize) -> Result<usize> {
        Ok(self.range(worker)?.end)
    }

    /// All ranges, in worker order
    pub fn ranges(&self) -> &[Range<usize>] {
        &self.ranges
    }

    /// Worker owning `row`
    ///
    /// Empty ranges never own anything; the owner is the unique worker whose
    /// range contains the row.
    pub fn owner_of(&self, row: usize) -> Result<usize> {
        if row >= self.n_rows {
            return Err(EllError::out_of_bounds(row, self.n_rows));
        }
        Ok(self.ranges.partition_point(|r| r.end <= row))
    }

    /// Whether two domains assign identical rows to identical workers
    pub fn is_compatible(&self, other: &Domain) -> bool {
        self == other
    }

    /// Checks that the ranges partition `[0, n_rows)` in order without gaps or overlaps
    pub fn validate(&self) -> Result<()> {
        let mut expected_start = 0;
        for (worker, range) in self.ranges.iter().enumerate() {
            if range.start != expected_start || range.start > range.end {
                return Err(EllError::invalid(
                    "domain",
                    format!("range {:?} of worker {} breaks the partition", range, worker),
                ));
            }
            expected_start = range.end;
        }
        if expected_start != self.n_rows || self.ranges.is_empty() {
            return Err(EllError::invalid(
                "domain",
                format!("ranges cover {} of {} rows", expected_start, self.n_rows),
            ));
        }
        Ok(())
    }
}

/// Cross-rank reductions and synchronization
///
/// Implemented by the transport layer of a distributed run (MPI or similar).
/// Reductions must be associative and commutative; results may differ in
/// the last bits across rank counts.
pub trait Communicator: Send + Sync {
    /// Rank of this process
    fn rank(&self) -> usize;

    /// Number of ranks
    fn n_ranks(&self) -> usize;

    /// Blocks until every rank reaches the barrier
    fn barrier(&self);

    /// Global minimum
    fn min_reduce(&self, local: f64) -> f64;

    /// Global maximum
    fn max_reduce(&self, local: f64) -> f64;

    /// Global sum
    fn sum_reduce(&self, local: f64) -> f64;
}

/// Single-rank communicator; every reduction is the identity
#[derive(Debug, Default, Clone, Copy)]
pub struct SerialCommunicator;

impl Communicator for SerialCommunicator {
    fn rank(&self) -> usize {
        0
    }

    fn n_ranks(&self) -> usize {
        1
    }

    fn barrier(&self) {}

    fn min_reduce(&self, local: f64) -> f64 {
        local
    }

    fn max_reduce(&self, local: f64) -> f64 {
        local
    }

    fn sum_reduce(&self, local: f64) -> f64 {
        local
    }
}

/// Brings rows owned by other ranks up to date in the local copy
///
/// Implementations typically gather each rank's owned block and write it
/// with [`EllpackMatrix::copy_rows_from`].
pub trait RowExchange<T: Element> {
    /// Overwrites every non-owned row of `matrix` with its owner's data
    fn exchange(&self, matrix: &mut EllpackMatrix<T>) -> Result<()>;
}

/// Exchange for runs where every rank already holds all rows
#[derive(Debug, Default, Clone, Copy)]
pub struct NoExchange;

impl<T: Element> RowExchange<T> for NoExchange {
    fn exchange(&self, _matrix: &mut EllpackMatrix<T>) -> Result<()> {
        Ok(())
    }
}

/// Runs `exchange` on a distributed matrix and marks all of its rows current
///
/// This is the barrier between producing a matrix and reading rows of it
/// outside the local range (as multiply does with `B`).
pub fn synchronize<T, X>(matrix: &mut EllpackMatrix<T>, exchange: &X) -> Result<()>
where
    T: Element,
    X: RowExchange<T> + ?Sized,
{
    if matrix.distribution.is_distributed() {
        exchange.exchange(matrix)?;
        tracing::debug!(rank = matrix.plan.rank, "rows synchronized");
    }
    matrix.rows_current = true;
    Ok(())
}

impl<T: Element> EllpackMatrix<T> {
    /// Active row ownership
    pub fn domain(&self) -> &Domain {
        &self.domain
    }

    /// Ownership staged by [`EllpackMatrix::stage_domain`], if any
    pub fn staged_domain(&self) -> Option<&Domain> {
        self.domain2.as_ref()
    }

    /// Rank this matrix's process plays in its domain
    pub fn local_rank(&self) -> usize {
        self.plan.rank
    }

    /// Rows updated by kernels on this process
    ///
    /// All rows unless the matrix is distributed, in which case only the
    /// local rank's range.
    pub fn local_rows(&self) -> Range<usize> {
        if self.distribution.is_distributed() {
            self.domain.ranges()[self.plan.rank.min(self.domain.n_workers() - 1)].clone()
        } else {
            0..self.n
        }
    }

    /// Whether every row (not just the local ones) holds current data
    pub fn is_rows_current(&self) -> bool {
        self.rows_current
    }

    /// Stages a new ownership while the active one keeps describing the
    /// current data, e.g. while an exchange for the new layout is in flight
    pub fn stage_domain(&mut self, domain: Domain) -> Result<()> {
        domain.validate()?;
        if domain.n_rows() != self.n {
            return Err(EllError::dimension_mismatch(self.n, domain.n_rows()));
        }
        if domain.n_workers() != self.plan.n_ranks {
            return Err(EllError::domain_mismatch(format!(
                "staged domain has {} workers for {} ranks",
                domain.n_workers(),
                self.plan.n_ranks
            )));
        }
        self.domain2 = Some(domain);
        Ok(())
    }

    /// Stages a domain balanced by current row degrees
    pub fn stage_balanced_domain(&mut self) -> Result<()> {
        let domain = Domain::balanced(&self.nnz, self.plan.n_ranks)?;
        self.stage_domain(domain)
    }

    /// Promotes the staged domain to active
    ///
    /// Ownership of a distributed matrix changes, so its rows are no longer
    /// considered current until the next [`synchronize`].
    pub fn commit_staged_domain(&mut self) -> Result<()> {
        let staged = self
            .domain2
            .take()
            .ok_or_else(|| EllError::invalid("domain", "no staged domain to commit"))?;
        if staged != self.domain {
            self.domain = staged;
            self.mark_written();
        }
        Ok(())
    }

    /// Overwrites rows `range` of `self` with the same rows of `other`
    ///
    /// `self` keeps its capacity and layout; ELLSORT destinations are sorted.
    ///
    /// # Errors
    ///
    /// `DimensionMismatch` for different `N`, `Capacity` if a source row does
    /// not fit (rows before it are already copied).
    pub fn copy_rows_from(&mut self, other: &EllpackMatrix<T>, range: Range<usize>) -> Result<()> {
        if other.n != self.n {
            return Err(EllError::dimension_mismatch(self.n, other.n));
        }
        if range.end > self.n || range.start > range.end {
            return Err(EllError::out_of_bounds(range.end, self.n));
        }
        let mut staged = Vec::with_capacity(other.m);
        for (offset, mut row) in self.rows_mut(range.clone()).into_iter().enumerate() {
            let (cols, vals) = other.row_slices(range.start + offset);
            staged.clear();
            staged.extend(cols.iter().copied().zip(vals.iter().copied()));
            row.commit(&mut staged)?;
        }
        self.mark_written();
        Ok(())
    }

    /// Rejects `operand` unless it holds current data for every local row of `self`
    pub(crate) fn check_row_operand(&self, operand: &EllpackMatrix<T>) -> Result<()> {
        if operand.n != self.n {
            return Err(EllError::dimension_mismatch(self.n, operand.n));
        }
        if operand.rows_current || !operand.distribution.is_distributed() {
            return Ok(());
        }
        if !self.distribution.is_distributed() {
            return Err(EllError::domain_mismatch(
                "replicated target needs every row of a distributed operand; synchronize it first",
            ));
        }
        if !self.domain.is_compatible(&operand.domain) || self.plan.rank != operand.plan.rank {
            return Err(EllError::domain_mismatch(format!(
                "operand rows {:?} do not cover target rows {:?}",
                operand.local_rows(),
                self.local_rows()
            )));
        }
        Ok(())
    }

    /// Rejects `operand` unless every one of its rows is current
    pub(crate) fn check_full_operand(&self, operand: &EllpackMatrix<T>) -> Result<()> {
        if operand.n != self.n {
            return Err(EllError::dimension_mismatch(self.n, operand.n));
        }
        if !operand.rows_current {
            return Err(EllError::domain_mismatch(
                "operand has stale rows outside its local range; synchronize it first",
            ));
        }
        Ok(())
    }
}
