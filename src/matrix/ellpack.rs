//! ELLPACK / ELLSORT fixed-width row storage
//!
//! The layout stores up to `M` entries for each of the `N` rows in two
//! parallel row-major buffers of shape `N × M`:
//! - `value[i * M + j]`: value of the j-th live entry of row i
//! - `index[i * M + j]`: its column
//! - `nnz[i]`: how many of the first slots of row i are live
//!
//! Slots past `nnz[i]` are stale and never read. ELLSORT is the same layout
//! with every row kept in ascending column order.

use aligned_vec::{AVec, ConstAlign};
use std::fmt;
use std::ops::Range;

use crate::constants::STORAGE_ALIGN;
use crate::domain::Domain;
use crate::error::{EllError, Result};
use crate::matrix::config::{Backend, DistributionMode, EngineConfig, MatrixKind, Precision};
use crate::parallel::{ExecutionPlan, RowsMut};
use crate::scalar::Element;

/// A square sparse matrix with a fixed per-row entry capacity
#[derive(Clone)]
pub struct EllpackMatrix<T> {
    /// Number of rows and columns
    pub(crate) n: usize,

    /// Per-row capacity
    pub(crate) m: usize,

    /// `Ellpack` or `Ellsort`
    pub(crate) kind: MatrixKind,

    pub(crate) distribution: DistributionMode,

    /// Values, `N × M` row-major
    pub(crate) value: Storage<T>,

    /// Column indices, `N × M` row-major
    pub(crate) index: Storage<usize>,

    /// Live entries per row
    pub(crate) nnz: Vec<usize>,

    /// Active row ownership
    pub(crate) domain: Domain,

    /// Ownership staged for an in-flight redistribution
    pub(crate) domain2: Option<Domain>,

    pub(crate) plan: ExecutionPlan,

    /// Whether rows owned by other ranks hold current data.
    /// Always true for non-distributed matrices.
    pub(crate) rows_current: bool,
}

/// Cache-line aligned backing buffer
pub(crate) type Storage<E> = AVec<E, ConstAlign<STORAGE_ALIGN>>;

/// Allocates an aligned buffer of `len` copies of `fill`
pub(crate) fn alloc_buffer<E: Copy>(len: usize, fill: E) -> Result<Storage<E>> {
    let failed = |bytes: usize| EllError::Allocation { bytes }.logged();
    let bytes = len
        .checked_mul(std::mem::size_of::<E>())
        .filter(|&b| b <= isize::MAX as usize - STORAGE_ALIGN)
        .ok_or_else(|| failed(usize::MAX))?;
    // AVec aborts when the allocator refuses, so the request is tried fallibly first
    Vec::<E>::new()
        .try_reserve_exact(len)
        .map_err(|_| failed(bytes))?;
    tracing::trace!(bytes, "allocating storage buffer");
    Ok(AVec::from_iter(STORAGE_ALIGN, std::iter::repeat(fill).take(len)))
}

fn alloc_counts(n: usize) -> Result<Vec<usize>> {
    let mut nnz = Vec::new();
    nnz.try_reserve_exact(n).map_err(|_| {
        EllError::Allocation {
            bytes: n.saturating_mul(std::mem::size_of::<usize>()),
        }
        .logged()
    })?;
    nnz.resize(n, 0);
    Ok(nnz)
}

impl<T: Element> EllpackMatrix<T> {
    /// Creates an empty ELLPACK matrix with the default engine configuration
    ///
    /// # Arguments
    ///
    /// * `n` - Number of rows and columns
    /// * `m` - Maximum number of stored entries per row
    /// * `distribution` - How rows are shared between ranks
    pub fn new(n: usize, m: usize, distribution: DistributionMode) -> Result<Self> {
        Self::with_config(MatrixKind::Ellpack, n, m, distribution, &EngineConfig::default())
    }

    /// Creates an empty ELLSORT matrix with the default engine configuration
    pub fn new_sorted(n: usize, m: usize, distribution: DistributionMode) -> Result<Self> {
        Self::with_config(MatrixKind::Ellsort, n, m, distribution, &EngineConfig::default())
    }

    /// Creates an empty matrix of the given kind
    ///
    /// The backend, worker count and rank layout are taken from `config` and
    /// stay fixed for the lifetime of the matrix.
    ///
    /// # Errors
    ///
    /// - `UnsupportedKind` for `MatrixKind::Dense`, which lives in another backend
    /// - `Allocation` if `N × M` buffers cannot be allocated
    /// - `InvalidArgument` for an inconsistent config
    pub fn with_config(
        kind: MatrixKind,
        n: usize,
        m: usize,
        distribution: DistributionMode,
        config: &EngineConfig,
    ) -> Result<Self> {
        if kind == MatrixKind::Dense {
            return Err(EllError::unsupported("matrix type", "dense"));
        }
        config.validate()?;

        let len = n
            .checked_mul(m)
            .ok_or_else(|| EllError::Allocation { bytes: usize::MAX }.logged())?;
        let value = alloc_buffer(len, T::zero())?;
        let index = alloc_buffer(len, 0usize)?;
        let nnz = alloc_counts(n)?;

        let plan = ExecutionPlan::from_config(config);
        let domain = Domain::partition(n, plan.n_ranks)?;

        tracing::debug!(
            n,
            m,
            ?kind,
            precision = ?T::PRECISION,
            ?distribution,
            backend = ?plan.backend,
            "allocated matrix"
        );

        Ok(Self {
            n,
            m,
            kind,
            distribution,
            value,
            index,
            nnz,
            domain,
            domain2: None,
            plan,
            rows_current: true,
        })
    }

    /// Creates an empty matrix with the same shape, kind and configuration
    pub fn zeros_like(&self) -> Result<Self> {
        let len = self.n * self.m;
        Ok(Self {
            n: self.n,
            m: self.m,
            kind: self.kind,
            distribution: self.distribution,
            value: alloc_buffer(len, T::zero())?,
            index: alloc_buffer(len, 0usize)?,
            nnz: alloc_counts(self.n)?,
            domain: self.domain.clone(),
            domain2: None,
            plan: self.plan,
            rows_current: true,
        })
    }

    /// Creates an identity matrix
    pub fn identity(n: usize, m: usize, distribution: DistributionMode) -> Result<Self> {
        let mut matrix = Self::new(n, m, distribution)?;
        for i in 0..n {
            matrix.set(i, i, T::one())?;
        }
        Ok(matrix)
    }

    /// Builds a matrix from `(row, col, value)` triplets; later triplets
    /// overwrite earlier ones at the same position
    pub fn from_triplets(
        n: usize,
        m: usize,
        triplets: &[(usize, usize, T)],
        distribution: DistributionMode,
    ) -> Result<Self> {
        let mut matrix = Self::new(n, m, distribution)?;
        for &(i, j, v) in triplets {
            matrix.set(i, j, v)?;
        }
        Ok(matrix)
    }

    /// All live entries as `(row, col, value)`, rows ascending
    pub fn triplets(&self) -> Vec<(usize, usize, T)> {
        let mut out = Vec::with_capacity(self.nnz_total());
        for i in 0..self.n {
            out.extend(self.row_iter(i).map(|(j, v)| (i, j, v)));
        }
        out
    }

    /// Number of rows (and columns)
    pub fn n(&self) -> usize {
        self.n
    }

    /// Per-row capacity
    pub fn m(&self) -> usize {
        self.m
    }

    /// Storage family
    pub fn kind(&self) -> MatrixKind {
        self.kind
    }

    /// Numeric precision
    pub fn precision(&self) -> Precision {
        T::PRECISION
    }

    /// Distribution mode
    pub fn distribution(&self) -> DistributionMode {
        self.distribution
    }

    /// Backend selected at creation
    pub fn backend(&self) -> Backend {
        self.plan.backend
    }

    /// Whether rows are kept in ascending column order
    pub fn is_sorted_layout(&self) -> bool {
        self.kind.is_sorted()
    }

    /// Live entries per row
    pub fn row_degrees(&self) -> &[usize] {
        &self.nnz
    }

    /// Number of live entries in row `i`
    pub fn row_nonzeros(&self, i: usize) -> Result<usize> {
        self.check_row(i)?;
        Ok(self.nnz[i])
    }

    /// Total number of live entries
    pub fn nnz_total(&self) -> usize {
        self.nnz.iter().sum()
    }

    /// Largest row degree, zero for an empty matrix
    pub fn max_row_occupancy(&self) -> usize {
        self.nnz.iter().copied().max().unwrap_or(0)
    }

    /// Live `(columns, values)` of row `i`
    pub fn row(&self, i: usize) -> Result<(&[usize], &[T])> {
        self.check_row(i)?;
        Ok(self.row_slices(i))
    }

    /// Returns an iterator over the live `(column, value)` pairs of row `i`
    ///
    /// # Panics
    ///
    /// Panics if `i` is out of bounds; use [`EllpackMatrix::row`] for a
    /// checked variant.
    pub fn row_iter(&self, i: usize) -> impl Iterator<Item = (usize, T)> + '_ {
        assert!(i < self.n, "Row index out of bounds");
        let (cols, vals) = self.row_slices(i);
        cols.iter().copied().zip(vals.iter().copied())
    }

    #[inline]
    pub(crate) fn row_slices(&self, i: usize) -> (&[usize], &[T]) {
        let start = i * self.m;
        let live = start + self.nnz[i];
        (&self.index[start..live], &self.value[start..live])
    }

    /// Slot of column `j` within row `i`, if stored
    fn find(&self, i: usize, j: usize) -> std::result::Result<usize, usize> {
        let (cols, _) = self.row_slices(i);
        if self.kind.is_sorted() {
            cols.binary_search(&j)
        } else {
            cols.iter().position(|&c| c == j).ok_or(cols.len())
        }
    }

    /// Value at `(i, j)`, zero when not stored
    pub fn get(&self, i: usize, j: usize) -> Result<T> {
        self.check_row(i)?;
        self.check_col(j)?;
        Ok(match self.find(i, j) {
            Ok(slot) => self.value[i * self.m + slot],
            Err(_) => T::zero(),
        })
    }

    /// Stores `v` at `(i, j)`
    ///
    /// An existing entry is overwritten, or removed when `v` is exactly zero.
    /// A new entry is appended (ELLSORT: inserted in column order).
    ///
    /// # Errors
    ///
    /// `Capacity` when row `i` is full and `(i, j)` is not yet stored.
    pub fn set(&mut self, i: usize, j: usize, v: T) -> Result<()> {
        self.check_row(i)?;
        self.check_col(j)?;
        let base = i * self.m;
        let live = self.nnz[i];
        match self.find(i, j) {
            Ok(slot) if v.is_zero() => {
                if self.kind.is_sorted() {
                    self.index.copy_within(base + slot + 1..base + live, base + slot);
                    self.value.copy_within(base + slot + 1..base + live, base + slot);
                } else {
                    self.index[base + slot] = self.index[base + live - 1];
                    self.value[base + slot] = self.value[base + live - 1];
                }
                self.nnz[i] = live - 1;
            }
            Ok(slot) => self.value[base + slot] = v,
            Err(_) if v.is_zero() => {}
            Err(insert_at) => {
                if live == self.m {
                    return Err(EllError::capacity(i, live + 1, self.m));
                }
                self.index.copy_within(base + insert_at..base + live, base + insert_at + 1);
                self.value.copy_within(base + insert_at..base + live, base + insert_at + 1);
                self.index[base + insert_at] = j;
                self.value[base + insert_at] = v;
                self.nnz[i] = live + 1;
            }
        }
        self.mark_written();
        Ok(())
    }

    /// Drops every entry
    pub fn clear(&mut self) {
        self.nnz.iter_mut().for_each(|c| *c = 0);
        self.mark_written();
    }

    /// Changes the per-row capacity, keeping all live entries
    ///
    /// # Errors
    ///
    /// `Capacity` if `new_m` is below the current maximum row occupancy.
    pub fn resize_row_capacity(&mut self, new_m: usize) -> Result<()> {
        if new_m == self.m {
            return Ok(());
        }
        if let Some((row, &occupied)) = self
            .nnz
            .iter()
            .enumerate()
            .find(|&(_, &count)| count > new_m)
        {
            return Err(EllError::capacity(row, occupied, new_m));
        }

        let len = self
            .n
            .checked_mul(new_m)
            .ok_or_else(|| EllError::Allocation { bytes: usize::MAX }.logged())?;
        let mut value = alloc_buffer(len, T::zero())?;
        let mut index = alloc_buffer(len, 0usize)?;
        for i in 0..self.n {
            let live = self.nnz[i];
            let (src, dst) = (i * self.m, i * new_m);
            value[dst..dst + live].copy_from_slice(&self.value[src..src + live]);
            index[dst..dst + live].copy_from_slice(&self.index[src..src + live]);
        }

        tracing::debug!(old_m = self.m, new_m, "resized row capacity");
        self.value = value;
        self.index = index;
        self.m = new_m;
        Ok(())
    }

    /// Copies every row of `self` into `other`, which keeps its own capacity,
    /// kind and configuration
    pub fn copy_into(&self, other: &mut Self) -> Result<()> {
        other.copy_rows_from(self, 0..self.n)
    }

    /// Verifies the storage invariants
    ///
    /// Row counts within capacity, live columns in range, no duplicate
    /// columns within a row, ascending columns for ELLSORT, and a domain
    /// that partitions all rows.
    pub fn check_invariants(&self) -> Result<()> {
        if self.nnz.len() != self.n
            || self.value.len() != self.n * self.m
            || self.index.len() != self.n * self.m
        {
            return Err(EllError::invalid("matrix", "buffer sizes disagree with N and M"));
        }
        let mut seen = vec![false; self.n];
        for i in 0..self.n {
            if self.nnz[i] > self.m {
                return Err(EllError::capacity(i, self.nnz[i], self.m));
            }
            let (cols, _) = self.row_slices(i);
            for &c in cols {
                if c >= self.n {
                    return Err(EllError::out_of_bounds(c, self.n));
                }
                if seen[c] {
                    return Err(EllError::invalid(
                        "matrix",
                        format!("duplicate column {} in row {}", c, i),
                    ));
                }
                seen[c] = true;
            }
            if self.kind.is_sorted() && cols.windows(2).any(|w| w[0] > w[1]) {
                return Err(EllError::invalid(
                    "matrix",
                    format!("row {} is not in ascending column order", i),
                ));
            }
            for &c in cols {
                seen[c] = false;
            }
        }
        self.domain.validate()?;
        if self.domain.n_rows() != self.n {
            return Err(EllError::dimension_mismatch(self.n, self.domain.n_rows()));
        }
        Ok(())
    }

    pub(crate) fn check_row(&self, i: usize) -> Result<()> {
        if i >= self.n {
            return Err(EllError::out_of_bounds(i, self.n));
        }
        Ok(())
    }

    pub(crate) fn check_col(&self, j: usize) -> Result<()> {
        if j >= self.n {
            return Err(EllError::out_of_bounds(j, self.n));
        }
        Ok(())
    }

    /// Records a write; other ranks' rows of a distributed matrix are stale
    /// until the next exchange
    pub(crate) fn mark_written(&mut self) {
        if self.distribution.is_distributed() && self.plan.n_ranks > 1 {
            self.rows_current = false;
        }
    }

    /// Disjoint mutable views over rows `range`
    pub(crate) fn rows_mut(&mut self, range: Range<usize>) -> RowsMut<'_, T> {
        let (start, end) = (range.start * self.m, range.end * self.m);
        RowsMut::new(
            range.start,
            self.m,
            &mut self.value[start..end],
            &mut self.index[start..end],
            &mut self.nnz[range],
            self.kind.is_sorted(),
        )
    }
}

impl<T: Element> fmt::Debug for EllpackMatrix<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "EllpackMatrix {{")?;
        writeln!(f, "  kind: {:?}, precision: {:?}", self.kind, T::PRECISION)?;
        writeln!(f, "  dimensions: {} × {} (capacity {} per row)", self.n, self.n, self.m)?;
        writeln!(f, "  nnz: {}", self.nnz_total())?;

        // Print a sample of the matrix content
        let max_rows_to_print = 5.min(self.n);

        if max_rows_to_print > 0 {
            writeln!(f, "  content sample:")?;

            for i in 0..max_rows_to_print {
                write!(f, "    row {}: ", i)?;
                let (cols, vals) = self.row_slices(i);

                if cols.is_empty() {
                    writeln!(f, "(empty)")?;
                } else {
                    let max_elements = 5.min(cols.len());

                    for j in 0..max_elements {
                        write!(f, "({}, {:?}) ", cols[j], vals[j])?;
                    }

                    if cols.len() > max_elements {
                        write!(f, "... ({} more)", cols.len() - max_elements)?;
                    }

                    writeln!(f)?;
                }
            }

            if self.n > max_rows_to_print {
                writeln!(f, "    ... ({} more rows)", self.n - max_rows_to_print)?;
            }
        }

        write!(f, "}}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scenario() -> EllpackMatrix<f64> {
        EllpackMatrix::from_triplets(
            3,
            3,
            &[
                (0, 0, 2.0),
                (0, 1, 1.0),
                (1, 0, 1.0),
                (1, 1, 3.0),
                (1, 2, 1.0),
                (2, 1, 1.0),
                (2, 2, 2.0),
            ],
            DistributionMode::Sequential,
        )
        .unwrap()
    }

    #[test]
    fn test_new_matrix() {
        let matrix = scenario();

        assert_eq!(matrix.n(), 3);
        assert_eq!(matrix.m(), 3);
        assert_eq!(matrix.nnz_total(), 7);
        assert_eq!(matrix.row_degrees(), &[2, 3, 2]);
        assert!(matrix.check_invariants().is_ok());
    }

    #[test]
    fn test_get_set() {
        let mut matrix = scenario();

        assert_eq!(matrix.get(1, 1).unwrap(), 3.0);
        assert_eq!(matrix.get(0, 2).unwrap(), 0.0);

        matrix.set(0, 1, 4.0).unwrap();
        assert_eq!(matrix.get(0, 1).unwrap(), 4.0);
        assert_eq!(matrix.row_nonzeros(0).unwrap(), 2);

        // Exact zero removes the entry
        matrix.set(0, 1, 0.0).unwrap();
        assert_eq!(matrix.row_nonzeros(0).unwrap(), 1);
        assert_eq!(matrix.get(0, 1).unwrap(), 0.0);
        assert!(matrix.check_invariants().is_ok());
    }

    #[test]
    fn test_set_past_capacity() {
        let mut matrix = EllpackMatrix::<f64>::new(4, 2, DistributionMode::Sequential).unwrap();
        matrix.set(0, 0, 1.0).unwrap();
        matrix.set(0, 3, 1.0).unwrap();

        let err = matrix.set(0, 2, 1.0).unwrap_err();
        assert_eq!(
            err,
            EllError::Capacity {
                row: 0,
                required: 3,
                capacity: 2
            }
        );
        // Overwriting a stored column still works on a full row
        matrix.set(0, 3, 5.0).unwrap();
        assert_eq!(matrix.get(0, 3).unwrap(), 5.0);
    }

    #[test]
    fn test_bounds_checks() {
        let matrix = scenario();
        assert!(matches!(
            matrix.get(3, 0),
            Err(EllError::IndexOutOfBounds { index: 3, bound: 3 })
        ));
        assert!(matrix.get(0, 5).is_err());
        assert!(matrix.row_nonzeros(7).is_err());
    }

    #[test]
    fn test_sorted_insert_keeps_order() {
        let mut matrix =
            EllpackMatrix::<f64>::new_sorted(5, 4, DistributionMode::Sequential).unwrap();
        matrix.set(2, 4, 1.0).unwrap();
        matrix.set(2, 0, 2.0).unwrap();
        matrix.set(2, 3, 3.0).unwrap();
        matrix.set(2, 1, 4.0).unwrap();

        let (cols, vals) = matrix.row(2).unwrap();
        assert_eq!(cols, &[0, 1, 3, 4]);
        assert_eq!(vals, &[2.0, 4.0, 3.0, 1.0]);

        matrix.set(2, 1, 0.0).unwrap();
        let (cols, _) = matrix.row(2).unwrap();
        assert_eq!(cols, &[0, 3, 4]);
        assert!(matrix.check_invariants().is_ok());
    }

    #[test]
    fn test_resize_row_capacity() {
        let mut matrix = scenario();

        matrix.resize_row_capacity(5).unwrap();
        assert_eq!(matrix.m(), 5);
        assert_eq!(matrix.get(1, 2).unwrap(), 1.0);
        assert_eq!(matrix.row_degrees(), &[2, 3, 2]);

        // Shrinking to the occupancy is fine, below it is not
        matrix.resize_row_capacity(3).unwrap();
        let err = matrix.resize_row_capacity(2).unwrap_err();
        assert!(matches!(err, EllError::Capacity { row: 1, required: 3, capacity: 2 }));
        assert_eq!(matrix.m(), 3);
    }

    #[test]
    fn test_identity() {
        let identity = EllpackMatrix::<f32>::identity(4, 2, DistributionMode::Sequential).unwrap();
        for i in 0..4 {
            let row: Vec<_> = identity.row_iter(i).collect();
            assert_eq!(row, vec![(i, 1.0)]);
        }
    }

    #[test]
    fn test_dense_kind_rejected() {
        let result = EllpackMatrix::<f64>::with_config(
            MatrixKind::Dense,
            3,
            3,
            DistributionMode::Sequential,
            &EngineConfig::default(),
        );
        assert!(matches!(result, Err(EllError::UnsupportedKind { .. })));
    }

    #[test]
    fn test_zero_capacity_matrix() {
        let mut matrix = EllpackMatrix::<f64>::new(3, 0, DistributionMode::Sequential).unwrap();
        assert_eq!(matrix.max_row_occupancy(), 0);
        assert!(matrix.set(0, 0, 1.0).is_err());
        matrix.set(0, 0, 0.0).unwrap();
    }

    #[test]
    fn test_storage_is_aligned() {
        let matrix = EllpackMatrix::<f32>::new(5, 3, DistributionMode::Sequential).unwrap();
        assert_eq!(matrix.value.as_ptr() as usize % STORAGE_ALIGN, 0);
        assert_eq!(matrix.index.as_ptr() as usize % STORAGE_ALIGN, 0);
    }

    #[test]
    fn test_overflowing_size_is_allocation_error() {
        let result = EllpackMatrix::<f64>::new(usize::MAX / 2, 4, DistributionMode::Sequential);
        assert!(matches!(result, Err(EllError::Allocation { .. })));
    }

    #[cfg(target_pointer_width = "64")]
    #[test]
    fn test_refused_allocation_is_allocation_error() {
        // 2^59 bytes passes the size checks but no allocator can serve it
        let len = 1usize << 56;
        assert!(matches!(
            alloc_buffer(len, 0u64),
            Err(EllError::Allocation { bytes }) if bytes == len * 8
        ));

        let result = EllpackMatrix::<f64>::new(1 << 28, 1 << 28, DistributionMode::Sequential);
        assert!(matches!(result, Err(EllError::Allocation { .. })));
    }
}
