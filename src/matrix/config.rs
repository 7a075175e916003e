//! Configuration, execution parameters and kind selectors for ellmat

use crate::error::{EllError, Result};

/// Numeric precision of a matrix, fixed at creation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Precision {
    /// `f32`
    SingleReal,
    /// `f64`
    DoubleReal,
    /// `Complex<f32>`
    SingleComplex,
    /// `Complex<f64>`
    DoubleComplex,
}

impl Precision {
    /// Decodes a raw selector (`0..=3`)
    ///
    /// Unknown values are logged and reported as `UnsupportedKind`.
    pub fn from_raw(raw: i32) -> Result<Self> {
        match raw {
            0 => Ok(Precision::SingleReal),
            1 => Ok(Precision::DoubleReal),
            2 => Ok(Precision::SingleComplex),
            3 => Ok(Precision::DoubleComplex),
            other => Err(EllError::unsupported("precision", other)),
        }
    }

    /// Whether values carry an imaginary part
    pub fn is_complex(&self) -> bool {
        matches!(self, Precision::SingleComplex | Precision::DoubleComplex)
    }

    /// Size of one stored value in bytes
    pub fn value_bytes(&self) -> usize {
        match self {
            Precision::SingleReal => 4,
            Precision::DoubleReal => 8,
            Precision::SingleComplex => 8,
            Precision::DoubleComplex => 16,
        }
    }
}

/// Storage family selecting which kernel set runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MatrixKind {
    /// Plain dense array; provided by an external backend
    Dense,
    /// Fixed row capacity, rows in arbitrary column order
    Ellpack,
    /// Fixed row capacity, rows kept in ascending column order
    Ellsort,
}

impl MatrixKind {
    /// Decodes a raw selector (`0..=2`)
    pub fn from_raw(raw: i32) -> Result<Self> {
        match raw {
            0 => Ok(MatrixKind::Dense),
            1 => Ok(MatrixKind::Ellpack),
            2 => Ok(MatrixKind::Ellsort),
            other => Err(EllError::unsupported("matrix type", other)),
        }
    }

    /// Whether rows keep ascending column order
    pub fn is_sorted(&self) -> bool {
        matches!(self, MatrixKind::Ellsort)
    }
}

/// How rows are shared between ranks, fixed at creation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DistributionMode {
    /// Every rank holds and updates all rows
    Sequential,
    /// Each rank owns a contiguous block of rows
    Distributed,
    /// Row ownership driven by a graph partition; treated like `Distributed`
    GraphDistributed,
}

impl DistributionMode {
    /// Decodes a raw selector (`0..=2`)
    pub fn from_raw(raw: i32) -> Result<Self> {
        match raw {
            0 => Ok(DistributionMode::Sequential),
            1 => Ok(DistributionMode::Distributed),
            2 => Ok(DistributionMode::GraphDistributed),
            other => Err(EllError::unsupported("distribution mode", other)),
        }
    }

    /// Whether each rank only owns part of the rows
    pub fn is_distributed(&self) -> bool {
        !matches!(self, DistributionMode::Sequential)
    }
}

/// Element order of a dense buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DenseOrder {
    /// `a[i * n + j]`
    RowMajor,
    /// `a[j * n + i]`
    ColumnMajor,
}

impl DenseOrder {
    /// Decodes a raw selector (`0..=1`)
    pub fn from_raw(raw: i32) -> Result<Self> {
        match raw {
            0 => Ok(DenseOrder::RowMajor),
            1 => Ok(DenseOrder::ColumnMajor),
            other => Err(EllError::unsupported("dense order", other)),
        }
    }

    /// Flat offset of `(i, j)` in an `n × n` buffer
    #[inline]
    pub fn offset(&self, i: usize, j: usize, n: usize) -> usize {
        match self {
            DenseOrder::RowMajor => i * n + j,
            DenseOrder::ColumnMajor => j * n + i,
        }
    }
}

/// Execution backend, selected when a matrix is created
///
/// All backends honour the same input, output and threshold contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Backend {
    /// One worker, rows in order
    Sequential,
    /// Rows split into static blocks, one rayon task per block
    CpuParallel,
    /// Add and multiply go through sprs triplet assembly
    VendorSparse,
}

impl Backend {
    /// Decodes a raw selector (`0..=2`)
    pub fn from_raw(raw: i32) -> Result<Self> {
        match raw {
            0 => Ok(Backend::Sequential),
            1 => Ok(Backend::CpuParallel),
            2 => Ok(Backend::VendorSparse),
            other => Err(EllError::unsupported("backend", other)),
        }
    }
}

/// System parameters for performance tuning
#[derive(Debug, Clone)]
pub struct SystemParameters {
    /// Number of threads to use
    pub n_threads: usize,
}

impl Default for SystemParameters {
    fn default() -> Self {
        Self {
            n_threads: num_cpus::get(), // Use all available cores
        }
    }
}

/// Position of this process among the ranks sharing distributed matrices
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DistributionParams {
    /// Rank of this process
    pub rank: usize,
    /// Number of ranks
    pub n_ranks: usize,
}

impl Default for DistributionParams {
    fn default() -> Self {
        Self { rank: 0, n_ranks: 1 }
    }
}

/// Configuration applied when creating matrices
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// System parameters for performance tuning
    pub system_params: SystemParameters,

    /// Backend used by kernels on matrices created with this config
    pub backend: Backend,

    /// Rank layout for distributed matrices
    pub distribution: DistributionParams,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            system_params: SystemParameters::default(),
            backend: Backend::CpuParallel,
            distribution: DistributionParams::default(),
        }
    }
}

impl EngineConfig {
    /// Create a config for a specific backend
    pub fn for_backend(backend: Backend) -> Self {
        Self {
            backend,
            ..Self::default()
        }
    }

    /// Create a config for one rank of a distributed run
    pub fn for_rank(rank: usize, n_ranks: usize) -> Self {
        Self {
            distribution: DistributionParams { rank, n_ranks },
            ..Self::default()
        }
    }

    /// Checks the worker and rank counts
    pub fn validate(&self) -> Result<()> {
        if self.system_params.n_threads == 0 {
            return Err(EllError::invalid("n_threads", "must be at least 1"));
        }
        let DistributionParams { rank, n_ranks } = self.distribution;
        if n_ranks == 0 {
            return Err(EllError::invalid("n_ranks", "must be at least 1"));
        }
        if rank >= n_ranks {
            return Err(EllError::invalid(
                "rank",
                format!("rank {} outside 0..{}", rank, n_ranks),
            ));
        }
        Ok(())
    }
}
