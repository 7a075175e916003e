//! # Runtime precision dispatch
//!
//! Kernels are generic over [`Element`] and monomorphized per precision.
//! [`AnyMatrix`] carries a matrix whose precision is only known at runtime
//! (for example when it was chosen by a raw selector code) and forwards each
//! operation to the typed kernel. Operands of different precisions are
//! rejected with `UnsupportedKind`.

use num_complex::{Complex32, Complex64};

use crate::error::{EllError, Result};
use crate::matrix::config::{DistributionMode, EngineConfig, MatrixKind, Precision};
use crate::matrix::EllpackMatrix;
use crate::ops::{self, SpectralBounds};
use crate::scalar::Element;

/// A matrix of any supported precision
#[derive(Debug, Clone)]
pub enum AnyMatrix {
    /// `f32` values
    SingleReal(EllpackMatrix<f32>),
    /// `f64` values
    DoubleReal(EllpackMatrix<f64>),
    /// `Complex<f32>` values
    SingleComplex(EllpackMatrix<Complex32>),
    /// `Complex<f64>` values
    DoubleComplex(EllpackMatrix<Complex64>),
}

/// Runs `$body` with `$m` bound to the typed matrix inside `$any`
macro_rules! with_matrix {
    ($any:expr, $m:ident => $body:expr) => {
        match $any {
            AnyMatrix::SingleReal($m) => $body,
            AnyMatrix::DoubleReal($m) => $body,
            AnyMatrix::SingleComplex($m) => $body,
            AnyMatrix::DoubleComplex($m) => $body,
        }
    };
}

/// Runs `$body` with `$a` and `$b` bound to two typed matrices of the same precision
macro_rules! with_pair {
    ($lhs:expr, $rhs:expr, $a:ident, $b:ident => $body:expr) => {
        match ($lhs, $rhs) {
            (AnyMatrix::SingleReal($a), AnyMatrix::SingleReal($b)) => $body,
            (AnyMatrix::DoubleReal($a), AnyMatrix::DoubleReal($b)) => $body,
            (AnyMatrix::SingleComplex($a), AnyMatrix::SingleComplex($b)) => $body,
            (AnyMatrix::DoubleComplex($a), AnyMatrix::DoubleComplex($b)) => $body,
            (lhs, rhs) => Err(mixed_precision(lhs.precision(), rhs.precision())),
        }
    };
}

fn mixed_precision(lhs: Precision, rhs: Precision) -> EllError {
    EllError::unsupported("precision pair", format!("{:?} with {:?}", lhs, rhs))
}

/// Creates an empty matrix of the requested precision and kind
///
/// # Errors
///
/// `UnsupportedKind` for [`MatrixKind::Dense`], which is provided by a
/// separate backend, plus the errors of [`EllpackMatrix::with_config`].
pub fn create(
    precision: Precision,
    kind: MatrixKind,
    n: usize,
    m: usize,
    distribution: DistributionMode,
    config: &EngineConfig,
) -> Result<AnyMatrix> {
    Ok(match precision {
        Precision::SingleReal => {
            AnyMatrix::SingleReal(EllpackMatrix::with_config(kind, n, m, distribution, config)?)
        }
        Precision::DoubleReal => {
            AnyMatrix::DoubleReal(EllpackMatrix::with_config(kind, n, m, distribution, config)?)
        }
        Precision::SingleComplex => {
            AnyMatrix::SingleComplex(EllpackMatrix::with_config(kind, n, m, distribution, config)?)
        }
        Precision::DoubleComplex => {
            AnyMatrix::DoubleComplex(EllpackMatrix::with_config(kind, n, m, distribution, config)?)
        }
    })
}

/// [`create`] from raw selector codes
///
/// Unknown codes are logged and reported as `UnsupportedKind`.
pub fn create_raw(
    precision: i32,
    kind: i32,
    n: usize,
    m: usize,
    distribution: i32,
    config: &EngineConfig,
) -> Result<AnyMatrix> {
    create(
        Precision::from_raw(precision)?,
        MatrixKind::from_raw(kind)?,
        n,
        m,
        DistributionMode::from_raw(distribution)?,
        config,
    )
}

impl AnyMatrix {
    /// Numeric precision
    pub fn precision(&self) -> Precision {
        with_matrix!(self, m => m.precision())
    }

    /// Storage family
    pub fn kind(&self) -> MatrixKind {
        with_matrix!(self, m => m.kind())
    }

    /// Number of rows and columns
    pub fn n(&self) -> usize {
        with_matrix!(self, m => m.n())
    }

    /// Per-row capacity
    pub fn m(&self) -> usize {
        with_matrix!(self, m => m.m())
    }

    /// Live entries per row
    pub fn row_degrees(&self) -> &[usize] {
        with_matrix!(self, m => m.row_degrees())
    }

    /// Entry `(i, j)` as `(re, im)`; `im` is zero for real precisions
    pub fn get_entry(&self, i: usize, j: usize) -> Result<(f64, f64)> {
        with_matrix!(self, m => m.get(i, j).map(|v| (v.real_part(), v.imag_part())))
    }

    /// Stores `re + i·im` at `(i, j)`; `im` is dropped for real precisions
    pub fn set_entry(&mut self, i: usize, j: usize, re: f64, im: f64) -> Result<()> {
        with_matrix!(self, m => set_parts(m, i, j, re, im))
    }

    /// `A ← αA + βB`, sparsified
    pub fn add(&mut self, other: &AnyMatrix, alpha: f64, beta: f64, threshold: f64) -> Result<()> {
        with_pair!(self, other, a, b => ops::add(a, b, alpha, beta, threshold))
    }

    /// `C ← αA·B + βC` with `self` as `C`, sparsified
    pub fn multiply(
        &mut self,
        a: &AnyMatrix,
        b: &AnyMatrix,
        alpha: f64,
        beta: f64,
        threshold: f64,
    ) -> Result<()> {
        if a.precision() != b.precision() {
            return Err(mixed_precision(a.precision(), b.precision()));
        }
        match (self, a, b) {
            (AnyMatrix::SingleReal(c), AnyMatrix::SingleReal(a), AnyMatrix::SingleReal(b)) => {
                ops::multiply(a, b, c, alpha, beta, threshold)
            }
            (AnyMatrix::DoubleReal(c), AnyMatrix::DoubleReal(a), AnyMatrix::DoubleReal(b)) => {
                ops::multiply(a, b, c, alpha, beta, threshold)
            }
            (
                AnyMatrix::SingleComplex(c),
                AnyMatrix::SingleComplex(a),
                AnyMatrix::SingleComplex(b),
            ) => ops::multiply(a, b, c, alpha, beta, threshold),
            (
                AnyMatrix::DoubleComplex(c),
                AnyMatrix::DoubleComplex(a),
                AnyMatrix::DoubleComplex(b),
            ) => ops::multiply(a, b, c, alpha, beta, threshold),
            (c, a, _) => Err(mixed_precision(c.precision(), a.precision())),
        }
    }

    /// Drops entries with magnitude `<= threshold`
    pub fn threshold(&mut self, threshold: f64) -> Result<()> {
        with_matrix!(self, m => ops::threshold(m, threshold))
    }

    /// `A ← αA` for a real `α`
    pub fn scale_real(&mut self, alpha: f64) -> Result<()> {
        with_matrix!(self, m => scale_by_real(m, alpha))
    }

    /// Gershgorin bounds over the local rows
    pub fn gershgorin(&self) -> SpectralBounds {
        with_matrix!(self, m => ops::gershgorin(m))
    }

    /// Maps the spectrum in `[emin, emax]` onto `[0, 1]`, reversed
    pub fn normalize(&mut self, emin: f64, emax: f64) -> Result<()> {
        with_matrix!(self, m => ops::normalize(m, emin, emax))
    }

    /// Renders a dense text window, see [`EllpackMatrix::format_window`]
    pub fn format_window(&self, i_l: usize, i_u: usize, j_l: usize, j_u: usize) -> Result<String> {
        with_matrix!(self, m => m.format_window(i_l, i_u, j_l, j_u))
    }

    /// Verifies the storage invariants
    pub fn check_invariants(&self) -> Result<()> {
        with_matrix!(self, m => m.check_invariants())
    }
}

fn set_parts<T: Element>(m: &mut EllpackMatrix<T>, i: usize, j: usize, re: f64, im: f64) -> Result<()> {
    m.set(i, j, T::from_parts(re, im))
}

fn scale_by_real<T: Element>(m: &mut EllpackMatrix<T>, alpha: f64) -> Result<()> {
    ops::scale_inplace(T::from_real(alpha), m)
}

macro_rules! impl_from_typed {
    ($t:ty, $variant:ident) => {
        impl From<EllpackMatrix<$t>> for AnyMatrix {
            fn from(m: EllpackMatrix<$t>) -> Self {
                AnyMatrix::$variant(m)
            }
        }
    };
}

impl_from_typed!(f32, SingleReal);
impl_from_typed!(f64, DoubleReal);
impl_from_typed!(Complex32, SingleComplex);
impl_from_typed!(Complex64, DoubleComplex);
