//! # ellmat: ELLPACK/ELLSORT sparse matrices for linear-scaling kernels
//!
//! ellmat stores large, approximately sparse square matrices (Hamiltonians,
//! density matrices) with a fixed number of entries per row and provides the
//! arithmetic that linear-scaling electronic structure methods repeat over
//! and over: scale, add, multiply, threshold, spectral bounds and
//! normalization.
//!
//! ## Overview
//!
//! - **Fixed-width rows**: values and column indices live in two aligned
//!   `N × M` buffers, with a live-entry count per row. ELLSORT keeps each
//!   row in ascending column order.
//! - **Threshold-driven sparsity**: add, multiply and identity-add drop every
//!   entry whose magnitude is not strictly above the threshold, so fill-in
//!   stays bounded.
//! - **Row-local kernels**: every kernel writes only the rows it owns, which
//!   makes row blocks safe to run in parallel with Rayon and lets ranks of a
//!   distributed run share a matrix by contiguous row ranges.
//! - **Four precisions**: `f32`, `f64`, `Complex32` and `Complex64`, through
//!   generic kernels or the runtime [`AnyMatrix`] wrapper.
//!
//! ## Usage
//!
//! ```
//! use ellmat::{add_identity, gershgorin, multiply_new, DistributionMode, EllpackMatrix};
//!
//! let mut h = EllpackMatrix::<f64>::from_triplets(
//!     3,
//!     3,
//!     &[(0, 0, 2.0), (0, 1, -1.0), (1, 0, -1.0), (1, 1, 2.0), (2, 2, 1.0)],
//!     DistributionMode::Sequential,
//! )
//! .unwrap();
//!
//! let bounds = gershgorin(&h);
//! assert_eq!((bounds.emin, bounds.emax), (1.0, 3.0));
//!
//! add_identity(&mut h, -1.0, 1e-12).unwrap();
//! let h2 = multiply_new(&h, &h, 1.0, 1e-12).unwrap();
//! assert_eq!(h2.get(0, 0).unwrap(), 2.0);
//! ```

pub mod accumulator;
pub mod constants;
pub mod dispatch;
pub mod domain;
pub mod error;
pub mod matrix;
pub mod ops;
pub(crate) mod parallel;
pub mod scalar;
pub mod utils;

// Re-export primary components
pub use accumulator::{Accumulator, DenseAccumulator};
pub use dispatch::{create, create_raw, AnyMatrix};
pub use domain::{synchronize, Communicator, Domain, NoExchange, RowExchange, SerialCommunicator};
pub use error::{EllError, Result};
pub use matrix::config::{
    Backend, DenseOrder, DistributionMode, DistributionParams, EngineConfig, MatrixKind,
    Precision, SystemParameters,
};
pub use matrix::EllpackMatrix;
pub use ops::{
    accumulate_offdiag, add, add_identity, add_new, add_norm, gershgorin, gershgorin_global,
    gershgorin_partial, multiply, multiply_ab, multiply_adjust_ab, multiply_new, multiply_x2,
    normalize, scale, scale_add_identity, scale_inplace, scale_new, square_inplace, threshold,
    threshold_new, SpectralBounds,
};
pub use scalar::{is_above_threshold, Element};
pub use utils::{from_sprs_csr, to_sprs_csr};

/// Version information for the ellmat library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
