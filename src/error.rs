//! Error types for ellmat

use thiserror::Error;

/// Result type alias using ellmat's error
pub type Result<T> = std::result::Result<T, EllError>;

/// Errors raised by storage and kernel operations
///
/// Numeric edge cases inside kernels (a zero scalar, an empty row, an entry
/// sitting exactly on the threshold) are not errors and never show up here.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EllError {
    /// A row needs more stored entries than the per-row capacity `M`
    #[error("Row {row} needs {required} entries but capacity is {capacity}")]
    Capacity {
        /// Offending row
        row: usize,
        /// Entries the row would hold
        required: usize,
        /// Per-row capacity of the matrix
        capacity: usize,
    },

    /// Backing store could not be allocated
    #[error("Allocation of {bytes} bytes failed")]
    Allocation {
        /// Requested size in bytes (saturated on overflow)
        bytes: usize,
    },

    /// A precision, matrix kind or mode selector outside the known set
    #[error("Unsupported {kind} selector: {value}")]
    UnsupportedKind {
        /// Which selector was decoded
        kind: &'static str,
        /// The rejected value
        value: String,
    },

    /// Operands do not share a compatible row partitioning
    #[error("Domain mismatch: {reason}")]
    DomainMismatch {
        /// What was incompatible
        reason: String,
    },

    /// Operand dimensions disagree
    #[error("Dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch {
        /// Expected dimension
        expected: usize,
        /// Actual dimension
        got: usize,
    },

    /// Row or column index outside the matrix
    #[error("Index {index} out of bounds for dimension of size {bound}")]
    IndexOutOfBounds {
        /// The invalid index
        index: usize,
        /// Size of the dimension
        bound: usize,
    },

    /// Argument rejected before any work was done
    #[error("Invalid argument '{arg}': {reason}")]
    InvalidArgument {
        /// Argument name
        arg: &'static str,
        /// Why it was rejected
        reason: String,
    },
}

impl EllError {
    /// Log the error at error severity and hand it back.
    ///
    /// Every error leaving a public operation goes through here exactly once.
    pub(crate) fn logged(self) -> Self {
        tracing::error!(error = %self, "ellmat operation failed");
        self
    }

    pub(crate) fn capacity(row: usize, required: usize, capacity: usize) -> Self {
        EllError::Capacity {
            row,
            required,
            capacity,
        }
        .logged()
    }

    pub(crate) fn domain_mismatch(reason: impl Into<String>) -> Self {
        EllError::DomainMismatch {
            reason: reason.into(),
        }
        .logged()
    }

    pub(crate) fn dimension_mismatch(expected: usize, got: usize) -> Self {
        EllError::DimensionMismatch { expected, got }.logged()
    }

    pub(crate) fn out_of_bounds(index: usize, bound: usize) -> Self {
        EllError::IndexOutOfBounds { index, bound }.logged()
    }

    pub(crate) fn invalid(arg: &'static str, reason: impl Into<String>) -> Self {
        EllError::InvalidArgument {
            arg,
            reason: reason.into(),
        }
        .logged()
    }

    pub(crate) fn unsupported(kind: &'static str, value: impl ToString) -> Self {
        EllError::UnsupportedKind {
            kind,
            value: value.to_string(),
        }
        .logged()
    }
}
