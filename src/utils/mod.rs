//! Utility functions and helpers

pub mod formats;
pub mod logging;
pub mod print;

pub use formats::{from_sprs_csr, to_sprs_csr};
pub use logging::{init_subscriber, init_test_subscriber};
pub use print::{format_dense, format_dense_vector, print_dense};

/// Computes an exclusive prefix sum (scan) for a vector
///
/// The result has one more element than the input; its last element is the
/// total.
pub fn exclusive_scan(input: &[usize]) -> Vec<usize> {
    let mut result = Vec::with_capacity(input.len() + 1);
    let mut sum = 0;

    result.push(0); // First element is always 0

    for &val in input {
        sum += val;
        result.push(sum);
    }

    result
}
