//! Numeric value abstraction shared by every kernel
//!
//! Kernels are written once against [`Element`] and monomorphized for the four
//! supported precisions: `f32`, `f64`, [`Complex32`] and [`Complex64`].

use num_complex::{Complex32, Complex64};
use num_traits::Num;
use std::fmt::Debug;
use std::ops::AddAssign;

use crate::matrix::config::Precision;

/// Capability set a matrix element must provide
pub trait Element: Copy + Num + AddAssign + Default + Debug + Send + Sync + 'static {
    /// Precision tag reported by matrices of this element type
    const PRECISION: Precision;

    /// Converts a real scalar (as used by add, multiply and normalize) into `Self`
    fn from_real(x: f64) -> Self;

    /// Builds a value from real and imaginary parts; real types drop `im`
    fn from_parts(re: f64, im: f64) -> Self;

    /// Absolute value (complex modulus for complex types)
    fn magnitude(self) -> f64;

    /// Real part widened to `f64`
    fn real_part(self) -> f64;

    /// Imaginary part widened to `f64`, zero for real types
    fn imag_part(self) -> f64;

    /// Complex conjugate, identity for real types
    fn conj(self) -> Self;

    /// Fixed-width rendering used by the print helpers
    fn format_entry(self) -> String;
}

/// Sparsification rule shared by add, multiply, identity-add and threshold.
///
/// An entry survives when its magnitude is strictly above `threshold`. Exact
/// zeros never survive, even for a negative threshold.
#[inline]
pub fn is_above_threshold<T: Element>(value: T, threshold: f64) -> bool {
    let mag = value.magnitude();
    mag > threshold && mag != 0.0
}

/// C `"% 1.3f"`: a leading blank stands in for the sign of non-negative values
fn format_space_signed(v: f64) -> String {
    let body = format!("{:.3}", v);
    if body.starts_with('-') {
        body
    } else {
        format!(" {}", body)
    }
}

macro_rules! impl_real_element {
    ($t:ty, $precision:expr) => {
        impl Element for $t {
            const PRECISION: Precision = $precision;

            #[inline]
            fn from_real(x: f64) -> Self {
                x as $t
            }

            #[inline]
            fn from_parts(re: f64, _im: f64) -> Self {
                re as $t
            }

            #[inline]
            fn magnitude(self) -> f64 {
                (self as f64).abs()
            }

            #[inline]
            fn real_part(self) -> f64 {
                self as f64
            }

            #[inline]
            fn imag_part(self) -> f64 {
                0.0
            }

            #[inline]
            fn conj(self) -> Self {
                self
            }

            fn format_entry(self) -> String {
                format_space_signed(self as f64)
            }
        }
    };
}

macro_rules! impl_complex_element {
    ($t:ty, $part:ty, $precision:expr) => {
        impl Element for $t {
            const PRECISION: Precision = $precision;

            #[inline]
            fn from_real(x: f64) -> Self {
                <$t>::new(x as $part, 0.0)
            }

            #[inline]
            fn from_parts(re: f64, im: f64) -> Self {
                <$t>::new(re as $part, im as $part)
            }

            #[inline]
            fn magnitude(self) -> f64 {
                (self.re as f64).hypot(self.im as f64)
            }

            #[inline]
            fn real_part(self) -> f64 {
                self.re as f64
            }

            #[inline]
            fn imag_part(self) -> f64 {
                self.im as f64
            }

            #[inline]
            fn conj(self) -> Self {
                <$t>::new(self.re, -self.im)
            }

            fn format_entry(self) -> String {
                format!("{}{:+.3}i", format_space_signed(self.re as f64), self.im as f64)
            }
        }
    };
}

impl_real_element!(f32, Precision::SingleReal);
impl_real_element!(f64, Precision::DoubleReal);
impl_complex_element!(Complex32, f32, Precision::SingleComplex);
impl_complex_element!(Complex64, f64, Precision::DoubleComplex);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_threshold_rule_is_strict() {
        assert!(is_above_threshold(1.5f64, 1.0));
        assert!(!is_above_threshold(1.0f64, 1.0));
        assert!(!is_above_threshold(-1.0f32, 1.0));
        assert!(is_above_threshold(-1.25f32, 1.0));
    }

    #[test]
    fn test_zero_never_survives() {
        assert!(!is_above_threshold(0.0f64, -1.0));
        assert!(!is_above_threshold(Complex64::new(0.0, 0.0), -1.0));
        assert!(is_above_threshold(1e-30f64, -1.0));
    }

    #[test]
    fn test_complex_magnitude() {
        let z = Complex64::new(3.0, -4.0);
        assert!((z.magnitude() - 5.0).abs() < 1e-12);
        assert_eq!(z.conj(), Complex64::new(3.0, 4.0));
        assert!(is_above_threshold(z, 4.9));
        assert!(!is_above_threshold(z, 5.0));
    }

    #[test]
    fn test_format_entry() {
        assert_eq!(2.0f64.format_entry(), " 2.000");
        assert_eq!((-0.5f32).format_entry(), "-0.500");
        assert_eq!(Complex64::new(1.0, -2.0).format_entry(), " 1.000-2.000i");
        assert_eq!(Complex32::new(-1.0, 0.25).format_entry(), "-1.000+0.250i");
    }

    #[test]
    fn test_precision_tags() {
        assert_eq!(<f32 as Element>::PRECISION, Precision::SingleReal);
        assert_eq!(<Complex64 as Element>::PRECISION, Precision::DoubleComplex);
    }
}
