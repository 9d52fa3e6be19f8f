//! Testing utilities for bigml-local.
//!
//! This module provides common assertion helpers that can be used in both
//! unit tests and integration tests.
//!
//! # Usage
//!
//! ```ignore
//! use bigml_local::assert_approx_eq;
//! use bigml_local::testing::{assert_distribution_eq, DEFAULT_TOLERANCE};
//! ```

use approx::AbsDiffEq;

use crate::repr::Distribution;

// =============================================================================
// Constants
// =============================================================================

/// Default tolerance for floating point comparisons.
///
/// Reference confidences and scores are published with five decimals.
pub const DEFAULT_TOLERANCE: f64 = 1e-5;

// =============================================================================
// Floating Point Assertions
// =============================================================================

/// Assert that two f64 values are approximately equal.
///
/// Uses absolute difference comparison with the given tolerance.
///
/// # Examples
///
/// ```
/// # use bigml_local::assert_approx_eq;
/// assert_approx_eq!(0.92444, 0.924439, 1e-5);
/// ```
///
/// # Panics
///
/// Panics if the absolute difference exceeds tolerance.
#[macro_export]
macro_rules! assert_approx_eq {
    ($left:expr, $right:expr, $tolerance:expr) => {{
        let left_val: f64 = $left;
        let right_val: f64 = $right;
        let tol: f64 = $tolerance;
        let diff = (left_val - right_val).abs();
        if !(diff <= tol) {
            panic!(
                "assertion failed: `(left ≈ right)`\n  left: `{:?}`\n right: `{:?}`\n  diff: `{:?}` > tolerance `{:?}`",
                left_val, right_val, diff, tol
            );
        }
    }};
    ($left:expr, $right:expr, $tolerance:expr, $($arg:tt)+) => {{
        let left_val: f64 = $left;
        let right_val: f64 = $right;
        let tol: f64 = $tolerance;
        let diff = (left_val - right_val).abs();
        if !(diff <= tol) {
            panic!(
                "assertion failed: `(left ≈ right)` - {}\n  left: `{:?}`\n right: `{:?}`\n  diff: `{:?}` > tolerance `{:?}`",
                format_args!($($arg)+), left_val, right_val, diff, tol
            );
        }
    }};
}

// =============================================================================
// Distribution Assertions
// =============================================================================

/// Render a distribution one bin per line for failure messages.
fn render(distribution: &Distribution) -> String {
    match distribution {
        Distribution::Categorical(bins) => bins
            .iter()
            .map(|(k, c)| format!("  {k:>20} {c:>12.6}\n"))
            .collect(),
        Distribution::Numeric(bins) => bins
            .iter()
            .map(|(k, c)| format!("  {k:>20.6} {c:>12.6}\n"))
            .collect(),
    }
}

/// Assert that two [`Distribution`]s are approximately equal.
///
/// Uses the `approx` crate's `AbsDiffEq` implementation of [`Distribution`].
///
/// # Panics
///
/// Panics if the kinds, keys or counts differ.
pub fn assert_distribution_eq(actual: &Distribution, expected: &Distribution, context: &str) {
    if !actual.abs_diff_eq(expected, DEFAULT_TOLERANCE) {
        panic!(
            "\n{context}: distributions differ\n- expected\n{}+ actual\n{}",
            render(expected),
            render(actual)
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assert_approx_eq_macro() {
        assert_approx_eq!(1.0, 1.0001, 0.001);
        assert_approx_eq!(0.0, 0.0, 1e-10);
        assert_approx_eq!(-1.5, -1.5001, 0.001);
    }

    #[test]
    #[should_panic(expected = "assertion failed")]
    fn test_assert_approx_eq_fails() {
        assert_approx_eq!(1.0, 2.0, 0.1);
    }

    #[test]
    #[should_panic(expected = "assertion failed")]
    fn test_assert_approx_eq_rejects_nan() {
        assert_approx_eq!(f64::NAN, 1.0, 0.1);
    }

    #[test]
    fn test_assert_approx_eq_with_message() {
        assert_approx_eq!(1.0, 1.0001, 0.001, "testing value");
    }

    #[test]
    fn test_distribution_eq() {
        let a = Distribution::Categorical(vec![("a".into(), 1.0), ("b".into(), 2.0)]);
        let b = Distribution::Categorical(vec![("a".into(), 1.000001), ("b".into(), 2.0)]);
        assert_distribution_eq(&a, &b, "test");
    }

    #[test]
    #[should_panic(expected = "distributions differ")]
    fn test_distribution_eq_kind_mismatch() {
        let a = Distribution::Categorical(vec![("1".into(), 1.0)]);
        let b = Distribution::Numeric(vec![(1.0, 1.0)]);
        assert_distribution_eq(&a, &b, "test");
    }
}
