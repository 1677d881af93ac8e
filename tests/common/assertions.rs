//! Assertion utilities for testing.
//!
//! This module provides helper functions for making assertions in tests,
//! particularly for floating-point comparisons where NaN marks missing data.

/// Default epsilon for floating-point comparisons
pub const DEFAULT_EPSILON: f64 = 1e-6;

/// Assert that two floating-point values are approximately equal.
///
/// Two NaNs compare equal; NaN against a number does not.
pub fn assert_approx_eq(actual: f64, expected: f64, epsilon: Option<f64>) {
    let epsilon = epsilon.unwrap_or(DEFAULT_EPSILON);

    if actual.is_nan() || expected.is_nan() {
        assert!(
            actual.is_nan() && expected.is_nan(),
            "Missing value mismatch: actual = {}, expected = {}",
            actual,
            expected
        );
        return;
    }

    let diff = (actual - expected).abs();
    assert!(
        diff <= epsilon,
        "Values not approximately equal: actual = {}, expected = {}, diff = {}, epsilon = {}",
        actual,
        expected,
        diff,
        epsilon
    );
}

/// Assert that two arrays of floating-point values are approximately element-wise equal.
pub fn assert_array_approx_eq<'a>(
    actual: impl IntoIterator<Item = &'a f64>,
    expected: impl IntoIterator<Item = &'a f64>,
    epsilon: Option<f64>,
) {
    let actual: Vec<f64> = actual.into_iter().copied().collect();
    let expected: Vec<f64> = expected.into_iter().copied().collect();

    assert_eq!(
        actual.len(),
        expected.len(),
        "Arrays have different lengths: actual = {}, expected = {}",
        actual.len(),
        expected.len()
    );

    for (i, (a, e)) in actual.iter().zip(expected.iter()).enumerate() {
        let eps = epsilon.unwrap_or(DEFAULT_EPSILON);
        let both_nan = a.is_nan() && e.is_nan();
        assert!(
            both_nan || (a - e).abs() <= eps,
            "Arrays differ at index {}: actual = {}, expected = {}, epsilon = {}",
            i,
            a,
            e,
            eps
        );
    }
}

/// Count missing (NaN) values
pub fn count_nan<'a>(values: impl IntoIterator<Item = &'a f64>) -> usize {
    values.into_iter().filter(|v| v.is_nan()).count()
}
