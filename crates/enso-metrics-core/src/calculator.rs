//! Metric calculator: model-vs-observation distance with error propagation.
//!
//! # Formulas
//!
//! With model `m ± em` and observation `o ± eo`:
//!
//! | operator | value | error |
//! |----------|-------|-------|
//! | difference | `m - o` | `em + eo` |
//! | ratio | `m / o` | `(o*em + m*eo) / o²` |
//! | relative_difference | `(m - o) / o` | `(o*(em+eo) + (m-o)*eo) / o²` |
//! | abs_relative_difference | `100 * \|(m - o) / o\|` | `100 * \|relative error\|` |
//!
//! Errors are only propagated when both input errors are present. A missing
//! input value is not an error: the comparison is simply absent.

use tracing::debug;

use crate::types::{ComparisonOperator, Diagnostic, Measured, MetricResult};

/// Outcome of one comparison.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Comparison {
    pub value: Option<f64>,
    pub value_error: Option<f64>,
    /// Description of the computation; empty when inputs were missing.
    pub description: String,
}

impl Comparison {
    fn absent() -> Self {
        Self::default()
    }

    fn new(value: Option<f64>, value_error: Option<f64>, operator: ComparisonOperator) -> Self {
        Self {
            value,
            value_error,
            description: operator.description().to_string(),
        }
    }

    /// Convert into a metric result without nonlinearity.
    pub fn into_result(self) -> MetricResult {
        MetricResult::new(self.value, self.value_error)
    }
}

/// `(numerator / denominator, propagated error)` for a quotient.
fn quotient(num: f64, num_err: Option<f64>, den: f64, den_err: Option<f64>) -> (f64, Option<f64>) {
    let value = num / den;
    let error = match (num_err, den_err) {
        (Some(ne), Some(de)) => Some((den * ne + num * de) / (den * den)),
        _ => None,
    };
    (value, error)
}

/// Compare a model value against an observation value.
///
/// # Example
///
/// ```
/// use enso_metrics_core::calculator::compute_metric;
/// use enso_metrics_core::types::{ComparisonOperator, Measured};
///
/// let out = compute_metric(
///     Measured::of(2.0, 0.1),
///     Measured::of(1.5, 0.2),
///     ComparisonOperator::Difference,
/// );
/// assert!((out.value.unwrap() - 0.5).abs() < 1e-12);
/// assert!((out.value_error.unwrap() - 0.3).abs() < 1e-12);
///
/// let missing = compute_metric(
///     Measured::new(None, None),
///     Measured::of(1.5, 0.2),
///     ComparisonOperator::Ratio,
/// );
/// assert_eq!(missing.value, None);
/// assert!(missing.description.is_empty());
/// ```
pub fn compute_metric(model: Measured, obs: Measured, operator: ComparisonOperator) -> Comparison {
    let (m, o) = match (model.value, obs.value) {
        (Some(m), Some(o)) => (m, o),
        _ => {
            debug!(operator = %operator, "Missing model or reference value, metric not computed");
            return Comparison::absent();
        }
    };
    let both_errors = model.error.zip(obs.error);

    if operator != ComparisonOperator::Difference && o == 0.0 {
        debug!(operator = %operator, "Reference value is zero, metric not computed");
        return Comparison::new(None, None, operator);
    }

    match operator {
        ComparisonOperator::Difference => {
            Comparison::new(Some(m - o), both_errors.map(|(em, eo)| em + eo), operator)
        }
        ComparisonOperator::Ratio => {
            let (value, error) = quotient(m, model.error, o, obs.error);
            Comparison::new(Some(value), error, operator)
        }
        ComparisonOperator::RelativeDifference => {
            let diff_err = both_errors.map(|(em, eo)| em + eo);
            let (value, error) = quotient(m - o, diff_err, o, obs.error);
            Comparison::new(Some(value), error, operator)
        }
        ComparisonOperator::AbsRelativeDifference => {
            let diff_err = both_errors.map(|(em, eo)| em + eo);
            let (value, error) = quotient(m - o, diff_err, o, obs.error);
            Comparison::new(Some(100.0 * value.abs()), error.map(|e| 100.0 * e.abs()), operator)
        }
    }
}

/// Compare two diagnostics, including the nonlinearity sub-values when
/// `nonlinearity` is set.
///
/// The two comparisons are independent: a missing primary value does not
/// affect the nonlinearity result and vice versa.
pub fn compare_diagnostics(
    model: &Diagnostic,
    obs: &Diagnostic,
    operator: ComparisonOperator,
    nonlinearity: bool,
) -> (MetricResult, String) {
    let primary = compute_metric(model.measured(), obs.measured(), operator);
    let description = primary.description.clone();
    let mut result = primary.into_result();
    if nonlinearity {
        let nl = compute_metric(model.nonlinearity_measured(), obs.nonlinearity_measured(), operator);
        result = result.with_nonlinearity(nl.into_result());
    }
    (result, description)
}
