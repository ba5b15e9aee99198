//! Model-vs-observation comparison types.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::EngineError;

/// Operator combining a model diagnostic and an observation diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComparisonOperator {
    /// `model - obs`
    Difference,
    /// `model / obs`
    Ratio,
    /// `(model - obs) / obs`
    RelativeDifference,
    /// `100 * |(model - obs) / obs|`
    #[default]
    AbsRelativeDifference,
}

impl ComparisonOperator {
    /// All operators in declaration order.
    pub fn all() -> &'static [ComparisonOperator] {
        &[
            ComparisonOperator::Difference,
            ComparisonOperator::Ratio,
            ComparisonOperator::RelativeDifference,
            ComparisonOperator::AbsRelativeDifference,
        ]
    }

    /// Configuration name of the operator.
    pub fn as_str(self) -> &'static str {
        match self {
            ComparisonOperator::Difference => "difference",
            ComparisonOperator::Ratio => "ratio",
            ComparisonOperator::RelativeDifference => "relative_difference",
            ComparisonOperator::AbsRelativeDifference => "abs_relative_difference",
        }
    }

    /// Whether the operator divides by the observation.
    pub fn is_ratio_like(self) -> bool {
        matches!(
            self,
            ComparisonOperator::Ratio | ComparisonOperator::RelativeDifference
        )
    }

    /// Units of the metric value given the units of the diagnostic.
    ///
    /// ```
    /// use enso_metrics_core::types::ComparisonOperator;
    ///
    /// assert_eq!(ComparisonOperator::Difference.metric_units("C"), "C");
    /// assert_eq!(ComparisonOperator::Ratio.metric_units("C"), "C / C");
    /// assert_eq!(ComparisonOperator::AbsRelativeDifference.metric_units("C"), "%");
    /// ```
    pub fn metric_units(self, diagnostic_units: &str) -> String {
        match self {
            ComparisonOperator::Difference => diagnostic_units.to_string(),
            ComparisonOperator::Ratio | ComparisonOperator::RelativeDifference => {
                format!("{} / {}", diagnostic_units, diagnostic_units)
            }
            ComparisonOperator::AbsRelativeDifference => "%".to_string(),
        }
    }

    /// Human-readable description of the computation.
    pub fn description(self) -> &'static str {
        match self {
            ComparisonOperator::Difference => {
                "difference of model and reference values (model - ref)"
            }
            ComparisonOperator::Ratio => "ratio of model and reference values (model / ref)",
            ComparisonOperator::RelativeDifference => {
                "relative difference of model and reference values ((model - ref) / ref)"
            }
            ComparisonOperator::AbsRelativeDifference => {
                "absolute relative difference of model and reference values, in percent \
                 (100 * |(model - ref) / ref|)"
            }
        }
    }
}

impl fmt::Display for ComparisonOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ComparisonOperator {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "difference" => Ok(ComparisonOperator::Difference),
            "ratio" => Ok(ComparisonOperator::Ratio),
            "relative_difference" => Ok(ComparisonOperator::RelativeDifference),
            "abs_relative_difference" => Ok(ComparisonOperator::AbsRelativeDifference),
            other => Err(EngineError::UnknownOperator(other.to_string())),
        }
    }
}

/// A value with its optional uncertainty, as read from a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Measured {
    pub value: Option<f64>,
    pub error: Option<f64>,
}

impl Measured {
    pub fn new(value: Option<f64>, error: Option<f64>) -> Self {
        Self { value, error }
    }

    /// Shorthand for a present value and error.
    pub fn of(value: f64, error: f64) -> Self {
        Self::new(Some(value), Some(error))
    }
}

/// Distance between the model diagnostic and one observation diagnostic.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MetricResult {
    pub value: Option<f64>,
    pub value_error: Option<f64>,
    /// Same comparison applied to the nonlinearity sub-values.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nonlinearity: Option<Box<MetricResult>>,
}

impl MetricResult {
    pub fn new(value: Option<f64>, value_error: Option<f64>) -> Self {
        Self {
            value,
            value_error,
            nonlinearity: None,
        }
    }

    /// Attach the nonlinearity comparison.
    pub fn with_nonlinearity(mut self, nonlinearity: MetricResult) -> Self {
        self.nonlinearity = Some(Box::new(nonlinearity));
        self
    }

    /// Whether neither the primary nor the nonlinearity value could be computed.
    pub fn is_absent(&self) -> bool {
        self.value.is_none()
            && self
                .nonlinearity
                .as_ref()
                .map_or(true, |nl| nl.value.is_none())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operator_round_trip_names() {
        for op in ComparisonOperator::all() {
            let parsed: ComparisonOperator = op.as_str().parse().unwrap();
            assert_eq!(parsed, *op);
        }
    }

    #[test]
    fn test_unknown_operator_fails_loudly() {
        let err = "rmse".parse::<ComparisonOperator>().unwrap_err();
        assert!(matches!(err, EngineError::UnknownOperator(ref name) if name == "rmse"));
        assert!(err.is_configuration_error());
    }

    #[test]
    fn test_unknown_operator_in_serde() {
        let result: Result<ComparisonOperator, _> = serde_json::from_str("\"distance\"");
        assert!(result.is_err());
    }

    #[test]
    fn test_ratio_like() {
        assert!(ComparisonOperator::Ratio.is_ratio_like());
        assert!(ComparisonOperator::RelativeDifference.is_ratio_like());
        assert!(!ComparisonOperator::Difference.is_ratio_like());
        assert!(!ComparisonOperator::AbsRelativeDifference.is_ratio_like());
    }

    #[test]
    fn test_metric_result_nonlinearity_serialization() {
        let plain = MetricResult::new(Some(1.0), None);
        let json = serde_json::to_string(&plain).unwrap();
        assert_eq!(json, r#"{"value":1.0,"value_error":null}"#);

        let nested = plain.with_nonlinearity(MetricResult::new(Some(2.0), Some(0.1)));
        let json = serde_json::to_string(&nested).unwrap();
        assert!(json.contains("\"nonlinearity\":{\"value\":2.0"));
    }

    #[test]
    fn test_is_absent() {
        assert!(MetricResult::default().is_absent());
        assert!(!MetricResult::new(Some(1.0), None).is_absent());
        let only_nl = MetricResult::default().with_nonlinearity(MetricResult::new(Some(1.0), None));
        assert!(!only_nl.is_absent());
    }
}
