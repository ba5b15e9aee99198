//! Engine error types.
//!
//! [`EngineError`] covers the failures that must abort a collection run: a
//! misconfigured engine (unknown comparison operator, unknown smoothing or
//! detrending method, invalid collection definition) or an I/O/serialization
//! failure while loading configuration or writing results.
//!
//! Data problems (a variable missing from a file, a grid mismatch, a too-short
//! time period, unknown units) are deliberately NOT represented here. Those
//! are recorded as `keyerror` strings on the affected
//! [`Diagnostic`](crate::types::Diagnostic) so the rest of the collection keeps
//! going.

use thiserror::Error;

/// Errors that abort engine operations.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Comparison operator name not recognized.
    #[error("Unknown metric computation operator: '{0}'. Expected one of: difference, ratio, relative_difference, abs_relative_difference")]
    UnknownOperator(String),

    /// Smoothing method name not recognized.
    #[error("Unknown smoothing method: '{0}'. Expected one of: box, triangle")]
    UnknownSmoothing(String),

    /// Detrending method name not recognized.
    #[error("Unknown detrending method: '{0}'. Expected one of: linear")]
    UnknownDetrending(String),

    /// Time frequency not recognized.
    #[error("Unknown time frequency: '{0}'. Expected one of: monthly, yearly")]
    UnknownFrequency(String),

    /// Requested metric collection is not registered.
    #[error("Unknown metric collection: '{0}'")]
    UnknownCollection(String),

    /// Illegal metric state machine transition.
    #[error("Invalid transition for metric '{metric}' from {from} to {to}")]
    InvalidTransition {
        /// Metric being processed
        metric: String,
        /// Source state
        from: String,
        /// Target state
        to: String,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Invalid parameter value
    #[error("Invalid parameter '{name}': {value}. {reason}")]
    InvalidParameter {
        /// Parameter name
        name: String,
        /// Parameter value as string
        value: String,
        /// Reason for invalidity
        reason: String,
    },

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

impl From<serde_json::Error> for EngineError {
    fn from(err: serde_json::Error) -> Self {
        EngineError::SerializationError(err.to_string())
    }
}

impl From<toml::de::Error> for EngineError {
    fn from(err: toml::de::Error) -> Self {
        EngineError::ConfigError(format!("Failed to parse TOML: {}", err))
    }
}

impl From<config::ConfigError> for EngineError {
    fn from(err: config::ConfigError) -> Self {
        EngineError::ConfigError(err.to_string())
    }
}

impl EngineError {
    /// Create an invalid parameter error.
    pub fn invalid_param(
        name: impl Into<String>,
        value: impl ToString,
        reason: impl Into<String>,
    ) -> Self {
        EngineError::InvalidParameter {
            name: name.into(),
            value: value.to_string(),
            reason: reason.into(),
        }
    }

    /// Create an invalid transition error.
    pub fn invalid_transition(
        metric: impl Into<String>,
        from: impl ToString,
        to: impl ToString,
    ) -> Self {
        EngineError::InvalidTransition {
            metric: metric.into(),
            from: from.to_string(),
            to: to.to_string(),
        }
    }

    /// Check if this error indicates a misconfigured engine rather than an
    /// environmental failure.
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            EngineError::UnknownOperator(_)
                | EngineError::UnknownSmoothing(_)
                | EngineError::UnknownDetrending(_)
                | EngineError::UnknownFrequency(_)
                | EngineError::UnknownCollection(_)
                | EngineError::ConfigError(_)
                | EngineError::InvalidParameter { .. }
        )
    }
}
