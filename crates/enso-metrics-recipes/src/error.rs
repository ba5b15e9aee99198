//! Data problems found while preparing a recipe's inputs.
//!
//! These never abort a collection: their `Display` text becomes the
//! diagnostic's `keyerror`.

use chrono::NaiveDate;
use enso_metrics_core::types::KEYERROR_SEPARATOR;
use thiserror::Error;

/// Recoverable data error.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PreprocessError {
    #[error("too short time period: {got} time steps, at least {min} required")]
    TooShort { got: usize, min: usize },

    #[error("no time step inside time bounds {start} .. {end}")]
    EmptyPeriod { start: NaiveDate, end: NaiveDate },

    #[error("land and ocean cannot both be masked")]
    BothMasked,

    #[error("masking requested but no landmask provided")]
    MissingLandmask,

    #[error("no grid cell left after masking")]
    AllMasked,

    #[error("{count} missing value(s) in the regional average")]
    MissingValues { count: usize },

    #[error("unknown units '{units}' for {variable}")]
    UnknownUnits { variable: String, units: String },

    #[error("unlikely {variable} values: mean {mean:.3} {units} outside [{min}, {max}]")]
    UnlikelyValues {
        variable: String,
        mean: f64,
        units: String,
        min: f64,
        max: f64,
    },

    #[error("no common time step between the two variables")]
    NoCommonTime,

    #[error("{0} requires monthly data")]
    NeedsMonthly(&'static str),

    #[error("degenerate series: {0}")]
    Degenerate(String),

    #[error("{}", join_messages(.0))]
    Multiple(Vec<PreprocessError>),
}

fn join_messages(errors: &[PreprocessError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(KEYERROR_SEPARATOR)
}

impl PreprocessError {
    /// Fold several problems into one error, `None` when there are none.
    pub fn collect(mut errors: Vec<PreprocessError>) -> Option<PreprocessError> {
        match errors.len() {
            0 => None,
            1 => errors.pop(),
            _ => Some(PreprocessError::Multiple(errors)),
        }
    }
}

/// Result type for preprocessing steps.
pub type PreprocessResult<T> = Result<T, PreprocessError>;
