//! Single-dataset recipe results.

use chrono::NaiveDate;
use ndarray::ArrayD;
use serde::{Deserialize, Serialize};

use super::metric::Measured;
use super::series::TimeBounds;

/// Separator used when several data problems apply to the same diagnostic.
pub const KEYERROR_SEPARATOR: &str = "; ";

/// Raw result of running one recipe against one dataset.
///
/// A diagnostic either carries numeric fields or a `keyerror`, never both:
/// every constructor and mutator that sets `keyerror` clears the numeric
/// fields. The `dive_down` payload is a visualization side channel and is
/// never serialized with the collection output (see
/// [`CollectionReport`](crate::reports::CollectionReport)).
///
/// # Example
///
/// ```
/// use enso_metrics_core::types::Diagnostic;
///
/// let mut diag = Diagnostic::computed(0.9, Some(0.05));
/// assert!(!diag.is_failed());
///
/// diag.append_keyerror("too short time period");
/// diag.append_keyerror("unknown units: furlongs");
/// assert_eq!(diag.value, None);
/// assert_eq!(
///     diag.keyerror.as_deref(),
///     Some("too short time period; unknown units: furlongs")
/// );
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Scalar diagnostic value.
    pub value: Option<f64>,

    /// Propagatable uncertainty of `value`.
    pub value_error: Option<f64>,

    /// Number of years used by the recipe.
    pub nyears: Option<u32>,

    /// First and last time step used by the recipe.
    pub time_period: Option<TimeBounds>,

    /// El Niño minus La Niña asymmetry of the diagnostic.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nonlinearity: Option<f64>,

    /// Uncertainty of `nonlinearity`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nonlinearity_error: Option<f64>,

    /// Visualization payload, persisted separately.
    #[serde(skip)]
    pub dive_down: Option<DiveDown>,

    /// Human-readable reason the diagnostic could not be computed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keyerror: Option<String>,
}

impl Diagnostic {
    /// Create a diagnostic holding a computed value.
    pub fn computed(value: f64, value_error: Option<f64>) -> Self {
        Self {
            value: Some(value),
            value_error,
            ..Default::default()
        }
    }

    /// Create a failed diagnostic carrying only a `keyerror`.
    pub fn failed(keyerror: impl Into<String>) -> Self {
        Self {
            keyerror: Some(keyerror.into()),
            ..Default::default()
        }
    }

    /// Attach the number of years and time period covered.
    pub fn with_period(mut self, nyears: u32, time_period: Option<TimeBounds>) -> Self {
        self.nyears = Some(nyears);
        self.time_period = time_period;
        self
    }

    /// Attach a nonlinearity sub-value.
    pub fn with_nonlinearity(mut self, value: Option<f64>, error: Option<f64>) -> Self {
        self.nonlinearity = value;
        self.nonlinearity_error = error;
        self
    }

    /// Attach a dive-down payload.
    pub fn with_dive_down(mut self, dive_down: DiveDown) -> Self {
        self.dive_down = Some(dive_down);
        self
    }

    /// Whether a `keyerror` is recorded.
    #[inline]
    pub fn is_failed(&self) -> bool {
        self.keyerror.is_some()
    }

    /// Record a data problem, joining with any previous one.
    ///
    /// Numeric fields are cleared; earlier messages are never overwritten.
    pub fn append_keyerror(&mut self, message: impl AsRef<str>) {
        let message = message.as_ref();
        self.keyerror = Some(match self.keyerror.take() {
            Some(existing) if !existing.is_empty() => {
                format!("{}{}{}", existing, KEYERROR_SEPARATOR, message)
            }
            _ => message.to_string(),
        });
        self.suppress_numeric();
    }

    /// Clear every numeric field and the dive-down payload.
    pub fn suppress_numeric(&mut self) {
        self.value = None;
        self.value_error = None;
        self.nyears = None;
        self.time_period = None;
        self.nonlinearity = None;
        self.nonlinearity_error = None;
        self.dive_down = None;
    }

    /// Primary value with its uncertainty.
    #[inline]
    pub fn measured(&self) -> Measured {
        Measured::new(self.value, self.value_error)
    }

    /// Nonlinearity sub-value with its uncertainty.
    #[inline]
    pub fn nonlinearity_measured(&self) -> Measured {
        Measured::new(self.nonlinearity, self.nonlinearity_error)
    }
}

/// Coordinates of one dive-down axis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AxisCoordinates {
    /// Calendar axis (time series).
    Dates(Vec<NaiveDate>),
    /// Numeric axis (longitude, latitude, lag...).
    Values(Vec<f64>),
}

impl AxisCoordinates {
    /// Number of points along the axis.
    pub fn len(&self) -> usize {
        match self {
            AxisCoordinates::Dates(d) => d.len(),
            AxisCoordinates::Values(v) => v.len(),
        }
    }

    /// Whether the axis has no points.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Name, units and coordinates of one dive-down axis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AxisDescriptor {
    pub name: String,
    pub units: Option<String>,
    pub coordinates: AxisCoordinates,
}

/// Lower-level array retained for visualization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiveDown {
    /// Short description of what the array holds.
    pub description: String,
    /// Units of the array values.
    pub units: String,
    /// The array, one dimension per entry of `axes`.
    pub data: ArrayD<f64>,
    /// Axis descriptors in dimension order.
    pub axes: Vec<AxisDescriptor>,
}

impl DiveDown {
    /// Check that every axis matches the corresponding array dimension.
    pub fn is_consistent(&self) -> bool {
        self.axes.len() == self.data.ndim()
            && self
                .axes
                .iter()
                .zip(self.data.shape())
                .all(|(axis, &n)| axis.coordinates.len() == n)
    }
}
