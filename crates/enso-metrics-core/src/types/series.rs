//! Resolved gridded series handed to recipes.

use chrono::{Months, NaiveDate};
use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};
use crate::types::KEYERROR_SEPARATOR;

/// Inclusive calendar interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeBounds {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl TimeBounds {
    /// Create bounds, rejecting `start > end`.
    pub fn new(start: NaiveDate, end: NaiveDate) -> EngineResult<Self> {
        if start > end {
            return Err(EngineError::invalid_param(
                "time_bounds",
                format!("{} .. {}", start, end),
                "start must not be after end",
            ));
        }
        Ok(Self { start, end })
    }

    /// Parse bounds from two `YYYY-MM-DD` strings.
    pub fn parse(start: &str, end: &str) -> EngineResult<Self> {
        let parse = |s: &str| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|e| {
                EngineError::invalid_param("time_bounds", s, format!("expected YYYY-MM-DD: {}", e))
            })
        };
        Self::new(parse(start)?, parse(end)?)
    }

    /// Whether `date` falls inside the bounds.
    #[inline]
    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }
}

/// Build a monthly time axis of `n` steps starting at `start`.
pub fn monthly_time_axis(start: NaiveDate, n: usize) -> Vec<NaiveDate> {
    (0..n)
        .filter_map(|i| start.checked_add_months(Months::new(i as u32)))
        .collect()
}

/// A physical variable resolved into memory for one dataset and region.
///
/// `data` is laid out as `(time, cell)`: regional selection has already been
/// applied by the resolver but spatial averaging has not, so recipes can weight
/// by `area` and mask by `landmask` (land fraction in `[0, 1]`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GriddedSeries {
    pub time: Vec<NaiveDate>,
    pub data: Array2<f64>,
    pub units: String,
    pub area: Option<Array1<f64>>,
    pub landmask: Option<Array1<f64>>,
}

impl GriddedSeries {
    /// Create a series without area weights or land mask.
    pub fn new(time: Vec<NaiveDate>, data: Array2<f64>, units: impl Into<String>) -> Self {
        Self {
            time,
            data,
            units: units.into(),
            area: None,
            landmask: None,
        }
    }

    /// Create a single-cell series from a time series.
    pub fn from_time_series(time: Vec<NaiveDate>, values: Vec<f64>, units: impl Into<String>) -> Self {
        let n = values.len();
        let data = Array1::from(values).into_shape((n, 1)).unwrap_or_else(|_| Array2::zeros((0, 1)));
        Self::new(time, data, units)
    }

    /// Attach area-cell weights.
    pub fn with_area(mut self, area: Array1<f64>) -> Self {
        self.area = Some(area);
        self
    }

    /// Attach a land-fraction mask.
    pub fn with_landmask(mut self, landmask: Array1<f64>) -> Self {
        self.landmask = Some(landmask);
        self
    }

    #[inline]
    pub fn ntime(&self) -> usize {
        self.data.len_of(Axis(0))
    }

    #[inline]
    pub fn ncells(&self) -> usize {
        self.data.len_of(Axis(1))
    }

    /// First and last time step, if any.
    pub fn time_period(&self) -> Option<TimeBounds> {
        match (self.time.first(), self.time.last()) {
            (Some(&start), Some(&end)) => Some(TimeBounds { start, end }),
            _ => None,
        }
    }

    /// Whether `other` shares this series' time axis and grid.
    pub fn same_layout(&self, other: &GriddedSeries) -> bool {
        self.time == other.time && self.data.dim() == other.data.dim()
    }

    /// Check internal consistency.
    ///
    /// Returns every problem found, joined with `"; "`, as a recoverable data
    /// error.
    pub fn validate(&self) -> Result<(), String> {
        let mut problems = Vec::new();
        if self.time.len() != self.ntime() {
            problems.push(format!(
                "time axis mismatch: {} time stamps for {} time steps",
                self.time.len(),
                self.ntime()
            ));
        }
        if let Some(area) = &self.area {
            if area.len() != self.ncells() {
                problems.push(format!(
                    "grid mismatch between variable ({} cells) and areacell ({} cells)",
                    self.ncells(),
                    area.len()
                ));
            }
        }
        if let Some(mask) = &self.landmask {
            if mask.len() != self.ncells() {
                problems.push(format!(
                    "grid mismatch between variable ({} cells) and landmask ({} cells)",
                    self.ncells(),
                    mask.len()
                ));
            }
        }
        if problems.is_empty() {
            Ok(())
        } else {
            Err(problems.join(KEYERROR_SEPARATOR))
        }
    }
}
