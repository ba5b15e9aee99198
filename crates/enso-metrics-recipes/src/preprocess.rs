//! Preprocessing pipeline turning a gridded series into a regional index.
//!
//! Steps, in order: time slicing, minimum-length check, land/ocean masking,
//! area-weighted average, unit normalization, anomalies, detrending,
//! smoothing and normalization. Each step reports data problems as a
//! [`PreprocessError`].

use chrono::{Datelike, NaiveDate};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};
use std::collections::{BTreeMap, BTreeSet};

use enso_metrics_core::options::{DetrendMethod, Frequency, RecipeOptions, SmoothSpec, SmoothingMethod};
use enso_metrics_core::types::{AxisCoordinates, AxisDescriptor, DiveDown, GriddedSeries, TimeBounds};

use crate::error::{PreprocessError, PreprocessResult};
use crate::stats;
use crate::units::VariableKind;

/// Minimum number of time steps when the options do not set one.
pub const DEFAULT_MIN_TIME_STEPS: usize = 24;

/// Land fraction above which a cell counts as land.
const LAND_THRESHOLD: f64 = 0.5;

/// Regional index time series in canonical units.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexSeries {
    pub time: Vec<NaiveDate>,
    pub values: Array1<f64>,
    pub units: &'static str,
}

impl IndexSeries {
    #[inline]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn time_period(&self) -> Option<TimeBounds> {
        match (self.time.first(), self.time.last()) {
            (Some(&start), Some(&end)) => Some(TimeBounds { start, end }),
            _ => None,
        }
    }

    /// Number of distinct calendar years covered.
    pub fn nyears(&self) -> u32 {
        self.time.iter().map(|d| d.year()).collect::<BTreeSet<_>>().len() as u32
    }

    /// The index as a dive-down payload over its time axis.
    pub fn dive_down(&self, description: impl Into<String>) -> DiveDown {
        DiveDown {
            description: description.into(),
            units: self.units.to_string(),
            data: self.values.clone().into_dyn(),
            axes: vec![AxisDescriptor {
                name: "time".to_string(),
                units: None,
                coordinates: AxisCoordinates::Dates(self.time.clone()),
            }],
        }
    }
}

/// Keep the time steps inside `bounds`.
pub fn slice_time(series: &GriddedSeries, bounds: Option<TimeBounds>) -> PreprocessResult<GriddedSeries> {
    let bounds = match bounds {
        Some(b) => b,
        None => return Ok(series.clone()),
    };
    let indices: Vec<usize> = series
        .time
        .iter()
        .enumerate()
        .filter(|(_, d)| bounds.contains(**d))
        .map(|(i, _)| i)
        .collect();
    if indices.is_empty() {
        return Err(PreprocessError::EmptyPeriod {
            start: bounds.start,
            end: bounds.end,
        });
    }
    Ok(select_times(series, &indices))
}

fn select_times(series: &GriddedSeries, indices: &[usize]) -> GriddedSeries {
    GriddedSeries {
        time: indices.iter().map(|&i| series.time[i]).collect(),
        data: series.data.select(Axis(0), indices),
        units: series.units.clone(),
        area: series.area.clone(),
        landmask: series.landmask.clone(),
    }
}

/// Restrict two series to their common time steps.
pub fn align_time(a: &GriddedSeries, b: &GriddedSeries) -> PreprocessResult<(GriddedSeries, GriddedSeries)> {
    if a.time == b.time {
        return Ok((a.clone(), b.clone()));
    }
    let b_index: BTreeMap<NaiveDate, usize> = b.time.iter().enumerate().map(|(i, d)| (*d, i)).collect();
    let (ia, ib): (Vec<usize>, Vec<usize>) = a
        .time
        .iter()
        .enumerate()
        .filter_map(|(i, d)| b_index.get(d).map(|&j| (i, j)))
        .unzip();
    if ia.is_empty() {
        return Err(PreprocessError::NoCommonTime);
    }
    Ok((select_times(a, &ia), select_times(b, &ib)))
}

/// Check the series has at least `min` time steps.
pub fn check_length(got: usize, min: usize) -> PreprocessResult<()> {
    if got < min {
        return Err(PreprocessError::TooShort { got, min });
    }
    Ok(())
}

/// Cells kept after masking, with their area weights.
pub fn apply_masks(
    series: &GriddedSeries,
    mask_land: bool,
    mask_ocean: bool,
) -> PreprocessResult<(Array2<f64>, Option<Array1<f64>>)> {
    if mask_land && mask_ocean {
        return Err(PreprocessError::BothMasked);
    }
    if !mask_land && !mask_ocean {
        return Ok((series.data.clone(), series.area.clone()));
    }
    let mask = series.landmask.as_ref().ok_or(PreprocessError::MissingLandmask)?;
    // land fraction may be given in percent
    let percent = mask.iter().any(|&v| v > 1.0);
    let keep: Vec<usize> = mask
        .iter()
        .map(|&v| if percent { v / 100.0 } else { v })
        .enumerate()
        .filter(|(_, fraction)| {
            let is_land = *fraction >= LAND_THRESHOLD;
            if mask_land {
                !is_land
            } else {
                is_land
            }
        })
        .map(|(i, _)| i)
        .collect();
    if keep.is_empty() {
        return Err(PreprocessError::AllMasked);
    }
    let data = series.data.select(Axis(1), &keep);
    let area = series.area.as_ref().map(|a| a.select(Axis(0), &keep));
    Ok((data, area))
}

/// Area-weighted average over cells, ignoring non-finite values.
pub fn spatial_average(data: ArrayView2<'_, f64>, area: Option<ArrayView1<'_, f64>>) -> PreprocessResult<Array1<f64>> {
    let ncells = data.len_of(Axis(1));
    let weights = match area {
        Some(a) => a.to_owned(),
        None => Array1::ones(ncells),
    };
    let averaged: Array1<f64> = data
        .axis_iter(Axis(0))
        .map(|row| {
            let (sum, wsum) = row
                .iter()
                .zip(weights.iter())
                .filter(|(v, w)| v.is_finite() && w.is_finite())
                .fold((0.0, 0.0), |(s, ws), (v, w)| (s + v * w, ws + w));
            if wsum > 0.0 {
                sum / wsum
            } else {
                f64::NAN
            }
        })
        .collect();
    let missing = averaged.iter().filter(|v| !v.is_finite()).count();
    if missing > 0 {
        return Err(PreprocessError::MissingValues { count: missing });
    }
    Ok(averaged)
}

/// Remove the mean seasonal cycle (monthly) or average to years and remove
/// the mean (yearly).
pub fn anomalies(
    time: &[NaiveDate],
    values: &Array1<f64>,
    frequency: Frequency,
) -> PreprocessResult<(Vec<NaiveDate>, Array1<f64>)> {
    match frequency {
        Frequency::Monthly => {
            let mut sums = [0.0f64; 12];
            let mut counts = [0usize; 12];
            for (d, v) in time.iter().zip(values.iter()) {
                let m = d.month0() as usize;
                sums[m] += v;
                counts[m] += 1;
            }
            let anomalies = time
                .iter()
                .zip(values.iter())
                .map(|(d, v)| {
                    let m = d.month0() as usize;
                    v - sums[m] / counts[m] as f64
                })
                .collect();
            Ok((time.to_vec(), anomalies))
        }
        Frequency::Yearly => {
            let mut years: BTreeMap<i32, (NaiveDate, f64, usize)> = BTreeMap::new();
            for (d, v) in time.iter().zip(values.iter()) {
                let slot = years.entry(d.year()).or_insert((*d, 0.0, 0));
                slot.1 += v;
                slot.2 += 1;
            }
            let yearly_time: Vec<NaiveDate> = years.values().map(|(d, _, _)| *d).collect();
            let yearly: Array1<f64> = years.values().map(|(_, s, n)| s / *n as f64).collect();
            let mean = yearly
                .mean()
                .ok_or_else(|| PreprocessError::Degenerate("no year to average".to_string()))?;
            Ok((yearly_time, yearly.mapv(|v| v - mean)))
        }
    }
}

/// Remove a trend.
pub fn detrend(values: &Array1<f64>, method: DetrendMethod) -> Array1<f64> {
    match method {
        DetrendMethod::Linear => match stats::trend(values.view()) {
            Some(fit) => Array1::from_iter(
                values
                    .iter()
                    .enumerate()
                    .map(|(i, v)| v - (fit.slope * i as f64 + fit.intercept)),
            ),
            None => values.clone(),
        },
    }
}

fn kernel(spec: &SmoothSpec) -> Array1<f64> {
    let w = spec.window;
    let raw: Array1<f64> = match spec.method {
        SmoothingMethod::Box => Array1::ones(w),
        SmoothingMethod::Triangle => (0..w).map(|i| (i + 1).min(w - i) as f64).collect(),
    };
    let total = raw.sum();
    raw / total
}

/// Running mean over complete windows only; the time axis is trimmed so each
/// value sits at the centre of its window.
pub fn smooth(
    time: &[NaiveDate],
    values: &Array1<f64>,
    spec: &SmoothSpec,
) -> PreprocessResult<(Vec<NaiveDate>, Array1<f64>)> {
    let n = values.len();
    let w = spec.window.max(1);
    if n < w {
        return Err(PreprocessError::TooShort { got: n, min: w });
    }
    let weights = kernel(spec);
    let smoothed: Array1<f64> = values
        .windows(w)
        .into_iter()
        .map(|window| window.dot(&weights))
        .collect();
    let start = w / 2;
    let trimmed = time[start..start + smoothed.len()].to_vec();
    Ok((trimmed, smoothed))
}

/// Divide by the standard deviation.
pub fn standardize(values: &Array1<f64>) -> PreprocessResult<Array1<f64>> {
    match stats::std_dev(values.view(), 0.0) {
        Some(sd) if sd > 0.0 => Ok(values / sd),
        _ => Err(PreprocessError::Degenerate("zero variance, cannot normalize".to_string())),
    }
}

/// Minimum time steps required by `options`.
pub fn min_time_steps(options: &RecipeOptions) -> usize {
    options
        .min_time_steps
        .map_or(DEFAULT_MIN_TIME_STEPS, |m| m as usize)
}

/// Run the whole pipeline on one series.
pub fn regional_index(
    series: &GriddedSeries,
    kind: VariableKind,
    options: &RecipeOptions,
) -> PreprocessResult<IndexSeries> {
    let mut problems = Vec::new();
    if options.mask_land && options.mask_ocean {
        problems.push(PreprocessError::BothMasked);
    }
    if !kind.accepts(&series.units) {
        problems.push(PreprocessError::UnknownUnits {
            variable: kind.name().to_string(),
            units: series.units.clone(),
        });
    }
    if let Some(err) = PreprocessError::collect(problems) {
        return Err(err);
    }

    let sliced = slice_time(series, options.time_bounds)?;
    check_length(sliced.ntime(), min_time_steps(options))?;

    let (data, area) = apply_masks(&sliced, options.mask_land, options.mask_ocean)?;
    let mut values = spatial_average(data.view(), area.as_ref().map(|a| a.view()))?;
    kind.normalize(&mut values, &series.units)?;

    let (mut time, mut values) = anomalies(&sliced.time, &values, options.frequency)?;
    if let Some(detrending) = options.detrending {
        values = detrend(&values, detrending.method);
    }
    if let Some(smoothing) = &options.smoothing {
        let (t, v) = smooth(&time, &values, smoothing)?;
        time = t;
        values = v;
    }
    if options.normalization {
        values = standardize(&values)?;
    }
    check_length(values.len(), 3)?;

    Ok(IndexSeries {
        time,
        values,
        units: if options.normalization { "" } else { kind.canonical_units() },
    })
}
