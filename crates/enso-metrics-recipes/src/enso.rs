//! Single-variable ENSO recipes over the Niño SST index.

use chrono::Datelike;
use ndarray::Array1;
use tracing::debug;

use enso_metrics_core::options::{Frequency, RecipeOptions};
use enso_metrics_core::recipe::{RecipeContext, RecipeMetadata, RecipeOutput};
use enso_metrics_core::types::{AxisCoordinates, AxisDescriptor, Diagnostic, DiveDown, GriddedSeries};
use enso_metrics_core::EngineResult;

use crate::error::{PreprocessError, PreprocessResult};
use crate::preprocess::{regional_index, IndexSeries};
use crate::stats;
use crate::units::VariableKind;

/// Autocorrelation level bounding an event's duration.
pub const DURATION_THRESHOLD: f64 = 0.25;

/// Longest lag, in time steps, explored by [`enso_duration`].
const MAX_DURATION_LAG: usize = 36;

const NDJ: [u32; 3] = [11, 12, 1];
const MAM: [u32; 3] = [3, 4, 5];

/// Reject option values no dataset could satisfy.
pub(crate) fn check_options(options: &RecipeOptions) -> EngineResult<()> {
    options.smoothing.map(|s| s.validate()).transpose()?;
    Ok(())
}

pub(crate) fn metadata(name: &str, units: &str, method: &str, reference: &str, options: &RecipeOptions) -> RecipeMetadata {
    RecipeMetadata {
        name: name.to_string(),
        units: units.to_string(),
        method: method.to_string(),
        time_frequency: options.frequency.to_string(),
        reference: reference.to_string(),
    }
}

fn index_units(kind: VariableKind, options: &RecipeOptions) -> &'static str {
    if options.normalization {
        ""
    } else {
        kind.canonical_units()
    }
}

/// Standard error of a standard deviation estimated from `n` samples.
fn std_error(sd: f64, n: usize) -> Option<f64> {
    if n < 2 {
        return None;
    }
    Some(sd / (2.0 * (n as f64 - 1.0)).sqrt())
}

/// Wrap a diagnostic computation, turning data problems into a failed output.
pub(crate) fn finish(result: PreprocessResult<Diagnostic>, metadata: RecipeMetadata) -> RecipeOutput {
    match result {
        Ok(diagnostic) => RecipeOutput::new(diagnostic, metadata),
        Err(err) => {
            debug!(recipe = %metadata.name, error = %err, "Recipe produced no value");
            RecipeOutput::failed(err.to_string(), metadata)
        }
    }
}

fn with_index_period(diagnostic: Diagnostic, index: &IndexSeries) -> Diagnostic {
    diagnostic.with_period(index.nyears(), index.time_period())
}

/// ENSO amplitude: standard deviation of the SST anomaly index.
pub fn enso_ampl(sst: &GriddedSeries, ctx: &RecipeContext<'_>) -> EngineResult<RecipeOutput> {
    check_options(ctx.options)?;
    let meta = metadata(
        "EnsoAmpl",
        index_units(VariableKind::Sst, ctx.options),
        "Standard deviation of the regional SST anomaly index",
        "ENSO amplitude; errors follow the standard error of a standard deviation",
        ctx.options,
    );

    let result = regional_index(sst, VariableKind::Sst, ctx.options).and_then(|index| {
        let sd = stats::std_dev(index.values.view(), 0.0)
            .ok_or_else(|| PreprocessError::Degenerate("empty index".to_string()))?;
        let mut diagnostic = with_index_period(Diagnostic::computed(sd, std_error(sd, index.len())), &index);
        if ctx.dive_down {
            diagnostic = diagnostic.with_dive_down(index.dive_down(format!("{} SST anomaly index", ctx.dataset)));
        }
        Ok(diagnostic)
    });
    Ok(finish(result, meta))
}

/// ENSO seasonality: standard deviation in November-January over
/// standard deviation in March-May.
pub fn enso_seasonality(sst: &GriddedSeries, ctx: &RecipeContext<'_>) -> EngineResult<RecipeOutput> {
    check_options(ctx.options)?;
    let meta = metadata(
        "EnsoSeasonality",
        "",
        "Ratio of the NDJ to the MAM standard deviation of the SST anomaly index",
        "ENSO phase locking to the seasonal cycle",
        ctx.options,
    );
    if ctx.options.frequency != Frequency::Monthly {
        return Ok(RecipeOutput::failed(
            PreprocessError::NeedsMonthly("EnsoSeasonality").to_string(),
            meta,
        ));
    }

    // smoothing across months would blur the seasonal contrast
    let options = RecipeOptions {
        smoothing: None,
        ..ctx.options.clone()
    };
    let result = regional_index(sst, VariableKind::Sst, &options).and_then(|index| {
        let (ndj, n_ndj) = season_std(&index, &NDJ)?;
        let (mam, n_mam) = season_std(&index, &MAM)?;
        if mam <= 0.0 {
            return Err(PreprocessError::Degenerate("zero MAM variability".to_string()));
        }
        let value = ndj / mam;
        let error = match (std_error(ndj, n_ndj), std_error(mam, n_mam)) {
            (Some(e_ndj), Some(e_mam)) => Some((mam * e_ndj + ndj * e_mam) / (mam * mam)),
            _ => None,
        };
        let mut diagnostic = with_index_period(Diagnostic::computed(value, error), &index);
        if ctx.dive_down {
            diagnostic = diagnostic.with_dive_down(monthly_std_dive_down(&index, ctx.dataset)?);
        }
        Ok(diagnostic)
    });
    Ok(finish(result, meta))
}

fn season_std(index: &IndexSeries, months: &[u32]) -> PreprocessResult<(f64, usize)> {
    let values: Array1<f64> = index
        .time
        .iter()
        .zip(index.values.iter())
        .filter(|(d, _)| months.contains(&d.month()))
        .map(|(_, v)| *v)
        .collect();
    let sd = stats::std_dev(values.view(), 0.0).ok_or_else(|| {
        PreprocessError::Degenerate(format!("no time step in months {:?}", months))
    })?;
    Ok((sd, values.len()))
}

fn monthly_std_dive_down(index: &IndexSeries, dataset: &str) -> PreprocessResult<DiveDown> {
    let per_month = (1..=12u32)
        .map(|m| season_std(index, &[m]).map(|(sd, _)| sd))
        .collect::<PreprocessResult<Vec<f64>>>()?;
    Ok(DiveDown {
        description: format!("{} SST anomaly standard deviation per calendar month", dataset),
        units: index.units.to_string(),
        data: Array1::from(per_month).into_dyn(),
        axes: vec![AxisDescriptor {
            name: "month".to_string(),
            units: None,
            coordinates: AxisCoordinates::Values((1..=12).map(f64::from).collect()),
        }],
    })
}

/// ENSO skewness of the SST anomaly index.
pub fn enso_sst_skew(sst: &GriddedSeries, ctx: &RecipeContext<'_>) -> EngineResult<RecipeOutput> {
    check_options(ctx.options)?;
    let meta = metadata(
        "EnsoSstSkew",
        "",
        "Skewness of the regional SST anomaly index",
        "ENSO asymmetry between warm and cold events",
        ctx.options,
    );

    let result = regional_index(sst, VariableKind::Sst, ctx.options).and_then(|index| {
        let skew = stats::skewness(index.values.view())
            .ok_or_else(|| PreprocessError::Degenerate("zero variance, skewness undefined".to_string()))?;
        let error = (6.0 / index.len() as f64).sqrt();
        let mut diagnostic = with_index_period(Diagnostic::computed(skew, Some(error)), &index);
        if ctx.dive_down {
            diagnostic = diagnostic.with_dive_down(index.dive_down(format!("{} SST anomaly index", ctx.dataset)));
        }
        Ok(diagnostic)
    });
    Ok(finish(result, meta))
}

/// ENSO duration: width in months of the lag window around 0 over which the
/// index autocorrelation stays above [`DURATION_THRESHOLD`].
pub fn enso_duration(sst: &GriddedSeries, ctx: &RecipeContext<'_>) -> EngineResult<RecipeOutput> {
    check_options(ctx.options)?;
    let meta = metadata(
        "EnsoDuration",
        "months",
        "Width of the lag window where the SST anomaly autocorrelation exceeds 0.25",
        "ENSO event duration from the lagged autocorrelation",
        ctx.options,
    );

    let result = regional_index(sst, VariableKind::Sst, ctx.options).and_then(|index| {
        let max_lag = MAX_DURATION_LAG.min(index.len() - 1);
        let acf = stats::lag_autocorrelation(index.values.view(), max_lag)
            .ok_or_else(|| PreprocessError::Degenerate("zero variance, autocorrelation undefined".to_string()))?;
        // positive lags start at the centre of the symmetric curve
        let above = acf
            .iter()
            .skip(max_lag)
            .take_while(|&&r| r > DURATION_THRESHOLD)
            .count();
        let months_per_step = 12 / ctx.options.frequency.steps_per_year();
        let width = (2 * above.saturating_sub(1) + 1) * months_per_step;

        let mut diagnostic = with_index_period(Diagnostic::computed(width as f64, None), &index);
        if ctx.dive_down {
            let lags: Vec<f64> = (0..acf.len())
                .map(|i| (i as f64 - max_lag as f64) * months_per_step as f64)
                .collect();
            diagnostic = diagnostic.with_dive_down(DiveDown {
                description: format!("{} SST anomaly lagged autocorrelation", ctx.dataset),
                units: String::new(),
                data: acf.into_dyn(),
                axes: vec![AxisDescriptor {
                    name: "lag".to_string(),
                    units: Some("months".to_string()),
                    coordinates: AxisCoordinates::Values(lags),
                }],
            });
        }
        Ok(diagnostic)
    });
    Ok(finish(result, meta))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use enso_metrics_core::options::SmoothSpec;
    use enso_metrics_core::types::monthly_time_axis;
    use std::f64::consts::PI;

    const N: usize = 480;

    fn sst(f: impl Fn(usize) -> f64) -> GriddedSeries {
        let start = NaiveDate::from_ymd_opt(1980, 1, 15).unwrap();
        GriddedSeries::from_time_series(monthly_time_axis(start, N), (0..N).map(|i| 27.0 + f(i)).collect(), "C")
    }

    /// Four-year oscillation, invisible to the monthly climatology.
    fn oscillation(i: usize) -> f64 {
        (2.0 * PI * i as f64 / 48.0).sin()
    }

    fn ctx(options: &RecipeOptions, dive_down: bool) -> RecipeContext<'_> {
        RecipeContext {
            dataset: "model",
            options,
            dive_down,
            nonlinearity: false,
        }
    }

    #[test]
    fn test_ampl_of_sine() {
        let options = RecipeOptions::default();
        let out = enso_ampl(&sst(|i| 2.0 * oscillation(i)), &ctx(&options, true)).unwrap();
        let d = &out.diagnostic;
        let expected = 2.0 / 2f64.sqrt();
        assert!((d.value.unwrap() - expected).abs() < 1e-9);
        assert!((d.value_error.unwrap() - expected / (2.0 * (N as f64 - 1.0)).sqrt()).abs() < 1e-12);
        assert_eq!(d.nyears, Some(40));
        assert_eq!(out.metadata.units, "°C");
        assert_eq!(out.metadata.time_frequency, "monthly");
        let dive = d.dive_down.as_ref().unwrap();
        assert!(dive.is_consistent());
        assert_eq!(dive.data.len(), N);
    }

    #[test]
    fn test_ampl_short_series_is_keyerror() {
        let options = RecipeOptions {
            min_time_steps: Some(600),
            ..Default::default()
        };
        let out = enso_ampl(&sst(oscillation), &ctx(&options, false)).unwrap();
        assert_eq!(
            out.diagnostic.keyerror.as_deref(),
            Some("too short time period: 480 time steps, at least 600 required")
        );
        assert_eq!(out.diagnostic.value, None);
        assert_eq!(out.metadata.name, "EnsoAmpl");
    }

    #[test]
    fn test_invalid_smoothing_is_hard_error() {
        let options = RecipeOptions {
            smoothing: Some(SmoothSpec {
                method: enso_metrics_core::options::SmoothingMethod::Box,
                window: 0,
            }),
            ..Default::default()
        };
        assert!(enso_ampl(&sst(oscillation), &ctx(&options, false)).is_err());
    }

    #[test]
    fn test_seasonality_ratio() {
        // doubled variability in NDJ
        let series = sst(|i| {
            let month0 = i % 12;
            let factor = if matches!(month0, 10 | 11 | 0) { 2.0 } else { 1.0 };
            factor * oscillation(i)
        });
        let options = RecipeOptions::default();
        let out = enso_seasonality(&series, &ctx(&options, true)).unwrap();
        assert!((out.diagnostic.value.unwrap() - 2.0).abs() < 1e-9);
        assert!(out.diagnostic.value_error.unwrap() > 0.0);
        let dive = out.diagnostic.dive_down.unwrap();
        assert_eq!(dive.data.len(), 12);
        assert!(dive.is_consistent());
    }

    #[test]
    fn test_seasonality_needs_monthly() {
        let options = RecipeOptions {
            frequency: Frequency::Yearly,
            ..Default::default()
        };
        let out = enso_seasonality(&sst(oscillation), &ctx(&options, false)).unwrap();
        assert_eq!(out.diagnostic.keyerror.as_deref(), Some("EnsoSeasonality requires monthly data"));
    }

    #[test]
    fn test_skewness_sign() {
        let options = RecipeOptions::default();
        let symmetric = enso_sst_skew(&sst(oscillation), &ctx(&options, false)).unwrap();
        assert!(symmetric.diagnostic.value.unwrap().abs() < 1e-9);
        assert!((symmetric.diagnostic.value_error.unwrap() - (6.0 / N as f64).sqrt()).abs() < 1e-12);

        let warm_heavy = sst(|i| oscillation(i) + 0.5 * oscillation(i).powi(2));
        let skewed = enso_sst_skew(&warm_heavy, &ctx(&options, false)).unwrap();
        assert!(skewed.diagnostic.value.unwrap() > 0.0);
    }

    #[test]
    fn test_duration() {
        let options = RecipeOptions::default();
        let out = enso_duration(&sst(oscillation), &ctx(&options, true)).unwrap();
        let width = out.diagnostic.value.unwrap();
        assert!(width > 1.0);
        assert_eq!(width as usize % 2, 1);
        assert_eq!(out.diagnostic.value_error, None);
        let dive = out.diagnostic.dive_down.unwrap();
        assert_eq!(dive.data.len(), 2 * MAX_DURATION_LAG + 1);
        assert!(dive.is_consistent());
    }

    #[test]
    fn test_flat_series_is_degenerate() {
        let options = RecipeOptions::default();
        let out = enso_sst_skew(&sst(|_| 0.0), &ctx(&options, false)).unwrap();
        assert!(out.diagnostic.keyerror.unwrap().starts_with("degenerate series"));
    }
}
