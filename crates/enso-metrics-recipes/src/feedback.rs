//! Dual-variable feedback recipes.
//!
//! A feedback is the regression slope of the second variable's anomaly index
//! on the first one's. The nonlinearity sub-value contrasts the slope over
//! positive and negative anomalies of the first variable.

use ndarray::{Array1, Array2};

use enso_metrics_core::recipe::{RecipeContext, RecipeOutput};
use enso_metrics_core::types::{AxisCoordinates, AxisDescriptor, Diagnostic, DiveDown, GriddedSeries};
use enso_metrics_core::EngineResult;

use crate::enso::{check_options, finish, metadata};
use crate::error::{PreprocessError, PreprocessResult};
use crate::preprocess::{align_time, regional_index, IndexSeries};
use crate::stats::{self, Regression};
use crate::units::VariableKind;

/// Slope difference between the positive and negative regimes of `x`.
///
/// `None` when either regime has too few points for a regression.
pub fn regime_nonlinearity(x: &Array1<f64>, y: &Array1<f64>) -> Option<(f64, f64)> {
    let split = |positive: bool| -> Option<Regression> {
        let (xs, ys): (Vec<f64>, Vec<f64>) = x
            .iter()
            .zip(y.iter())
            .filter(|(xv, _)| (**xv >= 0.0) == positive)
            .map(|(a, b)| (*a, *b))
            .unzip();
        stats::linregress(Array1::from(xs).view(), Array1::from(ys).view())
    };
    let warm = split(true)?;
    let cold = split(false)?;
    Some((warm.slope - cold.slope, warm.stderr + cold.stderr))
}

fn indices(
    first: &GriddedSeries,
    second: &GriddedSeries,
    kinds: (VariableKind, VariableKind),
    ctx: &RecipeContext<'_>,
) -> PreprocessResult<(IndexSeries, IndexSeries)> {
    let (first, second) = align_time(first, second)?;
    match (
        regional_index(&first, kinds.0, ctx.options),
        regional_index(&second, kinds.1, ctx.options),
    ) {
        (Ok(x), Ok(y)) if x.time == y.time => Ok((x, y)),
        (Ok(_), Ok(_)) => Err(PreprocessError::Degenerate(
            "processed indices do not share a time axis".to_string(),
        )),
        (x, y) => {
            let errors = [x.err(), y.err()].into_iter().flatten().collect();
            Err(PreprocessError::collect(errors).unwrap_or(PreprocessError::NoCommonTime))
        }
    }
}

/// Both indices side by side, one column per variable.
fn scatter_dive_down(x: &IndexSeries, y: &IndexSeries, kinds: (VariableKind, VariableKind), dataset: &str) -> DiveDown {
    let mut data = Array2::<f64>::zeros((x.len(), 2));
    data.column_mut(0).assign(&x.values);
    data.column_mut(1).assign(&y.values);
    DiveDown {
        description: format!("{} {} and {} anomaly indices", dataset, kinds.0, kinds.1),
        units: format!("{}, {}", x.units, y.units),
        data: data.into_dyn(),
        axes: vec![
            AxisDescriptor {
                name: "time".to_string(),
                units: None,
                coordinates: AxisCoordinates::Dates(x.time.clone()),
            },
            AxisDescriptor {
                name: "variable".to_string(),
                units: None,
                coordinates: AxisCoordinates::Values(vec![0.0, 1.0]),
            },
        ],
    }
}

fn feedback(
    name: &str,
    kinds: (VariableKind, VariableKind),
    first: &GriddedSeries,
    second: &GriddedSeries,
    ctx: &RecipeContext<'_>,
) -> EngineResult<RecipeOutput> {
    check_options(ctx.options)?;
    let units = if ctx.options.normalization {
        String::new()
    } else {
        format!("{}/{}", kinds.1.canonical_units(), kinds.0.canonical_units())
    };
    let meta = metadata(
        name,
        &units,
        &format!("Regression of {} anomalies on {} anomalies", kinds.1, kinds.0),
        "Slope of the least-squares fit; nonlinearity is the positive minus negative regime slope",
        ctx.options,
    );

    let result = indices(first, second, kinds, ctx).and_then(|(x, y)| {
        let fit = stats::linregress(x.values.view(), y.values.view())
            .ok_or_else(|| PreprocessError::Degenerate(format!("cannot regress {} on {}", kinds.1, kinds.0)))?;
        let mut diagnostic = Diagnostic::computed(fit.slope, Some(fit.stderr)).with_period(x.nyears(), x.time_period());
        if ctx.nonlinearity {
            let (value, error) = match regime_nonlinearity(&x.values, &y.values) {
                Some((v, e)) => (Some(v), Some(e)),
                None => (None, None),
            };
            diagnostic = diagnostic.with_nonlinearity(value, error);
        }
        if ctx.dive_down {
            diagnostic = diagnostic.with_dive_down(scatter_dive_down(&x, &y, kinds, ctx.dataset));
        }
        Ok(diagnostic)
    });

    Ok(finish(result, meta))
}

/// Wind stress response to SST (Bjerknes feedback).
pub fn enso_fb_sst_taux(sst: &GriddedSeries, taux: &GriddedSeries, ctx: &RecipeContext<'_>) -> EngineResult<RecipeOutput> {
    feedback("EnsoFbSstTaux", (VariableKind::Sst, VariableKind::Taux), sst, taux, ctx)
}

/// Heat flux response to SST (damping feedback).
pub fn enso_fb_sst_thf(sst: &GriddedSeries, thf: &GriddedSeries, ctx: &RecipeContext<'_>) -> EngineResult<RecipeOutput> {
    feedback("EnsoFbSstThf", (VariableKind::Sst, VariableKind::Thf), sst, thf, ctx)
}

/// SST response to sea surface height (thermocline feedback).
pub fn enso_fb_ssh_sst(ssh: &GriddedSeries, sst: &GriddedSeries, ctx: &RecipeContext<'_>) -> EngineResult<RecipeOutput> {
    feedback("EnsoFbSshSst", (VariableKind::Ssh, VariableKind::Sst), ssh, sst, ctx)
}

/// Sea surface height response to wind stress.
pub fn enso_fb_taux_ssh(taux: &GriddedSeries, ssh: &GriddedSeries, ctx: &RecipeContext<'_>) -> EngineResult<RecipeOutput> {
    feedback("EnsoFbTauxSsh", (VariableKind::Taux, VariableKind::Ssh), taux, ssh, ctx)
}
