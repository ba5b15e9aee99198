//! Deterministic fixtures.
//!
//! Recipes here are deliberately small: the numerics under test live in the
//! calculator and aggregator, not in the recipes.

use chrono::NaiveDate;
use std::f64::consts::PI;

use enso_metrics_core::recipe::{RecipeContext, RecipeMetadata, RecipeOutput, RecipeSet};
use enso_metrics_core::resolver::InMemoryResolver;
use enso_metrics_core::types::{monthly_time_axis, DatasetRef, Diagnostic, GriddedSeries, VariableEntry};
use enso_metrics_core::EngineResult;

pub const MONTHS: usize = 48;
pub const REGION: &str = "nino3.4";

/// Units label that makes the fixture recipes report a data error.
pub const BAD_UNITS: &str = "bad";
/// Units label that makes the fixture recipes return a null value.
pub const NULL_UNITS: &str = "null";

/// Seasonal sine around `offset`; its mean over whole years is `offset`.
pub fn sine(offset: f64, amplitude: f64, units: &str) -> GriddedSeries {
    let start = NaiveDate::from_ymd_opt(1990, 1, 15).unwrap();
    let values = (0..MONTHS)
        .map(|i| offset + amplitude * (2.0 * PI * i as f64 / 12.0).sin())
        .collect();
    GriddedSeries::from_time_series(monthly_time_axis(start, MONTHS), values, units)
}

fn mean(series: &GriddedSeries) -> f64 {
    series.data.column(0).mean().unwrap_or(f64::NAN)
}

fn metadata(name: &str, units: &str, ctx: &RecipeContext<'_>) -> RecipeMetadata {
    RecipeMetadata {
        name: name.to_string(),
        units: units.to_string(),
        method: format!("{} of the regional series", name.to_lowercase()),
        time_frequency: ctx.options.frequency.to_string(),
        reference: "fixture".to_string(),
    }
}

/// Mean of the series with a fixed error.
pub fn mean_recipe(series: &GriddedSeries, ctx: &RecipeContext<'_>) -> EngineResult<RecipeOutput> {
    let meta = metadata("Mean", &series.units, ctx);
    if series.units == BAD_UNITS {
        return Ok(RecipeOutput::failed("unknown units: bad", meta));
    }
    let value = if series.units == NULL_UNITS { None } else { Some(mean(series)) };
    let diagnostic = Diagnostic {
        value,
        value_error: Some(0.1),
        ..Default::default()
    }
    .with_period((series.ntime() / 12) as u32, series.time_period());
    Ok(RecipeOutput::new(diagnostic, meta))
}

/// Mean of the first series as value, mean of the second as nonlinearity.
pub fn pair_recipe(first: &GriddedSeries, second: &GriddedSeries, ctx: &RecipeContext<'_>) -> EngineResult<RecipeOutput> {
    let meta = metadata("Pair", &first.units, ctx);
    if first.units == BAD_UNITS || second.units == BAD_UNITS {
        return Ok(RecipeOutput::failed("unknown units: bad", meta));
    }
    let value = (first.units != NULL_UNITS).then(|| mean(first));
    let mut diagnostic = Diagnostic {
        value,
        value_error: Some(0.1),
        ..Default::default()
    };
    if ctx.nonlinearity {
        let nl = (second.units != NULL_UNITS).then(|| mean(second));
        diagnostic = diagnostic.with_nonlinearity(nl, Some(0.05));
    }
    Ok(RecipeOutput::new(diagnostic, meta))
}

pub fn recipes() -> RecipeSet {
    let mut recipes = RecipeSet::new();
    recipes
        .register_single("MeanSst", mean_recipe)
        .register_single("MeanTaux", mean_recipe)
        .register_single("MeanSsh", mean_recipe)
        .register_dual("Pair", pair_recipe);
    recipes
}

/// Variable of a fixture dataset.
#[derive(Debug, Clone, Copy)]
pub struct Var {
    pub name: &'static str,
    pub offset: f64,
    pub units: &'static str,
}

pub const fn var(name: &'static str, offset: f64) -> Var {
    Var {
        name,
        offset,
        units: "C",
    }
}

pub const fn var_with_units(name: &'static str, offset: f64, units: &'static str) -> Var {
    Var { name, offset, units }
}

/// Store `vars` for `dataset` and return its reference.
pub fn dataset(resolver: &mut InMemoryResolver, name: &str, vars: &[Var]) -> DatasetRef {
    let mut reference = DatasetRef::new(name);
    for v in vars {
        let path = format!("{}/{}.nc", name, v.name);
        resolver.insert(&path, v.name, REGION, sine(v.offset, 1.0, v.units));
        reference = reference.with_variable(v.name, VariableEntry::simple(path, v.name));
    }
    reference
}
