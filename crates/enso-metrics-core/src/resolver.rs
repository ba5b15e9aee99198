//! Dataset resolver contract.
//!
//! Reading variables, area cells and land masks from files is the job of an
//! external collaborator implementing [`DatasetResolver`]. The engine only sees
//! the resulting [`GriddedSeries`] or a human-readable data error that becomes
//! the diagnostic's `keyerror`.
//!
//! [`InMemoryResolver`] serves pre-loaded series and is what the engine's own
//! tests and callers with data already in memory use. It also shows how
//! composite variables are presented to the runner as a single combined series.

use ndarray::Array1;
use std::collections::BTreeMap;

use crate::types::{CombineOp, DatasetRef, GriddedSeries, VariableSource};

/// Turns a dataset reference into in-memory series.
pub trait DatasetResolver: Send + Sync {
    /// Resolve `variable` over `region` for `dataset`.
    ///
    /// `Err` carries a recoverable data error (unknown variable, grid
    /// mismatch...) and must not be used for anything else.
    fn resolve(&self, dataset: &DatasetRef, variable: &str, region: &str) -> Result<GriddedSeries, String>;
}

/// A dataset (or composite observation) with its series resolved, in the
/// order of the metric's variables.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedDataset {
    pub name: String,
    pub series: Vec<GriddedSeries>,
}

impl ResolvedDataset {
    pub fn new(name: impl Into<String>, series: Vec<GriddedSeries>) -> Self {
        Self {
            name: name.into(),
            series,
        }
    }
}

/// Combine the components of a composite variable into one series.
///
/// All components must share time axis, grid and units.
pub fn combine_components(components: &[GriddedSeries], combine: CombineOp) -> Result<GriddedSeries, String> {
    let (first, rest) = components
        .split_first()
        .ok_or_else(|| "composite variable has no components".to_string())?;

    let mut combined = first.clone();
    for component in rest {
        if !component.same_layout(first) {
            return Err(format!(
                "grid mismatch between components of composite variable: {:?} vs {:?}",
                first.data.dim(),
                component.data.dim()
            ));
        }
        if component.units != first.units {
            return Err(format!(
                "unit mismatch between components of composite variable: '{}' vs '{}'",
                first.units, component.units
            ));
        }
        match combine {
            CombineOp::Sum => combined.data += &component.data,
            CombineOp::Difference => combined.data -= &component.data,
        }
    }
    Ok(combined)
}

type SeriesKey = (String, String, String);

/// Resolver over series already held in memory.
///
/// Series are keyed by (file path, varname in file, region), mirroring how a
/// file-backed resolver would locate them.
#[derive(Debug, Clone, Default)]
pub struct InMemoryResolver {
    series: BTreeMap<SeriesKey, GriddedSeries>,
    areas: BTreeMap<SeriesKey, Array1<f64>>,
    landmasks: BTreeMap<SeriesKey, Array1<f64>>,
}

fn key(path: &str, name: &str, region: &str) -> SeriesKey {
    (path.to_string(), name.to_string(), region.to_string())
}

impl InMemoryResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store the series of `varname` in `path` over `region`.
    pub fn insert(&mut self, path: &str, varname: &str, region: &str, series: GriddedSeries) -> &mut Self {
        self.series.insert(key(path, varname, region), series);
        self
    }

    /// Store area-cell weights.
    pub fn insert_area(&mut self, path: &str, name: &str, region: &str, area: Array1<f64>) -> &mut Self {
        self.areas.insert(key(path, name, region), area);
        self
    }

    /// Store a land-fraction mask.
    pub fn insert_landmask(&mut self, path: &str, name: &str, region: &str, mask: Array1<f64>) -> &mut Self {
        self.landmasks.insert(key(path, name, region), mask);
        self
    }

    fn lookup(&self, path: &str, varname: &str, region: &str) -> Result<GriddedSeries, String> {
        self.series
            .get(&key(path, varname, region))
            .cloned()
            .ok_or_else(|| {
                format!(
                    "unknown variable name '{}' in file '{}' for region '{}'",
                    varname, path, region
                )
            })
    }
}

impl DatasetResolver for InMemoryResolver {
    fn resolve(&self, dataset: &DatasetRef, variable: &str, region: &str) -> Result<GriddedSeries, String> {
        let entry = dataset.entry(variable).ok_or_else(|| {
            format!("variable '{}' not provided by dataset '{}'", variable, dataset.name)
        })?;
        let source = entry.source().map_err(|e| e.to_string())?;

        let mut series = match &source {
            VariableSource::Simple(fv) => self.lookup(&fv.path, &fv.varname, region)?,
            VariableSource::Composite { components, combine } => {
                let parts = components
                    .iter()
                    .map(|fv| self.lookup(&fv.path, &fv.varname, region))
                    .collect::<Result<Vec<_>, _>>()?;
                combine_components(&parts, *combine)?
            }
        };

        if let (Some(path), Some(name)) = (&entry.area_path, &entry.area_name) {
            let area = self.areas.get(&key(path, name, region)).ok_or_else(|| {
                format!("unknown areacell variable '{}' in file '{}'", name, path)
            })?;
            series.area = Some(area.clone());
        }
        if let (Some(path), Some(name)) = (&entry.landmask_path, &entry.landmask_name) {
            let mask = self.landmasks.get(&key(path, name, region)).ok_or_else(|| {
                format!("unknown landmask variable '{}' in file '{}'", name, path)
            })?;
            series.landmask = Some(mask.clone());
        }

        series.validate()?;
        Ok(series)
    }
}
