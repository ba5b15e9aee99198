//! Deterministic synthetic datasets.
//!
//! Every dataset is driven by the same four-year oscillation with its own
//! amplitude, so diagnostics differ between datasets in a predictable way.

use chrono::NaiveDate;
use ndarray::{array, Array2};
use std::f64::consts::PI;

use enso_metrics_core::resolver::InMemoryResolver;
use enso_metrics_core::types::{monthly_time_axis, DatasetRef, GriddedSeries, VariableEntry};

/// Length of every synthetic record, 30 years.
pub const MONTHS: usize = 360;

/// Regions the built-in collections read.
pub const REGIONS: [&str; 3] = ["nino3", "nino3.4", "nino4"];

/// Observational catalogue: dataset name and the variables it provides.
pub const OBSERVATIONS: [(&str, &[&str]); 5] = [
    ("HadISST", &["sst"]),
    ("ERA-Interim", &["sst", "taux", "thf"]),
    ("Tropflux", &["sst", "taux", "thf"]),
    ("AVISO", &["ssh"]),
    ("SODA3.4.2", &["ssh"]),
];

/// Variables provided by the model.
pub const MODEL_VARIABLES: [&str; 4] = ["sst", "taux", "thf", "ssh"];

/// Knobs of one synthetic climate.
#[derive(Debug, Clone, Copy)]
pub struct Climate {
    /// SST anomaly amplitude in degrees.
    pub amplitude: f64,
    /// Wind stress response in 1e-3 N/m2 per degree.
    pub coupling: f64,
    /// Extra response to warm anomalies, same units as `coupling`.
    pub asymmetry: f64,
}

impl Climate {
    pub const fn new(amplitude: f64, coupling: f64) -> Self {
        Self {
            amplitude,
            coupling,
            asymmetry: 0.0,
        }
    }

    pub const fn with_asymmetry(mut self, asymmetry: f64) -> Self {
        self.asymmetry = asymmetry;
        self
    }

    /// SST anomaly at month `i`.
    pub fn anomaly(&self, i: usize) -> f64 {
        self.amplitude * (2.0 * PI * i as f64 / 48.0).sin() + 0.1 * (0.37 * i as f64).sin()
    }

    fn seasonal(i: usize) -> f64 {
        1.5 * (2.0 * PI * (i % 12) as f64 / 12.0).cos()
    }

    /// Values of `variable` in its native units, with the unit string.
    pub fn values(&self, variable: &str) -> (Vec<f64>, &'static str) {
        let anomalies = (0..MONTHS).map(|i| (i, self.anomaly(i)));
        match variable {
            "sst" => (anomalies.map(|(i, x)| 27.0 + Self::seasonal(i) + x).collect(), "degC"),
            "taux" => (
                anomalies
                    .map(|(_, x)| {
                        let warm = if x > 0.0 { self.asymmetry * x } else { 0.0 };
                        (-40.0 + self.coupling * x + warm) / 1000.0
                    })
                    .collect(),
                "N/m2",
            ),
            "thf" => (anomalies.map(|(_, x)| -10.0 - 15.0 * x).collect(), "W/m2"),
            "ssh" => (anomalies.map(|(_, x)| 0.05 * x).collect(), "m"),
            _ => (vec![0.0; MONTHS], "1"),
        }
    }
}

pub const MODEL_CLIMATE: Climate = Climate::new(1.2, 10.0);

pub fn start() -> NaiveDate {
    NaiveDate::from_ymd_opt(1980, 1, 15).unwrap()
}

/// Climate of each catalogued observation.
pub fn observed_climate(name: &str) -> Climate {
    match name {
        "HadISST" => Climate::new(1.0, 12.0),
        "ERA-Interim" => Climate::new(0.9, 13.0),
        "Tropflux" => Climate::new(1.1, 11.0),
        _ => Climate::new(1.0, 12.0),
    }
}

pub fn file_name(dataset: &str, variable: &str) -> String {
    format!("{}_{}.nc", dataset, variable)
}

/// Two-cell series with area weights, both cells carrying the same values.
pub fn gridded(values: &[f64], units: &str) -> GriddedSeries {
    let data = Array2::from_shape_fn((values.len(), 2), |(t, _)| values[t]);
    GriddedSeries::new(monthly_time_axis(start(), values.len()), data, units).with_area(array![1.0, 3.0])
}

/// Store every variable of `dataset` for every region and return its reference.
pub fn register(resolver: &mut InMemoryResolver, dataset: &str, variables: &[&str], climate: &Climate) -> DatasetRef {
    let mut reference = DatasetRef::new(dataset);
    for variable in variables {
        let (values, units) = climate.values(variable);
        let path = file_name(dataset, variable);
        for region in REGIONS {
            resolver.insert(&path, variable, region, gridded(&values, units));
        }
        reference = reference.with_variable(*variable, VariableEntry::simple(path, *variable));
    }
    reference
}

/// A model and the full observational catalogue, resolvable in memory.
pub struct World {
    pub resolver: InMemoryResolver,
    pub model: DatasetRef,
    pub observations: Vec<DatasetRef>,
}

impl World {
    pub fn new(model: Climate) -> Self {
        Self::with_model_variables(model, &MODEL_VARIABLES)
    }

    pub fn with_model_variables(model: Climate, variables: &[&str]) -> Self {
        let mut resolver = InMemoryResolver::new();
        let model = register(&mut resolver, "CanESM5", variables, &model);
        let observations = OBSERVATIONS
            .iter()
            .map(|(name, vars)| register(&mut resolver, name, vars, &observed_climate(name)))
            .collect();
        Self {
            resolver,
            model,
            observations,
        }
    }

    /// Replace the units of one stored observation variable.
    pub fn relabel_units(&mut self, dataset: &str, variable: &str, units: &str) {
        let climate = observed_climate(dataset);
        let (values, _) = climate.values(variable);
        let path = file_name(dataset, variable);
        for region in REGIONS {
            self.resolver.insert(&path, variable, region, gridded(&values, units));
        }
    }
}
