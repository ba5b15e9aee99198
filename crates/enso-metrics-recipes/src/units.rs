//! Unit normalization and plausibility checks per physical variable.

use ndarray::Array1;
use std::fmt;

use crate::error::{PreprocessError, PreprocessResult};

/// Physical variable a recipe reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VariableKind {
    /// Sea surface temperature.
    Sst,
    /// Zonal wind stress.
    Taux,
    /// Sea surface height.
    Ssh,
    /// Net heat flux.
    Thf,
    /// Precipitation.
    Pr,
}

/// `value * factor + offset` into canonical units.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Conversion {
    factor: f64,
    offset: f64,
}

const IDENTITY: Conversion = Conversion {
    factor: 1.0,
    offset: 0.0,
};

const fn scale(factor: f64) -> Conversion {
    Conversion { factor, offset: 0.0 }
}

impl VariableKind {
    pub fn name(self) -> &'static str {
        match self {
            VariableKind::Sst => "sst",
            VariableKind::Taux => "taux",
            VariableKind::Ssh => "ssh",
            VariableKind::Thf => "thf",
            VariableKind::Pr => "pr",
        }
    }

    /// Units recipes work in.
    pub fn canonical_units(self) -> &'static str {
        match self {
            VariableKind::Sst => "°C",
            VariableKind::Taux => "1e-3 N/m2",
            VariableKind::Ssh => "cm",
            VariableKind::Thf => "W/m2",
            VariableKind::Pr => "mm/day",
        }
    }

    /// Range the mean of a regional average must fall in, canonical units.
    fn plausible_range(self) -> (f64, f64) {
        match self {
            VariableKind::Sst => (-5.0, 40.0),
            VariableKind::Taux => (-500.0, 500.0),
            VariableKind::Ssh => (-500.0, 500.0),
            VariableKind::Thf => (-1000.0, 1000.0),
            VariableKind::Pr => (0.0, 100.0),
        }
    }

    fn conversion(self, units: &str) -> Option<Conversion> {
        let units = units.trim();
        let conversion = match self {
            VariableKind::Sst => match units {
                "C" | "°C" | "degC" | "deg_C" | "degree_C" | "degrees_C" | "celsius" => IDENTITY,
                "K" | "degK" | "kelvin" | "Kelvin" => Conversion {
                    factor: 1.0,
                    offset: -273.15,
                },
                _ => return None,
            },
            VariableKind::Taux => match units {
                "N/m2" | "N m-2" | "N/m^2" | "Pa" => scale(1000.0),
                "1e-3 N/m2" | "mN/m2" | "mPa" => IDENTITY,
                _ => return None,
            },
            VariableKind::Ssh => match units {
                "m" => scale(100.0),
                "cm" => IDENTITY,
                "mm" => scale(0.1),
                _ => return None,
            },
            VariableKind::Thf => match units {
                "W/m2" | "W m-2" | "W/m^2" => IDENTITY,
                _ => return None,
            },
            VariableKind::Pr => match units {
                "kg m-2 s-1" | "kg/m2/s" | "mm/s" => scale(86400.0),
                "mm/day" | "mm day-1" | "mm/d" => IDENTITY,
                _ => return None,
            },
        };
        Some(conversion)
    }

    /// Whether `units` is a known spelling for this variable.
    pub fn accepts(self, units: &str) -> bool {
        self.conversion(units).is_some()
    }

    /// Convert `values` from `units` into canonical units and check their
    /// magnitude is plausible.
    pub fn normalize(self, values: &mut Array1<f64>, units: &str) -> PreprocessResult<()> {
        let conversion = self.conversion(units).ok_or_else(|| PreprocessError::UnknownUnits {
            variable: self.name().to_string(),
            units: units.to_string(),
        })?;
        values.mapv_inplace(|v| v * conversion.factor + conversion.offset);

        if let Some(mean) = values.mean() {
            let (min, max) = self.plausible_range();
            if !(min..=max).contains(&mean) {
                return Err(PreprocessError::UnlikelyValues {
                    variable: self.name().to_string(),
                    mean,
                    units: self.canonical_units().to_string(),
                    min,
                    max,
                });
            }
        }
        Ok(())
    }
}

impl fmt::Display for VariableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
