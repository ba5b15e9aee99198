//! Typed recipe options.
//!
//! A [`RecipeOptions`] value is built once per (collection, metric, model or
//! observation) from the collection defaults and the metric overrides, then
//! passed by reference to the recipe. Recipes ignore the options they have no
//! use for.
//!
//! Method names are parsed when the collection is loaded: an unknown smoothing
//! or detrending method is a configuration error, never a per-dataset one.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{EngineError, EngineResult};
use crate::registry::{CollectionDefaults, MetricSpec};
use crate::types::TimeBounds;

/// Detrending method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum DetrendMethod {
    /// Remove the least-squares linear trend.
    Linear,
}

impl FromStr for DetrendMethod {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "linear" => Ok(DetrendMethod::Linear),
            other => Err(EngineError::UnknownDetrending(other.to_string())),
        }
    }
}

impl TryFrom<String> for DetrendMethod {
    type Error = EngineError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<DetrendMethod> for String {
    fn from(method: DetrendMethod) -> Self {
        method.to_string()
    }
}

impl fmt::Display for DetrendMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DetrendMethod::Linear => f.write_str("linear"),
        }
    }
}

/// Detrending policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetrendSpec {
    pub method: DetrendMethod,
}

impl DetrendSpec {
    pub fn linear() -> Self {
        Self {
            method: DetrendMethod::Linear,
        }
    }
}

/// Running-mean smoothing kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum SmoothingMethod {
    /// Uniform weights.
    Box,
    /// Weights decreasing linearly away from the centre.
    Triangle,
}

impl FromStr for SmoothingMethod {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "box" => Ok(SmoothingMethod::Box),
            "triangle" => Ok(SmoothingMethod::Triangle),
            other => Err(EngineError::UnknownSmoothing(other.to_string())),
        }
    }
}

impl TryFrom<String> for SmoothingMethod {
    type Error = EngineError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<SmoothingMethod> for String {
    fn from(method: SmoothingMethod) -> Self {
        method.to_string()
    }
}

impl fmt::Display for SmoothingMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SmoothingMethod::Box => f.write_str("box"),
            SmoothingMethod::Triangle => f.write_str("triangle"),
        }
    }
}

/// Smoothing policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SmoothSpec {
    pub method: SmoothingMethod,
    /// Window length in time steps (odd values keep the window centred).
    pub window: usize,
}

impl SmoothSpec {
    /// Parse a smoothing policy from its configuration name.
    pub fn parse(method: &str, window: usize) -> EngineResult<Self> {
        let spec = Self {
            method: method.parse()?,
            window,
        };
        spec.validate()?;
        Ok(spec)
    }

    pub fn validate(&self) -> EngineResult<()> {
        if self.window == 0 {
            return Err(EngineError::invalid_param(
                "smoothing.window",
                self.window,
                "Must be at least 1",
            ));
        }
        Ok(())
    }
}

/// Time frequency at which recipes operate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Frequency {
    #[default]
    Monthly,
    Yearly,
}

impl Frequency {
    /// Time steps per year.
    pub fn steps_per_year(self) -> usize {
        match self {
            Frequency::Monthly => 12,
            Frequency::Yearly => 1,
        }
    }
}

impl FromStr for Frequency {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "monthly" => Ok(Frequency::Monthly),
            "yearly" => Ok(Frequency::Yearly),
            other => Err(EngineError::UnknownFrequency(other.to_string())),
        }
    }
}

impl TryFrom<String> for Frequency {
    type Error = EngineError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Frequency> for String {
    fn from(frequency: Frequency) -> Self {
        frequency.to_string()
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Frequency::Monthly => f.write_str("monthly"),
            Frequency::Yearly => f.write_str("yearly"),
        }
    }
}

/// Per-metric overrides of the collection defaults.
///
/// `None` keeps the collection default.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptionOverrides {
    pub detrending: Option<DetrendSpec>,
    pub smoothing: Option<SmoothSpec>,
    pub normalization: Option<bool>,
    pub frequency: Option<Frequency>,
    pub min_time_steps: Option<u32>,
    pub mask_land: Option<bool>,
    pub mask_ocean: Option<bool>,
}

/// Options handed to a recipe for one dataset.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecipeOptions {
    pub detrending: Option<DetrendSpec>,
    pub smoothing: Option<SmoothSpec>,
    pub normalization: bool,
    pub time_bounds: Option<TimeBounds>,
    pub min_time_steps: Option<u32>,
    pub frequency: Frequency,
    pub mask_land: bool,
    pub mask_ocean: bool,
}

impl RecipeOptions {
    /// Build options for one metric and one dataset.
    ///
    /// The model uses `defaults.model_period`, observations use
    /// `defaults.observed_period`.
    pub fn for_dataset(defaults: &CollectionDefaults, spec: &MetricSpec, is_model: bool) -> Self {
        let o = &spec.overrides;
        Self {
            detrending: o.detrending.or(defaults.detrending),
            smoothing: o.smoothing.or(defaults.smoothing),
            normalization: o.normalization.unwrap_or(defaults.normalization),
            time_bounds: if is_model {
                defaults.model_period
            } else {
                defaults.observed_period
            },
            min_time_steps: o.min_time_steps.or(defaults.min_time_steps),
            frequency: o.frequency.unwrap_or(defaults.frequency),
            mask_land: o.mask_land.unwrap_or(defaults.mask_land),
            mask_ocean: o.mask_ocean.unwrap_or(defaults.mask_ocean),
        }
    }
}
