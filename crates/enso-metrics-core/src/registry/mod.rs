//! Collection registry: which metrics a collection holds, which variables and
//! regions each metric needs, and the collection-wide defaults.
//!
//! Collections are immutable once loaded. They come from the built-in table
//! ([`CollectionRegistry::builtin`]) and optionally from a TOML file:
//!
//! ```toml
//! [[collection]]
//! name = "my_collection"
//! description = "Amplitude only"
//!
//! [collection.defaults]
//! operator = "difference"
//! observed_period = { start = "1979-01-01", end = "2018-12-31" }
//!
//! [[collection.metrics]]
//! name = "EnsoAmpl"
//! variables = ["sst"]
//! regions = ["nino3.4"]
//! observations = [["HadISST", "ERA-Interim"]]
//! ```

mod builtin;

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use crate::error::{EngineError, EngineResult};
use crate::options::{DetrendSpec, Frequency, OptionOverrides, SmoothSpec};
use crate::types::{ComparisonOperator, TimeBounds};

pub use self::builtin::{builtin_collections, reference_observations};

/// Collection-wide default configuration.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectionDefaults {
    /// Comparison operator unless a metric overrides it.
    pub operator: ComparisonOperator,
    pub detrending: Option<DetrendSpec>,
    pub smoothing: Option<SmoothSpec>,
    pub normalization: bool,
    pub frequency: Frequency,
    /// Minimum number of time steps a recipe accepts.
    pub min_time_steps: Option<u32>,
    /// Time bounds applied to the model.
    pub model_period: Option<TimeBounds>,
    /// Time bounds applied to observations.
    pub observed_period: Option<TimeBounds>,
    pub mask_land: bool,
    pub mask_ocean: bool,
}

/// One metric of a collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSpec {
    /// Metric name, also the recipe name.
    pub name: String,

    /// Required variables (1 or 2).
    pub variables: Vec<String>,

    /// Region of each variable, aligned with `variables`.
    pub regions: Vec<String>,

    /// Reference datasets for each variable, aligned with `variables`.
    /// Empty means every observation providing the variable.
    #[serde(default)]
    pub observations: Vec<Vec<String>>,

    /// Override of the collection comparison operator.
    #[serde(default)]
    pub operator: Option<ComparisonOperator>,

    /// Whether the recipe also produces a nonlinearity sub-value.
    #[serde(default)]
    pub nonlinearity: bool,

    #[serde(default)]
    pub overrides: OptionOverrides,
}

impl MetricSpec {
    /// Metric over one variable.
    pub fn single(name: impl Into<String>, variable: impl Into<String>, region: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            variables: vec![variable.into()],
            regions: vec![region.into()],
            observations: Vec::new(),
            operator: None,
            nonlinearity: false,
            overrides: OptionOverrides::default(),
        }
    }

    /// Metric over two co-located variables.
    pub fn dual(
        name: impl Into<String>,
        first: (&str, &str),
        second: (&str, &str),
    ) -> Self {
        Self {
            name: name.into(),
            variables: vec![first.0.to_string(), second.0.to_string()],
            regions: vec![first.1.to_string(), second.1.to_string()],
            observations: Vec::new(),
            operator: None,
            nonlinearity: false,
            overrides: OptionOverrides::default(),
        }
    }

    /// Restrict reference datasets, one list per variable.
    pub fn with_observations(mut self, observations: &[&[&str]]) -> Self {
        self.observations = observations
            .iter()
            .map(|names| names.iter().map(|n| n.to_string()).collect())
            .collect();
        self
    }

    pub fn with_operator(mut self, operator: ComparisonOperator) -> Self {
        self.operator = Some(operator);
        self
    }

    pub fn with_nonlinearity(mut self) -> Self {
        self.nonlinearity = true;
        self
    }

    pub fn with_overrides(mut self, overrides: OptionOverrides) -> Self {
        self.overrides = overrides;
        self
    }

    /// Number of variables the recipe needs.
    #[inline]
    pub fn arity(&self) -> usize {
        self.variables.len()
    }

    /// Requested reference datasets for variable `index`; empty means any.
    pub fn observations_for(&self, index: usize) -> &[String] {
        self.observations.get(index).map_or(&[], Vec::as_slice)
    }

    pub fn validate(&self) -> EngineResult<()> {
        if self.name.is_empty() {
            return Err(EngineError::ConfigError("metric name must not be empty".into()));
        }
        if !(1..=2).contains(&self.variables.len()) {
            return Err(EngineError::invalid_param(
                format!("{}.variables", self.name),
                self.variables.len(),
                "A metric needs 1 or 2 variables",
            ));
        }
        if self.regions.len() != self.variables.len() {
            return Err(EngineError::invalid_param(
                format!("{}.regions", self.name),
                self.regions.len(),
                format!("Expected one region per variable ({})", self.variables.len()),
            ));
        }
        if !self.observations.is_empty() && self.observations.len() != self.variables.len() {
            return Err(EngineError::invalid_param(
                format!("{}.observations", self.name),
                self.observations.len(),
                format!("Expected one observation list per variable ({})", self.variables.len()),
            ));
        }
        if let Some(smoothing) = &self.overrides.smoothing {
            smoothing.validate()?;
        }
        Ok(())
    }
}

/// A named set of metrics with shared defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricCollection {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub defaults: CollectionDefaults,
    pub metrics: Vec<MetricSpec>,
}

impl MetricCollection {
    pub fn new(name: impl Into<String>, defaults: CollectionDefaults, metrics: Vec<MetricSpec>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            defaults,
            metrics,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Look up a metric by name.
    pub fn metric(&self, name: &str) -> Option<&MetricSpec> {
        self.metrics.iter().find(|m| m.name == name)
    }

    /// Metric names in collection order.
    pub fn metric_names(&self) -> Vec<&str> {
        self.metrics.iter().map(|m| m.name.as_str()).collect()
    }

    /// Operator applied to `spec`: its override or the collection default.
    pub fn operator_for(&self, spec: &MetricSpec) -> ComparisonOperator {
        spec.operator.unwrap_or(self.defaults.operator)
    }

    pub fn validate(&self) -> EngineResult<()> {
        if self.name.is_empty() {
            return Err(EngineError::ConfigError("collection name must not be empty".into()));
        }
        if self.metrics.is_empty() {
            return Err(EngineError::ConfigError(format!(
                "collection '{}' has no metrics",
                self.name
            )));
        }
        let mut seen = BTreeSet::new();
        for metric in &self.metrics {
            metric.validate()?;
            if !seen.insert(metric.name.as_str()) {
                return Err(EngineError::ConfigError(format!(
                    "collection '{}' lists metric '{}' twice",
                    self.name, metric.name
                )));
            }
        }
        if let Some(smoothing) = &self.defaults.smoothing {
            smoothing.validate()?;
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct CollectionFile {
    #[serde(rename = "collection", default)]
    collections: Vec<MetricCollection>,
}

/// Lookup table of metric collections.
#[derive(Debug, Clone, Default)]
pub struct CollectionRegistry {
    collections: BTreeMap<String, MetricCollection>,
}

impl CollectionRegistry {
    /// Registry without any collection.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Registry holding the built-in collections.
    pub fn builtin() -> Self {
        let mut registry = Self::empty();
        for collection in builtin_collections() {
            registry.collections.insert(collection.name.clone(), collection);
        }
        registry
    }

    /// Parse collections from TOML.
    pub fn from_toml_str(content: &str) -> EngineResult<Self> {
        let file: CollectionFile = toml::from_str(content)?;
        let mut registry = Self::empty();
        for collection in file.collections {
            registry.insert(collection)?;
        }
        Ok(registry)
    }

    /// Load collections from a TOML file on top of this registry.
    ///
    /// A collection with the same name as an existing one replaces it.
    pub fn load_file(&mut self, path: &Path) -> EngineResult<()> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            EngineError::ConfigError(format!(
                "Failed to read collections file {}: {}",
                path.display(),
                e
            ))
        })?;
        let loaded = Self::from_toml_str(&content)?;
        self.collections.extend(loaded.collections);
        Ok(())
    }

    /// Validate and register a collection.
    pub fn insert(&mut self, collection: MetricCollection) -> EngineResult<()> {
        collection.validate()?;
        self.collections.insert(collection.name.clone(), collection);
        Ok(())
    }

    pub fn get(&self, name: &str) -> EngineResult<&MetricCollection> {
        self.collections
            .get(name)
            .ok_or_else(|| EngineError::UnknownCollection(name.to_string()))
    }

    pub fn names(&self) -> Vec<&str> {
        self.collections.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.collections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.collections.is_empty()
    }
}
