//! Collection output structure.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::types::{ComparisonOperator, Diagnostic, DiveDown, MetricResult};

/// Descriptive block of one metric.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricMetadata {
    /// Recipe-provided long name.
    pub name: String,
    pub operator: ComparisonOperator,
    /// How the metric value is computed from the two diagnostics.
    pub description: String,
    /// Units of the metric value.
    pub units: String,
    /// Units of the diagnostic values.
    pub diagnostic_units: String,
    pub method: String,
    pub time_frequency: String,
    pub reference: String,
}

/// Everything computed for one metric.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricEntry {
    /// Observation name to model-vs-observation distance.
    pub metric: BTreeMap<String, MetricResult>,
    /// Dataset name (model and observations) to raw diagnostic.
    pub diagnostic: BTreeMap<String, Diagnostic>,
    pub metadata: MetricMetadata,
    /// Why the metric could not be computed at all.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keyerror: Option<String>,
}

impl MetricEntry {
    /// Whether the model diagnostic failed.
    #[inline]
    pub fn is_failed(&self) -> bool {
        self.keyerror.is_some()
    }
}

/// Result of computing one collection for one model.
///
/// Holds an entry for every metric of the collection, failed or not.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CollectionResult {
    pub collection: String,
    pub model: String,
    pub metrics: BTreeMap<String, MetricEntry>,
}

impl CollectionResult {
    pub fn new(collection: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            model: model.into(),
            metrics: BTreeMap::new(),
        }
    }

    pub fn entry(&self, metric: &str) -> Option<&MetricEntry> {
        self.metrics.get(metric)
    }

    /// Metrics whose model diagnostic failed.
    pub fn failed_metrics(&self) -> Vec<&str> {
        self.metrics
            .iter()
            .filter(|(_, e)| e.is_failed())
            .map(|(name, _)| name.as_str())
            .collect()
    }

    /// Dive-down payloads keyed like the diagnostics they belong to.
    pub fn dive_downs(&self) -> BTreeMap<&str, BTreeMap<&str, &DiveDown>> {
        let mut out = BTreeMap::new();
        for (metric, entry) in &self.metrics {
            let per_dataset: BTreeMap<&str, &DiveDown> = entry
                .diagnostic
                .iter()
                .filter_map(|(dataset, diag)| diag.dive_down.as_ref().map(|d| (dataset.as_str(), d)))
                .collect();
            if !per_dataset.is_empty() {
                out.insert(metric.as_str(), per_dataset);
            }
        }
        out
    }
}
