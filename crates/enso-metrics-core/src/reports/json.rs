//! JSON collection output.
//!
//! Produces the persisted artifact consumed by plotting and cross-model
//! comparison tooling. Output is deterministic: maps are ordered and no
//! timestamp is embedded, so identical results serialize to identical bytes.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::EngineResult;
use crate::result::{CollectionResult, MetricEntry};
use crate::types::DiveDown;

/// Schema version of the persisted files.
pub const REPORT_VERSION: &str = "1.0.0";

/// Complete collection output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonReport {
    pub version: String,
    pub collection: String,
    pub model: String,
    /// Metric name to its metric, diagnostic and metadata blocks.
    pub metrics: BTreeMap<String, MetricEntry>,
}

/// Companion file holding the dive-down arrays.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonDiveDownReport {
    pub version: String,
    pub collection: String,
    pub model: String,
    /// Metric name to dataset name to array, keyed like the diagnostics.
    pub dive_down: BTreeMap<String, BTreeMap<String, DiveDown>>,
}

/// Serialize the collection output.
pub fn generate_json(result: &CollectionResult) -> EngineResult<String> {
    let report = JsonReport {
        version: REPORT_VERSION.to_string(),
        collection: result.collection.clone(),
        model: result.model.clone(),
        metrics: result.metrics.clone(),
    };
    Ok(serde_json::to_string_pretty(&report)?)
}

/// Serialize the dive-down companion, or `None` when no recipe produced one.
pub fn generate_dive_down_json(result: &CollectionResult) -> EngineResult<Option<String>> {
    let dive_downs = result.dive_downs();
    if dive_downs.is_empty() {
        return Ok(None);
    }
    let report = JsonDiveDownReport {
        version: REPORT_VERSION.to_string(),
        collection: result.collection.clone(),
        model: result.model.clone(),
        dive_down: dive_downs
            .into_iter()
            .map(|(metric, per_dataset)| {
                let per_dataset = per_dataset
                    .into_iter()
                    .map(|(dataset, dive)| (dataset.to_string(), dive.clone()))
                    .collect();
                (metric.to_string(), per_dataset)
            })
            .collect(),
    };
    Ok(Some(serde_json::to_string_pretty(&report)?))
}

/// Parse a persisted collection output.
pub fn parse_json(content: &str) -> EngineResult<JsonReport> {
    Ok(serde_json::from_str(content)?)
}
