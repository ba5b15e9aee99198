//! Observation planning: which reference datasets feed which metric.

use std::collections::BTreeSet;
use tracing::{debug, warn};

use crate::error::{EngineError, EngineResult};
use crate::registry::MetricSpec;
use crate::types::DatasetRef;

/// Joins dataset names in composite observation keys.
pub const KEY_SEPARATOR: &str = "_";

/// One named observation of a metric, with the dataset serving each variable.
#[derive(Debug, Clone)]
pub struct ObservationPlan<'a> {
    /// Observation key in the output maps.
    pub key: String,
    /// Dataset serving each variable, aligned with the metric's variables.
    pub sources: Vec<&'a DatasetRef>,
}

/// Key of an observation assembled from one dataset per variable.
///
/// A single dataset serving every variable keeps its own name; distinct
/// datasets are joined with `_`.
///
/// ```
/// use enso_metrics_core::aggregator::composite_key;
///
/// assert_eq!(composite_key(&["HadISST"]), "HadISST");
/// assert_eq!(composite_key(&["Tropflux", "Tropflux"]), "Tropflux");
/// assert_eq!(composite_key(&["HadISST", "ERA-Interim"]), "HadISST_ERA-Interim");
/// ```
pub fn composite_key(names: &[&str]) -> String {
    match names.split_first() {
        Some((first, rest)) if rest.iter().all(|n| n == first) => first.to_string(),
        _ => names.join(KEY_SEPARATOR),
    }
}

/// Reject observation names that could make composite keys ambiguous.
///
/// Only multi-variable metrics build composite keys, so names containing
/// [`KEY_SEPARATOR`] are accepted when every metric has one variable.
pub fn check_observation_names(specs: &[MetricSpec], observations: &[DatasetRef]) -> EngineResult<()> {
    let Some(spec) = specs.iter().find(|s| s.arity() > 1) else {
        return Ok(());
    };
    match observations.iter().find(|ds| ds.name.contains(KEY_SEPARATOR)) {
        Some(ds) => Err(EngineError::ConfigError(format!(
            "observation name '{}' contains '{}', which joins composite keys of metric '{}'",
            ds.name, KEY_SEPARATOR, spec.name
        ))),
        None => Ok(()),
    }
}

/// Datasets eligible for variable `index` of `spec`.
///
/// An explicit observation list selects by name, so a listed dataset lacking
/// the variable surfaces as a keyerror on its diagnostic. Without a list,
/// every dataset providing the variable is used.
fn candidates<'a>(spec: &MetricSpec, index: usize, observations: &'a [DatasetRef]) -> Vec<&'a DatasetRef> {
    let requested = spec.observations_for(index);
    let variable = &spec.variables[index];
    if requested.is_empty() {
        return observations.iter().filter(|ds| ds.provides(variable)).collect();
    }
    for name in requested {
        if !observations.iter().any(|ds| &ds.name == name) {
            debug!(metric = %spec.name, observation = %name, "Requested observation not supplied");
        }
    }
    observations
        .iter()
        .filter(|ds| requested.contains(&ds.name))
        .collect()
}

/// Plan every observation of `spec`: the Cartesian product of the eligible
/// datasets of each variable.
pub fn plan_observations<'a>(
    spec: &MetricSpec,
    model: &str,
    observations: &'a [DatasetRef],
) -> Vec<ObservationPlan<'a>> {
    let mut combos: Vec<Vec<&'a DatasetRef>> = vec![Vec::new()];
    for index in 0..spec.arity() {
        let eligible = candidates(spec, index, observations);
        combos = combos
            .into_iter()
            .flat_map(|prefix| {
                eligible.iter().map(move |ds| {
                    let mut next = prefix.clone();
                    next.push(*ds);
                    next
                })
            })
            .collect();
    }

    let mut seen = BTreeSet::new();
    let mut plans = Vec::with_capacity(combos.len());
    for sources in combos {
        let names: Vec<&str> = sources.iter().map(|ds| ds.name.as_str()).collect();
        let key = composite_key(&names);
        if key == model {
            warn!(metric = %spec.name, observation = %key, "Observation shares the model name, skipped");
            continue;
        }
        if !seen.insert(key.clone()) {
            warn!(metric = %spec.name, observation = %key, "Duplicate observation key, skipped");
            continue;
        }
        plans.push(ObservationPlan { key, sources });
    }
    plans
}
