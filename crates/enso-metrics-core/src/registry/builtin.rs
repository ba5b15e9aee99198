//! Built-in metric collections and the reference-observation catalogue.

use std::collections::BTreeMap;

use super::{CollectionDefaults, MetricCollection, MetricSpec};
use crate::options::{DetrendSpec, SmoothSpec, SmoothingMethod};
use crate::types::{ComparisonOperator, TimeBounds};

/// Observational datasets known to provide each variable.
pub fn reference_observations() -> BTreeMap<&'static str, Vec<&'static str>> {
    BTreeMap::from([
        ("sst", vec!["HadISST", "ERA-Interim", "Tropflux"]),
        ("taux", vec!["ERA-Interim", "Tropflux"]),
        ("thf", vec!["ERA-Interim", "Tropflux"]),
        ("ssh", vec!["AVISO", "SODA3.4.2"]),
        ("pr", vec!["GPCPv2.3", "ERA-Interim"]),
    ])
}

fn standard_defaults() -> CollectionDefaults {
    CollectionDefaults {
        operator: ComparisonOperator::AbsRelativeDifference,
        detrending: Some(DetrendSpec::linear()),
        smoothing: Some(SmoothSpec {
            method: SmoothingMethod::Triangle,
            window: 5,
        }),
        model_period: TimeBounds::parse("1850-01-01", "2015-12-31").ok(),
        observed_period: TimeBounds::parse("1850-01-01", "2018-12-31").ok(),
        ..Default::default()
    }
}

fn feedback(name: &str, first: (&str, &str), second: (&str, &str)) -> MetricSpec {
    MetricSpec::dual(name, first, second).with_nonlinearity()
}

/// Restrict each metric to the catalogued reference datasets of its variables.
fn with_reference_observations(mut collection: MetricCollection) -> MetricCollection {
    let catalogue = reference_observations();
    for metric in &mut collection.metrics {
        metric.observations = metric
            .variables
            .iter()
            .map(|var| {
                catalogue
                    .get(var.as_str())
                    .map(|names| names.iter().map(|n| n.to_string()).collect())
                    .unwrap_or_default()
            })
            .collect();
    }
    collection
}

/// Every built-in collection.
pub fn builtin_collections() -> Vec<MetricCollection> {
    vec![enso_perf(), enso_proc(), enso_mini()]
        .into_iter()
        .map(with_reference_observations)
        .collect()
}

fn enso_perf() -> MetricCollection {
    MetricCollection::new(
        "ENSO_perf",
        standard_defaults(),
        vec![
            MetricSpec::single("EnsoAmpl", "sst", "nino3.4"),
            MetricSpec::single("EnsoSeasonality", "sst", "nino3.4"),
            MetricSpec::single("EnsoSstSkew", "sst", "nino3.4")
                .with_operator(ComparisonOperator::Difference),
            MetricSpec::single("EnsoDuration", "sst", "nino3.4"),
            feedback("EnsoFbSstTaux", ("sst", "nino3"), ("taux", "nino4")),
            feedback("EnsoFbSshSst", ("ssh", "nino3"), ("sst", "nino3")),
        ],
    )
    .with_description("ENSO performance: how realistic the simulated ENSO is")
}

fn enso_proc() -> MetricCollection {
    MetricCollection::new(
        "ENSO_proc",
        standard_defaults(),
        vec![
            MetricSpec::single("EnsoAmpl", "sst", "nino3.4"),
            MetricSpec::single("EnsoSeasonality", "sst", "nino3.4"),
            MetricSpec::single("EnsoSstSkew", "sst", "nino3.4")
                .with_operator(ComparisonOperator::Difference),
            feedback("EnsoFbSstTaux", ("sst", "nino3"), ("taux", "nino4")),
            feedback("EnsoFbSstThf", ("sst", "nino3"), ("thf", "nino3")),
            feedback("EnsoFbSshSst", ("ssh", "nino3"), ("sst", "nino3")),
            feedback("EnsoFbTauxSsh", ("taux", "nino4"), ("ssh", "nino3")),
        ],
    )
    .with_description("ENSO processes: feedbacks driving the simulated ENSO")
}

fn enso_mini() -> MetricCollection {
    MetricCollection::new(
        "ENSO_mini",
        CollectionDefaults {
            smoothing: None,
            ..standard_defaults()
        },
        vec![
            MetricSpec::single("EnsoAmpl", "sst", "nino3.4"),
            feedback("EnsoFbSstTaux", ("sst", "nino3"), ("taux", "nino4")),
        ],
    )
    .with_description("Two-metric smoke-test collection")
}
