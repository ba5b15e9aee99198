//! Collection aggregator: drives every metric of a collection through its
//! state machine and assembles the [`CollectionResult`].
//!
//! Per metric:
//! 1. the model is resolved and its diagnostic computed (`ModelRun`);
//! 2. a model keyerror ends the metric (`Errored`) with only the model
//!    diagnostic recorded;
//! 3. otherwise every planned observation is resolved and run (`ObsFanOut`);
//! 4. each observation without a keyerror is compared to the model
//!    (`Combine`), then metadata is attached (`Done`).
//!
//! Metrics are independent. With a worker pool, metrics and observations are
//! computed concurrently and merged into ordered maps, so the output does not
//! depend on scheduling.

mod plan;
mod state;

use rayon::prelude::*;
use tracing::{info, warn};

use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::recipe::RecipeSet;
use crate::registry::{MetricCollection, MetricSpec};
use crate::resolver::{DatasetResolver, ResolvedDataset};
use crate::result::{CollectionResult, MetricEntry};
use crate::runner::{DiagnosticRun, DiagnosticRunner};
use crate::types::{DatasetRef, KEYERROR_SEPARATOR};

pub use self::plan::{check_observation_names, composite_key, plan_observations, ObservationPlan, KEY_SEPARATOR};
pub use self::state::{MetricBuilder, MetricState};

/// Computes metric collections for one model against reference datasets.
///
/// # Example
///
/// ```
/// use enso_metrics_core::aggregator::CollectionAggregator;
/// use enso_metrics_core::recipe::RecipeSet;
/// use enso_metrics_core::registry::CollectionRegistry;
/// use enso_metrics_core::resolver::InMemoryResolver;
/// use enso_metrics_core::types::DatasetRef;
///
/// let recipes = RecipeSet::new();
/// let resolver = InMemoryResolver::new();
/// let aggregator = CollectionAggregator::new(&recipes, &resolver);
///
/// let registry = CollectionRegistry::builtin();
/// let collection = registry.get("ENSO_mini").unwrap();
/// let result = aggregator
///     .compute_collection(collection, &DatasetRef::new("model"), &[])
///     .unwrap();
///
/// // no recipe registered: every metric is present, each with a keyerror
/// assert_eq!(result.metrics.len(), collection.metrics.len());
/// assert_eq!(result.failed_metrics().len(), collection.metrics.len());
/// ```
pub struct CollectionAggregator<'a> {
    recipes: &'a RecipeSet,
    resolver: &'a dyn DatasetResolver,
    dive_down: bool,
    pool: Option<rayon::ThreadPool>,
}

impl<'a> CollectionAggregator<'a> {
    /// Sequential aggregator without dive-down output.
    pub fn new(recipes: &'a RecipeSet, resolver: &'a dyn DatasetResolver) -> Self {
        Self {
            recipes,
            resolver,
            dive_down: false,
            pool: None,
        }
    }

    /// Aggregator honoring `max_workers` and `produce_dive_down`.
    pub fn from_config(
        recipes: &'a RecipeSet,
        resolver: &'a dyn DatasetResolver,
        config: &EngineConfig,
    ) -> EngineResult<Self> {
        config.validate()?;
        let pool = if config.is_parallel() {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(config.max_workers)
                .thread_name(|i| format!("enso-metrics-{}", i))
                .build()
                .map_err(|e| EngineError::ConfigError(format!("Failed to build worker pool: {}", e)))?;
            Some(pool)
        } else {
            None
        };
        Ok(Self {
            recipes,
            resolver,
            dive_down: config.produce_dive_down,
            pool,
        })
    }

    pub fn with_dive_down(mut self, dive_down: bool) -> Self {
        self.dive_down = dive_down;
        self
    }

    /// Number of worker threads, 1 when sequential.
    pub fn workers(&self) -> usize {
        self.pool.as_ref().map_or(1, rayon::ThreadPool::current_num_threads)
    }

    /// Compute every metric of `collection` for `model` against `observations`.
    ///
    /// The result holds one entry per metric, including failed ones. `Err` is
    /// returned only for configuration errors, which abort the whole run:
    /// invalid collections, malformed dataset records and observation names
    /// that would make composite keys ambiguous.
    pub fn compute_collection(
        &self,
        collection: &MetricCollection,
        model: &DatasetRef,
        observations: &[DatasetRef],
    ) -> EngineResult<CollectionResult> {
        collection.validate()?;
        model.validate()?;
        for observation in observations {
            observation.validate()?;
        }
        check_observation_names(&collection.metrics, observations)?;
        info!(
            collection = %collection.name,
            model = %model.name,
            metrics = collection.metrics.len(),
            observations = observations.len(),
            workers = self.workers(),
            "Computing metric collection"
        );

        let entries = self.fan_out(&collection.metrics, |spec| {
            self.compute_metric_entry(collection, spec, model, observations)
        });

        let mut result = CollectionResult::new(&collection.name, &model.name);
        for (spec, entry) in collection.metrics.iter().zip(entries) {
            result.metrics.insert(spec.name.clone(), entry?);
        }

        info!(
            collection = %collection.name,
            model = %model.name,
            metrics = result.metrics.len(),
            failed = result.failed_metrics().len(),
            "Metric collection computed"
        );
        Ok(result)
    }

    /// Walk one metric through its state machine.
    pub fn compute_metric_entry(
        &self,
        collection: &MetricCollection,
        spec: &MetricSpec,
        model: &DatasetRef,
        observations: &[DatasetRef],
    ) -> EngineResult<MetricEntry> {
        let runner = DiagnosticRunner::new(self.recipes, &collection.defaults).with_dive_down(self.dive_down);
        let mut builder = MetricBuilder::new(spec, collection.operator_for(spec), &model.name);

        builder.begin_model_run()?;
        let model_sources = vec![model; spec.arity()];
        let model_run = self.run_dataset(&runner, spec, &model.name, &model_sources, true)?;
        if !builder.record_model(model_run)? {
            return builder.finish();
        }

        let plans = plan_observations(spec, &model.name, observations);
        if plans.is_empty() {
            warn!(metric = %spec.name, "No observation provides the metric's variables");
        }
        let runs = self.fan_out(&plans, |plan| {
            self.run_dataset(&runner, spec, &plan.key, &plan.sources, false)
        });
        for (plan, run) in plans.iter().zip(runs) {
            builder.record_observation(plan.key.clone(), run?.diagnostic)?;
        }

        builder.combine()?;
        builder.finish()
    }

    /// Resolve the variables of `spec` from `sources` and run the recipe.
    fn run_dataset(
        &self,
        runner: &DiagnosticRunner<'_>,
        spec: &MetricSpec,
        name: &str,
        sources: &[&DatasetRef],
        is_model: bool,
    ) -> EngineResult<DiagnosticRun> {
        match self.resolve(spec, name, sources) {
            Ok(resolved) => runner.run_diagnostic(spec, &resolved, is_model),
            Err(keyerror) => {
                warn!(metric = %spec.name, dataset = %name, keyerror = %keyerror, "Dataset could not be resolved");
                Ok(DiagnosticRun::failed(keyerror))
            }
        }
    }

    fn resolve(&self, spec: &MetricSpec, name: &str, sources: &[&DatasetRef]) -> Result<ResolvedDataset, String> {
        let mut series = Vec::with_capacity(spec.arity());
        let mut errors = Vec::new();
        for ((variable, region), source) in spec.variables.iter().zip(&spec.regions).zip(sources) {
            match self.resolver.resolve(source, variable, region) {
                Ok(s) => series.push(s),
                Err(e) => errors.push(e),
            }
        }
        if errors.is_empty() {
            Ok(ResolvedDataset::new(name, series))
        } else {
            Err(errors.join(KEYERROR_SEPARATOR))
        }
    }

    /// Map `f` over `items`, on the worker pool when there is one. Output
    /// order matches input order.
    fn fan_out<T, R, F>(&self, items: &[T], f: F) -> Vec<R>
    where
        T: Sync,
        R: Send,
        F: Fn(&T) -> R + Sync + Send,
    {
        match &self.pool {
            Some(pool) => pool.install(|| items.par_iter().map(&f).collect()),
            None => items.iter().map(f).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recipe::{RecipeContext, RecipeMetadata, RecipeOutput};
    use crate::registry::CollectionDefaults;
    use crate::resolver::InMemoryResolver;
    use crate::types::{monthly_time_axis, CombineOp, ComparisonOperator, Diagnostic, GriddedSeries, VariableEntry};
    use chrono::NaiveDate;

    fn series(values: Vec<f64>) -> GriddedSeries {
        GriddedSeries::from_time_series(
            monthly_time_axis(NaiveDate::from_ymd_opt(1990, 1, 15).unwrap(), values.len()),
            values,
            "C",
        )
    }

    fn last_value(s: &GriddedSeries, _: &RecipeContext<'_>) -> EngineResult<RecipeOutput> {
        let n = s.ntime();
        if n < 2 {
            return Ok(RecipeOutput::failed("too short time period", RecipeMetadata::default()));
        }
        Ok(RecipeOutput::new(
            Diagnostic::computed(s.data[[n - 1, 0]], Some(0.1)),
            RecipeMetadata {
                units: "C".into(),
                ..Default::default()
            },
        ))
    }

    fn product(a: &GriddedSeries, b: &GriddedSeries, _: &RecipeContext<'_>) -> EngineResult<RecipeOutput> {
        let v = a.data[[0, 0]] * b.data[[0, 0]];
        Ok(RecipeOutput::new(
            Diagnostic::computed(v, None).with_nonlinearity(Some(-v), None),
            RecipeMetadata::default(),
        ))
    }

    fn recipes() -> RecipeSet {
        let mut set = RecipeSet::new();
        set.register_single("Last", last_value).register_dual("Product", product);
        set
    }

    fn dataset(name: &str, vars: &[&str]) -> DatasetRef {
        vars.iter().fold(DatasetRef::new(name), |ds, v| {
            ds.with_variable(*v, VariableEntry::simple(format!("{}.nc", name), *v))
        })
    }

    #[test]
    fn test_observation_failure_is_isolated() {
        let mut resolver = InMemoryResolver::new();
        resolver
            .insert("model.nc", "sst", "nino3", series(vec![1.0, 2.0]))
            .insert("A.nc", "sst", "nino3", series(vec![0.0, 1.0]))
            .insert("B.nc", "sst", "nino3", series(vec![4.0]))
            .insert("C.nc", "sst", "nino3", series(vec![0.0, 4.0]));
        let recipes = recipes();
        let aggregator = CollectionAggregator::new(&recipes, &resolver);

        let collection = MetricCollection::new(
            "c",
            CollectionDefaults {
                operator: ComparisonOperator::Difference,
                ..Default::default()
            },
            vec![MetricSpec::single("Last", "sst", "nino3")],
        );
        let observations = vec![dataset("A", &["sst"]), dataset("B", &["sst"]), dataset("C", &["sst"])];
        let result = aggregator
            .compute_collection(&collection, &dataset("model", &["sst"]), &observations)
            .unwrap();

        let entry = result.entry("Last").unwrap();
        assert_eq!(entry.metric.len(), 2);
        assert_eq!(entry.diagnostic.len(), 4);
        assert!(entry.diagnostic["B"].is_failed());
        assert_eq!(entry.metric["A"].value, Some(1.0));
        assert_eq!(entry.metric["C"].value, Some(-2.0));
    }

    #[test]
    fn test_unresolvable_model_short_circuits() {
        let resolver = InMemoryResolver::new();
        let recipes = recipes();
        let aggregator = CollectionAggregator::new(&recipes, &resolver);
        let collection = MetricCollection::new(
            "c",
            CollectionDefaults::default(),
            vec![MetricSpec::single("Last", "sst", "nino3")],
        );
        let result = aggregator
            .compute_collection(&collection, &dataset("model", &["sst"]), &[dataset("A", &["sst"])])
            .unwrap();
        let entry = result.entry("Last").unwrap();
        assert!(entry.metric.is_empty());
        assert_eq!(entry.diagnostic.keys().collect::<Vec<_>>(), vec!["model"]);
        assert!(entry.keyerror.as_deref().unwrap().contains("unknown variable name"));
    }

    #[test]
    fn test_dual_variable_keys_and_nonlinearity() {
        let mut resolver = InMemoryResolver::new();
        resolver
            .insert("model.nc", "sst", "nino3", series(vec![2.0]))
            .insert("model.nc", "taux", "nino4", series(vec![3.0]))
            .insert("HadISST.nc", "sst", "nino3", series(vec![1.0]))
            .insert("Tropflux.nc", "sst", "nino3", series(vec![2.0]))
            .insert("Tropflux.nc", "taux", "nino4", series(vec![2.0]));
        let recipes = recipes();
        let aggregator = CollectionAggregator::new(&recipes, &resolver);
        let collection = MetricCollection::new(
            "c",
            CollectionDefaults {
                operator: ComparisonOperator::Difference,
                ..Default::default()
            },
            vec![MetricSpec::dual("Product", ("sst", "nino3"), ("taux", "nino4")).with_nonlinearity()],
        );
        let observations = vec![dataset("HadISST", &["sst"]), dataset("Tropflux", &["sst", "taux"])];
        let result = aggregator
            .compute_collection(&collection, &dataset("model", &["sst", "taux"]), &observations)
            .unwrap();

        let entry = result.entry("Product").unwrap();
        assert_eq!(entry.metric.keys().collect::<Vec<_>>(), vec!["HadISST_Tropflux", "Tropflux"]);
        // model 6, HadISST_Tropflux 2, Tropflux 4
        assert_eq!(entry.metric["HadISST_Tropflux"].value, Some(4.0));
        let nl = entry.metric["Tropflux"].nonlinearity.as_ref().unwrap();
        assert_eq!(nl.value, Some(-2.0));
    }

    #[test]
    fn test_recipe_configuration_error_aborts() {
        fn broken(_: &GriddedSeries, _: &RecipeContext<'_>) -> EngineResult<RecipeOutput> {
            Err(EngineError::UnknownSmoothing("gaussian".into()))
        }
        let mut recipes = RecipeSet::new();
        recipes.register_single("Broken", broken);
        let mut resolver = InMemoryResolver::new();
        resolver.insert("model.nc", "sst", "nino3", series(vec![1.0]));
        let aggregator = CollectionAggregator::new(&recipes, &resolver);
        let collection = MetricCollection::new(
            "c",
            CollectionDefaults::default(),
            vec![MetricSpec::single("Broken", "sst", "nino3")],
        );
        let err = aggregator
            .compute_collection(&collection, &dataset("model", &["sst"]), &[])
            .unwrap_err();
        assert!(err.is_configuration_error());
    }

    #[test]
    fn test_misaligned_dataset_entry_aborts() {
        let mut resolver = InMemoryResolver::new();
        resolver
            .insert("a.nc", "a", "nino3", series(vec![1.0, 2.0]))
            .insert("b.nc", "b", "nino3", series(vec![1.0, 2.0]));
        let recipes = recipes();
        let aggregator = CollectionAggregator::new(&recipes, &resolver);
        let collection = MetricCollection::new(
            "c",
            CollectionDefaults::default(),
            vec![MetricSpec::single("Last", "sst", "nino3")],
        );
        let model = DatasetRef::new("model").with_variable(
            "sst",
            VariableEntry::composite(["a.nc", "b.nc", "c.nc"], ["a", "b"], CombineOp::Sum),
        );
        let err = aggregator.compute_collection(&collection, &model, &[]).unwrap_err();
        assert!(err.is_configuration_error());
        assert!(err.to_string().contains("3 paths but 2 varnames"));

        // a malformed observation record aborts as well
        let observation = DatasetRef::new("A").with_variable(
            "sst",
            VariableEntry::composite(["a.nc", "b.nc", "c.nc"], ["a", "b"], CombineOp::Sum),
        );
        let err = aggregator
            .compute_collection(&collection, &dataset("model", &["sst"]), &[observation])
            .unwrap_err();
        assert!(matches!(err, EngineError::ConfigError(_)));
    }

    #[test]
    fn test_ambiguous_composite_names_abort() {
        let resolver = InMemoryResolver::new();
        let recipes = recipes();
        let aggregator = CollectionAggregator::new(&recipes, &resolver);
        let collection = MetricCollection::new(
            "c",
            CollectionDefaults::default(),
            vec![MetricSpec::dual("Product", ("sst", "nino3"), ("taux", "nino4"))],
        );
        let observations = vec![dataset("A_B", &["sst", "taux"]), dataset("A", &["sst"]), dataset("B", &["taux"])];
        let err = aggregator
            .compute_collection(&collection, &dataset("model", &["sst", "taux"]), &observations)
            .unwrap_err();
        assert!(err.is_configuration_error());
    }

    #[test]
    fn test_unresolved_variables_are_joined() {
        let resolver = InMemoryResolver::new();
        let recipes = recipes();
        let aggregator = CollectionAggregator::new(&recipes, &resolver);
        let collection = MetricCollection::new(
            "c",
            CollectionDefaults::default(),
            vec![MetricSpec::dual("Product", ("sst", "nino3"), ("taux", "nino4"))],
        );
        let result = aggregator
            .compute_collection(&collection, &DatasetRef::new("model"), &[])
            .unwrap();
        let entry = result.entry("Product").unwrap();
        assert_eq!(
            entry.diagnostic["model"].keyerror.as_deref(),
            Some("variable 'sst' not provided by dataset 'model'; variable 'taux' not provided by dataset 'model'")
        );
        assert!(entry.metric.is_empty());
    }

    #[test]
    fn test_from_config_builds_pool() {
        let recipes = recipes();
        let resolver = InMemoryResolver::new();
        let config = EngineConfig {
            max_workers: 3,
            ..Default::default()
        };
        let aggregator = CollectionAggregator::from_config(&recipes, &resolver, &config).unwrap();
        assert_eq!(aggregator.workers(), 3);
        assert_eq!(CollectionAggregator::new(&recipes, &resolver).workers(), 1);
    }
}
