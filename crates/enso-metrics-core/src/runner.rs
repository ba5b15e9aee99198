//! Diagnostic runner: one recipe invocation for one dataset.

use tracing::{debug, warn};

use crate::error::{EngineError, EngineResult};
use crate::options::RecipeOptions;
use crate::recipe::{Recipe, RecipeContext, RecipeMetadata, RecipeSet};
use crate::registry::{CollectionDefaults, MetricSpec};
use crate::resolver::ResolvedDataset;
use crate::types::Diagnostic;

/// Diagnostic of one (metric, dataset) pair plus the recipe's metadata.
///
/// `metadata` is `None` when no recipe ran (unknown metric, unresolvable data).
#[derive(Debug, Clone, PartialEq)]
pub struct DiagnosticRun {
    pub diagnostic: Diagnostic,
    pub metadata: Option<RecipeMetadata>,
}

impl DiagnosticRun {
    /// Run that never reached a recipe.
    pub fn failed(keyerror: impl Into<String>) -> Self {
        Self {
            diagnostic: Diagnostic::failed(keyerror),
            metadata: None,
        }
    }
}

/// Dispatches a metric to its recipe for the model or an observation.
///
/// # Example
///
/// ```
/// use enso_metrics_core::recipe::RecipeSet;
/// use enso_metrics_core::registry::{CollectionDefaults, MetricSpec};
/// use enso_metrics_core::resolver::ResolvedDataset;
/// use enso_metrics_core::runner::DiagnosticRunner;
///
/// let recipes = RecipeSet::new();
/// let defaults = CollectionDefaults::default();
/// let runner = DiagnosticRunner::new(&recipes, &defaults);
///
/// let spec = MetricSpec::single("NotImplementedYet", "sst", "nino3.4");
/// let run = runner
///     .run_diagnostic(&spec, &ResolvedDataset::new("model", vec![]), true)
///     .expect("unknown metrics are soft failures");
/// assert!(run.diagnostic.keyerror.unwrap().contains("unknown metric"));
/// ```
#[derive(Debug, Clone, Copy)]
pub struct DiagnosticRunner<'a> {
    recipes: &'a RecipeSet,
    defaults: &'a CollectionDefaults,
    dive_down: bool,
}

impl<'a> DiagnosticRunner<'a> {
    pub fn new(recipes: &'a RecipeSet, defaults: &'a CollectionDefaults) -> Self {
        Self {
            recipes,
            defaults,
            dive_down: false,
        }
    }

    /// Ask recipes to materialize dive-down payloads.
    pub fn with_dive_down(mut self, dive_down: bool) -> Self {
        self.dive_down = dive_down;
        self
    }

    /// Run the recipe of `spec` against `dataset`.
    ///
    /// Unknown metrics and recipe-reported data problems come back as a
    /// diagnostic with `keyerror` set. `Err` means the engine is misconfigured:
    /// the recipe's capability class does not match the metric's variable count,
    /// or the recipe itself raised a configuration error.
    pub fn run_diagnostic(
        &self,
        spec: &MetricSpec,
        dataset: &ResolvedDataset,
        is_model: bool,
    ) -> EngineResult<DiagnosticRun> {
        let recipe = match self.recipes.get(&spec.name) {
            Some(recipe) => recipe,
            None => {
                warn!(metric = %spec.name, dataset = %dataset.name, "No recipe registered for metric");
                return Ok(DiagnosticRun::failed(format!(
                    "unknown metric: no recipe registered for '{}'",
                    spec.name
                )));
            }
        };

        if recipe.arity() != spec.arity() {
            return Err(EngineError::ConfigError(format!(
                "metric '{}' lists {} variable(s) but its recipe takes {}",
                spec.name,
                spec.arity(),
                recipe.arity()
            )));
        }
        if dataset.series.len() != recipe.arity() {
            return Err(EngineError::ConfigError(format!(
                "metric '{}' received {} series for dataset '{}', expected {}",
                spec.name,
                dataset.series.len(),
                dataset.name,
                recipe.arity()
            )));
        }

        let options = RecipeOptions::for_dataset(self.defaults, spec, is_model);
        let ctx = RecipeContext {
            dataset: &dataset.name,
            options: &options,
            dive_down: self.dive_down,
            nonlinearity: spec.nonlinearity,
        };

        let output = match recipe {
            Recipe::SingleVariable(f) => f(&dataset.series[0], &ctx)?,
            Recipe::DualVariable(f) => f(&dataset.series[0], &dataset.series[1], &ctx)?,
        };

        let mut diagnostic = output.diagnostic;
        if diagnostic.is_failed() {
            diagnostic.suppress_numeric();
            warn!(
                metric = %spec.name,
                dataset = %dataset.name,
                keyerror = diagnostic.keyerror.as_deref().unwrap_or_default(),
                "Recipe reported a data error"
            );
        } else {
            debug!(metric = %spec.name, dataset = %dataset.name, value = ?diagnostic.value, "Diagnostic computed");
        }
        if !self.dive_down {
            diagnostic.dive_down = None;
        }

        Ok(DiagnosticRun {
            diagnostic,
            metadata: Some(output.metadata),
        })
    }
}
