//! Recipe dispatch contract.
//!
//! A recipe is a leaf numeric routine over one or two resolved series. Recipes
//! are registered by name in a [`RecipeSet`] at startup; the metric name of a
//! [`MetricSpec`](crate::registry::MetricSpec) is the lookup key.
//!
//! Recipes report data problems through the returned
//! [`Diagnostic::keyerror`] and reserve `Err` for configuration errors that
//! must abort the run.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::error::EngineResult;
use crate::options::RecipeOptions;
use crate::types::{Diagnostic, GriddedSeries};

/// Everything a recipe needs besides its input series.
#[derive(Debug, Clone, Copy)]
pub struct RecipeContext<'a> {
    /// Dataset label, used only to name dive-down outputs.
    pub dataset: &'a str,
    pub options: &'a RecipeOptions,
    /// Whether to materialize a dive-down payload.
    pub dive_down: bool,
    /// Whether the metric wants the nonlinearity sub-value.
    pub nonlinearity: bool,
}

/// Descriptive fields a recipe provides alongside its diagnostic.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecipeMetadata {
    pub name: String,
    /// Units of the diagnostic value.
    pub units: String,
    pub method: String,
    pub time_frequency: String,
    pub reference: String,
}

/// What a recipe returns for one dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct RecipeOutput {
    pub diagnostic: Diagnostic,
    pub metadata: RecipeMetadata,
}

impl RecipeOutput {
    pub fn new(diagnostic: Diagnostic, metadata: RecipeMetadata) -> Self {
        Self {
            diagnostic,
            metadata,
        }
    }

    /// Output for a recipe that hit a data problem.
    pub fn failed(keyerror: impl Into<String>, metadata: RecipeMetadata) -> Self {
        Self::new(Diagnostic::failed(keyerror), metadata)
    }
}

/// Single-variable recipe signature.
pub type SingleVariableFn = fn(&GriddedSeries, &RecipeContext<'_>) -> EngineResult<RecipeOutput>;

/// Dual-variable recipe signature; both series share a time axis.
pub type DualVariableFn =
    fn(&GriddedSeries, &GriddedSeries, &RecipeContext<'_>) -> EngineResult<RecipeOutput>;

/// A registered recipe, tagged by capability class.
#[derive(Clone, Copy)]
pub enum Recipe {
    SingleVariable(SingleVariableFn),
    DualVariable(DualVariableFn),
}

impl Recipe {
    /// Number of series the recipe consumes.
    #[inline]
    pub fn arity(&self) -> usize {
        match self {
            Recipe::SingleVariable(_) => 1,
            Recipe::DualVariable(_) => 2,
        }
    }
}

impl fmt::Debug for Recipe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Recipe::SingleVariable(_) => f.write_str("Recipe::SingleVariable"),
            Recipe::DualVariable(_) => f.write_str("Recipe::DualVariable"),
        }
    }
}

/// Static name-to-recipe table.
///
/// # Example
///
/// ```
/// use enso_metrics_core::recipe::{Recipe, RecipeContext, RecipeMetadata, RecipeOutput, RecipeSet};
/// use enso_metrics_core::types::{Diagnostic, GriddedSeries};
/// use enso_metrics_core::EngineResult;
///
/// fn first_value(series: &GriddedSeries, _ctx: &RecipeContext<'_>) -> EngineResult<RecipeOutput> {
///     Ok(RecipeOutput::new(
///         Diagnostic::computed(series.data[[0, 0]], None),
///         RecipeMetadata::default(),
///     ))
/// }
///
/// let mut recipes = RecipeSet::new();
/// recipes.register_single("FirstValue", first_value);
/// assert!(matches!(recipes.get("FirstValue"), Some(Recipe::SingleVariable(_))));
/// assert!(recipes.get("Unknown").is_none());
/// ```
#[derive(Debug, Clone, Default)]
pub struct RecipeSet {
    recipes: BTreeMap<String, Recipe>,
}

impl RecipeSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a single-variable recipe, replacing any recipe of the same name.
    pub fn register_single(&mut self, name: impl Into<String>, recipe: SingleVariableFn) -> &mut Self {
        self.recipes.insert(name.into(), Recipe::SingleVariable(recipe));
        self
    }

    /// Register a dual-variable recipe, replacing any recipe of the same name.
    pub fn register_dual(&mut self, name: impl Into<String>, recipe: DualVariableFn) -> &mut Self {
        self.recipes.insert(name.into(), Recipe::DualVariable(recipe));
        self
    }

    pub fn get(&self, name: &str) -> Option<&Recipe> {
        self.recipes.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.recipes.contains_key(name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.recipes.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.recipes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.recipes.is_empty()
    }
}
