//! Reference ENSO recipes for the enso-metrics engine.
//!
//! Recipes turn one or two resolved series into a [`Diagnostic`]. They share
//! a preprocessing pipeline ([`preprocess::regional_index`]) and report data
//! problems as `keyerror` strings; only option values no dataset could
//! satisfy come back as `Err`.
//!
//! # Example
//!
//! ```
//! use enso_metrics_recipes::default_recipe_set;
//!
//! let recipes = default_recipe_set();
//! assert!(recipes.contains("EnsoAmpl"));
//! assert_eq!(recipes.get("EnsoFbSstTaux").map(|r| r.arity()), Some(2));
//! ```
//!
//! [`Diagnostic`]: enso_metrics_core::types::Diagnostic

pub mod enso;
pub mod error;
pub mod feedback;
pub mod preprocess;
pub mod stats;
pub mod units;

use enso_metrics_core::RecipeSet;

pub use error::{PreprocessError, PreprocessResult};
pub use units::VariableKind;

/// Every reference recipe, keyed by metric name.
pub fn default_recipe_set() -> RecipeSet {
    let mut recipes = RecipeSet::new();
    recipes
        .register_single("EnsoAmpl", enso::enso_ampl)
        .register_single("EnsoSeasonality", enso::enso_seasonality)
        .register_single("EnsoSstSkew", enso::enso_sst_skew)
        .register_single("EnsoDuration", enso::enso_duration)
        .register_dual("EnsoFbSstTaux", feedback::enso_fb_sst_taux)
        .register_dual("EnsoFbSstThf", feedback::enso_fb_sst_thf)
        .register_dual("EnsoFbSshSst", feedback::enso_fb_ssh_sst)
        .register_dual("EnsoFbTauxSsh", feedback::enso_fb_taux_ssh);
    recipes
}

#[cfg(test)]
mod tests {
    use super::*;
    use enso_metrics_core::registry::CollectionRegistry;

    #[test]
    fn test_builtin_collections_are_covered() {
        let recipes = default_recipe_set();
        let registry = CollectionRegistry::builtin();
        for name in registry.names() {
            let collection = registry.get(name).unwrap();
            for metric in &collection.metrics {
                let recipe = recipes
                    .get(&metric.name)
                    .unwrap_or_else(|| panic!("no recipe for {}", metric.name));
                assert_eq!(recipe.arity(), metric.arity(), "{}", metric.name);
            }
        }
    }
}
