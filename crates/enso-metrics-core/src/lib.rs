//! Metric collection engine comparing climate model ENSO diagnostics against
//! observational references.
//!
//! For a named collection of metrics the engine resolves the variables each
//! metric needs, runs the metric's recipe once for the model and once per
//! observation, compares the resulting diagnostics into a distance with
//! propagated uncertainty, and assembles the collection output.
//!
//! # Modules
//!
//! - [`registry`]: Metric collections, metric specs and collection defaults
//! - [`recipe`]: Recipe dispatch table ([`RecipeSet`]) and recipe contract
//! - [`resolver`]: Dataset resolver contract and in-memory resolver
//! - [`runner`]: One recipe invocation for one dataset
//! - [`calculator`]: Model-vs-observation comparison operators
//! - [`aggregator`]: Per-metric state machine and collection assembly
//! - [`reports`]: JSON output and Markdown summary
//! - [`config`]: Engine configuration
//! - [`error`]: Error types and result aliases
//!
//! # Error classes
//!
//! - Data problems are `keyerror` strings on a [`types::Diagnostic`] and never
//!   stop the collection.
//! - A missing model or observation value makes a comparison absent, silently.
//! - Configuration mistakes (unknown operator, smoothing or detrending method,
//!   recipe arity mismatch) are [`EngineError`]s. An unknown metric name is the
//!   exception: it is recorded as a keyerror.
//!
//! # Example
//!
//! ```
//! use enso_metrics_core::calculator::compute_metric;
//! use enso_metrics_core::types::{ComparisonOperator, Measured};
//!
//! let out = compute_metric(
//!     Measured::new(Some(3.0), None),
//!     Measured::new(Some(2.0), None),
//!     ComparisonOperator::AbsRelativeDifference,
//! );
//! assert_eq!(out.value, Some(50.0));
//! ```

pub mod aggregator;
pub mod calculator;
pub mod config;
pub mod error;
pub mod options;
pub mod recipe;
pub mod registry;
pub mod reports;
pub mod resolver;
pub mod result;
pub mod runner;
pub mod types;

pub use aggregator::{CollectionAggregator, MetricState};
pub use config::EngineConfig;
pub use error::{EngineError, EngineResult};
pub use options::RecipeOptions;
pub use recipe::{Recipe, RecipeSet};
pub use registry::{CollectionRegistry, MetricCollection, MetricSpec};
pub use reports::{CollectionReport, ReportFormat};
pub use resolver::{DatasetResolver, InMemoryResolver};
pub use result::{CollectionResult, MetricEntry};
pub use runner::DiagnosticRunner;
