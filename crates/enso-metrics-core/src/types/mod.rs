//! Data model shared by the registry, runner, calculator and aggregator.
//!
//! - [`Diagnostic`]: raw single-dataset result of a recipe
//! - [`MetricResult`] / [`ComparisonOperator`]: model-vs-observation distance
//! - [`GriddedSeries`] / [`TimeBounds`]: resolved in-memory data handed to recipes
//! - [`DatasetRef`] / [`VariableSource`]: opaque handles resolved by a
//!   [`DatasetResolver`](crate::resolver::DatasetResolver)

mod dataset;
mod diagnostic;
mod metric;
mod series;

pub use self::dataset::{
    CombineOp, DatasetRef, FileVariable, OneOrMany, VariableEntry, VariableSource,
};
pub use self::diagnostic::{
    AxisCoordinates, AxisDescriptor, Diagnostic, DiveDown, KEYERROR_SEPARATOR,
};
pub use self::metric::{ComparisonOperator, Measured, MetricResult};
pub use self::series::{monthly_time_axis, GriddedSeries, TimeBounds};
