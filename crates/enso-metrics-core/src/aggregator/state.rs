//! Per-metric state machine.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use tracing::debug;

use crate::calculator::compare_diagnostics;
use crate::error::{EngineError, EngineResult};
use crate::recipe::RecipeMetadata;
use crate::registry::MetricSpec;
use crate::result::{MetricEntry, MetricMetadata};
use crate::runner::DiagnosticRun;
use crate::types::{ComparisonOperator, Diagnostic, MetricResult};

/// Processing state of one metric.
///
/// ```text
/// Pending -> ModelRun -> ObsFanOut -> Combine -> Done
///    \__________\___________\__________\______-> Errored
/// ```
///
/// # Example
///
/// ```
/// use enso_metrics_core::aggregator::MetricState;
///
/// assert!(MetricState::Pending.can_transition_to(MetricState::ModelRun));
/// assert!(MetricState::ModelRun.can_transition_to(MetricState::Errored));
/// assert!(!MetricState::Pending.can_transition_to(MetricState::Combine));
/// assert!(!MetricState::Errored.can_transition_to(MetricState::Done));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricState {
    Pending,
    /// Model diagnostic being computed.
    ModelRun,
    /// Observation diagnostics being computed.
    ObsFanOut,
    /// Model and observation diagnostics being compared.
    Combine,
    Done,
    /// Model diagnostic failed; absorbing.
    Errored,
}

impl MetricState {
    /// Check whether moving to `target` is legal.
    #[inline]
    pub fn can_transition_to(&self, target: MetricState) -> bool {
        use MetricState::*;
        matches!(
            (self, target),
            (Pending, ModelRun)
                | (ModelRun, ObsFanOut)
                | (ObsFanOut, Combine)
                | (Combine, Done)
                | (Pending | ModelRun | ObsFanOut | Combine, Errored)
        )
    }

    /// Whether no further transition is possible.
    #[inline]
    pub fn is_terminal(&self) -> bool {
        matches!(self, MetricState::Done | MetricState::Errored)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MetricState::Pending => "PENDING",
            MetricState::ModelRun => "MODEL_RUN",
            MetricState::ObsFanOut => "OBS_FAN_OUT",
            MetricState::Combine => "COMBINE",
            MetricState::Done => "DONE",
            MetricState::Errored => "ERRORED",
        }
    }
}

impl fmt::Display for MetricState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Accumulates the entry of one metric while walking its state machine.
#[derive(Debug, Clone)]
pub struct MetricBuilder {
    metric: String,
    model: String,
    operator: ComparisonOperator,
    nonlinearity: bool,
    state: MetricState,
    model_run: Option<DiagnosticRun>,
    observations: BTreeMap<String, Diagnostic>,
    metric_results: BTreeMap<String, MetricResult>,
}

impl MetricBuilder {
    pub fn new(spec: &MetricSpec, operator: ComparisonOperator, model: impl Into<String>) -> Self {
        Self {
            metric: spec.name.clone(),
            model: model.into(),
            operator,
            nonlinearity: spec.nonlinearity,
            state: MetricState::Pending,
            model_run: None,
            observations: BTreeMap::new(),
            metric_results: BTreeMap::new(),
        }
    }

    #[inline]
    pub fn state(&self) -> MetricState {
        self.state
    }

    fn transition(&mut self, target: MetricState) -> EngineResult<()> {
        if !self.state.can_transition_to(target) {
            return Err(EngineError::invalid_transition(&self.metric, self.state, target));
        }
        debug!(metric = %self.metric, from = %self.state, to = %target, "Metric state transition");
        self.state = target;
        Ok(())
    }

    /// Enter `ModelRun`.
    pub fn begin_model_run(&mut self) -> EngineResult<()> {
        self.transition(MetricState::ModelRun)
    }

    /// Record the model diagnostic.
    ///
    /// Moves to `Errored` when the diagnostic carries a `keyerror`, otherwise
    /// to `ObsFanOut`. Returns whether observations should be processed.
    pub fn record_model(&mut self, run: DiagnosticRun) -> EngineResult<bool> {
        let target = if run.diagnostic.is_failed() {
            MetricState::Errored
        } else {
            MetricState::ObsFanOut
        };
        if self.state != MetricState::ModelRun {
            return Err(EngineError::invalid_transition(&self.metric, self.state, target));
        }
        self.transition(target)?;
        self.model_run = Some(run);
        Ok(target == MetricState::ObsFanOut)
    }

    /// Record one observation diagnostic. Failed diagnostics are kept but
    /// never compared.
    pub fn record_observation(&mut self, name: impl Into<String>, diagnostic: Diagnostic) -> EngineResult<()> {
        if self.state != MetricState::ObsFanOut {
            return Err(EngineError::invalid_transition(
                &self.metric,
                self.state,
                MetricState::ObsFanOut,
            ));
        }
        self.observations.insert(name.into(), diagnostic);
        Ok(())
    }

    /// Compare the model diagnostic with every successful observation.
    pub fn combine(&mut self) -> EngineResult<()> {
        self.transition(MetricState::Combine)?;
        let model = match &self.model_run {
            Some(run) => &run.diagnostic,
            None => {
                return Err(EngineError::ConfigError(format!(
                    "metric '{}' reached {} without a model diagnostic",
                    self.metric, self.state
                )))
            }
        };
        for (name, obs) in &self.observations {
            if obs.is_failed() {
                continue;
            }
            let (result, _) = compare_diagnostics(model, obs, self.operator, self.nonlinearity);
            self.metric_results.insert(name.clone(), result);
        }
        Ok(())
    }

    /// Close the metric and produce its entry.
    pub fn finish(mut self) -> EngineResult<MetricEntry> {
        if self.state == MetricState::Combine {
            self.transition(MetricState::Done)?;
        }
        if !self.state.is_terminal() {
            return Err(EngineError::invalid_transition(&self.metric, self.state, MetricState::Done));
        }

        let (model_diagnostic, recipe_metadata) = match self.model_run {
            Some(run) => (run.diagnostic, run.metadata),
            None => (Diagnostic::default(), None),
        };
        let metadata = metric_metadata(&self.metric, self.operator, recipe_metadata.as_ref());
        let keyerror = model_diagnostic.keyerror.clone();

        let mut diagnostic = self.observations;
        diagnostic.insert(self.model, model_diagnostic);

        Ok(MetricEntry {
            metric: self.metric_results,
            diagnostic,
            metadata,
            keyerror,
        })
    }
}

fn metric_metadata(
    metric: &str,
    operator: ComparisonOperator,
    recipe: Option<&RecipeMetadata>,
) -> MetricMetadata {
    let mut metadata = MetricMetadata {
        name: metric.to_string(),
        operator,
        description: operator.description().to_string(),
        ..Default::default()
    };
    if let Some(recipe) = recipe {
        if !recipe.name.is_empty() {
            metadata.name = recipe.name.clone();
        }
        metadata.units = operator.metric_units(&recipe.units);
        metadata.diagnostic_units = recipe.units.clone();
        metadata.method = recipe.method.clone();
        metadata.time_frequency = recipe.time_frequency.clone();
        metadata.reference = recipe.reference.clone();
    }
    metadata
}
