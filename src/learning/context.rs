//! Learning Context - one learned capability
//!
//! Couples an example store with an inference strategy and the adaptation
//! triggers for that capability. Contexts are shared by `Arc` between the
//! enhancement wrapper and callers adding examples directly.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use super::store::{ExampleSnapshot, ExampleStore};
use super::strategy::InferenceStrategy;
use crate::adaptation::{AdaptationTrigger, OutcomeWindow, TriggerInput};
use crate::adaptation::window::DEFAULT_WINDOW;
use crate::config::CapabilityConfig;
use crate::error::{Error, Result};
use crate::events::{EventBus, RuntimeEvent};
use crate::types::{ContextId, Datum, Example, Feedback, InferenceResult};

/// A learned capability
pub struct LearningContext<I, O> {
    id: ContextId,
    store: ExampleStore<I, O>,
    strategy: Arc<dyn InferenceStrategy<I, O>>,
    triggers: Vec<AdaptationTrigger>,
    outcomes: Mutex<OutcomeWindow>,
    examples_since_retrain: AtomicUsize,
    events: EventBus,
}

impl<I: Datum, O: Datum> LearningContext<I, O> {
    /// Start building a context around a strategy
    pub fn builder(
        name: impl Into<String>,
        strategy: Arc<dyn InferenceStrategy<I, O>>,
    ) -> LearningContextBuilder<I, O> {
        LearningContextBuilder {
            name: name.into(),
            strategy,
            examples: Vec::new(),
            triggers: Vec::new(),
            outcome_window: DEFAULT_WINDOW,
            events: None,
        }
    }

    /// Build a context from a capability's configuration section.
    ///
    /// Seed examples are `{input, output}` objects; one that does not fit
    /// `I`/`O` is rejected as an invalid example.
    pub fn from_config(
        name: &str,
        config: &CapabilityConfig,
        strategy: Arc<dyn InferenceStrategy<I, O>>,
        events: EventBus,
    ) -> Result<Self> {
        let mut builder = Self::builder(name, strategy)
            .events(events)
            .outcome_window(config.outcome_window.unwrap_or(DEFAULT_WINDOW));

        for (idx, raw) in config.examples.iter().enumerate() {
            let example: Example<I, O> = serde_json::from_value(raw.clone()).map_err(|e| {
                Error::InvalidExample(format!("seed example {} of '{}': {}", idx, name, e))
            })?;
            builder = builder.examples(std::iter::once(example));
        }

        for (trigger_name, spec) in &config.adaptation_triggers {
            builder = builder.trigger(spec.clone().into_trigger(trigger_name.clone())?);
        }

        builder.build()
    }

    pub fn id(&self) -> &ContextId {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.id.name
    }

    pub fn strategy(&self) -> &Arc<dyn InferenceStrategy<I, O>> {
        &self.strategy
    }

    pub fn triggers(&self) -> &[AdaptationTrigger] {
        &self.triggers
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Run the strategy on `input` against the current examples.
    ///
    /// A confidence outside [0, 1] is clamped and reported as
    /// `ConfidenceOutOfRange`. Strategy errors come back as
    /// `InferenceFailure`.
    pub async fn process(&self, input: &I) -> Result<InferenceResult<O>> {
        let snapshot = self.store.all();
        let mut result = match self.strategy.infer(input, &snapshot).await {
            Ok(result) => result,
            Err(cause) => {
                self.events.emit(RuntimeEvent::InferenceFailure {
                    context: self.id.clone(),
                    cause: format!("{:#}", cause),
                });
                return Err(Error::inference(self.id.to_string(), cause));
            }
        };

        if let Some(reported) = result.normalize() {
            self.events.emit(RuntimeEvent::ConfidenceOutOfRange {
                context: self.id.clone(),
                reported,
                clamped: result.confidence,
            });
        }
        Ok(result)
    }

    /// Validate and store a new example, emitting `ExampleAdded`
    pub fn add_example(&self, input: I, output: O) -> Result<()> {
        let example = Example::new(input, output);
        let payload = serde_json::to_value(&example).unwrap_or(serde_json::Value::Null);
        self.store.add(example)?;
        self.examples_since_retrain.fetch_add(1, Ordering::SeqCst);
        self.events.emit(RuntimeEvent::ExampleAdded {
            context: self.id.clone(),
            example: payload,
        });
        Ok(())
    }

    /// Snapshot of the stored examples
    pub fn examples(&self) -> ExampleSnapshot<I, O> {
        self.store.all()
    }

    pub fn example_count(&self) -> usize {
        self.store.len()
    }

    /// Whether any trigger fires for this result and optional feedback.
    ///
    /// Read-only: the feedback is considered but not recorded. A trigger
    /// that errors counts as not firing.
    pub fn should_adapt(&self, result: &InferenceResult<O>, feedback: Option<&Feedback<O>>) -> bool {
        let pending = feedback.map(|f| f.disagrees_with(result));
        self.evaluate_triggers(result.confidence, pending)
            .into_iter()
            .any(|(_, outcome)| matches!(outcome, Ok(true)))
    }

    /// Evaluate every trigger, in configured order
    pub fn evaluate_triggers(
        &self,
        confidence: f64,
        pending_disagreement: Option<bool>,
    ) -> Vec<(String, anyhow::Result<bool>)> {
        self.evaluate_counted(confidence, pending_disagreement).1
    }

    /// Like `evaluate_triggers`, also returning the examples-added count the
    /// triggers saw
    pub(crate) fn evaluate_counted(
        &self,
        confidence: f64,
        pending_disagreement: Option<bool>,
    ) -> (usize, Vec<(String, anyhow::Result<bool>)>) {
        let outcomes = self.outcomes.lock().unwrap_or_else(PoisonError::into_inner);
        let examples_since_retrain = self.examples_since_retrain();
        let input = TriggerInput {
            confidence,
            pending_disagreement,
            outcomes: &outcomes,
            examples_since_retrain,
        };
        let results = self
            .triggers
            .iter()
            .map(|t| (t.name.clone(), t.fires(&input)))
            .collect();
        (examples_since_retrain, results)
    }

    /// Append an outcome observation to the rolling window
    pub fn record_outcome(&self, disagreed: bool) {
        self.outcomes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .record(disagreed);
    }

    /// Outcome observations currently held
    pub fn outcome_count(&self) -> usize {
        self.outcomes.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn examples_since_retrain(&self) -> usize {
        self.examples_since_retrain.load(Ordering::SeqCst)
    }

    /// Consume the examples a retrain request accounted for. Examples added
    /// after the triggers were evaluated stay counted.
    pub(crate) fn mark_retrain_requested(&self, evaluated: usize) {
        let _ = self
            .examples_since_retrain
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| Some(n.saturating_sub(evaluated)));
    }

    /// Hand the current examples to the strategy's update hook
    pub async fn retrain(&self, reasons: &[String]) -> anyhow::Result<()> {
        let snapshot = self.store.all();
        self.strategy.update(&snapshot, reasons).await
    }

    /// Forget every example and outcome
    pub fn reset(&self) {
        self.store.clear();
        self.outcomes.lock().unwrap_or_else(PoisonError::into_inner).clear();
        self.examples_since_retrain.store(0, Ordering::SeqCst);
    }
}

/// Builder for [`LearningContext`]
pub struct LearningContextBuilder<I, O> {
    name: String,
    strategy: Arc<dyn InferenceStrategy<I, O>>,
    examples: Vec<Example<I, O>>,
    triggers: Vec<AdaptationTrigger>,
    outcome_window: usize,
    events: Option<EventBus>,
}

impl<I: Datum, O: Datum> LearningContextBuilder<I, O> {
    /// Seed examples
    pub fn examples(mut self, examples: impl IntoIterator<Item = Example<I, O>>) -> Self {
        self.examples.extend(examples);
        self
    }

    pub fn example(mut self, input: I, output: O) -> Self {
        self.examples.push(Example::new(input, output));
        self
    }

    pub fn trigger(mut self, trigger: AdaptationTrigger) -> Self {
        self.triggers.push(trigger);
        self
    }

    /// Outcomes kept for accumulated-feedback triggers. Grown automatically
    /// to the largest trigger window.
    pub fn outcome_window(mut self, size: usize) -> Self {
        self.outcome_window = size;
        self
    }

    pub fn events(mut self, events: EventBus) -> Self {
        self.events = Some(events);
        self
    }

    pub fn build(self) -> Result<LearningContext<I, O>> {
        let store = ExampleStore::with_examples(self.examples)?;
        let window = self
            .triggers
            .iter()
            .filter_map(|t| t.window_len())
            .fold(self.outcome_window, usize::max);

        Ok(LearningContext {
            id: ContextId::new(self.name),
            store,
            strategy: self.strategy,
            triggers: self.triggers,
            outcomes: Mutex::new(OutcomeWindow::new(window)),
            examples_since_retrain: AtomicUsize::new(0),
            events: self.events.unwrap_or_default(),
        })
    }
}
