//! Adaptation Engine - decides when a capability should be retrained
//!
//! The engine records outcome feedback into the context's rolling window,
//! evaluates every trigger, and on a positive decision emits
//! `RetrainRequested`. Retraining itself belongs to the strategy's update
//! hook. Evaluation problems never reach the caller: they turn into a
//! negative decision carrying the failure as its reason.

use serde::Serialize;

use crate::events::{EventBus, RuntimeEvent};
use crate::learning::LearningContext;
use crate::types::{Datum, Feedback, InferenceResult};

/// Outcome of one adaptation evaluation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AdaptationDecision {
    pub should_retrain: bool,
    /// Names of the triggers that fired, in configured order, or the
    /// failures that prevented a decision
    pub reasons: Vec<String>,
}

impl AdaptationDecision {
    pub fn no_change() -> Self {
        Self {
            should_retrain: false,
            reasons: Vec::new(),
        }
    }
}

/// Evaluates adaptation triggers and signals retrain requests
#[derive(Clone)]
pub struct AdaptationEngine {
    events: EventBus,
}

impl AdaptationEngine {
    pub fn new(events: EventBus) -> Self {
        Self { events }
    }

    /// Evaluate a context's triggers against a result and optional feedback
    pub fn evaluate<I: Datum, O: Datum>(
        &self,
        context: &LearningContext<I, O>,
        result: &InferenceResult<O>,
        feedback: Option<&Feedback<O>>,
    ) -> AdaptationDecision {
        if let Some(feedback) = feedback {
            context.record_outcome(feedback.disagrees_with(result));
        }

        let mut fired = Vec::new();
        let mut failures = Vec::new();
        let (evaluated_examples, outcomes) = context.evaluate_counted(result.confidence, None);
        for (name, outcome) in outcomes {
            match outcome {
                Ok(true) => fired.push(name),
                Ok(false) => {}
                Err(e) => failures.push(format!("{}: {}", name, e)),
            }
        }

        if !failures.is_empty() {
            self.events.emit(RuntimeEvent::AdaptationDegraded {
                context: context.id().clone(),
                reasons: failures.clone(),
            });
            return AdaptationDecision {
                should_retrain: false,
                reasons: failures,
            };
        }

        if fired.is_empty() {
            return AdaptationDecision::no_change();
        }

        context.mark_retrain_requested(evaluated_examples);
        self.events.emit(RuntimeEvent::RetrainRequested {
            context: context.id().clone(),
            reasons: fired.clone(),
        });
        AdaptationDecision {
            should_retrain: true,
            reasons: fired,
        }
    }
}
