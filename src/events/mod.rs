//! Typed runtime events
//!
//! Core components never write to a log stream. Everything observable
//! (examples added, retrain requests, inference failures, clamped
//! confidences) is published as a [`RuntimeEvent`] on an [`EventBus`];
//! logging and telemetry subscribe to the bus.

pub mod bus;
pub mod logger;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::types::ContextId;

pub use bus::{EventBus, EventReceiver};
pub use logger::spawn_event_logger;

/// Something a runtime component wants the outside world to know about
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum RuntimeEvent {
    /// An example was appended to a context's store
    ExampleAdded {
        context: ContextId,
        /// `{"input": .., "output": ..}`
        example: serde_json::Value,
    },
    /// The adaptation engine decided the strategy should be updated
    RetrainRequested {
        context: ContextId,
        reasons: Vec<String>,
    },
    /// The strategy or base procedure raised, or timed out
    InferenceFailure {
        context: ContextId,
        cause: String,
    },
    /// A strategy reported a confidence outside [0, 1]; it was clamped
    ConfidenceOutOfRange {
        context: ContextId,
        reported: f64,
        clamped: f64,
    },
    /// Trigger evaluation failed and the decision fell back to no retrain
    AdaptationDegraded {
        context: ContextId,
        reasons: Vec<String>,
    },
    /// Explanation kinds that were requested but are not known
    ExplanationKindsIgnored {
        kinds: Vec<String>,
    },
}

impl RuntimeEvent {
    /// Short snake_case name, matching the serialized tag
    pub fn name(&self) -> &'static str {
        match self {
            RuntimeEvent::ExampleAdded { .. } => "example_added",
            RuntimeEvent::RetrainRequested { .. } => "retrain_requested",
            RuntimeEvent::InferenceFailure { .. } => "inference_failure",
            RuntimeEvent::ConfidenceOutOfRange { .. } => "confidence_out_of_range",
            RuntimeEvent::AdaptationDegraded { .. } => "adaptation_degraded",
            RuntimeEvent::ExplanationKindsIgnored { .. } => "explanation_kinds_ignored",
        }
    }

    /// The context the event concerns, if any
    pub fn context(&self) -> Option<&ContextId> {
        match self {
            RuntimeEvent::ExampleAdded { context, .. }
            | RuntimeEvent::RetrainRequested { context, .. }
            | RuntimeEvent::InferenceFailure { context, .. }
            | RuntimeEvent::ConfidenceOutOfRange { context, .. }
            | RuntimeEvent::AdaptationDegraded { context, .. } => Some(context),
            RuntimeEvent::ExplanationKindsIgnored { .. } => None,
        }
    }

    /// Whether a subscriber should treat this as a warning
    pub fn is_warning(&self) -> bool {
        matches!(
            self,
            RuntimeEvent::InferenceFailure { .. }
                | RuntimeEvent::ConfidenceOutOfRange { .. }
                | RuntimeEvent::AdaptationDegraded { .. }
        )
    }
}

/// An event stamped with an id and emission time
#[derive(Debug, Clone, Serialize)]
pub struct EventEnvelope {
    pub id: Uuid,
    pub at: DateTime<Utc>,
    #[serde(flatten)]
    pub event: RuntimeEvent,
}

impl EventEnvelope {
    pub fn new(event: RuntimeEvent) -> Self {
        Self {
            id: Uuid::new_v4(),
            at: Utc::now(),
            event,
        }
    }
}
