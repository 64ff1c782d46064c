//! Event logger - writes runtime events to `tracing`
//!
//! This is the observability collaborator: the only place runtime events
//! turn into log lines.

use tokio::task::JoinHandle;
use tracing::{debug, info, warn, Level};

use super::{EventBus, EventEnvelope, RuntimeEvent};

/// Spawn a task that logs every event published on `bus`.
///
/// The task ends when every bus handle has been dropped.
pub fn spawn_event_logger(bus: &EventBus) -> JoinHandle<()> {
    let mut rx = bus.subscribe();
    tokio::spawn(async move {
        while let Some(received) = rx.recv().await {
            match received {
                Ok(envelope) => log_event(&envelope),
                Err(skipped) => warn!("Event logger lagged, skipped {} events", skipped),
            }
        }
        debug!("Event bus closed, event logger exiting");
    })
}

/// Log a single event at a level matching its severity
pub fn log_event(envelope: &EventEnvelope) {
    let id = envelope.id;
    let event = &envelope.event;
    let name = event.name();
    let context = event.context().map(ToString::to_string).unwrap_or_default();
    let message = describe(event);
    match level(event) {
        Level::WARN => warn!(event_id = %id, event = name, context = %context, "{}", message),
        Level::INFO => info!(event_id = %id, event = name, context = %context, "{}", message),
        _ => debug!(event_id = %id, event = name, context = %context, "{}", message),
    }
}

fn level(event: &RuntimeEvent) -> Level {
    if event.is_warning() {
        Level::WARN
    } else if matches!(event, RuntimeEvent::RetrainRequested { .. }) {
        Level::INFO
    } else {
        Level::DEBUG
    }
}

fn describe(event: &RuntimeEvent) -> String {
    match event {
        RuntimeEvent::ExampleAdded { example, .. } => format!("Example added: {}", example),
        RuntimeEvent::RetrainRequested { reasons, .. } => format!("Retrain requested: {}", reasons.join(", ")),
        RuntimeEvent::InferenceFailure { cause, .. } => format!("Inference failed: {}", cause),
        RuntimeEvent::ConfidenceOutOfRange { reported, clamped, .. } => format!(
            "Strategy reported confidence {} outside [0, 1], clamped to {}",
            reported, clamped
        ),
        RuntimeEvent::AdaptationDegraded { reasons, .. } => {
            format!("Adaptation evaluation failed: {}", reasons.join("; "))
        }
        RuntimeEvent::ExplanationKindsIgnored { kinds } => {
            format!("Ignored unknown explanation kinds: {}", kinds.join(", "))
        }
    }
}
