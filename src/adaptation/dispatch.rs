//! Retrain dispatcher
//!
//! Background task closing the feedback loop: listens for
//! `RetrainRequested` events and hands them to the matching context's
//! strategy update hook.

use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::events::{EventBus, EventEnvelope, RuntimeEvent};
use crate::learning::CapabilityRegistry;
use crate::types::Datum;

/// Spawn the dispatcher. It runs until `shutdown_rx` fires or the bus closes.
///
/// Requests already on the bus when shutdown arrives are still handled.
pub fn spawn_retrain_dispatcher<I: Datum, O: Datum>(
    bus: &EventBus,
    registry: Arc<CapabilityRegistry<I, O>>,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> JoinHandle<()> {
    let mut events = bus.subscribe();
    tokio::spawn(async move {
        loop {
            tokio::select! {
                biased;
                received = events.recv() => {
                    match received {
                        Some(Ok(envelope)) => handle(&registry, envelope).await,
                        Some(Err(skipped)) => {
                            warn!("Retrain dispatcher lagged, skipped {} events", skipped);
                        }
                        None => break,
                    }
                }
                _ = shutdown_rx.recv() => {
                    while let Some(envelope) = events.try_recv() {
                        handle(&registry, envelope).await;
                    }
                    debug!("Retrain dispatcher shutting down");
                    break;
                }
            }
        }
    })
}

async fn handle<I: Datum, O: Datum>(registry: &CapabilityRegistry<I, O>, envelope: EventEnvelope) {
    let RuntimeEvent::RetrainRequested { context, reasons } = envelope.event else {
        return;
    };
    let Some(target) = registry.get_by_id(&context).await else {
        debug!("Retrain requested for unregistered context {}", context);
        return;
    };
    match target.retrain(&reasons).await {
        Ok(()) => info!("Retrained {} ({})", context, reasons.join(", ")),
        Err(e) => warn!("Retrain of {} failed: {:#}", context, e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adaptation::{AdaptationEngine, AdaptationTrigger};
    use crate::learning::{ExampleSnapshot, InferenceStrategy, LearningContext};
    use crate::types::InferenceResult;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct CountingStrategy {
        updates: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl InferenceStrategy<String, String> for CountingStrategy {
        async fn infer(
            &self,
            _input: &String,
            _examples: &ExampleSnapshot<String, String>,
        ) -> anyhow::Result<InferenceResult<String>> {
            Ok(InferenceResult::new("UNSURE".to_string(), 0.1))
        }

        async fn update(&self, examples: &ExampleSnapshot<String, String>, _reasons: &[String]) -> anyhow::Result<()> {
            self.updates.fetch_add(examples.len().max(1), Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_dispatcher_calls_update_hook() {
        let bus = EventBus::new();
        let updates = Arc::new(AtomicUsize::new(0));
        let ctx = LearningContext::builder("unsure", Arc::new(CountingStrategy { updates: updates.clone() }))
            .events(bus.clone())
            .trigger(AdaptationTrigger::confidence_below("low", 0.5))
            .build()
            .unwrap();

        let registry = Arc::new(CapabilityRegistry::new());
        let ctx = registry.register(ctx).await;

        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        let handle = spawn_retrain_dispatcher(&bus, registry.clone(), shutdown_rx);

        let result = ctx.process(&"anything".to_string()).await.unwrap();
        let decision = AdaptationEngine::new(bus.clone()).evaluate(&ctx, &result, None);
        assert!(decision.should_retrain);

        for _ in 0..50 {
            if updates.load(Ordering::SeqCst) > 0 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(updates.load(Ordering::SeqCst), 1);

        shutdown_tx.send(()).unwrap();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_requests_queued_before_shutdown_are_handled() {
        for round in 1..=50 {
            let bus = EventBus::new();
            let updates = Arc::new(AtomicUsize::new(0));
            let ctx = LearningContext::builder("unsure", Arc::new(CountingStrategy { updates: updates.clone() }))
                .events(bus.clone())
                .trigger(AdaptationTrigger::confidence_below("low", 0.5))
                .build()
                .unwrap();
            let registry = Arc::new(CapabilityRegistry::new());
            let ctx = registry.register(ctx).await;

            let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
            let handle = spawn_retrain_dispatcher(&bus, registry.clone(), shutdown_rx);

            let result = ctx.process(&"anything".to_string()).await.unwrap();
            assert!(AdaptationEngine::new(bus.clone()).evaluate(&ctx, &result, None).should_retrain);
            shutdown_tx.send(()).unwrap();
            handle.await.unwrap();

            assert_eq!(updates.load(Ordering::SeqCst), 1, "round {}", round);
        }
    }
}
