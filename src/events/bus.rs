//! Event bus
//!
//! Fan-out of runtime events to any number of subscribers over a tokio
//! broadcast channel. Emitting never blocks and never fails: with no
//! subscribers the event is simply dropped.

use tokio::sync::broadcast;

use super::{EventEnvelope, RuntimeEvent};

/// Default number of buffered events per subscriber
pub const DEFAULT_CAPACITY: usize = 256;

/// Publisher side of the event channel
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<EventEnvelope>,
}

impl EventBus {
    /// Create a new bus with the default capacity
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Publish an event to every current subscriber
    pub fn emit(&self, event: RuntimeEvent) {
        // No receivers is fine
        let _ = self.tx.send(EventEnvelope::new(event));
    }

    /// Subscribe to events emitted from now on
    pub fn subscribe(&self) -> EventReceiver {
        EventReceiver {
            rx: self.tx.subscribe(),
        }
    }

    /// Number of live subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Subscriber side of the event channel
pub struct EventReceiver {
    rx: broadcast::Receiver<EventEnvelope>,
}

impl EventReceiver {
    /// Wait for the next event.
    ///
    /// Returns the number of skipped events as `Err` when this subscriber
    /// fell behind, and `None` once every bus handle is dropped.
    pub async fn recv(&mut self) -> Option<Result<EventEnvelope, u64>> {
        match self.rx.recv().await {
            Ok(envelope) => Some(Ok(envelope)),
            Err(broadcast::error::RecvError::Lagged(skipped)) => Some(Err(skipped)),
            Err(broadcast::error::RecvError::Closed) => None,
        }
    }

    /// Take an already-delivered event without waiting
    pub fn try_recv(&mut self) -> Option<EventEnvelope> {
        loop {
            match self.rx.try_recv() {
                Ok(envelope) => return Some(envelope),
                Err(broadcast::error::TryRecvError::Lagged(_)) => continue,
                Err(_) => return None,
            }
        }
    }

    /// Drain everything delivered so far
    pub fn drain(&mut self) -> Vec<RuntimeEvent> {
        let mut events = Vec::new();
        while let Some(envelope) = self.try_recv() {
            events.push(envelope.event);
        }
        events
    }
}
