//! In-process event fan-out

use crate::engine::{EngineEventHandler, EventSource, SubscriptionId};
use crate::event::EngineEvent;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::trace;

type Subscribers = Vec<(SubscriptionId, Arc<dyn EngineEventHandler>)>;

/// Delivers published events to every subscriber, in subscription order
///
/// Handlers run on the publishing thread. The subscriber list is copied
/// before delivery so handlers may subscribe or unsubscribe while an event
/// is in flight.
pub struct EventBus {
    subscribers: RwLock<Subscribers>,
    next_id: AtomicU64,
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            subscribers: RwLock::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn publish(&self, event: &EngineEvent) {
        let handlers: Vec<Arc<dyn EngineEventHandler>> = self
            .subscribers
            .read()
            .iter()
            .map(|(_, handler)| Arc::clone(handler))
            .collect();

        trace!(
            event = event.name(),
            workspace = %event.workspace(),
            subscribers = handlers.len(),
            "Publishing event"
        );

        for handler in handlers {
            handler.on_event(event);
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.read().len()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSource for EventBus {
    fn subscribe(&self, handler: Arc<dyn EngineEventHandler>) -> SubscriptionId {
        let id = SubscriptionId::new(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.subscribers.write().push((id, handler));
        id
    }

    fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subscribers = self.subscribers.write();
        let before = subscribers.len();
        subscribers.retain(|(existing, _)| *existing != id);
        subscribers.len() != before
    }
}
