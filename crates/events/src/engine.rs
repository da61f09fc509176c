//! The version control engine as seen by the cache

use crate::event::EngineEvent;
use pendmap_core::{EngineError, PathTranslator, PendingChange, WorkspaceId};
use std::sync::Arc;

/// Receives engine events
///
/// Handlers may be called from any thread.
pub trait EngineEventHandler: Send + Sync {
    fn on_event(&self, event: &EngineEvent);
}

impl<F> EngineEventHandler for F
where
    F: Fn(&EngineEvent) + Send + Sync,
{
    fn on_event(&self, event: &EngineEvent) {
        self(event)
    }
}

/// Handle returned by [`EventSource::subscribe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    pub const fn get(self) -> u64 {
        self.0
    }
}

/// Something handlers can subscribe to for engine events
pub trait EventSource: Send + Sync {
    fn subscribe(&self, handler: Arc<dyn EngineEventHandler>) -> SubscriptionId;

    /// Returns false when the subscription was already gone
    fn unsubscribe(&self, id: SubscriptionId) -> bool;
}

/// A version control engine bound to one workspace
pub trait VersionControlEngine: Send + Sync {
    /// The workspace this engine serves
    fn workspace(&self) -> &WorkspaceId;

    /// Ask the server for every pending change in the workspace
    ///
    /// This is a round trip and may be slow.
    fn query_pending_changes(&self) -> Result<Vec<PendingChange>, EngineError>;

    /// Server/local path translation for the workspace
    fn path_translator(&self) -> Arc<dyn PathTranslator>;

    /// Where the engine publishes its events
    fn event_source(&self) -> Arc<dyn EventSource>;
}
