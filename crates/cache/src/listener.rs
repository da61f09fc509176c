//! Cache observers

use crate::cache::PendingChangeCache;
use parking_lot::RwLock;
use pendmap_core::PendingChange;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Receives cache notifications
///
/// Every callback has an empty default, so observers implement only what
/// they need. Callbacks run on the thread that changed the cache, after the
/// collection lock has been released; they may query the cache.
pub trait PendingChangeCacheListener: Send + Sync {
    /// The outermost update bracket opened
    fn on_before_update(&self, _cache: &PendingChangeCache) {}

    /// The outermost update bracket closed; `modified` tells whether
    /// anything changed in between
    fn on_after_update(&self, _cache: &PendingChangeCache, _modified: bool) {}

    fn on_added(&self, _cache: &PendingChangeCache, _change: &Arc<PendingChange>) {}

    fn on_removed(&self, _cache: &PendingChangeCache, _change: &Arc<PendingChange>) {}

    /// `new` replaced `old`
    fn on_modified(
        &self,
        _cache: &PendingChangeCache,
        _old: &Arc<PendingChange>,
        _new: &Arc<PendingChange>,
    ) {
    }

    fn on_cleared(&self, _cache: &PendingChangeCache) {}
}

/// Handle returned by [`PendingChangeCache::add_listener`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Entries = Vec<(ListenerId, Arc<dyn PendingChangeCacheListener>)>;

/// Ordered listener registry
pub(crate) struct ListenerSet {
    entries: RwLock<Entries>,
    next_id: AtomicU64,
}

impl ListenerSet {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn add(&self, listener: Arc<dyn PendingChangeCacheListener>) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.entries.write().push((id, listener));
        id
    }

    pub fn remove(&self, id: ListenerId) -> bool {
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|(existing, _)| *existing != id);
        entries.len() != before
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Call `f` for each listener in registration order
    ///
    /// Works on a copy of the registry, so listeners may register or
    /// unregister from inside a callback.
    pub fn notify(&self, f: impl Fn(&dyn PendingChangeCacheListener)) {
        let snapshot: Vec<Arc<dyn PendingChangeCacheListener>> = self
            .entries
            .read()
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();

        for listener in &snapshot {
            f(listener.as_ref());
        }
    }
}
