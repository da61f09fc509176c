//! Pending change cache

use crate::adapter::CoreEventAdapter;
use crate::depth::{DepthChange, OperationDepth};
use crate::error::Result;
use crate::listener::{ListenerId, ListenerSet, PendingChangeCacheListener};
use parking_lot::{Mutex, ReentrantMutex, ReentrantMutexGuard};
use pendmap_core::{EngineError, PathResult, PendingChange, WorkspaceId};
use pendmap_events::{
    EngineEventHandler, EventSource, Mailbox, SubscriptionId, VersionControlEngine,
};
use pendmap_index::PendingChangeCollection;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// How engine events reach the cache
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dispatch {
    /// Handled on the thread that raised the event
    #[default]
    Inline,
    /// Queued and handled in arrival order on a dedicated thread
    Queued,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CacheOptions {
    #[serde(default)]
    pub dispatch: Dispatch,
}

struct Subscription {
    source: Arc<dyn EventSource>,
    id: SubscriptionId,
    mailbox: Option<Arc<Mailbox>>,
}

impl Subscription {
    /// Unsubscribe, draining a queued mailbox first when `wait` is set
    ///
    /// The mailbox worker takes the atomic-operation lock, so a caller
    /// holding it must not wait.
    fn cancel(self, wait: bool) {
        self.source.unsubscribe(self.id);
        match self.mailbox {
            Some(mailbox) if wait => mailbox.shutdown(),
            Some(mailbox) => mailbox.close(),
            None => {}
        }
    }
}

pub(crate) struct CacheInner {
    engine: Arc<dyn VersionControlEngine>,
    workspace: WorkspaceId,
    pub(crate) changes: PendingChangeCollection,
    listeners: ListenerSet,
    /// Serializes entry points; reentrant so a listener may call back in
    pub(crate) atomic_operation_lock: ReentrantMutex<()>,
    depth: Mutex<OperationDepth>,
    subscription: Mutex<Option<Subscription>>,
}

impl Drop for CacheInner {
    fn drop(&mut self) {
        if let Some(subscription) = self.subscription.get_mut().take() {
            subscription.cancel(true);
        }
    }
}

/// Continuously synchronized index of one workspace's pending changes
///
/// The cache mirrors what the engine reports: it subscribes to engine
/// events when created, applies them to a [`PendingChangeCollection`] and
/// tells listeners what changed. Handles are cheap to clone and share one
/// cache.
///
/// Lock order is atomic-operation lock, then collection lock. Listener
/// callbacks run with the atomic-operation lock held (it is reentrant) but
/// never with the collection lock held.
#[derive(Clone)]
pub struct PendingChangeCache {
    pub(crate) inner: Arc<CacheInner>,
}

impl PendingChangeCache {
    /// Attach to an engine, handling events on the engine's threads
    pub fn new(engine: Arc<dyn VersionControlEngine>) -> Self {
        let cache = Self::detached(engine);
        let adapter = Arc::new(CoreEventAdapter::new(Arc::downgrade(&cache.inner)));
        cache.attach(adapter, None);
        cache
    }

    pub fn with_options(engine: Arc<dyn VersionControlEngine>, options: CacheOptions) -> Result<Self> {
        let cache = Self::detached(engine);
        let adapter = Arc::new(CoreEventAdapter::new(Arc::downgrade(&cache.inner)));

        match options.dispatch {
            Dispatch::Inline => cache.attach(adapter, None),
            Dispatch::Queued => {
                let mailbox = Arc::new(Mailbox::spawn(adapter)?);
                cache.attach(Arc::clone(&mailbox) as Arc<dyn EngineEventHandler>, Some(mailbox));
            }
        }
        Ok(cache)
    }

    fn detached(engine: Arc<dyn VersionControlEngine>) -> Self {
        let workspace = engine.workspace().clone();
        let changes = PendingChangeCollection::new(engine.path_translator());
        Self {
            inner: Arc::new(CacheInner {
                engine,
                workspace,
                changes,
                listeners: ListenerSet::new(),
                atomic_operation_lock: ReentrantMutex::new(()),
                depth: Mutex::new(OperationDepth::default()),
                subscription: Mutex::new(None),
            }),
        }
    }

    fn attach(&self, handler: Arc<dyn EngineEventHandler>, mailbox: Option<Arc<Mailbox>>) {
        let source = self.inner.engine.event_source();
        let id = source.subscribe(handler);
        *self.inner.subscription.lock() = Some(Subscription {
            source,
            id,
            mailbox,
        });
        debug!(workspace = %self.inner.workspace, queued = self.is_queued(), "Pending change cache attached");
    }

    pub(crate) fn from_inner(inner: Arc<CacheInner>) -> Self {
        Self { inner }
    }

    fn is_queued(&self) -> bool {
        self.inner
            .subscription
            .lock()
            .as_ref()
            .map_or(false, |subscription| subscription.mailbox.is_some())
    }

    pub fn workspace(&self) -> &WorkspaceId {
        &self.inner.workspace
    }

    /// Stop listening to engine events
    ///
    /// Queued events still waiting are delivered first. From inside a
    /// listener, or anywhere else the atomic-operation lock is held, they are
    /// delivered after that lock is released instead. The cache keeps
    /// answering queries with what it holds.
    pub fn dispose(&self) {
        let subscription = self.inner.subscription.lock().take();
        if let Some(subscription) = subscription {
            let wait = !self.inner.atomic_operation_lock.is_owned_by_current_thread();
            subscription.cancel(wait);
            debug!(workspace = %self.inner.workspace, "Pending change cache disposed");
        }
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.subscription.lock().is_none()
    }

    /// Reload every pending change from the engine
    ///
    /// A failed query is logged and leaves the cache as it was.
    pub fn refresh(&self) {
        if let Err(e) = self.try_refresh() {
            error!(workspace = %self.inner.workspace, error = %e, "Failed to refresh pending changes");
        }
    }

    /// Like [`refresh`](Self::refresh) but reports a failed query, returning
    /// the number of changes loaded
    pub fn try_refresh(&self) -> std::result::Result<usize, EngineError> {
        // The round trip happens before taking the lock
        let changes = self.inner.engine.query_pending_changes()?;

        let _scope = self.update_scope();
        self.clear_internal();

        let mut loaded = 0;
        for change in changes {
            match self.add_internal(Arc::new(change), true) {
                Ok(_) => loaded += 1,
                Err(e) => warn!(error = %e, "Skipping pending change with invalid path"),
            }
        }

        info!(workspace = %self.inner.workspace, count = loaded, "Refreshed pending changes");
        Ok(loaded)
    }

    /// Add or replace a pending change, returning the record it replaced
    pub fn add_pending_change(
        &self,
        change: impl Into<Arc<PendingChange>>,
    ) -> PathResult<Option<Arc<PendingChange>>> {
        let _guard = self.inner.atomic_operation_lock.lock();
        self.add_internal(change.into(), false)
    }

    pub fn remove_pending_change(
        &self,
        change: &PendingChange,
    ) -> PathResult<Option<Arc<PendingChange>>> {
        let _guard = self.inner.atomic_operation_lock.lock();
        self.remove_internal(change)
    }

    pub(crate) fn add_internal(
        &self,
        change: Arc<PendingChange>,
        for_refill: bool,
    ) -> PathResult<Option<Arc<PendingChange>>> {
        let applied = self.inner.changes.add_with_evictions(Arc::clone(&change), for_refill)?;
        self.inner.depth.lock().mark_modified();

        match &applied.record {
            Some(old) => self
                .inner
                .listeners
                .notify(|listener| listener.on_modified(self, old, &change)),
            None => self
                .inner
                .listeners
                .notify(|listener| listener.on_added(self, &change)),
        }
        self.notify_evicted(&applied.evicted);
        Ok(applied.record)
    }

    pub(crate) fn remove_internal(
        &self,
        change: &PendingChange,
    ) -> PathResult<Option<Arc<PendingChange>>> {
        let applied = self.inner.changes.remove_with_evictions(change)?;
        if let Some(removed) = &applied.record {
            self.inner.depth.lock().mark_modified();
            self.inner
                .listeners
                .notify(|listener| listener.on_removed(self, removed));
        }
        self.notify_evicted(&applied.evicted);
        Ok(applied.record)
    }

    /// Records displaced by a mutation leave the cache like any removal
    fn notify_evicted(&self, evicted: &[Arc<PendingChange>]) {
        for removed in evicted {
            debug!(server_item = %removed.server_item, "Evicted pending change");
            self.inner
                .listeners
                .notify(|listener| listener.on_removed(self, removed));
        }
    }

    fn clear_internal(&self) {
        if self.inner.changes.clear() > 0 {
            self.inner.depth.lock().mark_modified();
        }
        self.inner.listeners.notify(|listener| listener.on_cleared(self));
    }

    /// Open an update bracket
    ///
    /// Only the outermost bracket notifies `on_before_update`. Waits for any
    /// atomic operation running on another thread.
    pub fn begin_update(&self) {
        let _guard = self.inner.atomic_operation_lock.lock();
        let change = self.inner.depth.lock().begin();
        if change == DepthChange::Opened {
            self.inner
                .listeners
                .notify(|listener| listener.on_before_update(self));
        }
    }

    /// Close an update bracket
    ///
    /// Closing the outermost bracket notifies `on_after_update` with whether
    /// anything changed since it opened.
    pub fn end_update(&self) {
        let _guard = self.inner.atomic_operation_lock.lock();
        let change = self.inner.depth.lock().end();
        match change {
            DepthChange::Closed { modified } => self
                .inner
                .listeners
                .notify(|listener| listener.on_after_update(self, modified)),
            DepthChange::Unbalanced => {
                warn!(workspace = %self.inner.workspace, "end_update without matching begin_update")
            }
            DepthChange::Opened | DepthChange::Nested => {}
        }
    }

    /// Group mutations into one update, holding the atomic-operation lock
    /// until the scope is dropped
    pub fn update_scope(&self) -> UpdateScope<'_> {
        let guard = self.inner.atomic_operation_lock.lock();
        self.begin_update();
        UpdateScope {
            cache: self,
            _guard: guard,
        }
    }

    /// Current update nesting depth
    pub fn update_depth(&self) -> u32 {
        self.inner.depth.lock().depth()
    }

    pub fn add_listener(&self, listener: Arc<dyn PendingChangeCacheListener>) -> ListenerId {
        self.inner.listeners.add(listener)
    }

    pub fn remove_listener(&self, id: ListenerId) -> bool {
        self.inner.listeners.remove(id)
    }

    pub fn pending_changes(&self) -> Vec<Arc<PendingChange>> {
        self.inner.changes.values()
    }

    pub fn by_server_path(&self, path: &str) -> PathResult<Option<Arc<PendingChange>>> {
        self.inner.changes.by_server_path(path)
    }

    pub fn by_local_path(&self, path: &str) -> PathResult<Option<Arc<PendingChange>>> {
        self.inner.changes.by_local_path(path)
    }

    pub fn by_server_path_recursive(&self, path: &str) -> PathResult<Vec<Arc<PendingChange>>> {
        self.inner.changes.by_server_path_recursive(path)
    }

    pub fn by_local_path_recursive(&self, path: &str) -> PathResult<Vec<Arc<PendingChange>>> {
        self.inner.changes.by_local_path_recursive(path)
    }

    pub fn has_by_local_path_recursive(&self, path: &str) -> PathResult<bool> {
        self.inner.changes.has_by_local_path_recursive(path)
    }

    /// The pending rename whose source is `path`
    pub fn rename_by_source_server_path(&self, path: &str) -> PathResult<Option<Arc<PendingChange>>> {
        self.inner.changes.rename_by_source_server_path(path)
    }

    pub fn len(&self) -> usize {
        self.inner.changes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.changes.is_empty()
    }
}

impl fmt::Debug for PendingChangeCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingChangeCache")
            .field("workspace", &self.inner.workspace)
            .field("len", &self.len())
            .field("listeners", &self.inner.listeners.len())
            .finish()
    }
}

/// Update bracket returned by [`PendingChangeCache::update_scope`]
///
/// Closes the bracket when dropped, even while unwinding.
pub struct UpdateScope<'a> {
    cache: &'a PendingChangeCache,
    _guard: ReentrantMutexGuard<'a, ()>,
}

impl Drop for UpdateScope<'_> {
    fn drop(&mut self) {
        self.cache.end_update();
    }
}
