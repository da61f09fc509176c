//! Engine events → cache mutations

use crate::cache::{CacheInner, PendingChangeCache};
use pendmap_core::{
    server_path, ChangeKind, ChangeRequest, PathResult, PendingChange, RequestType,
    ENCODING_UNCHANGED,
};
use pendmap_events::{CompletedOperation, EngineEvent, EngineEventHandler, EventOrigin};
use std::sync::{Arc, Weak};
use tracing::{debug, trace, warn};

/// The one handler a cache subscribes to its engine
///
/// Holds the cache weakly so the subscription does not keep it alive.
pub(crate) struct CoreEventAdapter {
    cache: Weak<CacheInner>,
}

impl CoreEventAdapter {
    pub fn new(cache: Weak<CacheInner>) -> Self {
        Self { cache }
    }
}

impl EngineEventHandler for CoreEventAdapter {
    fn on_event(&self, event: &EngineEvent) {
        match self.cache.upgrade() {
            Some(inner) => PendingChangeCache::from_inner(inner).handle_event(event),
            None => trace!(event = event.name(), "Cache gone, dropping event"),
        }
    }
}

impl PendingChangeCache {
    pub(crate) fn handle_event(&self, event: &EngineEvent) {
        if event.workspace() != self.workspace() {
            trace!(
                event = event.name(),
                workspace = %event.workspace(),
                "Ignoring event for another workspace"
            );
            return;
        }
        trace!(event = event.name(), "Handling engine event");

        match event {
            EngineEvent::NewPendingChange { change, .. } => {
                if !assigned(change) {
                    return;
                }
                let _guard = self.inner.atomic_operation_lock.lock();
                if change.change_type.is_none() {
                    self.remove_logged(change);
                } else {
                    self.add_logged(change);
                }
            }
            EngineEvent::UndonePendingChange { change, .. } => {
                if !assigned(change) {
                    return;
                }
                let _guard = self.inner.atomic_operation_lock.lock();
                self.remove_logged(change);
            }
            EngineEvent::Merging { change, .. } => {
                let Some(change) = change.as_ref().filter(|change| assigned(change)) else {
                    return;
                };
                let _guard = self.inner.atomic_operation_lock.lock();
                self.add_logged(change);
            }
            EngineEvent::Checkin {
                committed, undone, ..
            } => {
                if committed.is_empty() && undone.is_empty() {
                    return;
                }
                let _scope = self.update_scope();
                for change in undone.iter().chain(committed) {
                    self.remove_logged(change);
                }
            }
            EngineEvent::OperationStarted { .. } => {
                let _guard = self.inner.atomic_operation_lock.lock();
                self.begin_update();
            }
            EngineEvent::OperationCompleted { operation, .. } => {
                let _guard = self.inner.atomic_operation_lock.lock();
                if let CompletedOperation::Pend { requests } = operation {
                    self.fix_up_encodings(requests);
                }
                self.end_update();
            }
            EngineEvent::PendingChangesChanged { .. } | EngineEvent::FolderContentChanged { .. } => {
                self.refresh();
            }
            EngineEvent::GetCompleted { origin, .. } | EngineEvent::LocalWorkspaceScan { origin, .. } => {
                if *origin == EventOrigin::External {
                    self.refresh();
                }
            }
        }
    }

    fn add_logged(&self, change: &PendingChange) {
        if let Err(e) = self.add_internal(Arc::new(change.clone()), false) {
            warn!(server_item = %change.server_item, error = %e, "Dropping pending change with invalid path");
        }
    }

    fn remove_logged(&self, change: &PendingChange) {
        if let Err(e) = self.remove_internal(change) {
            warn!(server_item = %change.server_item, error = %e, "Cannot remove pending change with invalid path");
        }
    }

    /// Carry request encodings onto cached edits
    ///
    /// Pending changes built from get operations have no encoding, so an
    /// edit that also changed encoding shows `ENCODING_UNCHANGED` until it is
    /// patched from the request that produced it.
    fn fix_up_encodings(&self, requests: &[ChangeRequest]) {
        for request in requests {
            if request.request_type != RequestType::Edit || request.encoding == ENCODING_UNCHANGED {
                continue;
            }
            if let Err(e) = self.fix_up_encoding(request) {
                warn!(item = request.resulting_item(), error = %e, "Could not update pending change encoding");
            }
        }
    }

    fn fix_up_encoding(&self, request: &ChangeRequest) -> PathResult<()> {
        let path = request.resulting_item();
        let cached = if server_path::is_server_path(path) {
            self.inner.changes.by_server_path(path)?
        } else {
            self.inner.changes.by_local_path(path)?
        };

        let Some(cached) = cached else {
            return Ok(());
        };
        if !cached.change_type.contains(ChangeKind::Encoding) || cached.encoding != ENCODING_UNCHANGED {
            return Ok(());
        }

        let patched = (*cached).clone().with_encoding(request.encoding);
        if self.inner.changes.replace(&cached, patched)? {
            debug!(
                server_item = %cached.server_item,
                encoding = request.encoding,
                "Patched pending change encoding"
            );
        }
        Ok(())
    }
}

/// Provisional changes are reported again once the server assigns an id
fn assigned(change: &PendingChange) -> bool {
    if !change.is_assigned() {
        trace!(server_item = %change.server_item, "Ignoring provisional pending change");
    }
    change.is_assigned()
}
