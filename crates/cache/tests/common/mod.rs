//! Shared fixtures: a scripted engine and a recording listener

#![allow(dead_code)]

use parking_lot::Mutex;
use pendmap_cache::{PendingChangeCache, PendingChangeCacheListener};
use pendmap_core::{
    ChangeKind, ChangeType, EngineError, ItemType, LocalPathStyle, PathTranslator, PendingChange,
    WorkspaceId, WorkspaceMappings,
};
use pendmap_events::{EngineEvent, EventBus, EventSource, VersionControlEngine};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

pub const WORKSPACE: &str = "dev-ws";

/// Engine whose query answers are scripted by the test
pub struct MockEngine {
    workspace: WorkspaceId,
    bus: Arc<EventBus>,
    mappings: Arc<WorkspaceMappings>,
    scripted: Mutex<VecDeque<Result<Vec<PendingChange>, EngineError>>>,
    current: Mutex<Vec<PendingChange>>,
    queries: AtomicUsize,
}

impl MockEngine {
    /// `$/` is mapped onto `/ws`
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            workspace: WorkspaceId::new(WORKSPACE),
            bus: Arc::new(EventBus::new()),
            mappings: Arc::new(WorkspaceMappings::new(LocalPathStyle::Unix).map("$/", "/ws")),
            scripted: Mutex::new(VecDeque::new()),
            current: Mutex::new(Vec::new()),
            queries: AtomicUsize::new(0),
        })
    }

    /// Answer every unscripted query with `changes`
    pub fn set_changes(&self, changes: Vec<PendingChange>) {
        *self.current.lock() = changes;
    }

    pub fn fail_next_query(&self, message: &str) {
        self.scripted
            .lock()
            .push_back(Err(EngineError::Unavailable(message.to_string())));
    }

    pub fn publish(&self, event: EngineEvent) {
        self.bus.publish(&event);
    }

    pub fn query_count(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }

    pub fn bus(&self) -> &Arc<EventBus> {
        &self.bus
    }
}

impl VersionControlEngine for MockEngine {
    fn workspace(&self) -> &WorkspaceId {
        &self.workspace
    }

    fn query_pending_changes(&self) -> Result<Vec<PendingChange>, EngineError> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        match self.scripted.lock().pop_front() {
            Some(answer) => answer,
            None => Ok(self.current.lock().clone()),
        }
    }

    fn path_translator(&self) -> Arc<dyn PathTranslator> {
        self.mappings.clone()
    }

    fn event_source(&self) -> Arc<dyn EventSource> {
        self.bus.clone()
    }
}

/// One listener notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Note {
    Before,
    After(bool),
    Added(String),
    Removed(String),
    Modified(String, String),
    Cleared,
}

#[derive(Default)]
pub struct Recorder {
    notes: Mutex<Vec<Note>>,
}

impl Recorder {
    pub fn attach(cache: &PendingChangeCache) -> Arc<Self> {
        let recorder = Arc::new(Self::default());
        cache.add_listener(recorder.clone());
        recorder
    }

    pub fn notes(&self) -> Vec<Note> {
        self.notes.lock().clone()
    }

    pub fn take(&self) -> Vec<Note> {
        std::mem::take(&mut *self.notes.lock())
    }

    fn push(&self, note: Note) {
        self.notes.lock().push(note);
    }
}

impl PendingChangeCacheListener for Recorder {
    fn on_before_update(&self, _cache: &PendingChangeCache) {
        self.push(Note::Before);
    }

    fn on_after_update(&self, _cache: &PendingChangeCache, modified: bool) {
        self.push(Note::After(modified));
    }

    fn on_added(&self, _cache: &PendingChangeCache, change: &Arc<PendingChange>) {
        self.push(Note::Added(change.server_item.clone()));
    }

    fn on_removed(&self, _cache: &PendingChangeCache, change: &Arc<PendingChange>) {
        self.push(Note::Removed(change.server_item.clone()));
    }

    fn on_modified(&self, _cache: &PendingChangeCache, old: &Arc<PendingChange>, new: &Arc<PendingChange>) {
        self.push(Note::Modified(old.server_item.clone(), new.server_item.clone()));
    }

    fn on_cleared(&self, _cache: &PendingChangeCache) {
        self.push(Note::Cleared);
    }
}

/// An assigned change at `server` with its mapped local path
pub fn change(server: &str, change_type: impl Into<ChangeType>) -> PendingChange {
    let local = format!("/ws/{}", server.trim_start_matches("$/"));
    PendingChange::new(server, change_type)
        .with_local_item(local)
        .with_id(1)
}

pub fn edit(server: &str) -> PendingChange {
    change(server, ChangeKind::Edit)
}

pub fn folder_rename(target: &str, source: &str) -> PendingChange {
    PendingChange::new(target, ChangeKind::Rename)
        .with_item_type(ItemType::Folder)
        .with_source_server_item(source)
        .with_id(1)
}

pub fn workspace() -> WorkspaceId {
    WorkspaceId::new(WORKSPACE)
}
