//! File-backed engine over a JSON workspace snapshot
//!
//! ```json
//! {
//!   "workspace": "dev-ws",
//!   "mappings": { "style": "unix", "folders": [{ "server_item": "$/", "local_item": "/ws" }] },
//!   "changes": [{ "server_item": "$/proj/a.txt", "change_type": ["edit"], "pending_change_id": 1 }]
//! }
//! ```

use pendmap_core::{EngineError, PathTranslator, PendingChange, WorkspaceId, WorkspaceMappings};
use pendmap_events::{EngineEvent, EventBus, EventSource, VersionControlEngine};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkspaceSnapshot {
    pub workspace: WorkspaceId,
    #[serde(default)]
    pub mappings: WorkspaceMappings,
    #[serde(default)]
    pub changes: Vec<PendingChange>,
}

impl WorkspaceSnapshot {
    pub fn load(path: &Path) -> Result<Self, EngineError> {
        let contents = std::fs::read_to_string(path)?;
        serde_json::from_str(&contents)
            .map_err(|e| EngineError::Decode(format!("{}: {}", path.display(), e)))
    }
}

/// Serves a snapshot file as the engine's server state
///
/// Every query re-reads the file, so edits between queries show up on the
/// next refresh. Events are published through [`SnapshotEngine::publish`].
pub struct SnapshotEngine {
    path: PathBuf,
    workspace: WorkspaceId,
    mappings: Arc<WorkspaceMappings>,
    bus: Arc<EventBus>,
}

impl SnapshotEngine {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, EngineError> {
        let path = path.into();
        let snapshot = WorkspaceSnapshot::load(&path)?;
        debug!(
            path = %path.display(),
            workspace = %snapshot.workspace,
            folders = snapshot.mappings.folders().len(),
            "Opened workspace snapshot"
        );

        Ok(Self {
            path,
            workspace: snapshot.workspace,
            mappings: Arc::new(snapshot.mappings),
            bus: Arc::new(EventBus::new()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn mappings(&self) -> &WorkspaceMappings {
        &self.mappings
    }

    pub fn publish(&self, event: &EngineEvent) {
        self.bus.publish(event);
    }
}

impl VersionControlEngine for SnapshotEngine {
    fn workspace(&self) -> &WorkspaceId {
        &self.workspace
    }

    fn query_pending_changes(&self) -> Result<Vec<PendingChange>, EngineError> {
        let snapshot = WorkspaceSnapshot::load(&self.path)?;
        if snapshot.workspace != self.workspace {
            return Err(EngineError::Workspace(format!(
                "snapshot now describes workspace {} instead of {}",
                snapshot.workspace, self.workspace
            )));
        }
        Ok(snapshot.changes)
    }

    fn path_translator(&self) -> Arc<dyn PathTranslator> {
        self.mappings.clone()
    }

    fn event_source(&self) -> Arc<dyn EventSource> {
        self.bus.clone()
    }
}
