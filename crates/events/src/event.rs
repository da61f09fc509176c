//! Events reported by the version control engine

use pendmap_core::{ChangeRequest, PendingChange, WorkspaceId};
use serde::{Deserialize, Serialize};

/// Where a workspace notification came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventOrigin {
    /// Raised by an operation this process performed
    #[default]
    ThisProcess,
    /// Relayed from another process working on the same workspace
    External,
}

/// The operation an `OperationCompleted` event closes
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CompletedOperation {
    #[default]
    Other,
    /// A pend operation, with the requests that were sent to the server
    Pend { requests: Vec<ChangeRequest> },
}

/// Everything the engine tells its subscribers
///
/// Every event names the workspace it concerns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum EngineEvent {
    NewPendingChange {
        workspace: WorkspaceId,
        change: PendingChange,
    },
    UndonePendingChange {
        workspace: WorkspaceId,
        change: PendingChange,
    },
    Merging {
        workspace: WorkspaceId,
        #[serde(default)]
        change: Option<PendingChange>,
    },
    Checkin {
        workspace: WorkspaceId,
        #[serde(default)]
        committed: Vec<PendingChange>,
        #[serde(default)]
        undone: Vec<PendingChange>,
    },
    OperationStarted {
        workspace: WorkspaceId,
    },
    OperationCompleted {
        workspace: WorkspaceId,
        #[serde(default)]
        operation: CompletedOperation,
    },
    /// The pending change table changed in a way the event does not describe
    PendingChangesChanged {
        workspace: WorkspaceId,
    },
    /// Folder contents changed without pending changes being reported
    FolderContentChanged {
        workspace: WorkspaceId,
    },
    GetCompleted {
        workspace: WorkspaceId,
        #[serde(default)]
        origin: EventOrigin,
    },
    LocalWorkspaceScan {
        workspace: WorkspaceId,
        #[serde(default)]
        origin: EventOrigin,
    },
}

impl EngineEvent {
    pub fn workspace(&self) -> &WorkspaceId {
        match self {
            EngineEvent::NewPendingChange { workspace, .. }
            | EngineEvent::UndonePendingChange { workspace, .. }
            | EngineEvent::Merging { workspace, .. }
            | EngineEvent::Checkin { workspace, .. }
            | EngineEvent::OperationStarted { workspace }
            | EngineEvent::OperationCompleted { workspace, .. }
            | EngineEvent::PendingChangesChanged { workspace }
            | EngineEvent::FolderContentChanged { workspace }
            | EngineEvent::GetCompleted { workspace, .. }
            | EngineEvent::LocalWorkspaceScan { workspace, .. } => workspace,
        }
    }

    /// Short name for logs
    pub fn name(&self) -> &'static str {
        match self {
            EngineEvent::NewPendingChange { .. } => "new_pending_change",
            EngineEvent::UndonePendingChange { .. } => "undone_pending_change",
            EngineEvent::Merging { .. } => "merging",
            EngineEvent::Checkin { .. } => "checkin",
            EngineEvent::OperationStarted { .. } => "operation_started",
            EngineEvent::OperationCompleted { .. } => "operation_completed",
            EngineEvent::PendingChangesChanged { .. } => "pending_changes_changed",
            EngineEvent::FolderContentChanged { .. } => "folder_content_changed",
            EngineEvent::GetCompleted { .. } => "get_completed",
            EngineEvent::LocalWorkspaceScan { .. } => "local_workspace_scan",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pendmap_core::{ChangeKind, RequestType};

    #[test]
    fn test_event_script_parses() {
        let script = r#"[
            {"event": "operation_started", "workspace": "ws"},
            {"event": "new_pending_change", "workspace": "ws",
             "change": {"server_item": "$/p/a.txt", "change_type": ["edit"], "pending_change_id": 3}},
            {"event": "operation_completed", "workspace": "ws",
             "operation": {"kind": "pend", "requests": [
                {"request_type": "edit", "item": "$/p/a.txt", "encoding": 65001}]}},
            {"event": "get_completed", "workspace": "ws", "origin": "external"}
        ]"#;

        let events: Vec<EngineEvent> = serde_json::from_str(script).unwrap();
        assert_eq!(events.len(), 4);
        assert_eq!(events[0].name(), "operation_started");

        match &events[1] {
            EngineEvent::NewPendingChange { change, .. } => {
                assert!(change.change_type.contains(ChangeKind::Edit));
                assert_eq!(change.pending_change_id, 3);
            }
            other => panic!("unexpected event {:?}", other),
        }

        match &events[2] {
            EngineEvent::OperationCompleted {
                operation: CompletedOperation::Pend { requests },
                ..
            } => {
                assert_eq!(requests[0].request_type, RequestType::Edit);
                assert_eq!(requests[0].encoding, 65001);
            }
            other => panic!("unexpected event {:?}", other),
        }

        assert_eq!(
            events[3],
            EngineEvent::GetCompleted {
                workspace: "ws".into(),
                origin: EventOrigin::External,
            }
        );
    }

    #[test]
    fn test_defaults_when_fields_missing() {
        let event: EngineEvent =
            serde_json::from_str(r#"{"event": "local_workspace_scan", "workspace": "ws"}"#).unwrap();
        assert_eq!(
            event,
            EngineEvent::LocalWorkspaceScan {
                workspace: WorkspaceId::new("ws"),
                origin: EventOrigin::ThisProcess,
            }
        );
        assert_eq!(event.workspace().as_str(), "ws");
    }
}
