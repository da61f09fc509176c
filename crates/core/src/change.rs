//! Pending change records and the request types that produce them

use serde::{Deserialize, Serialize};
use std::fmt;

/// Encoding value meaning "leave the encoding as it is"
pub const ENCODING_UNCHANGED: i32 = -2;

/// Encoding value for binary files
pub const ENCODING_BINARY: i32 = -1;

/// Identity of a workspace; events for other workspaces are ignored
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkspaceId(String);

impl WorkspaceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for WorkspaceId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl fmt::Display for WorkspaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A single kind of pending change
///
/// The discriminants are the server's flag values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Add = 2,
    Edit = 4,
    Encoding = 8,
    Rename = 16,
    Delete = 32,
    Undelete = 64,
    Branch = 128,
    Merge = 256,
    Lock = 512,
    Rollback = 1024,
    SourceRename = 2048,
    TargetRename = 4096,
    Property = 8192,
}

impl ChangeKind {
    /// Every kind, in flag order
    pub const ALL: [ChangeKind; 13] = [
        ChangeKind::Add,
        ChangeKind::Edit,
        ChangeKind::Encoding,
        ChangeKind::Rename,
        ChangeKind::Delete,
        ChangeKind::Undelete,
        ChangeKind::Branch,
        ChangeKind::Merge,
        ChangeKind::Lock,
        ChangeKind::Rollback,
        ChangeKind::SourceRename,
        ChangeKind::TargetRename,
        ChangeKind::Property,
    ];

    pub const fn flag(self) -> u32 {
        self as u32
    }

    pub fn name(self) -> &'static str {
        match self {
            ChangeKind::Add => "add",
            ChangeKind::Edit => "edit",
            ChangeKind::Encoding => "encoding",
            ChangeKind::Rename => "rename",
            ChangeKind::Delete => "delete",
            ChangeKind::Undelete => "undelete",
            ChangeKind::Branch => "branch",
            ChangeKind::Merge => "merge",
            ChangeKind::Lock => "lock",
            ChangeKind::Rollback => "rollback",
            ChangeKind::SourceRename => "source rename",
            ChangeKind::TargetRename => "target rename",
            ChangeKind::Property => "property",
        }
    }
}

/// Set of change kinds carried by a pending change
///
/// The empty set is `ChangeType::NONE`, which the server reports for an item
/// whose pending change has gone away.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "Vec<ChangeKind>", into = "Vec<ChangeKind>")]
pub struct ChangeType(u32);

impl ChangeType {
    pub const NONE: ChangeType = ChangeType(0);

    pub const fn of(kind: ChangeKind) -> Self {
        Self(kind.flag())
    }

    pub fn from_kinds(kinds: &[ChangeKind]) -> Self {
        Self(kinds.iter().fold(0, |bits, kind| bits | kind.flag()))
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn contains(self, kind: ChangeKind) -> bool {
        self.0 & kind.flag() != 0
    }

    pub const fn union(self, other: ChangeType) -> Self {
        Self(self.0 | other.0)
    }

    pub const fn with(self, kind: ChangeKind) -> Self {
        Self(self.0 | kind.flag())
    }

    pub const fn is_none(self) -> bool {
        self.0 == 0
    }

    /// Iterate the kinds present, in flag order
    pub fn kinds(self) -> impl Iterator<Item = ChangeKind> {
        ChangeKind::ALL
            .into_iter()
            .filter(move |kind| self.contains(*kind))
    }
}

impl From<ChangeKind> for ChangeType {
    fn from(kind: ChangeKind) -> Self {
        Self::of(kind)
    }
}

impl From<Vec<ChangeKind>> for ChangeType {
    fn from(kinds: Vec<ChangeKind>) -> Self {
        Self::from_kinds(&kinds)
    }
}

impl From<ChangeType> for Vec<ChangeKind> {
    fn from(change_type: ChangeType) -> Self {
        change_type.kinds().collect()
    }
}

impl fmt::Debug for ChangeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ChangeType({})", self)
    }
}

impl fmt::Display for ChangeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_none() {
            return f.write_str("none");
        }

        let mut first = true;
        for kind in self.kinds() {
            if !first {
                f.write_str(", ")?;
            }
            f.write_str(kind.name())?;
            first = false;
        }
        Ok(())
    }
}

/// Type of versioned item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemType {
    #[default]
    File,
    Folder,
}

/// An uncommitted change to one workspace item
///
/// Stored records are shared as `Arc<PendingChange>` and never mutated; a
/// changed record is a new value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingChange {
    /// Server path of the item (authoritative key)
    pub server_item: String,
    /// Local path, absent until the item is mapped into a working folder
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_item: Option<String>,
    /// Server path before a rename
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_server_item: Option<String>,
    /// Local path before a rename
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_local_item: Option<String>,
    pub change_type: ChangeType,
    #[serde(default)]
    pub item_type: ItemType,
    /// Server-assigned id; 0 while the change is provisional
    #[serde(default)]
    pub pending_change_id: i32,
    #[serde(default = "default_encoding")]
    pub encoding: i32,
}

fn default_encoding() -> i32 {
    ENCODING_UNCHANGED
}

impl PendingChange {
    /// Create a file change at a server path with no local mapping
    pub fn new(server_item: impl Into<String>, change_type: impl Into<ChangeType>) -> Self {
        Self {
            server_item: server_item.into(),
            local_item: None,
            source_server_item: None,
            source_local_item: None,
            change_type: change_type.into(),
            item_type: ItemType::File,
            pending_change_id: 0,
            encoding: ENCODING_UNCHANGED,
        }
    }

    pub fn with_local_item(mut self, local_item: impl Into<String>) -> Self {
        self.local_item = Some(local_item.into());
        self
    }

    pub fn with_source_server_item(mut self, source: impl Into<String>) -> Self {
        self.source_server_item = Some(source.into());
        self
    }

    pub fn with_source_local_item(mut self, source: impl Into<String>) -> Self {
        self.source_local_item = Some(source.into());
        self
    }

    pub fn with_item_type(mut self, item_type: ItemType) -> Self {
        self.item_type = item_type;
        self
    }

    pub fn with_id(mut self, pending_change_id: i32) -> Self {
        self.pending_change_id = pending_change_id;
        self
    }

    pub fn with_encoding(mut self, encoding: i32) -> Self {
        self.encoding = encoding;
        self
    }

    /// True once the server has assigned an id
    pub fn is_assigned(&self) -> bool {
        self.pending_change_id != 0
    }

    /// A renamed folder drags its cached descendants along when removed
    pub fn is_folder_rename(&self) -> bool {
        self.change_type.contains(ChangeKind::Rename) && self.item_type == ItemType::Folder
    }
}

/// Kind of request sent to the server to pend a change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestType {
    Add,
    Branch,
    Encoding,
    Edit,
    Lock,
    Rename,
    Undelete,
    Delete,
    Property,
}

/// A request that produced pending changes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeRequest {
    pub request_type: RequestType,
    /// Server or local path the request names
    pub item: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_item: Option<String>,
    #[serde(default = "default_encoding")]
    pub encoding: i32,
}

impl ChangeRequest {
    pub fn new(request_type: RequestType, item: impl Into<String>) -> Self {
        Self {
            request_type,
            item: item.into(),
            target_item: None,
            encoding: ENCODING_UNCHANGED,
        }
    }

    pub fn with_target_item(mut self, target_item: impl Into<String>) -> Self {
        self.target_item = Some(target_item.into());
        self
    }

    pub fn with_encoding(mut self, encoding: i32) -> Self {
        self.encoding = encoding;
        self
    }

    /// Path where the resulting pending change lives
    pub fn resulting_item(&self) -> &str {
        self.target_item.as_deref().unwrap_or(&self.item)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_change_type_set_operations() {
        let change_type = ChangeType::of(ChangeKind::Edit).with(ChangeKind::Encoding);

        assert!(change_type.contains(ChangeKind::Edit));
        assert!(change_type.contains(ChangeKind::Encoding));
        assert!(!change_type.contains(ChangeKind::Rename));
        assert!(!change_type.is_none());
        assert!(ChangeType::NONE.is_none());
        assert_eq!(change_type.bits(), 4 | 8);
        assert_eq!(change_type.to_string(), "edit, encoding");
        assert_eq!(ChangeType::NONE.to_string(), "none");
    }

    #[test]
    fn test_change_type_serializes_as_kind_list() {
        let change_type = ChangeType::from_kinds(&[ChangeKind::Rename, ChangeKind::Edit]);

        let json = serde_json::to_string(&change_type).unwrap();
        assert_eq!(json, r#"["edit","rename"]"#);

        let parsed: ChangeType = serde_json::from_str(r#"["source_rename"]"#).unwrap();
        assert!(parsed.contains(ChangeKind::SourceRename));
    }

    #[test]
    fn test_pending_change_defaults_from_json() {
        let change: PendingChange =
            serde_json::from_str(r#"{"server_item":"$/p/a.txt","change_type":["add"]}"#).unwrap();

        assert_eq!(change.local_item, None);
        assert_eq!(change.item_type, ItemType::File);
        assert_eq!(change.pending_change_id, 0);
        assert_eq!(change.encoding, ENCODING_UNCHANGED);
        assert!(!change.is_assigned());
    }

    #[test]
    fn test_folder_rename_detection() {
        let rename = PendingChange::new("$/B", ChangeKind::Rename).with_item_type(ItemType::Folder);
        let file_rename = PendingChange::new("$/b.txt", ChangeKind::Rename);
        let folder_edit = PendingChange::new("$/B", ChangeKind::Edit).with_item_type(ItemType::Folder);

        assert!(rename.is_folder_rename());
        assert!(!file_rename.is_folder_rename());
        assert!(!folder_edit.is_folder_rename());
    }

    #[test]
    fn test_request_resulting_item() {
        let edit = ChangeRequest::new(RequestType::Edit, "$/p/a.txt");
        let rename = ChangeRequest::new(RequestType::Rename, "$/p/a.txt").with_target_item("$/p/b.txt");

        assert_eq!(edit.resulting_item(), "$/p/a.txt");
        assert_eq!(rename.resulting_item(), "$/p/b.txt");
    }
}
