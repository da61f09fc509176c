//! Translation between server paths and local paths
//!
//! A workspace maps server folders onto local folders. The collection uses
//! the translation to find renamed items by their old local path and to
//! recover local paths while retargeting the children of a renamed folder.

use crate::local_path::{self, LocalPathStyle};
use crate::server_path;
use serde::{Deserialize, Serialize};

/// Maps paths between the server and the local disk
pub trait PathTranslator: Send + Sync {
    /// Server path mapped to a local path, if any working folder covers it
    fn server_path_for(&self, local_path: &str) -> Option<String>;

    /// Local path mapped to a server path, if any working folder covers it
    fn local_path_for(&self, server_path: &str) -> Option<String>;

    /// Local path conventions of the workspace
    fn local_style(&self) -> LocalPathStyle {
        LocalPathStyle::default()
    }
}

/// One server folder mapped onto one local folder
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkingFolder {
    pub server_item: String,
    pub local_item: String,
    /// Cloaked folders are excluded from the workspace
    #[serde(default)]
    pub cloaked: bool,
}

impl WorkingFolder {
    pub fn new(server_item: impl Into<String>, local_item: impl Into<String>) -> Self {
        Self {
            server_item: server_item.into(),
            local_item: local_item.into(),
            cloaked: false,
        }
    }

    pub fn cloak(server_item: impl Into<String>) -> Self {
        Self {
            server_item: server_item.into(),
            local_item: String::new(),
            cloaked: true,
        }
    }
}

/// Working folder mappings of a workspace
///
/// The deepest working folder that contains a path decides its translation,
/// so a cloak beneath a mapping hides that subtree.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkspaceMappings {
    #[serde(default)]
    style: LocalPathStyle,
    #[serde(default)]
    folders: Vec<WorkingFolder>,
}

impl WorkspaceMappings {
    pub fn new(style: LocalPathStyle) -> Self {
        Self {
            style,
            folders: Vec::new(),
        }
    }

    /// Add a mapping, builder style
    pub fn map(mut self, server_item: impl Into<String>, local_item: impl Into<String>) -> Self {
        self.folders.push(WorkingFolder::new(server_item, local_item));
        self
    }

    pub fn cloak(mut self, server_item: impl Into<String>) -> Self {
        self.folders.push(WorkingFolder::cloak(server_item));
        self
    }

    pub fn folders(&self) -> &[WorkingFolder] {
        &self.folders
    }

    pub fn style(&self) -> LocalPathStyle {
        self.style
    }

    fn closest_by_server(&self, server_path: &str) -> Option<&WorkingFolder> {
        self.folders
            .iter()
            .filter(|folder| server_path::is_child(&folder.server_item, server_path))
            .max_by_key(|folder| folder.server_item.len())
    }

    fn closest_by_local(&self, local_path: &str) -> Option<&WorkingFolder> {
        self.folders
            .iter()
            .filter(|folder| !folder.cloaked)
            .filter(|folder| local_path::is_child(self.style, &folder.local_item, local_path))
            .max_by_key(|folder| folder.local_item.len())
    }
}

impl PathTranslator for WorkspaceMappings {
    fn server_path_for(&self, local_path: &str) -> Option<String> {
        let folder = self.closest_by_local(local_path)?;
        let local = local_path::canonicalize(self.style, local_path).ok()?;
        let base = local_path::canonicalize(self.style, &folder.local_item).ok()?;
        let relative = local_path::make_relative(self.style, &local, &base);
        let relative = relative.replace(self.style.separator(), "/");
        let server = server_path::combine(&folder.server_item, &relative).ok()?;

        // A deeper cloak on the server side hides the item
        match self.closest_by_server(&server) {
            Some(owner) if owner.cloaked => None,
            _ => Some(server),
        }
    }

    fn local_path_for(&self, server_path: &str) -> Option<String> {
        let folder = self.closest_by_server(server_path)?;
        if folder.cloaked {
            return None;
        }
        let server = server_path::canonicalize(server_path).ok()?;
        let base = server_path::canonicalize(&folder.server_item).ok()?;
        let relative = server_path::make_relative(&server, &base);
        local_path::combine(self.style, &folder.local_item, relative).ok()
    }

    fn local_style(&self) -> LocalPathStyle {
        self.style
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mappings() -> WorkspaceMappings {
        WorkspaceMappings::new(LocalPathStyle::Unix)
            .map("$/Proj", "/home/dev/proj")
            .map("$/Proj/lib", "/opt/lib")
            .cloak("$/Proj/big")
    }

    #[test]
    fn test_local_path_for() {
        let mappings = mappings();

        assert_eq!(mappings.local_path_for("$/Proj").as_deref(), Some("/home/dev/proj"));
        assert_eq!(
            mappings.local_path_for("$/proj/src/main.rs").as_deref(),
            Some("/home/dev/proj/src/main.rs")
        );
        assert_eq!(mappings.local_path_for("$/Proj/lib/a.c").as_deref(), Some("/opt/lib/a.c"));
        assert_eq!(mappings.local_path_for("$/Proj/big/blob.bin"), None);
        assert_eq!(mappings.local_path_for("$/Other"), None);
    }

    #[test]
    fn test_server_path_for() {
        let mappings = mappings();

        assert_eq!(
            mappings.server_path_for("/home/dev/proj/src/main.rs").as_deref(),
            Some("$/Proj/src/main.rs")
        );
        assert_eq!(mappings.server_path_for("/opt/lib").as_deref(), Some("$/Proj/lib"));
        assert_eq!(mappings.server_path_for("/home/dev/proj/big/blob.bin"), None);
        assert_eq!(mappings.server_path_for("/tmp/x"), None);
    }

    #[test]
    fn test_windows_mappings() {
        let mappings = WorkspaceMappings::new(LocalPathStyle::Windows).map("$/Proj", "C:\\src\\proj");

        assert_eq!(
            mappings.local_path_for("$/Proj/a/b.txt").as_deref(),
            Some("C:\\src\\proj\\a\\b.txt")
        );
        assert_eq!(
            mappings.server_path_for("c:\\SRC\\proj\\a\\b.txt").as_deref(),
            Some("$/Proj/a/b.txt")
        );
    }
}
