//! Local path dialect
//!
//! Local paths follow the conventions of the machine the workspace lives on,
//! described by [`LocalPathStyle`]. Unix paths are case-sensitive; Windows
//! paths are drive-absolute, accept both separators and compare
//! case-insensitively.

use crate::error::PathError;
use crate::server_path::Hierarchy;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// Local path conventions of a workspace
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LocalPathStyle {
    Unix,
    Windows,
}

impl LocalPathStyle {
    /// Style of the machine we are running on
    pub const fn host() -> Self {
        if cfg!(windows) {
            LocalPathStyle::Windows
        } else {
            LocalPathStyle::Unix
        }
    }

    /// Separator used in canonical paths
    pub const fn separator(self) -> char {
        match self {
            LocalPathStyle::Unix => '/',
            LocalPathStyle::Windows => '\\',
        }
    }

    pub fn is_separator(self, c: char) -> bool {
        match self {
            LocalPathStyle::Unix => c == '/',
            LocalPathStyle::Windows => c == '\\' || c == '/',
        }
    }

    pub const fn is_case_sensitive(self) -> bool {
        matches!(self, LocalPathStyle::Unix)
    }

    /// Length of the root prefix of a canonical path (`/` or `C:\`)
    const fn root_len(self) -> usize {
        match self {
            LocalPathStyle::Unix => 1,
            LocalPathStyle::Windows => 3,
        }
    }
}

impl Default for LocalPathStyle {
    fn default() -> Self {
        Self::host()
    }
}

/// True when `path` is absolute in this style
pub fn is_absolute(style: LocalPathStyle, path: &str) -> bool {
    match style {
        LocalPathStyle::Unix => path.starts_with('/'),
        LocalPathStyle::Windows => drive_prefix(path).is_some(),
    }
}

/// Drive letter of a Windows path followed by a separator or nothing
fn drive_prefix(path: &str) -> Option<char> {
    let mut chars = path.chars();
    let drive = chars.next().filter(|c| c.is_ascii_alphabetic())?;
    if chars.next() != Some(':') {
        return None;
    }
    match chars.next() {
        None => Some(drive),
        Some(c) if LocalPathStyle::Windows.is_separator(c) => Some(drive),
        Some(_) => None,
    }
}

/// Canonicalize an absolute local path
pub fn canonicalize(style: LocalPathStyle, path: &str) -> Result<String, PathError> {
    if path.is_empty() {
        return Err(PathError::Empty);
    }

    let (root, rest) = match style {
        LocalPathStyle::Unix => {
            if !path.starts_with('/') {
                return Err(PathError::NotAbsolute(path.to_string()));
            }
            ("/".to_string(), path)
        }
        LocalPathStyle::Windows => {
            let drive = drive_prefix(path).ok_or_else(|| PathError::NotAbsolute(path.to_string()))?;
            (format!("{}:\\", drive.to_ascii_uppercase()), &path[2..])
        }
    };

    let mut components: SmallVec<[&str; 16]> = SmallVec::new();
    for raw in rest.split(|c| style.is_separator(c)) {
        match raw {
            "" | "." => continue,
            ".." => {
                if components.pop().is_none() {
                    return Err(PathError::AboveRoot(path.to_string()));
                }
            }
            _ => {
                let cleaned = match style {
                    LocalPathStyle::Unix => raw,
                    LocalPathStyle::Windows => {
                        raw.trim_end_matches(|c: char| c == '.' || c == ' ')
                    }
                };
                if cleaned.is_empty() {
                    return Err(PathError::InvalidComponent(path.to_string()));
                }
                components.push(cleaned);
            }
        }
    }

    let mut canonical = root;
    for (i, component) in components.iter().enumerate() {
        if i > 0 {
            canonical.push(style.separator());
        }
        canonical.push_str(component);
    }
    Ok(canonical)
}

/// Canonical form folded per the style's case rules
pub fn index_key(style: LocalPathStyle, path: &str) -> Result<String, PathError> {
    let canonical = canonicalize(style, path)?;
    if style.is_case_sensitive() {
        Ok(canonical)
    } else {
        Ok(canonical.to_lowercase())
    }
}

/// Every ancestor of a canonical path plus the path itself, root first
pub fn hierarchy(style: LocalPathStyle, canonical: &str) -> Hierarchy {
    let root_len = style.root_len().min(canonical.len());
    let mut hierarchy = Hierarchy::new();
    hierarchy.push(canonical[..root_len].to_string());
    if canonical.len() == root_len {
        return hierarchy;
    }

    for (idx, _) in canonical[root_len..].match_indices(style.separator()) {
        hierarchy.push(canonical[..root_len + idx].to_string());
    }
    hierarchy.push(canonical.to_string());
    hierarchy
}

/// Parent of a canonical path, `None` for a root
pub fn parent(style: LocalPathStyle, canonical: &str) -> Option<&str> {
    let root_len = style.root_len();
    if canonical.len() <= root_len {
        return None;
    }
    match canonical[root_len..].rfind(style.separator()) {
        Some(idx) => Some(&canonical[..root_len + idx]),
        None => Some(&canonical[..root_len]),
    }
}

fn starts_with(style: LocalPathStyle, path: &str, prefix: &str) -> bool {
    if style.is_case_sensitive() {
        path.starts_with(prefix)
    } else {
        crate::server_path::starts_with_ignore_case(path, prefix)
    }
}

/// Express `path` relative to `relative_to`
///
/// Returns `path` unchanged when it is not beneath `relative_to`.
pub fn make_relative<'a>(style: LocalPathStyle, path: &'a str, relative_to: &str) -> &'a str {
    if !starts_with(style, path, relative_to) {
        return path;
    }
    if path.len() == relative_to.len() {
        return "";
    }
    if relative_to.ends_with(|c| style.is_separator(c)) {
        return &path[relative_to.len()..];
    }
    if path[relative_to.len()..].starts_with(|c| style.is_separator(c)) {
        return &path[relative_to.len() + 1..];
    }
    path
}

/// Join a relative path onto a parent; an absolute `relative` wins
pub fn combine(style: LocalPathStyle, parent: &str, relative: &str) -> Result<String, PathError> {
    if relative.is_empty() {
        return canonicalize(style, parent);
    }
    if is_absolute(style, relative) {
        return canonicalize(style, relative);
    }

    let mut combined = String::with_capacity(parent.len() + relative.len() + 1);
    combined.push_str(parent);
    if !combined.ends_with(|c| style.is_separator(c)) {
        combined.push(style.separator());
    }
    for c in relative.chars() {
        // Server-relative fragments use '/' regardless of style
        if c == '/' || style.is_separator(c) {
            combined.push(style.separator());
        } else {
            combined.push(c);
        }
    }
    canonicalize(style, &combined)
}

pub fn equals(style: LocalPathStyle, a: &str, b: &str) -> bool {
    match (index_key(style, a), index_key(style, b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}

/// True when `child` is `parent` or lies beneath it
pub fn is_child(style: LocalPathStyle, parent: &str, child: &str) -> bool {
    let (Ok(parent), Ok(child)) = (index_key(style, parent), index_key(style, child)) else {
        return false;
    };
    if parent == child {
        return true;
    }
    if parent.len() == style.root_len() {
        return child.starts_with(&parent);
    }
    child.len() > parent.len()
        && child.starts_with(&parent)
        && child[parent.len()..].starts_with(style.separator())
}

#[cfg(test)]
mod tests {
    use super::*;

    const UNIX: LocalPathStyle = LocalPathStyle::Unix;
    const WINDOWS: LocalPathStyle = LocalPathStyle::Windows;

    #[test]
    fn test_canonicalize_unix() {
        assert_eq!(canonicalize(UNIX, "/").unwrap(), "/");
        assert_eq!(canonicalize(UNIX, "/ws//B/./x.txt").unwrap(), "/ws/B/x.txt");
        assert_eq!(canonicalize(UNIX, "/ws/B/../A/").unwrap(), "/ws/A");
        assert!(matches!(canonicalize(UNIX, "ws/B"), Err(PathError::NotAbsolute(_))));
        assert!(matches!(canonicalize(UNIX, "/.."), Err(PathError::AboveRoot(_))));
        assert_eq!(canonicalize(UNIX, ""), Err(PathError::Empty));
    }

    #[test]
    fn test_canonicalize_windows() {
        assert_eq!(canonicalize(WINDOWS, "c:").unwrap(), "C:\\");
        assert_eq!(canonicalize(WINDOWS, "c:/ws/B/x.txt").unwrap(), "C:\\ws\\B\\x.txt");
        assert_eq!(canonicalize(WINDOWS, "C:\\ws\\\\B.\\").unwrap(), "C:\\ws\\B");
        assert!(matches!(canonicalize(WINDOWS, "\\ws"), Err(PathError::NotAbsolute(_))));
        assert!(matches!(canonicalize(WINDOWS, "C:ws"), Err(PathError::NotAbsolute(_))));
    }

    #[test]
    fn test_index_key_case_rules() {
        assert_eq!(index_key(UNIX, "/WS/File").unwrap(), "/WS/File");
        assert_eq!(index_key(WINDOWS, "c:\\WS\\File").unwrap(), "c:\\ws\\file");
    }

    #[test]
    fn test_hierarchy() {
        assert_eq!(
            hierarchy(UNIX, "/ws/B/x.txt").as_slice(),
            &["/", "/ws", "/ws/B", "/ws/B/x.txt"].map(String::from)
        );
        assert_eq!(hierarchy(UNIX, "/").as_slice(), &["/".to_string()]);
        assert_eq!(
            hierarchy(WINDOWS, "C:\\ws\\a").as_slice(),
            &["C:\\", "C:\\ws", "C:\\ws\\a"].map(String::from)
        );
    }

    #[test]
    fn test_parent() {
        assert_eq!(parent(UNIX, "/"), None);
        assert_eq!(parent(UNIX, "/ws"), Some("/"));
        assert_eq!(parent(UNIX, "/ws/B"), Some("/ws"));
        assert_eq!(parent(WINDOWS, "C:\\ws"), Some("C:\\"));
    }

    #[test]
    fn test_make_relative_and_combine() {
        assert_eq!(make_relative(UNIX, "/ws/B/x.txt", "/ws/B"), "x.txt");
        assert_eq!(make_relative(UNIX, "/ws/b/x.txt", "/ws/B"), "/ws/b/x.txt");
        assert_eq!(make_relative(WINDOWS, "C:\\ws\\b\\x.txt", "c:\\WS\\B"), "x.txt");
        assert_eq!(make_relative(UNIX, "/ws", "/"), "ws");

        assert_eq!(combine(UNIX, "/ws/A", "x.txt").unwrap(), "/ws/A/x.txt");
        assert_eq!(combine(UNIX, "/ws/A", "").unwrap(), "/ws/A");
        assert_eq!(combine(WINDOWS, "C:\\ws", "sub/x.txt").unwrap(), "C:\\ws\\sub\\x.txt");
        assert_eq!(combine(UNIX, "/ws/A", "/other").unwrap(), "/other");
    }

    #[test]
    fn test_is_child() {
        assert!(is_child(UNIX, "/ws", "/ws/B/x.txt"));
        assert!(is_child(UNIX, "/", "/ws"));
        assert!(!is_child(UNIX, "/ws", "/wsx/a"));
        assert!(!is_child(UNIX, "/WS", "/ws/a"));
        assert!(is_child(WINDOWS, "c:\\WS", "C:\\ws\\a"));
    }
}
