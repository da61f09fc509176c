//! Server path dialect
//!
//! Server paths are rooted at `$/`, accept `/` and `\` as separators and
//! compare case-insensitively. Index keys are the canonical form folded to
//! lower case.

use crate::error::PathError;
use smallvec::SmallVec;

/// The server root
pub const ROOT: &str = "$/";

/// Separator used in canonical server paths
pub const SEPARATOR: char = '/';

/// Hierarchy of a path, root first
pub type Hierarchy = SmallVec<[String; 8]>;

pub fn is_separator(c: char) -> bool {
    c == '/' || c == '\\'
}

/// True for `$`, `$/...` and `$\...`
pub fn is_server_path(path: &str) -> bool {
    let mut chars = path.chars();
    chars.next() == Some('$') && chars.next().map_or(true, is_separator)
}

/// Canonicalize a server path
///
/// - `$` and `/` alone are the root
/// - repeated separators collapse, `.` components are dropped, `..` pops
/// - trailing dots and whitespace are stripped from each component
/// - components may not start with `$`
pub fn canonicalize(path: &str) -> Result<String, PathError> {
    if path.is_empty() {
        return Err(PathError::Empty);
    }

    let rest = path.strip_prefix('$').unwrap_or(path);
    if rest.is_empty() {
        return Ok(ROOT.to_string());
    }
    if !rest.starts_with(is_separator) {
        return Err(PathError::NotAbsolute(path.to_string()));
    }

    let mut components: SmallVec<[&str; 16]> = SmallVec::new();
    for raw in rest.split(is_separator) {
        match raw {
            "" | "." => continue,
            ".." => {
                if components.pop().is_none() {
                    return Err(PathError::AboveRoot(path.to_string()));
                }
            }
            _ => {
                let cleaned = raw.trim_end_matches(|c: char| c == '.' || c.is_whitespace());
                if cleaned.is_empty() {
                    return Err(PathError::InvalidComponent(path.to_string()));
                }
                if cleaned.starts_with('$') {
                    return Err(PathError::IllegalDollar(path.to_string()));
                }
                components.push(cleaned);
            }
        }
    }

    let mut canonical = String::with_capacity(path.len() + 1);
    canonical.push_str(ROOT);
    for (i, component) in components.iter().enumerate() {
        if i > 0 {
            canonical.push(SEPARATOR);
        }
        canonical.push_str(component);
    }
    Ok(canonical)
}

/// Canonical form folded for use as a map key
pub fn index_key(path: &str) -> Result<String, PathError> {
    Ok(canonicalize(path)?.to_lowercase())
}

/// Every ancestor of a canonical path plus the path itself, root first
///
/// `$/a/b` yields `$/`, `$/a`, `$/a/b`.
pub fn hierarchy(canonical: &str) -> Hierarchy {
    let mut hierarchy = Hierarchy::new();
    hierarchy.push(ROOT.to_string());
    if canonical == ROOT {
        return hierarchy;
    }

    for (idx, _) in canonical.match_indices(SEPARATOR).skip(1) {
        hierarchy.push(canonical[..idx].to_string());
    }
    hierarchy.push(canonical.to_string());
    hierarchy
}

/// Parent of a canonical path, `None` for the root
pub fn parent(canonical: &str) -> Option<&str> {
    if canonical == ROOT {
        return None;
    }
    match canonical.rfind(SEPARATOR) {
        Some(1) => Some(ROOT),
        Some(idx) => Some(&canonical[..idx]),
        None => None,
    }
}

pub(crate) fn starts_with_ignore_case(path: &str, prefix: &str) -> bool {
    path.len() >= prefix.len()
        && path.is_char_boundary(prefix.len())
        && path[..prefix.len()].to_lowercase() == prefix.to_lowercase()
}

/// Express `path` relative to `relative_to`
///
/// Returns `path` unchanged when it is not beneath `relative_to`, and an
/// empty string when the two are the same item.
pub fn make_relative<'a>(path: &'a str, relative_to: &str) -> &'a str {
    if !starts_with_ignore_case(path, relative_to) {
        return path;
    }
    if path.len() == relative_to.len() {
        return "";
    }
    if relative_to.ends_with(is_separator) {
        return &path[relative_to.len()..];
    }
    if path[relative_to.len()..].starts_with(is_separator) {
        return &path[relative_to.len() + 1..];
    }
    path
}

/// Join a relative path onto a parent; an absolute `relative` wins
pub fn combine(parent: &str, relative: &str) -> Result<String, PathError> {
    if relative.is_empty() || relative == "$" {
        return canonicalize(parent);
    }
    if relative.starts_with(is_separator) || is_server_path(relative) {
        return canonicalize(relative);
    }

    let mut combined = String::with_capacity(parent.len() + relative.len() + 1);
    combined.push_str(parent);
    if !combined.ends_with(is_separator) {
        combined.push(SEPARATOR);
    }
    combined.push_str(relative);
    canonicalize(&combined)
}

/// Case-insensitive equality of two server paths
pub fn equals(a: &str, b: &str) -> bool {
    match (index_key(a), index_key(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => a.eq_ignore_ascii_case(b),
    }
}

/// True when `child` is `parent` or lies beneath it
pub fn is_child(parent: &str, child: &str) -> bool {
    let (Ok(parent), Ok(child)) = (index_key(parent), index_key(child)) else {
        return false;
    };
    if parent == ROOT || parent == child {
        return true;
    }
    child.len() > parent.len()
        && child.starts_with(&parent)
        && child[parent.len()..].starts_with(SEPARATOR)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonicalize() {
        assert_eq!(canonicalize("$").unwrap(), "$/");
        assert_eq!(canonicalize("$/").unwrap(), "$/");
        assert_eq!(canonicalize("/").unwrap(), "$/");
        assert_eq!(canonicalize("$/Proj/src").unwrap(), "$/Proj/src");
        assert_eq!(canonicalize("$\\Proj\\src\\").unwrap(), "$/Proj/src");
        assert_eq!(canonicalize("$//Proj///./src").unwrap(), "$/Proj/src");
        assert_eq!(canonicalize("$/Proj/old/../new").unwrap(), "$/Proj/new");
        assert_eq!(canonicalize("$/Proj/file.  ").unwrap(), "$/Proj/file");
        assert_eq!(canonicalize("/Proj").unwrap(), "$/Proj");
    }

    #[test]
    fn test_canonicalize_rejects_bad_paths() {
        assert_eq!(canonicalize(""), Err(PathError::Empty));
        assert!(matches!(canonicalize("Proj/src"), Err(PathError::NotAbsolute(_))));
        assert!(matches!(canonicalize("$Proj"), Err(PathError::NotAbsolute(_))));
        assert!(matches!(canonicalize("$/.."), Err(PathError::AboveRoot(_))));
        assert!(matches!(canonicalize("$/a/$b"), Err(PathError::IllegalDollar(_))));
        assert!(matches!(canonicalize("$/a/..."), Err(PathError::InvalidComponent(_))));
    }

    #[test]
    fn test_index_key_folds_case() {
        assert_eq!(index_key("$/Proj/README.md").unwrap(), "$/proj/readme.md");
        assert_eq!(index_key("$\\PROJ").unwrap(), index_key("$/proj").unwrap());
    }

    #[test]
    fn test_hierarchy() {
        assert_eq!(hierarchy("$/").as_slice(), &["$/".to_string()]);
        assert_eq!(
            hierarchy("$/a/b/c").as_slice(),
            &["$/", "$/a", "$/a/b", "$/a/b/c"].map(String::from)
        );
    }

    #[test]
    fn test_parent() {
        assert_eq!(parent("$/"), None);
        assert_eq!(parent("$/a"), Some("$/"));
        assert_eq!(parent("$/a/b"), Some("$/a"));
    }

    #[test]
    fn test_make_relative() {
        assert_eq!(make_relative("$/B/x.txt", "$/B"), "x.txt");
        assert_eq!(make_relative("$/b/sub/x.txt", "$/B"), "sub/x.txt");
        assert_eq!(make_relative("$/B", "$/B"), "");
        assert_eq!(make_relative("$/a/b", "$/"), "a/b");
        assert_eq!(make_relative("$/Bee/x.txt", "$/B"), "$/Bee/x.txt");
        assert_eq!(make_relative("$/C/x.txt", "$/B"), "$/C/x.txt");
    }

    #[test]
    fn test_combine() {
        assert_eq!(combine("$/A", "x.txt").unwrap(), "$/A/x.txt");
        assert_eq!(combine("$/A/", "sub/x.txt").unwrap(), "$/A/sub/x.txt");
        assert_eq!(combine("$/A", "").unwrap(), "$/A");
        assert_eq!(combine("$/A", "$/Other").unwrap(), "$/Other");
        assert_eq!(combine("$/", "a").unwrap(), "$/a");
    }

    #[test]
    fn test_is_child_and_equals() {
        assert!(is_child("$/A", "$/a/x.txt"));
        assert!(is_child("$/A", "$/A"));
        assert!(is_child("$/", "$/anything"));
        assert!(!is_child("$/A", "$/AB/x.txt"));
        assert!(equals("$/Proj/File.txt", "$\\proj\\file.TXT"));
        assert!(!equals("$/a", "$/b"));
    }

    #[test]
    fn test_is_server_path() {
        assert!(is_server_path("$"));
        assert!(is_server_path("$/a"));
        assert!(is_server_path("$\\a"));
        assert!(!is_server_path("/home/a"));
        assert!(!is_server_path("C:\\a"));
    }
}
