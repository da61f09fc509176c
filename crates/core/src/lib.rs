//! Core types for pendmap
//!
//! This crate provides:
//! - Pending change records (`PendingChange`, `ChangeType`, `ChangeRequest`)
//! - Server and local path dialects (canonicalization, hierarchy, combine)
//! - Working folder path translation
//! - Error types shared across crates

pub mod change;
pub mod error;
pub mod local_path;
pub mod mapping;
pub mod server_path;

// Re-exports
pub use change::{
    ChangeKind, ChangeRequest, ChangeType, ItemType, PendingChange, RequestType, WorkspaceId,
    ENCODING_BINARY, ENCODING_UNCHANGED,
};
pub use error::{EngineError, PathError, PathResult};
pub use local_path::LocalPathStyle;
pub use mapping::{PathTranslator, WorkingFolder, WorkspaceMappings};
