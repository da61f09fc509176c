//! Error types shared by the pendmap crates

use thiserror::Error;

/// A path could not be canonicalized
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PathError {
    #[error("path is empty")]
    Empty,
    #[error("path is not absolute: {0}")]
    NotAbsolute(String),
    #[error("path climbs above its root: {0}")]
    AboveRoot(String),
    #[error("server path component may not start with '$': {0}")]
    IllegalDollar(String),
    #[error("invalid path component in {0}")]
    InvalidComponent(String),
}

/// The version control engine could not answer a query
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("server unavailable: {0}")]
    Unavailable(String),
    #[error("workspace error: {0}")]
    Workspace(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("could not decode server response: {0}")]
    Decode(String),
}

pub type PathResult<T> = std::result::Result<T, PathError>;
