//! Cache error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("failed to start event dispatch thread: {0}")]
    Dispatch(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, CacheError>;
