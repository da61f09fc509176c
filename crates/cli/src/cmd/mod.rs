//! CLI command implementations

pub mod config;
pub mod replay;
pub mod show;
pub mod status;
