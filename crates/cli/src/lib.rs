//! pmx - inspect pending changes of a workspace snapshot
//!
//! The binary is a thin clap front end over these modules; integration
//! tests and embedders can drive the commands directly.

pub mod cmd;
pub mod config;
pub mod logging;
pub mod snapshot;
pub mod util;
