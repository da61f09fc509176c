//! Multi-index storage for pending changes
//!
//! [`PendingChangeCollection`] keeps four indices over one record arena:
//! exact server path, exact local path, and the server and local path
//! hierarchies used for recursive queries. Removing a renamed folder
//! retargets its cached descendants.

mod arena;
pub mod collection;
mod hierarchy;

pub use arena::RecordId;
pub use collection::{Applied, Evicted, PendingChangeCollection};
