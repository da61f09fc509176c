//! Pending change cache
//!
//! Keeps an in-memory, event-driven mirror of a workspace's pending changes
//! and notifies listeners about every change to it.
//!
//! ```ignore
//! let cache = PendingChangeCache::new(engine);
//! cache.add_listener(Arc::new(MyListener));
//! cache.refresh();
//! let under_src = cache.by_server_path_recursive("$/proj/src")?;
//! ```

mod adapter;
pub mod cache;
mod depth;
pub mod error;
pub mod listener;

pub use cache::{CacheOptions, Dispatch, PendingChangeCache, UpdateScope};
pub use error::{CacheError, Result};
pub use listener::{ListenerId, PendingChangeCacheListener};
