//! Engine events and the engine interface consumed by the pending change cache
//!
//! - [`EngineEvent`]: what the engine reports
//! - [`VersionControlEngine`]: query and subscription surface of the engine
//! - [`EventBus`]: synchronous fan-out to subscribers
//! - [`Mailbox`]: queued delivery on a worker thread

pub mod bus;
pub mod engine;
pub mod event;
pub mod mailbox;

pub use bus::EventBus;
pub use engine::{EngineEventHandler, EventSource, SubscriptionId, VersionControlEngine};
pub use event::{CompletedOperation, EngineEvent, EventOrigin};
pub use mailbox::Mailbox;
