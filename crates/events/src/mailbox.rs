//! Queued event delivery on a dedicated thread

use crate::engine::EngineEventHandler;
use crate::event::EngineEvent;
use crossbeam_channel::{unbounded, Sender};
use parking_lot::Mutex;
use std::sync::Arc;
use std::thread::{self, JoinHandle, ThreadId};
use tracing::{debug, warn};

/// Hands events to a worker thread that forwards them to a target handler
///
/// Events are delivered one at a time in arrival order. Publishers never
/// block on the target. Dropping the mailbox drains what is queued.
pub struct Mailbox {
    sender: Mutex<Option<Sender<EngineEvent>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
    worker_id: ThreadId,
}

impl Mailbox {
    pub fn spawn(target: Arc<dyn EngineEventHandler>) -> std::io::Result<Self> {
        let (sender, receiver) = unbounded::<EngineEvent>();

        let worker = thread::Builder::new()
            .name("pendmap-mailbox".to_string())
            .spawn(move || {
                let mut delivered = 0u64;
                for event in receiver.iter() {
                    target.on_event(&event);
                    delivered += 1;
                }
                debug!(delivered, "Mailbox drained");
            })?;

        Ok(Self {
            sender: Mutex::new(Some(sender)),
            worker_id: worker.thread().id(),
            worker: Mutex::new(Some(worker)),
        })
    }

    /// Events waiting for the worker
    pub fn pending(&self) -> usize {
        self.sender.lock().as_ref().map_or(0, |sender| sender.len())
    }

    pub fn is_closed(&self) -> bool {
        self.sender.lock().is_none()
    }

    /// Stop accepting events without waiting for the worker
    ///
    /// The worker still delivers what is queued, then exits on its own.
    pub fn close(&self) {
        drop(self.sender.lock().take());
        if self.worker.lock().take().is_some() {
            debug!("Mailbox worker detached");
        }
    }

    /// Stop accepting events and wait for the queue to drain
    ///
    /// Called from the worker itself this only closes the queue.
    pub fn shutdown(&self) {
        drop(self.sender.lock().take());

        let Some(worker) = self.worker.lock().take() else {
            return;
        };
        if thread::current().id() == self.worker_id {
            return;
        }
        if worker.join().is_err() {
            warn!("Mailbox worker panicked");
        }
    }
}

impl EngineEventHandler for Mailbox {
    fn on_event(&self, event: &EngineEvent) {
        let guard = self.sender.lock();
        let Some(sender) = guard.as_ref() else {
            debug!(event = event.name(), "Mailbox closed, dropping event");
            return;
        };
        if sender.send(event.clone()).is_err() {
            warn!(event = event.name(), "Mailbox worker gone, dropping event");
        }
    }
}

impl Drop for Mailbox {
    fn drop(&mut self) {
        self.shutdown();
    }
}
