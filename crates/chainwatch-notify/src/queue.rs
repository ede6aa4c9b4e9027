//! Per-listener queued delivery.
//!
//! A queued listener owns an unbounded channel and a dedicated worker thread
//! that feeds it events in arrival order. Publishing only enqueues, so a slow
//! listener falls behind on its own without holding up the producer, any
//! other listener, or the tokio runtime.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

use chainwatch_core::NodeEvent;
use parking_lot::Mutex;
use tokio::sync::{mpsc, oneshot};

use crate::error::{NotifyError, Result};
use crate::listener::{self, NodeEventNotifier};

/// A listener fed through its own queue.
pub struct QueuedListener {
    name: String,
    sender: Mutex<Option<mpsc::UnboundedSender<Arc<NodeEvent>>>>,
    /// Fires once the worker has delivered everything and exited.
    finished: Mutex<Option<oneshot::Receiver<()>>>,
    backlog: Arc<AtomicUsize>,
    warn_threshold: usize,
}

impl QueuedListener {
    /// Spawn the worker thread for `listener`.
    ///
    /// Panics raised by the listener are caught in the worker, logged, and
    /// added to `failures`; the worker keeps going with the next event.
    pub fn spawn(
        name: String,
        listener: Arc<dyn NodeEventNotifier>,
        warn_threshold: usize,
        failures: Arc<AtomicU64>,
    ) -> Result<Self> {
        let (tx, mut rx) = mpsc::unbounded_channel::<Arc<NodeEvent>>();
        let (done_tx, done_rx) = oneshot::channel();
        let backlog = Arc::new(AtomicUsize::new(0));

        let worker_backlog = Arc::clone(&backlog);
        let worker_name = name.clone();
        thread::Builder::new()
            .name(format!("listener-{name}"))
            .spawn(move || {
                while let Some(event) = rx.blocking_recv() {
                    worker_backlog.fetch_sub(1, Ordering::AcqRel);
                    let delivered = panic::catch_unwind(AssertUnwindSafe(|| {
                        listener::deliver(listener.as_ref(), &event)
                    }));
                    if delivered.is_err() {
                        failures.fetch_add(1, Ordering::Relaxed);
                        tracing::warn!(
                            listener = %worker_name,
                            event = event.kind(),
                            "listener panicked while handling event"
                        );
                    }
                }
                tracing::debug!(listener = %worker_name, "listener queue closed");
                let _ = done_tx.send(());
            })
            .map_err(|e| NotifyError::WorkerSpawn(e.to_string()))?;

        Ok(Self {
            name,
            sender: Mutex::new(Some(tx)),
            finished: Mutex::new(Some(done_rx)),
            backlog,
            warn_threshold,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Events waiting for the listener.
    pub fn backlog(&self) -> usize {
        self.backlog.load(Ordering::Acquire)
    }

    /// Queue `event` for the listener. Never blocks.
    pub fn enqueue(&self, event: Arc<NodeEvent>) {
        let sender = self.sender.lock();
        let Some(tx) = sender.as_ref() else {
            return;
        };

        let depth = self.backlog.fetch_add(1, Ordering::AcqRel) + 1;
        if tx.send(event).is_err() {
            self.backlog.fetch_sub(1, Ordering::AcqRel);
            tracing::debug!(listener = %self.name, "listener worker gone, event discarded");
            return;
        }

        if self.warn_threshold > 0 && depth % self.warn_threshold == 0 {
            tracing::warn!(
                listener = %self.name,
                backlog = depth,
                "listener is falling behind"
            );
        }
    }

    /// Stop accepting events. The worker drains what is already queued and
    /// then exits.
    pub fn close(&self) {
        self.sender.lock().take();
    }

    /// Close the queue and wait until every queued event has been delivered.
    pub async fn drain(&self) {
        self.close();
        let finished = self.finished.lock().take();
        if let Some(finished) = finished {
            if finished.await.is_err() {
                tracing::warn!(listener = %self.name, "listener worker exited early");
            }
        }
    }
}
