/*!
 * Async Completion Channel
 *
 * FIFO hand-off from host threads to the main thread. Producers never
 * block; the consumer drains on demand and never waits for new entries.
 */

use super::completion::PendingCompletion;
use crate::core::errors::{CompletionError, LifecycleError, LifecycleResult};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, error};

/// Result of one drain pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrainStats {
    pub applied: usize,
    pub discarded: usize,
}

impl DrainStats {
    pub fn total(&self) -> usize {
        self.applied + self.discarded
    }
}

/// Producer side, cloned into every host callback
#[derive(Clone)]
pub struct CompletionSender {
    tx: flume::Sender<PendingCompletion>,
    closed: Arc<AtomicBool>,
}

impl CompletionSender {
    /// Enqueue a completion without blocking
    pub fn send(&self, completion: PendingCompletion) -> LifecycleResult<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(LifecycleError::ChannelClosed);
        }
        self.tx
            .send(completion)
            .map_err(|_| LifecycleError::ChannelClosed)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

/// Consumer side, owned by the lifecycle context
pub struct CompletionChannel {
    tx: flume::Sender<PendingCompletion>,
    rx: flume::Receiver<PendingCompletion>,
    closed: Arc<AtomicBool>,
}

impl CompletionChannel {
    pub fn new() -> Self {
        let (tx, rx) = flume::unbounded();
        Self {
            tx,
            rx,
            closed: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn sender(&self) -> CompletionSender {
        CompletionSender {
            tx: self.tx.clone(),
            closed: self.closed.clone(),
        }
    }

    /// Completions currently queued
    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }

    /// Apply every queued completion in FIFO order
    ///
    /// Stops as soon as the queue reports empty. A completion that fails to
    /// apply is logged and discarded; draining continues with the next one.
    pub fn drain<F>(&self, mut apply: F) -> DrainStats
    where
        F: FnMut(PendingCompletion) -> Result<(), CompletionError>,
    {
        let mut stats = DrainStats::default();
        while let Ok(completion) = self.rx.try_recv() {
            let kind = completion.kind();
            match apply(completion) {
                Ok(()) => stats.applied += 1,
                Err(e) => {
                    error!(kind, error = %e, "Discarding malformed completion");
                    stats.discarded += 1;
                }
            }
        }
        if stats.total() > 0 {
            debug!(applied = stats.applied, discarded = stats.discarded, "Completions drained");
        }
        stats
    }

    /// Refuse further completions and drop whatever is still queued
    ///
    /// Dropped sign-in handles are released with their tokens.
    pub fn close(&self) -> usize {
        self.closed.store(true, Ordering::Release);
        let dropped = self.rx.drain().count();
        if dropped > 0 {
            debug!(dropped, "Dropped queued completions on close");
        }
        dropped
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

impl Default for CompletionChannel {
    fn default() -> Self {
        Self::new()
    }
}
