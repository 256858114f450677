/*!
 * Lifecycle Events
 * Application-visible on-suspend / on-resume subscriptions
 */

use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

/// Zero-argument notification points exposed to the application
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleEvent {
    Suspend,
    Resume,
}

/// Handle returned by [`LifecycleEvents::subscribe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

/// Subscriber callback
pub type EventHandler = Arc<dyn Fn() + Send + Sync>;

/// Ordered subscriber lists for the lifecycle events
///
/// Handlers run on the thread that fires the event, which is always the
/// main thread. Firing works on a snapshot, so a handler may subscribe or
/// unsubscribe without deadlocking.
pub struct LifecycleEvents {
    suspend: RwLock<Vec<(SubscriptionId, EventHandler)>>,
    resume: RwLock<Vec<(SubscriptionId, EventHandler)>>,
    next_id: AtomicU64,
}

impl LifecycleEvents {
    pub fn new() -> Self {
        Self {
            suspend: RwLock::new(Vec::new()),
            resume: RwLock::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }

    fn list(&self, event: LifecycleEvent) -> &RwLock<Vec<(SubscriptionId, EventHandler)>> {
        match event {
            LifecycleEvent::Suspend => &self.suspend,
            LifecycleEvent::Resume => &self.resume,
        }
    }

    /// Register a handler; handlers fire in subscription order
    pub fn subscribe<F>(&self, event: LifecycleEvent, handler: F) -> SubscriptionId
    where
        F: Fn() + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.list(event).write().push((id, Arc::new(handler)));
        debug!(?event, id = id.0, "Lifecycle handler subscribed");
        id
    }

    /// Remove a handler. Returns `false` if it was not subscribed.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        for event in [LifecycleEvent::Suspend, LifecycleEvent::Resume] {
            let mut list = self.list(event).write();
            if let Some(index) = list.iter().position(|(sid, _)| *sid == id) {
                list.remove(index);
                return true;
            }
        }
        false
    }

    pub fn subscriber_count(&self, event: LifecycleEvent) -> usize {
        self.list(event).read().len()
    }

    /// Invoke every handler for `event`; returns how many ran
    pub fn fire(&self, event: LifecycleEvent) -> usize {
        let snapshot: Vec<EventHandler> = self
            .list(event)
            .read()
            .iter()
            .map(|(_, handler)| handler.clone())
            .collect();
        for handler in &snapshot {
            handler();
        }
        snapshot.len()
    }
}

impl Default for LifecycleEvents {
    fn default() -> Self {
        Self::new()
    }
}
