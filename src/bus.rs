use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::debug;

type Listener = std::sync::Arc<dyn Fn() + Send + Sync>;

/// Handle returned by [`SectionsBus::subscribe`]; pass it back to
/// unsubscribe.
#[derive(Debug)]
pub struct SubscriptionId(u64);

/// In-process replacement for the window-scoped section-change
/// broadcast. Zero payload, fire-and-forget: listeners run in
/// registration order, there is no acknowledgment, and subscribers
/// that register after a signal fired get no replay. Late mounters
/// must read current state themselves.
pub struct SectionsBus {
    next_id: AtomicU64,
    listeners: Mutex<Vec<(u64, &'static str, Listener)>>,
}

impl SectionsBus {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            listeners: Mutex::new(Vec::new()),
        }
    }

    pub fn subscribe<F>(&self, name: &'static str, listener: F) -> SubscriptionId
    where
        F: Fn() + Send + Sync + 'static,
    {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.listeners
            .lock()
            .unwrap()
            .push((id, name, std::sync::Arc::new(listener)));
        debug!(listener = %name, "Subscribed to section changes");
        SubscriptionId(id)
    }

    pub fn unsubscribe(&self, subscription: SubscriptionId) {
        self.listeners
            .lock()
            .unwrap()
            .retain(|(id, _, _)| *id != subscription.0);
    }

    /// Notify every listener that the section list changed. The
    /// listener list is snapshotted first so a listener may subscribe
    /// or unsubscribe without deadlocking the bus.
    pub fn publish(&self) {
        let snapshot: Vec<(&'static str, Listener)> = self
            .listeners
            .lock()
            .unwrap()
            .iter()
            .map(|(_, name, listener)| (*name, listener.clone()))
            .collect();

        debug!(listeners = snapshot.len(), "Publishing section change");
        for (name, listener) in snapshot {
            debug!(listener = %name, "Notifying listener");
            listener();
        }
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.lock().unwrap().len()
    }
}

impl Default for SectionsBus {
    fn default() -> Self {
        Self::new()
    }
}
