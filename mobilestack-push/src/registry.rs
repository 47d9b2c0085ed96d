use crate::message::PushMessage;
use std::sync::{Arc, LazyLock, Mutex, MutexGuard, PoisonError};
use tracing::debug;

/// A transient push subscriber.
pub type PushCallback = Arc<dyn Fn(&PushMessage) + Send + Sync>;

static GLOBAL: LazyLock<Arc<PushRegistry>> = LazyLock::new(|| Arc::new(PushRegistry::new()));

/// Subscribers notified of every inbound push message while the process
/// runs.
///
/// The lock only guards registration, clearing and taking a snapshot;
/// callbacks are invoked outside it, so a callback may itself register or
/// clear. Callbacks run on whichever thread dispatches, in no particular
/// order.
pub struct PushRegistry {
    callbacks: Mutex<Vec<PushCallback>>,
}

impl PushRegistry {
    pub const fn new() -> Self {
        Self {
            callbacks: Mutex::new(Vec::new()),
        }
    }

    /// The process-wide registry.
    pub fn global() -> Arc<PushRegistry> {
        GLOBAL.clone()
    }

    pub fn register<F>(&self, callback: F)
    where
        F: Fn(&PushMessage) + Send + Sync + 'static,
    {
        self.lock().push(Arc::new(callback));
    }

    /// Removes every subscriber.
    pub fn clear(&self) {
        let mut callbacks = self.lock();
        debug!(removed = callbacks.len(), "clearing push callbacks");
        callbacks.clear();
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Invokes every current subscriber with `message`. Returns how many
    /// were invoked.
    pub fn dispatch(&self, message: &PushMessage) -> usize {
        let snapshot: Vec<PushCallback> = self.lock().clone();
        for callback in &snapshot {
            callback(message);
        }
        snapshot.len()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<PushCallback>> {
        self.callbacks.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for PushRegistry {
    fn default() -> Self {
        Self::new()
    }
}
