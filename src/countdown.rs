use std::sync::Arc;

use tokio::sync::watch;

/// Fallback reset value when settings don't provide one.
pub const DEFAULT_DURATION_SECS: u32 = 10;

/// Seconds remaining for the active meditation, shared between the session
/// screen and the duration picker.
///
/// The store is injected into both consumers rather than reached through a
/// global. Writes are last-write-wins; every write is visible to
/// [`CountdownStore::subscribe`] receivers so views can re-render.
#[derive(Clone)]
pub struct CountdownStore {
    tx: Arc<watch::Sender<u32>>,
    default_secs: u32,
}

impl CountdownStore {
    pub fn new(default_secs: u32) -> Self {
        let (tx, _rx) = watch::channel(default_secs);
        Self {
            tx: Arc::new(tx),
            default_secs,
        }
    }

    pub fn get(&self) -> u32 {
        *self.tx.borrow()
    }

    pub fn set(&self, secs: u32) {
        self.tx.send_replace(secs);
    }

    pub fn reset(&self) {
        self.set(self.default_secs);
    }

    /// Counts down by one second and returns the new value. Saturates at zero.
    pub fn decrement(&self) -> u32 {
        let mut remaining = 0;
        self.tx.send_if_modified(|secs| {
            remaining = secs.saturating_sub(1);
            let changed = remaining != *secs;
            *secs = remaining;
            changed
        });
        remaining
    }

    pub fn subscribe(&self) -> watch::Receiver<u32> {
        self.tx.subscribe()
    }
}

impl Default for CountdownStore {
    fn default() -> Self {
        Self::new(DEFAULT_DURATION_SECS)
    }
}
