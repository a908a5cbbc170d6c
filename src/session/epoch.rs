use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Generation counter for mounted session screens.
///
/// Advanced on every mount and unmount. A controller remembers the value it
/// was mounted with; any async result that resumes after the counter moved on
/// belongs to a torn-down or superseded screen and must be dropped.
#[derive(Clone, Default)]
pub struct Epoch {
    counter: Arc<AtomicU64>,
}

impl Epoch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a new generation and returns it.
    pub fn advance(&self) -> u64 {
        self.counter.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Ends `generation` if it is still current. Returns false when a newer
    /// mount already superseded it.
    pub fn retire(&self, generation: u64) -> bool {
        self.counter
            .compare_exchange(generation, generation + 1, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    pub fn is_current(&self, generation: u64) -> bool {
        self.counter.load(Ordering::SeqCst) == generation
    }
}
