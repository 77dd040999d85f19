//! Wall clock abstraction so expiry and scheduling can be driven in tests.

use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Source of the current Unix time in seconds.
#[derive(Clone, Debug, Default)]
pub enum Clock {
    /// Reads the system clock.
    #[default]
    System,
    /// Fixed time that only moves when told to. Clones share the same value.
    Manual(Arc<AtomicI64>),
}

impl Clock {
    pub fn manual(now: i64) -> Self {
        Clock::Manual(Arc::new(AtomicI64::new(now)))
    }

    /// Current Unix time in seconds.
    pub fn now(&self) -> i64 {
        match self {
            Clock::System => unix_now(),
            Clock::Manual(t) => t.load(Ordering::SeqCst),
        }
    }

    /// Move a manual clock forward. No-op for the system clock.
    pub fn advance(&self, secs: i64) {
        if let Clock::Manual(t) = self {
            t.fetch_add(secs, Ordering::SeqCst);
        }
    }

    /// Set a manual clock. No-op for the system clock.
    pub fn set(&self, now: i64) {
        if let Clock::Manual(t) = self {
            t.store(now, Ordering::SeqCst);
        }
    }
}

pub fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}
