//! Time source.
//!
//! Session timestamps, expirations and store TTLs are whole seconds since the epoch.
//! A [`Clock`] carries an offset so tests can move time forward without sleeping;
//! clones share the same offset.

use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use chrono::Utc;

/// Shared time source with an adjustable offset.
#[derive(Debug, Clone, Default)]
pub struct Clock {
    offset: Arc<AtomicI64>,
}

impl Clock {
    /// Creates a clock with no offset.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current time in seconds since the epoch, offset applied.
    #[must_use]
    pub fn current_time(&self) -> i64 {
        Utc::now().timestamp() + self.offset()
    }

    /// Current time in milliseconds since the epoch, offset applied.
    #[must_use]
    pub fn current_time_millis(&self) -> i64 {
        Utc::now().timestamp_millis() + self.offset() * 1000
    }

    /// Returns the offset in seconds.
    #[must_use]
    pub fn offset(&self) -> i64 {
        self.offset.load(Ordering::Relaxed)
    }

    /// Sets the offset in seconds.
    pub fn set_offset(&self, seconds: i64) {
        self.offset.store(seconds, Ordering::Relaxed);
    }

    /// Moves the clock forward.
    pub fn advance(&self, seconds: i64) {
        self.offset.fetch_add(seconds, Ordering::Relaxed);
    }
}
