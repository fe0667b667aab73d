//! Lightweight counters for batch telemetry.
//!
//! The poller and reconciler bump these as they go; the batch summary logs a
//! snapshot at the end of every run.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Monotonic counter.
#[derive(Debug, Default)]
pub struct Counter {
    value: AtomicU64,
}

impl Counter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment(&self) {
        self.value.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add(&self, n: u64) {
        self.value.fetch_add(n, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.value.load(Ordering::Relaxed)
    }
}

/// Counter registry for one bot process.
#[derive(Debug, Clone, Default)]
pub struct Metrics {
    /// Messages walked by the poller
    pub messages_processed: Arc<Counter>,
    /// Update pairs written into a week store
    pub pairs_applied: Arc<Counter>,
    /// Per-message parse/apply failures (recovered, not fatal)
    pub parse_failures: Arc<Counter>,
    /// Board messages created
    pub publishes_created: Arc<Counter>,
    /// Board messages edited in place
    pub publishes_edited: Arc<Counter>,
    /// Board messages deleted
    pub publishes_deleted: Arc<Counter>,
    /// Publish cycles that were already up to date
    pub publishes_noop: Arc<Counter>,
    /// Relay HTTP errors observed
    pub relay_errors: Arc<Counter>,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// One-line snapshot for the batch summary notice.
    pub fn summary_line(&self) -> String {
        format!(
            "processed={} applied={} failed={} publish(c/e/d/=)={}/{}/{}/{} relay_errors={}",
            self.messages_processed.get(),
            self.pairs_applied.get(),
            self.parse_failures.get(),
            self.publishes_created.get(),
            self.publishes_edited.get(),
            self.publishes_deleted.get(),
            self.publishes_noop.get(),
            self.relay_errors.get(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counter_increments() {
        let c = Counter::new();
        assert_eq!(c.get(), 0);
        c.increment();
        c.add(2);
        assert_eq!(c.get(), 3);
    }

    #[test]
    fn test_summary_line() {
        let m = Metrics::new();
        m.messages_processed.add(5);
        m.pairs_applied.add(3);
        m.parse_failures.add(2);
        let line = m.summary_line();
        assert!(line.contains("processed=5"));
        assert!(line.contains("applied=3"));
        assert!(line.contains("failed=2"));
    }
}
