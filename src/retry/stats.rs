use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Counters shared by every toggle running through one orchestrator.
#[derive(Debug, Default)]
pub struct RetryStats {
    attempts: AtomicU64,
    retries: AtomicU64,
    succeeded: AtomicU64,
    fatal: AtomicU64,
    exhausted: AtomicU64,
}

impl RetryStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_attempt(&self) {
        self.attempts.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_retry(&self) {
        self.retries.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_success(&self) {
        self.succeeded.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_fatal(&self) {
        self.fatal.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_exhausted(&self) {
        self.exhausted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> RetryStatsSnapshot {
        RetryStatsSnapshot {
            attempts: self.attempts.load(Ordering::Relaxed),
            retries: self.retries.load(Ordering::Relaxed),
            succeeded: self.succeeded.load(Ordering::Relaxed),
            fatal: self.fatal.load(Ordering::Relaxed),
            exhausted: self.exhausted.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RetryStatsSnapshot {
    pub attempts: u64,
    pub retries: u64,
    pub succeeded: u64,
    pub fatal: u64,
    pub exhausted: u64,
}

impl std::fmt::Display for RetryStatsSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Retry Stats: {} attempts, {} retries, {} succeeded, {} fatal, {} exhausted",
            self.attempts, self.retries, self.succeeded, self.fatal, self.exhausted
        )
    }
}
