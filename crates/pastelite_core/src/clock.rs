//! Clock abstraction.
//!
//! Every expiry decision takes its "now" from a [`Clock`] so tests and the
//! test-mode request header can pin time deterministically.

use chrono::{DateTime, TimeDelta, Utc};
use std::fmt;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;

/// Source of the current instant.
pub trait Clock: Send + Sync + fmt::Debug {
    /// Current wall-clock instant in UTC.
    fn now(&self) -> DateTime<Utc>;
}

/// Real system time.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Manually driven clock for deterministic tests.
///
/// Stores Unix milliseconds, so sub-millisecond precision is dropped.
#[derive(Debug)]
pub struct ManualClock {
    now_ms: AtomicI64,
}

impl ManualClock {
    /// Create a clock pinned at `millis` since the Unix epoch.
    pub fn at_millis(millis: i64) -> Self {
        Self {
            now_ms: AtomicI64::new(millis),
        }
    }

    /// Jump to an absolute instant.
    pub fn set(&self, instant: DateTime<Utc>) {
        self.now_ms
            .store(instant.timestamp_millis(), Ordering::SeqCst);
    }

    /// Move the clock forward by `by`.
    pub fn advance(&self, by: Duration) {
        let delta = i64::try_from(by.as_millis()).unwrap_or(i64::MAX);
        let _ = self
            .now_ms
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |current| {
                Some(current.saturating_add(delta))
            });
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        from_unix_millis(self.now_ms.load(Ordering::SeqCst)).unwrap_or_default()
    }
}

/// Convert Unix milliseconds into an instant.
///
/// # Returns
/// `None` when `millis` falls outside the representable range.
pub fn from_unix_millis(millis: i64) -> Option<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp_millis(millis)
}

/// Compute `now + ttl`, or `None` when no ttl applies or the sum overflows.
///
/// An overflowing deadline is treated as "never", which is the only sane
/// reading of a TTL longer than the calendar.
pub fn deadline_after(now: DateTime<Utc>, ttl: Option<Duration>) -> Option<DateTime<Utc>> {
    let ttl = TimeDelta::from_std(ttl?).ok()?;
    now.checked_add_signed(ttl)
}
