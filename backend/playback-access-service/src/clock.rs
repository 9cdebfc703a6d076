//! Wall-clock abstraction
//!
//! Expiry checks and TTL computation read time through [`Clock`] so tests can
//! drive a simulated clock.

use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;

pub trait Clock: Send + Sync {
    /// Milliseconds since the Unix epoch
    fn now_millis(&self) -> i64;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}

/// Manually advanced clock for tests.
#[derive(Debug, Default)]
pub struct ManualClock {
    now_millis: AtomicI64,
}

impl ManualClock {
    pub fn new(now_millis: i64) -> Self {
        Self {
            now_millis: AtomicI64::new(now_millis),
        }
    }

    pub fn advance(&self, by: Duration) {
        self.now_millis
            .fetch_add(by.as_millis() as i64, Ordering::SeqCst);
    }

    pub fn set(&self, now_millis: i64) {
        self.now_millis.store(now_millis, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> i64 {
        self.now_millis.load(Ordering::SeqCst)
    }
}

/// Time left until `expires_at_millis`, or `None` once it has passed.
pub fn remaining_until(clock: &dyn Clock, expires_at_millis: i64) -> Option<Duration> {
    let remaining = expires_at_millis - clock.now_millis();
    if remaining > 0 {
        Some(Duration::from_millis(remaining as u64))
    } else {
        None
    }
}
