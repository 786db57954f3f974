//! Time source trait for testability.

use chrono::{DateTime, Utc};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Wall-clock source consulted once per captured request
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// System time implementation
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Manually advanced clock for deterministic tests.
///
/// Clones share the same underlying time value.
#[derive(Debug, Clone)]
pub struct ManualClock {
    current: Arc<Mutex<DateTime<Utc>>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            current: Arc::new(Mutex::new(start)),
        }
    }

    pub fn advance(&self, duration: Duration) {
        let mut time = self
            .current
            .lock()
            .expect("ManualClock mutex poisoned - a test thread panicked while holding the lock");
        *time += chrono::TimeDelta::milliseconds(duration.as_millis().min(i64::MAX as u128) as i64);
    }

    pub fn set(&self, at: DateTime<Utc>) {
        let mut time = self
            .current
            .lock()
            .expect("ManualClock mutex poisoned - a test thread panicked while holding the lock");
        *time = at;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self
            .current
            .lock()
            .expect("ManualClock mutex poisoned - a test thread panicked while holding the lock")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock_advances() {
        let start = DateTime::from_timestamp_millis(1_700_000_000_000).unwrap();
        let clock = ManualClock::new(start);

        assert_eq!(clock.now(), start);

        clock.advance(Duration::from_secs(10));
        assert_eq!(clock.now(), start + chrono::TimeDelta::seconds(10));

        let later = start + chrono::TimeDelta::minutes(5);
        clock.set(later);
        assert_eq!(clock.now(), later);
    }

    #[test]
    fn test_clones_share_time() {
        let start = DateTime::from_timestamp_millis(1_700_000_000_000).unwrap();
        let clock = ManualClock::new(start);
        let other = clock.clone();

        other.advance(Duration::from_secs(30));
        assert_eq!(clock.now(), start + chrono::TimeDelta::seconds(30));
    }

    #[test]
    fn test_system_clock_is_sane() {
        // Anything after 2023 counts as a working clock here
        let now = SystemClock.now();
        assert!(now.timestamp() > 1_700_000_000);
    }
}
