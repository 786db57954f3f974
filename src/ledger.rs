//! Per-signer throttle ledger.
//!
//! Each signer observed in over-threshold submissions moves through a three
//! state machine: Untracked (no record), Tracked (recency baseline recorded),
//! Managed (blocked for a bounded window). A whole transition runs under the
//! signer's shard guard, so concurrent submissions for one signer serialize
//! into some valid order. The ledger is origin-agnostic; the decision engine
//! decides when a submission reaches it at all.

use crate::bounded::BoundedMap;
use crate::domain::types::{SignerId, Verdict};
use chrono::{DateTime, TimeDelta, Utc};
use std::num::NonZeroUsize;
use std::time::Duration;

/// Throttle state for one signer
#[derive(Debug, Clone, Copy)]
pub struct ThrottleRecord {
    last_activity_at: DateTime<Utc>,
    managed_since: Option<DateTime<Utc>>,
}

impl ThrottleRecord {
    fn tracked(now: DateTime<Utc>) -> Self {
        Self {
            last_activity_at: now,
            managed_since: None,
        }
    }

    /// Advance the record for one activity at `now`. Negative elapsed times
    /// (out-of-order timestamps) clamp to zero, which reads as "no time has
    /// passed" and takes the conservative branch.
    fn apply(
        &mut self,
        now: DateTime<Utc>,
        min_activity_interval: Duration,
        management_duration: Duration,
        interval_delta: TimeDelta,
    ) -> LedgerOutcome {
        match self.managed_since {
            Some(managed_since) => {
                let elapsed = elapsed_since(now, managed_since);
                if elapsed > management_duration {
                    // Management lapsed. Shift the baseline one interval into
                    // the past so the next activity is judged on its own.
                    self.managed_since = None;
                    self.last_activity_at = now - interval_delta;
                    LedgerOutcome::Restored
                } else {
                    LedgerOutcome::StillManaged {
                        remaining: management_duration - elapsed,
                    }
                }
            }
            None => {
                let elapsed = elapsed_since(now, self.last_activity_at);
                if elapsed >= min_activity_interval {
                    self.last_activity_at = now;
                    LedgerOutcome::IntervalReset
                } else {
                    self.managed_since = Some(now);
                    self.last_activity_at = now;
                    LedgerOutcome::Escalated {
                        remaining: management_duration,
                    }
                }
            }
        }
    }
}

/// What one recorded activity did to the signer's record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerOutcome {
    /// Untracked signer got its first baseline
    FirstTracked,
    /// Interval elapsed; baseline refreshed
    IntervalReset,
    /// Activity recurred too soon; signer is now managed
    Escalated { remaining: Duration },
    /// Signer is managed and the window has not lapsed
    StillManaged { remaining: Duration },
    /// Management window lapsed; signer back to tracked
    Restored,
}

impl LedgerOutcome {
    pub fn verdict(&self) -> Verdict {
        match self {
            Self::FirstTracked | Self::IntervalReset | Self::Restored => Verdict::Allow,
            Self::Escalated { .. } | Self::StillManaged { .. } => Verdict::Deny,
        }
    }

    /// Management time left, present on denying outcomes.
    pub fn remaining(&self) -> Option<Duration> {
        match self {
            Self::Escalated { remaining } | Self::StillManaged { remaining } => Some(*remaining),
            _ => None,
        }
    }
}

/// Snapshot of a signer's current state, for introspection and tests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignerState {
    Untracked,
    Tracked {
        last_activity_at: DateTime<Utc>,
    },
    Managed {
        managed_since: DateTime<Utc>,
        last_activity_at: DateTime<Utc>,
    },
}

/// Shared per-signer throttle state
pub struct ThrottleLedger {
    records: BoundedMap<SignerId, ThrottleRecord>,
    min_activity_interval: Duration,
    management_duration: Duration,
    interval_delta: TimeDelta,
}

impl ThrottleLedger {
    pub fn new(
        min_activity_interval: Duration,
        management_duration: Duration,
        max_signers: Option<NonZeroUsize>,
    ) -> Self {
        Self {
            records: BoundedMap::new(max_signers),
            min_activity_interval,
            management_duration,
            interval_delta: clamped_delta(min_activity_interval),
        }
    }

    /// Record one activity for `signer` at `now` and return the transition.
    /// The read-modify-write runs under the signer's shard guard.
    pub fn record_activity(&self, signer: SignerId, now: DateTime<Utc>) -> LedgerOutcome {
        self.records.upsert(
            signer,
            now.timestamp_millis(),
            || ThrottleRecord::tracked(now),
            |record, inserted| {
                if inserted {
                    LedgerOutcome::FirstTracked
                } else {
                    record.apply(
                        now,
                        self.min_activity_interval,
                        self.management_duration,
                        self.interval_delta,
                    )
                }
            },
        )
    }

    /// Current state of `signer` without touching its recency.
    pub fn state_of(&self, signer: &SignerId) -> SignerState {
        self.records
            .peek(signer, |record| match record.managed_since {
                Some(managed_since) => SignerState::Managed {
                    managed_since,
                    last_activity_at: record.last_activity_at,
                },
                None => SignerState::Tracked {
                    last_activity_at: record.last_activity_at,
                },
            })
            .unwrap_or(SignerState::Untracked)
    }

    /// Number of signers with a record
    pub fn signer_count(&self) -> usize {
        self.records.len()
    }
}

fn elapsed_since(now: DateTime<Utc>, earlier: DateTime<Utc>) -> Duration {
    now.signed_duration_since(earlier)
        .to_std()
        .unwrap_or(Duration::ZERO)
}

/// Millisecond-precision delta, clamped so arithmetic on timestamps cannot
/// leave the representable range for any validated window.
fn clamped_delta(duration: Duration) -> TimeDelta {
    TimeDelta::milliseconds(duration.as_millis().min(i64::MAX as u128) as i64)
}
