//! Decision audit trail.
//!
//! Every inspected request that produces a decision yields one
//! [`AuditRecord`]. Sinks must never block or fail the request path; the
//! engine hands records over after all ledger guards are released.

use crate::domain::types::{EventKind, Origin, SignerId, Verdict};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{info, trace, warn};
use uuid::Uuid;

/// Unique id for one admission decision, sortable by creation time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct DecisionId(Uuid);

impl DecisionId {
    pub fn generate() -> Self {
        Self(Uuid::now_v7())
    }
}

impl fmt::Display for DecisionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Why a decision came out the way it did
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionOutcome {
    /// No recognizable activity in the request
    Unrecognized,
    /// Identity probe registered a new origin-signer association
    Registered,
    /// Identity probe repeated an existing association
    AlreadyRegistered,
    /// Submission from an origin at or under the association threshold
    WithinThreshold,
    /// Over-threshold signer received its first recency baseline
    Tracked,
    /// Over-threshold signer cleared the activity interval
    Refreshed,
    /// Activity recurred too soon; signer moved under management
    Escalated,
    /// Signer remains under management
    StillManaged,
    /// Management window lapsed; signer allowed again
    Restored,
}

impl DecisionOutcome {
    /// The verdict this outcome always carries
    pub fn verdict(&self) -> Verdict {
        match self {
            Self::Escalated | Self::StillManaged => Verdict::Deny,
            _ => Verdict::Allow,
        }
    }
}

/// One admission decision, ready for structured serialization
#[derive(Debug, Clone, Serialize)]
pub struct AuditRecord {
    pub decision_id: DecisionId,
    pub at: DateTime<Utc>,
    pub origin: Origin,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signer: Option<SignerId>,
    pub event: EventKind,
    pub outcome: DecisionOutcome,
    pub verdict: Verdict,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub associations: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remaining: Option<Duration>,
}

/// Receives finished decisions. Implementations must not block.
pub trait AuditSink: Send + Sync {
    fn record(&self, record: AuditRecord);
}

/// Default sink: structured log lines via `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct LogAuditSink;

impl AuditSink for LogAuditSink {
    fn record(&self, record: AuditRecord) {
        if record.outcome == DecisionOutcome::Unrecognized {
            trace!(
                decision_id = %record.decision_id,
                origin = %record.origin,
                "No recognizable activity in request"
            );
            return;
        }

        match record.verdict {
            Verdict::Allow => info!(
                decision_id = %record.decision_id,
                origin = %record.origin,
                signer = ?record.signer,
                outcome = ?record.outcome,
                associations = ?record.associations,
                "Request admitted"
            ),
            Verdict::Deny => warn!(
                decision_id = %record.decision_id,
                origin = %record.origin,
                signer = ?record.signer,
                outcome = ?record.outcome,
                associations = ?record.associations,
                remaining = ?record.remaining,
                "Request denied"
            ),
        }
    }
}

/// Forwards decisions to a channel for out-of-band consumers.
///
/// A closed receiver drops records with a warning rather than failing
/// the request path.
pub struct ChannelAuditSink {
    tx: mpsc::UnboundedSender<AuditRecord>,
}

impl ChannelAuditSink {
    pub fn new(tx: mpsc::UnboundedSender<AuditRecord>) -> Self {
        Self { tx }
    }
}

impl AuditSink for ChannelAuditSink {
    fn record(&self, record: AuditRecord) {
        if self.tx.send(record).is_err() {
            warn!("Audit channel closed - dropping decision record");
        }
    }
}
