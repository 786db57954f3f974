//! Admission decision engine.
//!
//! One engine instance owns the registry and ledger and is shared across
//! the service. The pipeline per captured request:
//!
//! 1. extract at most one activity event from the body
//! 2. probes register origin-signer associations and always pass
//! 3. submissions from origins at or under the association threshold pass
//!    without touching the ledger
//! 4. submissions from over-threshold origins run the signer through the
//!    throttle ledger, which yields the verdict
//!
//! Extraction failures admit the request; this layer prefers letting an
//! odd payload through over rejecting legitimate traffic on a parse bug.

use crate::audit::{AuditRecord, AuditSink, DecisionId, DecisionOutcome, LogAuditSink};
use crate::domain::config::AdmissionConfig;
use crate::domain::error::ConfigError;
use crate::domain::types::{ActivityEvent, EventKind, Origin, SignerId, Verdict};
use crate::extractor::{ActivityExtractor, MarkerScanExtractor};
use crate::ledger::{LedgerOutcome, SignerState, ThrottleLedger};
use crate::metrics::AdmissionMetrics;
use crate::registry::AssociationRegistry;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

/// Final word on one request
#[derive(Debug, Clone, Copy)]
pub struct Decision {
    pub decision_id: DecisionId,
    pub verdict: Verdict,
    pub outcome: DecisionOutcome,
    /// Management time left when the verdict is a denial
    pub remaining: Option<Duration>,
}

impl Decision {
    fn pass_through() -> Self {
        Self {
            decision_id: DecisionId::generate(),
            verdict: Verdict::Allow,
            outcome: DecisionOutcome::Unrecognized,
            remaining: None,
        }
    }
}

/// Shared admission state and decision logic
pub struct AdmissionEngine {
    config: AdmissionConfig,
    registry: AssociationRegistry,
    ledger: ThrottleLedger,
    extractor: Box<dyn ActivityExtractor>,
    audit: Arc<dyn AuditSink>,
    metrics: Arc<AdmissionMetrics>,
}

impl AdmissionEngine {
    /// Engine with the default marker extractor and log audit sink
    pub fn new(config: AdmissionConfig) -> Result<Self, ConfigError> {
        Self::with_parts(
            config,
            Box::new(MarkerScanExtractor::new()),
            Arc::new(LogAuditSink),
        )
    }

    pub fn with_parts(
        config: AdmissionConfig,
        extractor: Box<dyn ActivityExtractor>,
        audit: Arc<dyn AuditSink>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            registry: AssociationRegistry::new(config.max_origins),
            ledger: ThrottleLedger::new(
                config.min_activity_interval,
                config.management_duration,
                config.max_signers,
            ),
            extractor,
            audit,
            metrics: Arc::new(AdmissionMetrics::new()),
            config,
        })
    }

    pub fn enabled(&self) -> bool {
        self.config.enabled
    }

    pub fn config(&self) -> &AdmissionConfig {
        &self.config
    }

    pub fn metrics(&self) -> Arc<AdmissionMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Throttle state of one signer, without touching its recency
    pub fn signer_state(&self, signer: &SignerId) -> SignerState {
        self.ledger.state_of(signer)
    }

    /// Full pipeline for a captured body: extract, then decide.
    pub fn inspect(&self, origin: &Origin, body: &str, now: DateTime<Utc>) -> Decision {
        if !self.config.enabled {
            return Decision::pass_through();
        }

        self.metrics.record_inspection();
        let event = match self.extractor.extract(body) {
            Ok(event) => event,
            Err(error) => {
                self.metrics.record_extraction_failure();
                warn!(
                    origin = %origin,
                    error = %error,
                    "Activity extraction failed - admitting request"
                );
                None
            }
        };

        self.decide(origin, event, now)
    }

    /// Decide on a pre-extracted event. Exposed for embedders that capture
    /// traffic on a transport this crate does not ship an adapter for.
    pub fn decide(
        &self,
        origin: &Origin,
        event: Option<ActivityEvent>,
        now: DateTime<Utc>,
    ) -> Decision {
        if !self.config.enabled {
            return Decision::pass_through();
        }

        let (outcome, signer, associations, remaining) = match event {
            None => (DecisionOutcome::Unrecognized, None, None, None),
            Some(ActivityEvent::IdentityProbe { signer }) => {
                self.metrics.record_probe();
                let inserted = self.registry.register(origin, signer, now);
                if inserted {
                    self.metrics.record_registration();
                }
                let outcome = if inserted {
                    DecisionOutcome::Registered
                } else {
                    DecisionOutcome::AlreadyRegistered
                };
                (
                    outcome,
                    Some(signer),
                    Some(self.registry.associated_count(origin, now)),
                    None,
                )
            }
            Some(ActivityEvent::TransactionSubmission { signer }) => {
                self.metrics.record_submission();
                if !self.registry.has_any_association(origin, now) {
                    // First contact from this origin. Enroll it and admit;
                    // origins already on file do not gain associations from
                    // submissions, only from probes.
                    let inserted = self.registry.register(origin, signer, now);
                    if inserted {
                        self.metrics.record_registration();
                    }
                    (
                        DecisionOutcome::Registered,
                        Some(signer),
                        Some(self.registry.associated_count(origin, now)),
                        None,
                    )
                } else {
                    let count = self.registry.associated_count(origin, now);
                    if count <= self.config.association_threshold as usize {
                        (DecisionOutcome::WithinThreshold, Some(signer), Some(count), None)
                    } else {
                        let transition = self.ledger.record_activity(signer, now);
                        (
                            outcome_label(transition),
                            Some(signer),
                            Some(count),
                            transition.remaining(),
                        )
                    }
                }
            }
        };

        let verdict = outcome.verdict();
        self.metrics.record_verdict(verdict.is_allow());

        let decision_id = DecisionId::generate();
        self.audit.record(AuditRecord {
            decision_id,
            at: now,
            origin: origin.clone(),
            signer,
            event: event.map(|e| e.kind()).unwrap_or(EventKind::None),
            outcome,
            verdict,
            associations,
            remaining,
        });

        Decision {
            decision_id,
            verdict,
            outcome,
            remaining,
        }
    }
}

fn outcome_label(transition: LedgerOutcome) -> DecisionOutcome {
    match transition {
        LedgerOutcome::FirstTracked => DecisionOutcome::Tracked,
        LedgerOutcome::IntervalReset => DecisionOutcome::Refreshed,
        LedgerOutcome::Escalated { .. } => DecisionOutcome::Escalated,
        LedgerOutcome::StillManaged { .. } => DecisionOutcome::StillManaged,
        LedgerOutcome::Restored => DecisionOutcome::Restored,
    }
}
