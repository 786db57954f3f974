//! Counters for the admission pipeline.

use std::sync::atomic::{AtomicU64, Ordering};

/// Admission control metrics
#[derive(Default)]
pub struct AdmissionMetrics {
    // Capture counters
    pub bodies_inspected: AtomicU64,

    // Activity counters
    pub probes_seen: AtomicU64,
    pub submissions_seen: AtomicU64,
    pub extraction_failures: AtomicU64,

    // Registry counters
    pub registrations: AtomicU64,

    // Decision counters
    pub allowed: AtomicU64,
    pub denied: AtomicU64,
}

impl AdmissionMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an inspected request body
    pub fn record_inspection(&self) {
        self.bodies_inspected.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a recognized identity probe
    pub fn record_probe(&self) {
        self.probes_seen.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a recognized transaction submission
    pub fn record_submission(&self) {
        self.submissions_seen.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a payload that carried a marker but failed to parse
    pub fn record_extraction_failure(&self) {
        self.extraction_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a new origin-signer association
    pub fn record_registration(&self) {
        self.registrations.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a final verdict
    pub fn record_verdict(&self, allowed: bool) {
        if allowed {
            self.allowed.fetch_add(1, Ordering::Relaxed);
        } else {
            self.denied.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Export metrics as JSON
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "capture": {
                "bodies_inspected": self.bodies_inspected.load(Ordering::Relaxed),
            },
            "activity": {
                "probes": self.probes_seen.load(Ordering::Relaxed),
                "submissions": self.submissions_seen.load(Ordering::Relaxed),
                "extraction_failures": self.extraction_failures.load(Ordering::Relaxed),
            },
            "registry": {
                "registrations": self.registrations.load(Ordering::Relaxed),
            },
            "decisions": {
                "allowed": self.allowed.load(Ordering::Relaxed),
                "denied": self.denied.load(Ordering::Relaxed),
            }
        })
    }
}
