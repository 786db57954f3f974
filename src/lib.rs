// Allow missing docs for internal items in development
#![allow(missing_docs)]

//! TxWarden - admission control for transaction-submitting endpoints.
//!
//! Correlates the network origins of requests with the signer accounts they
//! act for, and throttles signers that a single origin fans out across too
//! many accounts.
//!
//! # Architecture
//!
//! ```text
//!                 HTTP/1.1 request
//!                        │
//!              ┌─────────┴─────────┐
//!              │  AdmissionLayer   │  buffer body, resolve origin
//!              └─────────┬─────────┘
//!                        │ body + origin + now
//!              ┌─────────┴─────────┐
//!              │  AdmissionEngine  │
//!              │  ┌─────────────┐  │
//!              │  │  Extractor  │  │  probe / submission / nothing
//!              │  └──────┬──────┘  │
//!              │  ┌──────┴──────┐  │
//!              │  │  Registry   │  │  origin-signer associations
//!              │  └──────┬──────┘  │
//!              │  ┌──────┴──────┐  │
//!              │  │   Ledger    │  │  per-signer throttle state
//!              │  └──────┬──────┘  │
//!              └─────────┼─────────┘
//!                        │ verdict + audit record
//!              Allow ────┴──── Deny (403)
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use txwarden::{AdmissionConfig, AdmissionLayer};
//! use std::time::Duration;
//!
//! let config = AdmissionConfig::enforcing(
//!     5,                           // association threshold
//!     Duration::from_secs(5 * 60), // min activity interval
//!     Duration::from_secs(10 * 60) // management duration
//! );
//! let admission = AdmissionLayer::new(config)?;
//!
//! let app = axum::Router::new()
//!     .route("/graphql", axum::routing::post(handler))
//!     .layer(admission);
//! ```
//!
//! # Behavior
//!
//! - Identity probes register origin-signer associations and always pass
//! - Submissions pass freely while an origin stays at or under the
//!   association threshold
//! - Over-threshold submissions must keep a minimum interval between
//!   activities per signer, or the signer is managed (denied) for a
//!   bounded window
//! - Extraction failures and non-HTTP/1.1 traffic pass through untouched

#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod audit;
pub mod bounded;
pub mod clock;
pub mod codec;
pub mod domain;
pub mod engine;
pub mod extractor;
pub mod ledger;
pub mod metrics;
pub mod middleware;
pub mod registry;

// Re-exports for public API
pub use audit::{
    AuditRecord, AuditSink, ChannelAuditSink, DecisionId, DecisionOutcome, LogAuditSink,
};
pub use clock::{Clock, ManualClock, SystemClock};
pub use domain::config::AdmissionConfig;
pub use domain::error::{CodecError, ConfigError, ExtractError};
pub use domain::types::*;
pub use engine::{AdmissionEngine, Decision};
pub use extractor::{ActivityExtractor, MarkerScanExtractor};
pub use ledger::{LedgerOutcome, SignerState, ThrottleLedger};
pub use metrics::AdmissionMetrics;
pub use middleware::{AdmissionLayer, AdmissionService};
pub use registry::AssociationRegistry;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
