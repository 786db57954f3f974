//! Origin-signer association registry.
//!
//! Many-to-many store linking each request origin to the distinct signer
//! identities observed from it. Associations only grow: nothing in the
//! decision logic removes one. With `max_origins` configured, whole origins
//! are evicted least-recently-touched (see [`crate::bounded`]).

use crate::bounded::BoundedMap;
use crate::domain::types::{Origin, SignerId};
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::num::NonZeroUsize;
use tracing::debug;

/// Shared origin-to-signer association store
pub struct AssociationRegistry {
    origins: BoundedMap<Origin, HashSet<SignerId>>,
}

impl AssociationRegistry {
    pub fn new(max_origins: Option<NonZeroUsize>) -> Self {
        Self {
            origins: BoundedMap::new(max_origins),
        }
    }

    /// Idempotently add `signer` to the origin's set. Returns true when this
    /// is a new association.
    pub fn register(&self, origin: &Origin, signer: SignerId, now: DateTime<Utc>) -> bool {
        let newly = self.origins.upsert(
            origin.clone(),
            now.timestamp_millis(),
            HashSet::new,
            |signers, _| signers.insert(signer),
        );
        if newly {
            debug!(origin = %origin, signer = %signer, "Recorded new origin-signer association");
        }
        newly
    }

    /// Number of distinct signers ever linked to `origin`; 0 if unseen.
    pub fn associated_count(&self, origin: &Origin, now: DateTime<Utc>) -> usize {
        self.origins
            .read(origin, now.timestamp_millis(), |signers| signers.len())
            .unwrap_or(0)
    }

    /// Whether `origin` has at least one registered signer.
    pub fn has_any_association(&self, origin: &Origin, now: DateTime<Utc>) -> bool {
        self.origins
            .read(origin, now.timestamp_millis(), |_| ())
            .is_some()
    }

    /// Number of origins currently tracked
    pub fn origin_count(&self) -> usize {
        self.origins.len()
    }
}
