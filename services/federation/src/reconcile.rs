//! Cross-registry reconciliation
//!
//! Verifies the local registry against the continental one by exact
//! (entity_type, entity_id, hash) tuple matching. The reconciler only
//! reports; it never mutates either registry.

use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

use crate::registry::FederationRegistry;

/// Verification outcome for one local record
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReconciledRecord {
    pub entity_type: String,
    pub entity_id: String,
    pub local_hash: String,
    /// Hash of the most recent continental record for the same entity,
    /// absent when the entity never reached the continental registry
    pub continental_hash: Option<String>,
    pub verified: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ReconciliationSummary {
    pub total: usize,
    pub verified: usize,
    pub unverified: usize,
}

pub struct FederationReconciler {
    local: Arc<FederationRegistry>,
    continental: Arc<FederationRegistry>,
}

impl FederationReconciler {
    pub fn new(local: Arc<FederationRegistry>, continental: Arc<FederationRegistry>) -> Self {
        Self { local, continental }
    }

    /// Verify the most recent `limit` local records against the
    /// continental registry.
    ///
    /// A record verifies iff the continental registry holds a record with
    /// the identical (entity_type, entity_id, hash) tuple. When the
    /// entity exists on the other side with a different hash, the most
    /// recent continental hash is reported alongside `verified: false`.
    pub fn reconcile(&self, limit: usize) -> Vec<ReconciledRecord> {
        let local_records = self.local.recent(limit);
        let continental_records = self.continental.recent(limit);

        let mut results = Vec::with_capacity(local_records.len());
        for record in &local_records {
            let mut candidates = continental_records.iter().filter(|c| {
                c.entity_type == record.entity_type && c.entity_id == record.entity_id
            });
            let exact = candidates.clone().any(|c| c.hash == record.hash);
            // Continental list is most-recent-first, so the first
            // candidate is the latest attestation for this entity
            let continental_hash = candidates.next().map(|c| c.hash.clone());

            if !exact {
                warn!(
                    entity_type = %record.entity_type,
                    entity_id = %record.entity_id,
                    local_hash = %record.hash,
                    continental_hash = ?continental_hash,
                    "Federation record failed verification"
                );
            }

            results.push(ReconciledRecord {
                entity_type: record.entity_type.clone(),
                entity_id: record.entity_id.clone(),
                local_hash: record.hash.clone(),
                continental_hash: if exact { Some(record.hash.clone()) } else { continental_hash },
                verified: exact,
            });
        }
        results
    }

    /// Reconcile and aggregate into counts.
    pub fn summarize(&self, limit: usize) -> ReconciliationSummary {
        let records = self.reconcile(limit);
        let verified = records.iter().filter(|r| r.verified).count();
        let summary = ReconciliationSummary {
            total: records.len(),
            verified,
            unverified: records.len() - verified,
        };
        info!(
            total = summary.total,
            verified = summary.verified,
            unverified = summary.unverified,
            "Federation reconciliation complete"
        );
        summary
    }
}
