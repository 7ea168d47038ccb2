//! Certificate registry and the pending/approved/rejected workflow.
//!
//! Certificates reference the product under review; batches link back via
//! their certificate-id lists. Resolution is terminal: a second attempt
//! fails rather than silently succeeding.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use agrotrace_types::{
    Address, BatchId, Certificate, CertificateId, CertificateOutcome, ContentHash, LedgerError,
    LedgerEvent, ProductId, Result, Role,
    config::ValidationConfig,
    validation::validate_text,
};

use crate::{access::AccessControl, batch::BatchLedger, product::ProductLedger};

/// Table of certificate records, keyed by dense id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertificateRegistry {
    records: BTreeMap<CertificateId, Certificate>,
    next_id: u64,
}

impl CertificateRegistry {
    /// Creates an empty registry; the first certificate gets id 1.
    pub fn new() -> Self {
        Self { records: BTreeMap::new(), next_id: 1 }
    }

    /// Raises a certificate against a product. Processor or Inspector.
    ///
    /// The certificate starts `Pending`.
    ///
    /// # Errors
    ///
    /// `Unauthorized` for other roles, `NotFound` for an unknown product,
    /// and `InvalidInput` when `valid_until` is not in the future or the
    /// issuer fails validation.
    pub fn add(
        &mut self,
        access: &AccessControl,
        products: &ProductLedger,
        caller: &Address,
        product_id: ProductId,
        issuer: String,
        valid_until: DateTime<Utc>,
        doc_hash: ContentHash,
        config: &ValidationConfig,
        now: DateTime<Utc>,
    ) -> Result<(CertificateId, LedgerEvent)> {
        products.get(product_id)?;
        access.require(caller, &[Role::Processor, Role::Inspector])?;
        if valid_until <= now {
            return Err(LedgerError::StaleExpiry);
        }
        validate_text("issuer", &issuer, config.max_issuer_bytes)?;

        let id = CertificateId::new(self.next_id);
        let certificate = Certificate {
            id,
            product_id,
            issuer,
            valid_until,
            doc_hash,
            outcome: CertificateOutcome::Pending,
            resolved_by: None,
            resolved_at: None,
        };
        self.records.insert(id, certificate);
        self.next_id += 1;
        let event = LedgerEvent::CertificateAdded {
            principal: caller.clone(),
            at: now,
            certificate_id: id,
            product_id,
        };
        Ok((id, event))
    }

    /// Links a certificate to a batch's certificate list. Processor or
    /// Inspector.
    ///
    /// # Errors
    ///
    /// `Unauthorized` for other roles, `NotFound` when either id is
    /// unknown.
    pub fn link_to_batch(
        &mut self,
        access: &AccessControl,
        batches: &mut BatchLedger,
        caller: &Address,
        id: CertificateId,
        batch_id: BatchId,
        now: DateTime<Utc>,
    ) -> Result<LedgerEvent> {
        if !self.records.contains_key(&id) {
            return Err(LedgerError::CertificateNotFound { id });
        }
        batches.get(batch_id)?;
        access.require(caller, &[Role::Processor, Role::Inspector])?;
        batches.link_certificate(batch_id, id)?;
        Ok(LedgerEvent::CertificateLinked {
            principal: caller.clone(),
            at: now,
            certificate_id: id,
            batch_id,
        })
    }

    /// Resolves a pending certificate. Inspector or Admin.
    ///
    /// Resolution is terminal; a second attempt fails with
    /// `InvalidTransition` and leaves the outcome unchanged.
    ///
    /// # Errors
    ///
    /// `Unauthorized` for other roles, `NotFound` for an unknown id, and
    /// [`LedgerError::CertificateResolved`] when not currently pending.
    pub fn resolve(
        &mut self,
        access: &AccessControl,
        caller: &Address,
        id: CertificateId,
        outcome: CertificateOutcome,
        now: DateTime<Utc>,
    ) -> Result<LedgerEvent> {
        debug_assert!(outcome.is_resolved(), "resolve target must be terminal");
        let certificate =
            self.records.get_mut(&id).ok_or(LedgerError::CertificateNotFound { id })?;
        access.require(caller, &[Role::Inspector, Role::Admin])?;
        if certificate.outcome.is_resolved() {
            return Err(LedgerError::CertificateResolved { id, outcome: certificate.outcome });
        }
        certificate.outcome = outcome;
        certificate.resolved_by = Some(caller.clone());
        certificate.resolved_at = Some(now);
        Ok(LedgerEvent::CertificateResolved {
            principal: caller.clone(),
            at: now,
            certificate_id: id,
            outcome,
        })
    }

    /// Lazy, restartable iterator over pending certificate ids in
    /// insertion order.
    ///
    /// Ids are dense and monotonically assigned, so ascending id order is
    /// insertion order.
    pub fn pending_ids(&self) -> impl Iterator<Item = CertificateId> + '_ {
        self.records
            .values()
            .filter(|c| c.outcome == CertificateOutcome::Pending)
            .map(|c| c.id)
    }

    /// Returns a certificate by id.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::CertificateNotFound`] for an unknown id.
    pub fn get(&self, id: CertificateId) -> Result<&Certificate> {
        self.records.get(&id).ok_or(LedgerError::CertificateNotFound { id })
    }

    /// Number of certificates ever raised.
    pub fn total(&self) -> u64 {
        self.next_id - 1
    }
}
