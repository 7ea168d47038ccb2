//! Ledger events for the append-only audit trail.
//!
//! Every successful mutation emits exactly one primary [`LedgerEvent`]
//! (custody transfers additionally emit [`LedgerEvent::CustodyTransferred`]).
//! Events are appended to the ledger's in-order audit log, included in
//! snapshots, and returned to the caller; they are never rewritten.
//!
//! Each variant maps to a hierarchical dot-separated label via
//! [`LedgerEvent::event_type`] for routing and log filtering.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{
    Address, BatchId, CertificateId, CertificateOutcome, GeoTag, Product, ProductStatus, Role,
    SensorReading,
};

/// A single entry in the ledger's audit trail.
///
/// `principal` is the address whose operation produced the event; `at` is
/// the caller-supplied operation timestamp (the ledger never samples a
/// clock itself, keeping replay deterministic).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LedgerEvent {
    /// A farmer registered a product. Carries the full initial record.
    ProductRegistered {
        /// Acting principal.
        principal: Address,
        /// Operation timestamp.
        at: DateTime<Utc>,
        /// The freshly created record.
        product: Product,
    },

    /// A product moved one step forward in its lifecycle.
    ProductStatusChanged {
        /// Acting principal.
        principal: Address,
        /// Operation timestamp.
        at: DateTime<Utc>,
        /// The product that moved.
        product_id: crate::types::ProductId,
        /// Status before the transition.
        from: ProductStatus,
        /// Status after the transition.
        to: ProductStatus,
    },

    /// Custody of a product moved to a new address.
    CustodyTransferred {
        /// Acting principal (the new custodian).
        principal: Address,
        /// Operation timestamp.
        at: DateTime<Utc>,
        /// The product changing hands.
        product_id: crate::types::ProductId,
        /// Previous custodian.
        from: Address,
        /// New custodian.
        to: Address,
    },

    /// An inspector or admin recalled a product.
    ProductRecalled {
        /// Acting principal.
        principal: Address,
        /// Operation timestamp.
        at: DateTime<Utc>,
        /// The recalled product.
        product_id: crate::types::ProductId,
        /// Inspector-supplied reason.
        reason: String,
    },

    /// A retailer listed a product for sale.
    RetailListed {
        /// Acting principal.
        principal: Address,
        /// Operation timestamp.
        at: DateTime<Utc>,
        /// The listed product.
        product_id: crate::types::ProductId,
        /// Listed price in cents.
        price_cents: u64,
    },

    /// A processor created a batch from a product.
    BatchCreated {
        /// Acting principal.
        principal: Address,
        /// Operation timestamp.
        at: DateTime<Utc>,
        /// The new batch.
        batch_id: BatchId,
        /// The parent product.
        product_id: crate::types::ProductId,
    },

    /// A sensor reading was appended to a batch's log.
    SensorLogAppended {
        /// Acting principal.
        principal: Address,
        /// Operation timestamp.
        at: DateTime<Utc>,
        /// The batch that grew.
        batch_id: BatchId,
        /// The appended reading, anomaly flag included.
        reading: SensorReading,
    },

    /// A location entry was appended to a batch's movement history.
    LocationAppended {
        /// Acting principal.
        principal: Address,
        /// Operation timestamp.
        at: DateTime<Utc>,
        /// The batch that moved.
        batch_id: BatchId,
        /// The appended point.
        location: GeoTag,
    },

    /// A batch's history was frozen.
    BatchSealed {
        /// Acting principal.
        principal: Address,
        /// Operation timestamp.
        at: DateTime<Utc>,
        /// The sealed batch.
        batch_id: BatchId,
    },

    /// A certificate was raised against a product.
    CertificateAdded {
        /// Acting principal.
        principal: Address,
        /// Operation timestamp.
        at: DateTime<Utc>,
        /// The new certificate.
        certificate_id: CertificateId,
        /// The product under review.
        product_id: crate::types::ProductId,
    },

    /// A certificate was linked to a batch's certificate list.
    CertificateLinked {
        /// Acting principal.
        principal: Address,
        /// Operation timestamp.
        at: DateTime<Utc>,
        /// The linked certificate.
        certificate_id: CertificateId,
        /// The batch it was linked to.
        batch_id: BatchId,
    },

    /// A pending certificate was resolved. Terminal for the certificate.
    CertificateResolved {
        /// Acting principal.
        principal: Address,
        /// Operation timestamp.
        at: DateTime<Utc>,
        /// The resolved certificate.
        certificate_id: CertificateId,
        /// Approved or rejected.
        outcome: CertificateOutcome,
    },

    /// An admin granted a role.
    RoleGranted {
        /// Acting principal.
        principal: Address,
        /// Operation timestamp.
        at: DateTime<Utc>,
        /// The granted role.
        role: Role,
        /// The receiving address.
        grantee: Address,
    },

    /// An admin revoked a role.
    RoleRevoked {
        /// Acting principal.
        principal: Address,
        /// Operation timestamp.
        at: DateTime<Utc>,
        /// The revoked role.
        role: Role,
        /// The address that lost the role.
        holder: Address,
    },

    /// An admin bumped the ledger version. All records are preserved.
    LedgerUpgraded {
        /// Acting principal.
        principal: Address,
        /// Operation timestamp.
        at: DateTime<Utc>,
        /// Version before the upgrade.
        from_version: u64,
        /// Version after the upgrade.
        to_version: u64,
    },
}

impl LedgerEvent {
    /// Hierarchical dot-separated event label, e.g. `product.registered`.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::ProductRegistered { .. } => "product.registered",
            Self::ProductStatusChanged { .. } => "product.status_changed",
            Self::CustodyTransferred { .. } => "product.custody_transferred",
            Self::ProductRecalled { .. } => "product.recalled",
            Self::RetailListed { .. } => "product.retail_listed",
            Self::BatchCreated { .. } => "batch.created",
            Self::SensorLogAppended { .. } => "batch.sensor_appended",
            Self::LocationAppended { .. } => "batch.location_appended",
            Self::BatchSealed { .. } => "batch.sealed",
            Self::CertificateAdded { .. } => "certificate.added",
            Self::CertificateLinked { .. } => "certificate.linked",
            Self::CertificateResolved { .. } => "certificate.resolved",
            Self::RoleGranted { .. } => "access.role_granted",
            Self::RoleRevoked { .. } => "access.role_revoked",
            Self::LedgerUpgraded { .. } => "ledger.upgraded",
        }
    }

    /// The address whose operation produced this event.
    pub fn principal(&self) -> &Address {
        match self {
            Self::ProductRegistered { principal, .. }
            | Self::ProductStatusChanged { principal, .. }
            | Self::CustodyTransferred { principal, .. }
            | Self::ProductRecalled { principal, .. }
            | Self::RetailListed { principal, .. }
            | Self::BatchCreated { principal, .. }
            | Self::SensorLogAppended { principal, .. }
            | Self::LocationAppended { principal, .. }
            | Self::BatchSealed { principal, .. }
            | Self::CertificateAdded { principal, .. }
            | Self::CertificateLinked { principal, .. }
            | Self::CertificateResolved { principal, .. }
            | Self::RoleGranted { principal, .. }
            | Self::RoleRevoked { principal, .. }
            | Self::LedgerUpgraded { principal, .. } => principal,
        }
    }
}
