//! Core type definitions for the AgroTrace ledger.
//!
//! Identifier newtypes, the role set, and the domain records for
//! products, batches, and certificates.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::hash::ContentHash;

// ============================================================================
// Identifier Types
// ============================================================================

/// Generates a newtype wrapper around a numeric type for type-safe identifiers.
///
/// Each generated type provides:
/// - Standard derives: Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord
/// - Serde with `#[serde(transparent)]` for wire format compatibility
/// - `From<inner>` and `Into<inner>` conversions
/// - `Display` with a semantic prefix (e.g., `product:1`)
/// - `new()` constructor and `value()` accessor
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        $name:ident, $inner:ty, $prefix:expr
    ) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord,
            Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name($inner);

        impl $name {
            /// Creates a new identifier from a raw value.
            #[inline]
            pub const fn new(value: $inner) -> Self {
                Self(value)
            }

            /// Returns the raw numeric value.
            #[inline]
            pub const fn value(self) -> $inner {
                self.0
            }
        }

        impl From<$inner> for $name {
            #[inline]
            fn from(value: $inner) -> Self {
                Self(value)
            }
        }

        impl From<$name> for $inner {
            #[inline]
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}:{}", $prefix, self.0)
            }
        }

        impl std::str::FromStr for $name {
            type Err = <$inner as std::str::FromStr>::Err;

            fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
                s.parse::<$inner>().map(Self)
            }
        }
    };
}

define_id!(
    /// Unique identifier for a registered product.
    ///
    /// Ids are dense and monotonically assigned starting at 1; the counter is
    /// independent of batch and certificate ids.
    ///
    /// # Display
    ///
    /// Formats with `product:` prefix: `product:1`.
    ProductId, u64, "product"
);

define_id!(
    /// Unique identifier for a processing batch.
    ///
    /// # Display
    ///
    /// Formats with `batch:` prefix: `batch:7`.
    BatchId, u64, "batch"
);

define_id!(
    /// Unique identifier for an inspection certificate.
    ///
    /// # Display
    ///
    /// Formats with `cert:` prefix: `cert:3`.
    CertificateId, u64, "cert"
);

/// Opaque principal identifier — what the chain of custody calls an address.
///
/// Addresses are free-form non-empty strings; the ledger never interprets
/// their content, only compares them for equality.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Address(String);

impl Address {
    /// Creates an address from any string-like value.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Returns the address as a string slice.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Address {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

// ============================================================================
// Roles
// ============================================================================

/// A named permission grant checked before every mutating operation.
///
/// An address may hold zero or more roles simultaneously. `Admin` is the only
/// role that can grant or revoke roles and trigger upgrades.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Registers products and drives them through planting and harvest.
    Farmer,
    /// Creates batches and appends sensor and location history.
    Processor,
    /// Drives custody through transit, delivery, and sale.
    Retailer,
    /// Resolves certificates and may recall products.
    Inspector,
    /// Grants roles, resolves certificates, recalls products, and upgrades.
    Admin,
}

impl Role {
    /// All roles, in declaration order.
    pub const ALL: [Role; 5] =
        [Role::Farmer, Role::Processor, Role::Retailer, Role::Inspector, Role::Admin];

    /// Returns the role as a static string label for logs and error messages.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Farmer => "farmer",
            Self::Processor => "processor",
            Self::Retailer => "retailer",
            Self::Inspector => "inspector",
            Self::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Product Lifecycle
// ============================================================================

/// Crop category for a registered product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CropType {
    /// Leafy and root vegetables.
    Vegetable,
    /// Tree and vine fruit.
    Fruit,
    /// Cereal grains.
    Grain,
    /// Beans, lentils, peas.
    Legume,
    /// Culinary and medicinal herbs.
    Herb,
    /// Anything the other categories do not cover.
    Other,
}

impl CropType {
    /// Returns the crop type as a static string label.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Vegetable => "vegetable",
            Self::Fruit => "fruit",
            Self::Grain => "grain",
            Self::Legume => "legume",
            Self::Herb => "herb",
            Self::Other => "other",
        }
    }
}

/// Product lifecycle status.
///
/// Transitions are strictly forward, one stage at a time:
///
/// ```text
/// Planted → Growing → Harvested → Processing → InTransit → Delivered → Sold
/// ```
///
/// Recall is an orthogonal side flag on [`Product`], not a status.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum ProductStatus {
    /// Registered and in the ground.
    Planted,
    /// Growing season underway.
    Growing,
    /// Harvest recorded; ready for processing.
    Harvested,
    /// At least one processing batch exists.
    Processing,
    /// In transit to a retailer.
    InTransit,
    /// Received by the retailer.
    Delivered,
    /// Sold to a consumer. Terminal.
    Sold,
}

impl ProductStatus {
    /// All statuses in lifecycle order.
    pub const ALL: [ProductStatus; 7] = [
        ProductStatus::Planted,
        ProductStatus::Growing,
        ProductStatus::Harvested,
        ProductStatus::Processing,
        ProductStatus::InTransit,
        ProductStatus::Delivered,
        ProductStatus::Sold,
    ];

    /// Returns the next status in the forward sequence, or `None` from the
    /// terminal `Sold` stage.
    pub fn next(self) -> Option<ProductStatus> {
        match self {
            Self::Planted => Some(Self::Growing),
            Self::Growing => Some(Self::Harvested),
            Self::Harvested => Some(Self::Processing),
            Self::Processing => Some(Self::InTransit),
            Self::InTransit => Some(Self::Delivered),
            Self::Delivered => Some(Self::Sold),
            Self::Sold => None,
        }
    }

    /// Whether this status ends the lifecycle.
    #[inline]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Sold)
    }

    /// The roles permitted to drive a transition *into* this status.
    ///
    /// `Planted` is only ever assigned at registration and is never the
    /// target of a transition, so its slice is empty.
    pub fn driving_roles(self) -> &'static [Role] {
        match self {
            Self::Planted => &[],
            Self::Growing | Self::Harvested => &[Role::Farmer],
            Self::Processing => &[Role::Processor],
            Self::InTransit | Self::Delivered | Self::Sold => &[Role::Retailer],
        }
    }

    /// Whether entering this status transfers custody to the caller.
    pub fn transfers_custody(self) -> bool {
        matches!(self, Self::Processing | Self::InTransit | Self::Delivered | Self::Sold)
    }

    /// Returns the status as a static string label.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Planted => "planted",
            Self::Growing => "growing",
            Self::Harvested => "harvested",
            Self::Processing => "processing",
            Self::InTransit => "in_transit",
            Self::Delivered => "delivered",
            Self::Sold => "sold",
        }
    }
}

impl fmt::Display for ProductStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A geotagged point in a product or batch history.
///
/// Coordinates are kept as the decimal strings the caller supplied so that
/// no precision is lost crossing numeric environments; they are validated
/// for shape and range on the way in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeoTag {
    /// Latitude in decimal degrees, `-90` to `90`.
    pub latitude: String,
    /// Longitude in decimal degrees, `-180` to `180`.
    pub longitude: String,
    /// When the point was recorded.
    pub recorded_at: DateTime<Utc>,
}

/// Harvest details recorded when a product transitions into `Harvested`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HarvestRecord {
    /// When the harvest happened. Must not precede the planted date.
    pub date: DateTime<Utc>,
    /// Quantity harvested, in kilograms.
    pub quantity_kg: u64,
    /// Free-text notes from the farmer.
    pub notes: String,
}

/// Retail listing details recorded by the retailer holding custody.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetailListing {
    /// Listed price in minor currency units (cents).
    pub price_cents: u64,
    /// Free-text retail notes.
    pub notes: String,
    /// Sell-by date shown to consumers, if known.
    pub expires_at: Option<DateTime<Utc>>,
}

/// A registered product and its full lifecycle record.
///
/// Products are never deleted; a recall sets [`Product::recalled`] rather
/// than removing the record. The authenticity score is deliberately absent:
/// it is recomputed on demand, never persisted as ground truth.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    /// Dense id assigned at registration.
    pub id: ProductId,
    /// Display name, e.g. `"Organic Tomatoes"`.
    pub name: String,
    /// Crop category.
    pub crop_type: CropType,
    /// Content hash of an off-ledger photo or registration document.
    pub photo_hash: Option<ContentHash>,
    /// Where the product was planted.
    pub origin: GeoTag,
    /// Planting date.
    pub planted_at: DateTime<Utc>,
    /// Expected harvest date; must be after `planted_at`.
    pub expected_harvest_at: DateTime<Utc>,
    /// Harvest details, present once the product reaches `Harvested`.
    pub harvest: Option<HarvestRecord>,
    /// Current lifecycle stage.
    pub status: ProductStatus,
    /// Batches derived from this product, in creation order.
    pub batch_ids: Vec<BatchId>,
    /// Address currently attesting custody.
    pub custodian: Address,
    /// When custody last left the previous custodian.
    pub transferred_at: Option<DateTime<Utc>>,
    /// When the current custodian attested receipt.
    pub received_at: Option<DateTime<Utc>>,
    /// Retail listing, present once a retailer has listed the product.
    pub retail: Option<RetailListing>,
    /// Recall side flag; orthogonal to `status`.
    pub recalled: bool,
    /// Inspector-supplied reason, present when `recalled` is set.
    pub recall_reason: Option<String>,
}

/// Input record for product registration.
///
/// Built with a fallible-free builder; validation happens when the draft is
/// submitted to the ledger, not at construction.
#[derive(Debug, Clone, PartialEq, Eq, bon::Builder)]
pub struct ProductDraft {
    /// Display name.
    #[builder(into)]
    pub name: String,
    /// Crop category.
    pub crop_type: CropType,
    /// Optional content hash of an off-ledger photo or document.
    pub photo_hash: Option<ContentHash>,
    /// Latitude of the planting site, decimal degrees.
    #[builder(into)]
    pub latitude: String,
    /// Longitude of the planting site, decimal degrees.
    #[builder(into)]
    pub longitude: String,
    /// Planting date.
    pub planted_at: DateTime<Utc>,
    /// Expected harvest date.
    pub expected_harvest_at: DateTime<Utc>,
}

// ============================================================================
// Batches
// ============================================================================

/// Batch lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchStatus {
    /// Accepting sensor and location appends.
    Open,
    /// Processing documentation finalized; history is frozen.
    Sealed,
}

/// A single reading from a cold-chain sensor.
///
/// Readings are append-only; the anomaly flag is computed against the
/// configured bounds at append time and never revised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SensorReading {
    /// When the reading was taken.
    pub recorded_at: DateTime<Utc>,
    /// Temperature in whole degrees Celsius.
    pub temperature_c: i32,
    /// Relative humidity, 0–100.
    pub humidity_pct: u8,
    /// Whether the reading fell outside the configured acceptable range.
    pub anomaly: bool,
}

/// A processing batch derived from a product.
///
/// Location history and the sensor log are append-only; the authenticity
/// computation depends on their full history being retained.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Batch {
    /// Dense id assigned at creation; counter independent of product ids.
    pub id: BatchId,
    /// The product this batch was derived from.
    pub product_id: ProductId,
    /// Processor that created the batch.
    pub processor: Address,
    /// When processing started.
    pub processed_at: DateTime<Utc>,
    /// Quantity processed, in kilograms.
    pub quantity_kg: u64,
    /// Append-only movement history.
    pub locations: Vec<GeoTag>,
    /// Append-only sensor log.
    pub sensor_log: Vec<SensorReading>,
    /// Certificates linked to this batch.
    pub certificate_ids: Vec<CertificateId>,
    /// Packaging description.
    pub packaging: String,
    /// Where processing happened.
    pub processing_location: String,
    /// Free-text processing notes.
    pub processing_notes: String,
    /// Content hash of the processing documentation.
    pub doc_hash: ContentHash,
    /// Open or sealed.
    pub status: BatchStatus,
}

// ============================================================================
// Certificates
// ============================================================================

/// Tri-state resolution of a certificate. Never both approved and rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CertificateOutcome {
    /// Awaiting inspector resolution.
    Pending,
    /// Approved. Terminal.
    Approved,
    /// Rejected. Terminal.
    Rejected,
}

impl CertificateOutcome {
    /// Whether the outcome is terminal.
    #[inline]
    pub fn is_resolved(self) -> bool {
        !matches!(self, Self::Pending)
    }

    /// Returns the outcome as a static string label.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }
}

impl fmt::Display for CertificateOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An inspection certificate raised against a product.
///
/// Certificates reference the product under review even when raised for a
/// specific batch's documentation; batches link back via their certificate
/// id lists. Immutable once resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Certificate {
    /// Dense id assigned at creation.
    pub id: CertificateId,
    /// The product under review.
    pub product_id: ProductId,
    /// Issuing body, free text (e.g. `"ISO-Organic"`).
    pub issuer: String,
    /// Expiry of the certification, must be in the future at creation.
    pub valid_until: DateTime<Utc>,
    /// Content hash of the certifying document.
    pub doc_hash: ContentHash,
    /// Pending, approved, or rejected.
    pub outcome: CertificateOutcome,
    /// Who resolved the certificate, set exactly once.
    pub resolved_by: Option<Address>,
    /// When the certificate was resolved.
    pub resolved_at: Option<DateTime<Utc>>,
}
