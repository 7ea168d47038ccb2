//! Bootstrapped ledgers and lifecycle helpers for integration tests.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use chrono::{DateTime, Duration, TimeZone, Utc};

use agrotrace_state::Ledger;
use agrotrace_types::{
    Address, ContentHash, CropType, HarvestRecord, ProductDraft, ProductId, ProductStatus, Role,
    config::LedgerConfig,
};

/// The standard cast of role holders.
#[derive(Debug, Clone)]
pub struct Cast {
    /// Deployer and sole initial admin.
    pub admin: Address,
    /// Holds Farmer.
    pub farmer: Address,
    /// Holds Processor.
    pub processor: Address,
    /// Holds Retailer.
    pub retailer: Address,
    /// Holds Inspector.
    pub inspector: Address,
    /// Holds no roles at all.
    pub outsider: Address,
}

impl Cast {
    fn standard() -> Self {
        Self {
            admin: Address::new("admin"),
            farmer: Address::new("farmer"),
            processor: Address::new("processor"),
            retailer: Address::new("retailer"),
            inspector: Address::new("inspector"),
            outsider: Address::new("outsider"),
        }
    }
}

/// A fixed, readable reference instant for deterministic tests.
pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).single().expect("valid reference instant")
}

/// Builds a ledger with default config and the standard cast granted
/// their roles.
pub fn bootstrap() -> (Ledger, Cast) {
    let cast = Cast::standard();
    let mut ledger = Ledger::new(cast.admin.clone(), LedgerConfig::default());
    for (role, address) in [
        (Role::Farmer, &cast.farmer),
        (Role::Processor, &cast.processor),
        (Role::Retailer, &cast.retailer),
        (Role::Inspector, &cast.inspector),
    ] {
        ledger.grant_role(&cast.admin, role, address, t0()).expect("grant standard role");
    }
    (ledger, cast)
}

/// A plausible tomato registration planted at `planted_at`.
pub fn tomato_draft(planted_at: DateTime<Utc>) -> ProductDraft {
    ProductDraft::builder()
        .name("Organic Tomatoes")
        .crop_type(CropType::Vegetable)
        .latitude("45.523")
        .longitude("-122.676")
        .planted_at(planted_at)
        .expected_harvest_at(planted_at + Duration::days(20))
        .build()
}

/// A harvest record dated `date`.
pub fn harvest_at(date: DateTime<Utc>) -> HarvestRecord {
    HarvestRecord { date, quantity_kg: 500, notes: "first picking".to_string() }
}

/// Drives a freshly registered product through `Growing` into `Harvested`.
pub fn harvest_product(
    ledger: &mut Ledger,
    cast: &Cast,
    id: ProductId,
    harvest_date: DateTime<Utc>,
) {
    ledger
        .update_product_status(&cast.farmer, id, ProductStatus::Growing, None, harvest_date)
        .expect("enter growing");
    ledger
        .update_product_status(
            &cast.farmer,
            id,
            ProductStatus::Harvested,
            Some(harvest_at(harvest_date)),
            harvest_date,
        )
        .expect("enter harvested");
}

/// A content hash for throwaway documentation.
pub fn doc_hash(label: &str) -> ContentHash {
    ContentHash::digest(label.as_bytes())
}
