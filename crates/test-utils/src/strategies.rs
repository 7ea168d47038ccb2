//! Proptest strategies for AgroTrace domain types.
//!
//! Reusable generators for property-based testing across crates.
//! Strategies produce well-formed domain values while exploring edge
//! cases through random variation.
//!
//! # Usage
//!
//! ```no_run
//! use agrotrace_test_utils::strategies;
//! use proptest::prelude::*;
//!
//! proptest! {
//!     #[test]
//!     fn my_property(status in strategies::arb_status()) {
//!         // test invariant with a randomly generated status
//!     }
//! }
//! ```

use chrono::{DateTime, TimeZone, Utc};
use proptest::prelude::*;

use agrotrace_types::{Address, CropType, HarvestRecord, ProductStatus, Role};

/// Generates an arbitrary address of 1-16 characters matching `[a-z][a-z0-9]{0,15}`.
pub fn arb_address() -> impl Strategy<Value = Address> {
    "[a-z][a-z0-9]{0,15}".prop_map(Address::new)
}

/// Generates an arbitrary role.
pub fn arb_role() -> impl Strategy<Value = Role> {
    prop::sample::select(Role::ALL.to_vec())
}

/// Generates an arbitrary crop type.
pub fn arb_crop_type() -> impl Strategy<Value = CropType> {
    prop::sample::select(vec![
        CropType::Vegetable,
        CropType::Fruit,
        CropType::Grain,
        CropType::Legume,
        CropType::Herb,
        CropType::Other,
    ])
}

/// Generates an arbitrary product status, any stage.
pub fn arb_status() -> impl Strategy<Value = ProductStatus> {
    prop::sample::select(ProductStatus::ALL.to_vec())
}

/// Generates a timestamp in 2024–2026, whole seconds.
pub fn arb_timestamp() -> impl Strategy<Value = DateTime<Utc>> {
    (1_704_067_200i64..1_767_225_600).prop_map(|secs| {
        Utc.timestamp_opt(secs, 0).single().unwrap_or_else(|| Utc.timestamp_nanos(0))
    })
}

/// Generates a well-formed latitude string in `[-90, 90]`.
pub fn arb_latitude() -> impl Strategy<Value = String> {
    (-90_000i32..=90_000).prop_map(|millis| format!("{:.3}", f64::from(millis) / 1000.0))
}

/// Generates a well-formed longitude string in `[-180, 180]`.
pub fn arb_longitude() -> impl Strategy<Value = String> {
    (-180_000i32..=180_000).prop_map(|millis| format!("{:.3}", f64::from(millis) / 1000.0))
}

/// Generates a harvest record dated at `date` with random quantity and notes.
pub fn arb_harvest(date: DateTime<Utc>) -> impl Strategy<Value = HarvestRecord> {
    (1u64..100_000, "[a-z ]{0,40}")
        .prop_map(move |(quantity_kg, notes)| HarvestRecord { date, quantity_kg, notes })
}

/// Generates a plausible sensor reading: temperature in -20..40 °C,
/// humidity 0..=100 %.
pub fn arb_sensor_input() -> impl Strategy<Value = (i32, u8)> {
    (-20i32..40, 0u8..=100)
}
