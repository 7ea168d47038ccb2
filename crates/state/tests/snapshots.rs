//! Snapshot, restore, and upgrade: state is preserved, never reset.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use chrono::Duration;

use agrotrace_state::{BatchDraft, Ledger, SNAPSHOT_FORMAT_VERSION};
use agrotrace_test_utils::fixtures::{bootstrap, doc_hash, harvest_product, t0, tomato_draft};
use agrotrace_types::{ErrorKind, LedgerError, ProductStatus, Role, encode};

/// Builds a ledger with products, a batch, a certificate, and history.
fn populated() -> (Ledger, agrotrace_test_utils::fixtures::Cast) {
    let (mut ledger, cast) = bootstrap();
    let planted = t0();
    let id = ledger.register_product(&cast.farmer, tomato_draft(planted), planted).expect("register");
    harvest_product(&mut ledger, &cast, id, planted + Duration::days(18));
    let batch_id = ledger
        .create_batch(
            &cast.processor,
            BatchDraft::builder()
                .product_id(id)
                .quantity_kg(100)
                .packaging("crates")
                .processing_location("line 1")
                .doc_hash(doc_hash("docs"))
                .build(),
            planted + Duration::days(19),
        )
        .expect("batch");
    ledger
        .append_sensor_log(&cast.processor, batch_id, 4, 80, planted + Duration::days(19))
        .expect("reading");
    ledger
        .add_certificate(
            &cast.processor,
            id,
            "ISO-Organic".to_string(),
            planted + Duration::days(365),
            doc_hash("audit"),
            planted + Duration::days(19),
        )
        .expect("certificate");
    (ledger, cast)
}

#[test]
fn snapshot_restore_preserves_everything() {
    let (ledger, _cast) = populated();
    let bytes = ledger.snapshot().expect("snapshot");
    let restored = Ledger::restore(&bytes).expect("restore");

    // Records, ids, roles, audit trail, and version all survive intact.
    assert_eq!(restored.total_products(), ledger.total_products());
    assert_eq!(restored.total_batches(), ledger.total_batches());
    assert_eq!(restored.total_certificates(), ledger.total_certificates());
    assert_eq!(restored.version(), ledger.version());
    assert_eq!(restored.events(), ledger.events());
    for id in 1..=ledger.total_products() {
        let id = agrotrace_types::ProductId::new(id);
        assert_eq!(restored.get_product(id).expect("product"), ledger.get_product(id).expect("product"));
    }
}

#[test]
fn upgrade_bumps_version_and_preserves_records() {
    let (mut ledger, cast) = populated();
    let now = t0() + Duration::days(30);
    let products_before = ledger.total_products();
    let product_before = ledger.get_product(agrotrace_types::ProductId::new(1)).expect("p").clone();

    // Upgrade is admin-gated.
    let err = ledger.upgrade(&cast.processor, now).expect_err("processor upgrading");
    assert_eq!(err.kind(), ErrorKind::Unauthorized);
    assert_eq!(ledger.version(), 1);

    let new_version = ledger.upgrade(&cast.admin, now).expect("upgrade");
    assert_eq!(new_version, 2);
    assert_eq!(ledger.version(), 2);
    let again = ledger.upgrade(&cast.admin, now).expect("second upgrade");
    assert_eq!(again, 3, "version only ever increases");

    // Data migration, not reset.
    assert_eq!(ledger.total_products(), products_before);
    assert_eq!(
        ledger.get_product(agrotrace_types::ProductId::new(1)).expect("p"),
        &product_before
    );
    assert!(ledger.has_role(Role::Farmer, &cast.farmer));
}

#[test]
fn upgraded_state_survives_snapshot_roundtrip() {
    let (mut ledger, cast) = populated();
    let now = t0() + Duration::days(30);
    ledger.upgrade(&cast.admin, now).expect("upgrade");
    ledger
        .update_product_status(
            &cast.processor,
            agrotrace_types::ProductId::new(1),
            ProductStatus::InTransit,
            None,
            now,
        )
        .expect_err("processing is current; retailer drives transit");
    let bytes = ledger.snapshot().expect("snapshot");
    let restored = Ledger::restore(&bytes).expect("restore");
    assert_eq!(restored.version(), 2);
    assert_eq!(restored.events(), ledger.events());
}

#[test]
fn future_format_snapshot_is_rejected() {
    let (ledger, _cast) = populated();
    // A snapshot envelope is (format_version, ledger); fabricate one from
    // a format this build does not know.
    let bytes = encode(&(SNAPSHOT_FORMAT_VERSION + 1, ledger)).expect("encode future envelope");
    let err = Ledger::restore(&bytes).expect_err("future format");
    assert!(matches!(
        err,
        LedgerError::SnapshotFromFuture { found, supported }
            if found == SNAPSHOT_FORMAT_VERSION + 1 && supported == SNAPSHOT_FORMAT_VERSION
    ));
    assert_eq!(err.kind(), ErrorKind::InvalidInput);
}

#[test]
fn corrupt_snapshot_is_rejected() {
    let err = Ledger::restore(&[0xFF, 0xFF, 0xFF]).expect_err("garbage");
    assert!(matches!(err, LedgerError::SnapshotCodec { .. }));
}
