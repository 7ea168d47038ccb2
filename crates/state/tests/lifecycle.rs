//! End-to-end product lifecycle scenarios.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use chrono::Duration;

use agrotrace_state::{BatchDraft, SharedLedger};
use agrotrace_test_utils::fixtures::{bootstrap, doc_hash, harvest_at, harvest_product, t0, tomato_draft};
use agrotrace_types::{
    Address, BatchId, ErrorKind, LedgerError, LedgerEvent, ProductId, ProductStatus, RetailListing,
    Role,
};

fn batch_draft(product_id: ProductId) -> BatchDraft {
    BatchDraft::builder()
        .product_id(product_id)
        .quantity_kg(200)
        .packaging("10kg crates")
        .processing_location("Salem wash line")
        .doc_hash(doc_hash("wash-line run 1"))
        .build()
}

#[test]
fn tomato_lifecycle_from_planting_to_processing() {
    let (mut ledger, cast) = bootstrap();
    let planted = t0();

    let id = ledger
        .register_product(&cast.farmer, tomato_draft(planted), planted)
        .expect("register tomatoes");
    assert_eq!(id, ProductId::new(1));
    let product = ledger.get_product(id).expect("lookup");
    assert_eq!(product.status, ProductStatus::Planted);
    assert_eq!(product.custodian, cast.farmer);

    // Processing before harvest is premature.
    let err = ledger
        .create_batch(&cast.processor, batch_draft(id), planted + Duration::days(2))
        .expect_err("batch before harvest");
    assert_eq!(err.kind(), ErrorKind::InvalidTransition);

    // Farmer walks the product to harvest at day 18.
    harvest_product(&mut ledger, &cast, id, planted + Duration::days(18));
    let product = ledger.get_product(id).expect("lookup");
    assert_eq!(product.status, ProductStatus::Harvested);
    assert_eq!(product.harvest.as_ref().expect("harvest recorded").quantity_kg, 500);

    // Now the processor can create a batch; the product moves along.
    let batch_id = ledger
        .create_batch(&cast.processor, batch_draft(id), planted + Duration::days(19))
        .expect("batch after harvest");
    let product = ledger.get_product(id).expect("lookup");
    assert_eq!(product.status, ProductStatus::Processing);
    assert_eq!(product.batch_ids, vec![batch_id]);
    assert_eq!(product.custodian, cast.farmer, "batch creation does not transfer custody");
}

#[test]
fn registration_rejects_inverted_dates_and_wrong_role() {
    let (mut ledger, cast) = bootstrap();
    let planted = t0();

    let mut draft = tomato_draft(planted);
    draft.expected_harvest_at = planted;
    let err = ledger.register_product(&cast.farmer, draft, planted).expect_err("inverted dates");
    assert_eq!(err.kind(), ErrorKind::InvalidInput);

    let err = ledger
        .register_product(&cast.processor, tomato_draft(planted), planted)
        .expect_err("processor registering");
    assert!(matches!(err, LedgerError::Unauthorized { ref required, .. } if *required == vec![Role::Farmer]));

    assert_eq!(ledger.total_products(), 0, "failed calls do not consume ids");
}

#[test]
fn transitions_cannot_skip_or_go_backward() {
    let (mut ledger, cast) = bootstrap();
    let now = t0();
    let id = ledger.register_product(&cast.farmer, tomato_draft(now), now).expect("register");

    // Skipping Growing.
    let err = ledger
        .update_product_status(&cast.farmer, id, ProductStatus::Harvested, Some(harvest_at(now)), now)
        .expect_err("skip growing");
    assert!(matches!(
        err,
        LedgerError::ProductTransition { from: ProductStatus::Planted, to: ProductStatus::Harvested, .. }
    ));

    ledger
        .update_product_status(&cast.farmer, id, ProductStatus::Growing, None, now)
        .expect("enter growing");

    // Going backward.
    let err = ledger
        .update_product_status(&cast.farmer, id, ProductStatus::Planted, None, now)
        .expect_err("go backward");
    assert!(
        matches!(err, LedgerError::ProductTransition { to: ProductStatus::Planted, .. }),
        "planted is never a transition target"
    );

    let product = ledger.get_product(id).expect("lookup");
    assert_eq!(product.status, ProductStatus::Growing, "failed calls leave status untouched");
}

#[test]
fn harvest_record_rules() {
    let (mut ledger, cast) = bootstrap();
    let planted = t0();
    let id = ledger.register_product(&cast.farmer, tomato_draft(planted), planted).expect("register");

    // Harvest data outside the Harvested transition is rejected.
    let err = ledger
        .update_product_status(
            &cast.farmer,
            id,
            ProductStatus::Growing,
            Some(harvest_at(planted)),
            planted,
        )
        .expect_err("harvest data entering growing");
    assert_eq!(err.kind(), ErrorKind::InvalidInput);

    ledger
        .update_product_status(&cast.farmer, id, ProductStatus::Growing, None, planted)
        .expect("enter growing");

    // Entering Harvested without harvest data is rejected.
    let err = ledger
        .update_product_status(&cast.farmer, id, ProductStatus::Harvested, None, planted)
        .expect_err("no harvest data");
    assert_eq!(err.kind(), ErrorKind::InvalidInput);

    // Harvest before planting is rejected.
    let err = ledger
        .update_product_status(
            &cast.farmer,
            id,
            ProductStatus::Harvested,
            Some(harvest_at(planted - Duration::days(1))),
            planted,
        )
        .expect_err("harvest before planting");
    assert!(matches!(err, LedgerError::DateOrder { field: "harvest.date", .. }));
}

#[test]
fn custody_follows_the_product_to_sale() {
    let (mut ledger, cast) = bootstrap();
    let planted = t0();
    let id = ledger.register_product(&cast.farmer, tomato_draft(planted), planted).expect("register");
    harvest_product(&mut ledger, &cast, id, planted + Duration::days(18));

    let day = |d: i64| planted + Duration::days(d);
    ledger
        .update_product_status(&cast.processor, id, ProductStatus::Processing, None, day(19))
        .expect("enter processing");
    assert_eq!(ledger.get_product(id).expect("lookup").custodian, cast.processor);

    ledger
        .update_product_status(&cast.retailer, id, ProductStatus::InTransit, None, day(20))
        .expect("enter transit");
    ledger
        .set_retail_listing(
            &cast.retailer,
            id,
            RetailListing {
                price_cents: 499,
                notes: "vine ripened".to_string(),
                expires_at: Some(day(30)),
            },
            day(20),
        )
        .expect("list for retail");
    ledger
        .update_product_status(&cast.retailer, id, ProductStatus::Delivered, None, day(21))
        .expect("deliver");
    ledger
        .update_product_status(&cast.retailer, id, ProductStatus::Sold, None, day(22))
        .expect("sell");

    let product = ledger.get_product(id).expect("lookup");
    assert_eq!(product.status, ProductStatus::Sold);
    assert_eq!(product.custodian, cast.retailer);
    assert_eq!(product.received_at, Some(day(21)));
    assert_eq!(product.retail.as_ref().expect("listing").price_cents, 499);

    // Terminal: nothing drives past Sold.
    let err = ledger
        .update_product_status(&cast.retailer, id, ProductStatus::Sold, None, day(23))
        .expect_err("re-sell");
    assert_eq!(err.kind(), ErrorKind::InvalidTransition);

    // Custody transfers show up in the audit trail.
    let transfers = ledger
        .events()
        .iter()
        .filter(|e| matches!(e, LedgerEvent::CustodyTransferred { .. }))
        .count();
    assert_eq!(transfers, 2, "farmer->processor and processor->retailer");
}

#[test]
fn recall_is_a_side_flag_not_a_status() {
    let (mut ledger, cast) = bootstrap();
    let planted = t0();
    let id = ledger.register_product(&cast.farmer, tomato_draft(planted), planted).expect("register");
    harvest_product(&mut ledger, &cast, id, planted + Duration::days(18));

    let err = ledger
        .recall_product(&cast.farmer, id, "spots".to_string(), planted)
        .expect_err("farmer recalling");
    assert_eq!(err.kind(), ErrorKind::Unauthorized);

    ledger
        .recall_product(&cast.inspector, id, "salmonella trace".to_string(), planted)
        .expect("inspector recalls");
    let product = ledger.get_product(id).expect("lookup");
    assert!(product.recalled);
    assert_eq!(product.status, ProductStatus::Harvested, "status untouched by recall");

    let err = ledger
        .recall_product(&cast.inspector, id, "again".to_string(), planted)
        .expect_err("double recall");
    assert!(matches!(err, LedgerError::RecallRejected { reason: "already recalled", .. }));

    // Lifecycle continues independently of the flag.
    ledger
        .create_batch(&cast.processor, batch_draft(id), planted + Duration::days(19))
        .expect("batch on recalled product");
}

#[test]
fn recall_rejected_once_sold() {
    let (mut ledger, cast) = bootstrap();
    let planted = t0();
    let id = ledger.register_product(&cast.farmer, tomato_draft(planted), planted).expect("register");
    harvest_product(&mut ledger, &cast, id, planted + Duration::days(18));
    for status in [
        ProductStatus::Processing,
        ProductStatus::InTransit,
        ProductStatus::Delivered,
        ProductStatus::Sold,
    ] {
        let caller = if status == ProductStatus::Processing { &cast.processor } else { &cast.retailer };
        ledger.update_product_status(caller, id, status, None, planted).expect("advance");
    }
    let err = ledger
        .recall_product(&cast.admin, id, "too late".to_string(), planted)
        .expect_err("recall after sale");
    assert!(matches!(err, LedgerError::RecallRejected { reason: "lifecycle complete", .. }));
}

#[test]
fn batch_histories_are_append_only_until_sealed() {
    let (mut ledger, cast) = bootstrap();
    let planted = t0();
    let id = ledger.register_product(&cast.farmer, tomato_draft(planted), planted).expect("register");
    harvest_product(&mut ledger, &cast, id, planted + Duration::days(18));
    let batch_id = ledger
        .create_batch(&cast.processor, batch_draft(id), planted + Duration::days(19))
        .expect("create batch");

    let now = planted + Duration::days(19);
    ledger.append_sensor_log(&cast.processor, batch_id, 4, 80, now).expect("in-range reading");
    ledger.append_sensor_log(&cast.processor, batch_id, 15, 80, now).expect("warm reading");
    ledger
        .append_location(&cast.processor, batch_id, "45.1".to_string(), "-122.5".to_string(), now)
        .expect("location");

    let batch = ledger.get_batch(batch_id).expect("lookup");
    assert_eq!(batch.sensor_log.len(), 2);
    assert!(!batch.sensor_log[0].anomaly);
    assert!(batch.sensor_log[1].anomaly, "15C breaks the cold chain");
    assert_eq!(batch.locations.len(), 1);

    let err = ledger
        .append_location(&cast.processor, batch_id, "not-a-lat".to_string(), "0".to_string(), now)
        .expect_err("malformed latitude");
    assert_eq!(err.kind(), ErrorKind::InvalidInput);

    ledger.seal_batch(&cast.processor, batch_id, now).expect("seal");
    let err = ledger
        .append_sensor_log(&cast.processor, batch_id, 4, 80, now)
        .expect_err("append after seal");
    assert!(matches!(err, LedgerError::BatchSealed { .. }));
    let err = ledger.seal_batch(&cast.processor, batch_id, now).expect_err("double seal");
    assert!(matches!(err, LedgerError::BatchSealed { .. }));
}

#[test]
fn unknown_ids_fail_as_not_found_before_any_role_check() {
    let (mut ledger, cast) = bootstrap();
    let now = t0();
    let ghost = BatchId::new(404);

    // Missing records are reported first, even for callers with no roles.
    let err = ledger
        .create_batch(&cast.outsider, batch_draft(ProductId::new(404)), now)
        .expect_err("unknown product, no role");
    assert_eq!(err.kind(), ErrorKind::NotFound);
    let err = ledger
        .append_sensor_log(&cast.outsider, ghost, 4, 80, now)
        .expect_err("unknown batch, no role");
    assert_eq!(err.kind(), ErrorKind::NotFound);

    // Same answer with the right role held.
    for err in [
        ledger.append_sensor_log(&cast.processor, ghost, 4, 80, now).expect_err("sensor"),
        ledger
            .append_location(&cast.processor, ghost, "45.0".to_string(), "0".to_string(), now)
            .expect_err("location"),
        ledger.seal_batch(&cast.processor, ghost, now).expect_err("seal"),
    ] {
        assert!(matches!(err, LedgerError::BatchNotFound { .. }));
    }
    assert!(matches!(ledger.get_batch(ghost), Err(LedgerError::BatchNotFound { .. })));
}

#[test]
fn role_administration_and_the_last_admin() {
    let (mut ledger, cast) = bootstrap();
    let now = t0();

    // Only admins administer roles.
    let err = ledger
        .grant_role(&cast.farmer, Role::Retailer, &cast.outsider, now)
        .expect_err("farmer granting");
    assert_eq!(err.kind(), ErrorKind::Unauthorized);

    // The sole admin cannot self-revoke.
    let err = ledger
        .revoke_role(&cast.admin, Role::Admin, &cast.admin, now)
        .expect_err("sole admin self-revoke");
    assert_eq!(err.kind(), ErrorKind::InvariantViolation);
    assert!(ledger.has_role(Role::Admin, &cast.admin), "role table unchanged");

    // With a successor in place, stepping down is fine.
    let successor = Address::new("successor");
    ledger.grant_role(&cast.admin, Role::Admin, &successor, now).expect("grant successor");
    ledger.revoke_role(&cast.admin, Role::Admin, &cast.admin, now).expect("step down");
    assert!(!ledger.has_role(Role::Admin, &cast.admin));
    assert!(ledger.has_role(Role::Admin, &successor));
}

#[test]
fn shared_ledger_serializes_operations() {
    let (ledger, cast) = bootstrap();
    let shared = SharedLedger::new(ledger);
    let now = t0();

    let id = shared
        .write("register_product", |ledger| {
            ledger.register_product(&cast.farmer, tomato_draft(now), now)
        })
        .expect("register via handle");

    let (status, total) = shared.read(|ledger| {
        let product = ledger.get_product(id).expect("lookup");
        (product.status, ledger.total_products())
    });
    assert_eq!(status, ProductStatus::Planted);
    assert_eq!(total, 1);

    // Clones observe the same state.
    let clone = shared.clone();
    assert_eq!(clone.read(|ledger| ledger.total_products()), 1);
}

#[test]
fn audit_trail_records_every_mutation_in_order() {
    let (mut ledger, cast) = bootstrap();
    let now = t0();
    let before = ledger.events().len();

    let id = ledger.register_product(&cast.farmer, tomato_draft(now), now).expect("register");
    ledger
        .update_product_status(&cast.farmer, id, ProductStatus::Growing, None, now)
        .expect("grow");

    let tail: Vec<&'static str> =
        ledger.events()[before..].iter().map(|e| e.event_type()).collect();
    assert_eq!(tail, vec!["product.registered", "product.status_changed"]);

    // Failed calls leave no trace.
    let len = ledger.events().len();
    let _ = ledger
        .update_product_status(&cast.farmer, id, ProductStatus::Sold, None, now)
        .expect_err("skip to sold");
    assert_eq!(ledger.events().len(), len);
}
