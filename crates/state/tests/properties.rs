//! Property tests over the lifecycle state machine, the scorer, and the
//! certificate workflow.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use chrono::Duration;
use proptest::prelude::*;

use agrotrace_state::Ledger;
use agrotrace_test_utils::{
    fixtures::{bootstrap, doc_hash, harvest_at, t0, tomato_draft, Cast},
    strategies,
};
use agrotrace_types::{
    Address, ErrorKind, ProductId, ProductStatus, Role,
};

/// Advances a freshly registered product to `target` using the correct
/// role holders.
fn advance_to(ledger: &mut Ledger, cast: &Cast, id: ProductId, target: ProductStatus) {
    let now = t0();
    let mut current = ProductStatus::Planted;
    while current != target {
        let next = current.next().expect("target is reachable");
        let caller = match next.driving_roles()[0] {
            Role::Farmer => &cast.farmer,
            Role::Processor => &cast.processor,
            Role::Retailer => &cast.retailer,
            Role::Inspector => &cast.inspector,
            Role::Admin => &cast.admin,
        };
        let harvest =
            (next == ProductStatus::Harvested).then(|| harvest_at(now + Duration::days(18)));
        ledger.update_product_status(caller, id, next, harvest, now).expect("scripted advance");
        current = next;
    }
}

fn holder_of<'a>(cast: &'a Cast, role: Role) -> &'a Address {
    match role {
        Role::Farmer => &cast.farmer,
        Role::Processor => &cast.processor,
        Role::Retailer => &cast.retailer,
        Role::Inspector => &cast.inspector,
        Role::Admin => &cast.admin,
    }
}

proptest! {
    /// Any single-step request succeeds iff it is the next forward stage
    /// and the caller's role drives that stage; everything else fails with
    /// the taxonomy's kind and no state change.
    #[test]
    fn transitions_only_move_forward(
        start in strategies::arb_status(),
        target in strategies::arb_status(),
        actor_role in strategies::arb_role(),
    ) {
        let (mut ledger, cast) = bootstrap();
        let now = t0();
        let id = ledger
            .register_product(&cast.farmer, tomato_draft(now), now)
            .expect("register");
        advance_to(&mut ledger, &cast, id, start);

        let caller = holder_of(&cast, actor_role);
        let harvest =
            (target == ProductStatus::Harvested).then(|| harvest_at(now + Duration::days(18)));
        let before = ledger.get_product(id).expect("lookup").clone();

        let result = ledger.update_product_status(caller, id, target, harvest, now);

        // A target no role drives is a transition error for every caller;
        // otherwise the capability check runs before the order check.
        let undriven = target.driving_roles().is_empty();
        let role_ok = target.driving_roles().contains(&actor_role);
        let order_ok = start.next() == Some(target);
        match result {
            Ok(()) => {
                prop_assert!(role_ok && order_ok);
                prop_assert_eq!(ledger.get_product(id).expect("lookup").status, target);
            },
            Err(err) => {
                if undriven || role_ok {
                    prop_assert!(undriven || !order_ok);
                    prop_assert_eq!(err.kind(), ErrorKind::InvalidTransition);
                } else {
                    prop_assert_eq!(err.kind(), ErrorKind::Unauthorized);
                }
                prop_assert_eq!(&before, ledger.get_product(id).expect("lookup"));
            },
        }
    }

    /// `total_products` increases by exactly 1 per successful registration
    /// and is unaffected by failures.
    #[test]
    fn product_count_tracks_successes(
        attempts in proptest::collection::vec(
            (any::<bool>(), any::<bool>()),
            1..20,
        ),
    ) {
        let (mut ledger, cast) = bootstrap();
        let now = t0();
        let mut expected = 0u64;
        for (use_farmer, invert_dates) in attempts {
            let mut draft = tomato_draft(now);
            if invert_dates {
                draft.expected_harvest_at = draft.planted_at;
            }
            let caller = if use_farmer { &cast.farmer } else { &cast.outsider };
            let result = ledger.register_product(caller, draft, now);
            if use_farmer && !invert_dates {
                let id = result.expect("valid registration");
                expected += 1;
                prop_assert_eq!(id, ProductId::new(expected));
            } else {
                prop_assert!(result.is_err());
            }
            prop_assert_eq!(ledger.total_products(), expected);
        }
    }

    /// The authenticity score is pure and always within [0, 100].
    #[test]
    fn score_is_pure_and_clamped(
        harvest_age_days in 0i64..60,
        batch_delay_days in 0i64..10,
        readings in proptest::collection::vec(strategies::arb_sensor_input(), 0..32),
    ) {
        let (mut ledger, cast) = bootstrap();
        let planted = t0() - Duration::days(120);
        let id = ledger
            .register_product(&cast.farmer, tomato_draft(planted), planted)
            .expect("register");
        let now = t0();
        let harvest_date = now - Duration::days(harvest_age_days);
        ledger
            .update_product_status(&cast.farmer, id, ProductStatus::Growing, None, planted)
            .expect("grow");
        ledger
            .update_product_status(
                &cast.farmer, id, ProductStatus::Harvested, Some(harvest_at(harvest_date)), harvest_date,
            )
            .expect("harvest");
        let batch_id = ledger
            .create_batch(
                &cast.processor,
                agrotrace_state::BatchDraft::builder()
                    .product_id(id)
                    .quantity_kg(100)
                    .packaging("crates")
                    .processing_location("line 1")
                    .doc_hash(doc_hash("docs"))
                    .build(),
                harvest_date + Duration::days(batch_delay_days),
            )
            .expect("batch");
        for (temperature_c, humidity_pct) in readings {
            ledger
                .append_sensor_log(&cast.processor, batch_id, temperature_c, humidity_pct, now)
                .expect("reading");
        }

        let first = ledger.authenticity_score(id, now).expect("score");
        let second = ledger.authenticity_score(id, now).expect("score again");
        prop_assert_eq!(first, second, "identical inputs, identical score");
        prop_assert!(first <= 100);
    }

    /// A certificate is resolved exactly once regardless of how many
    /// resolution attempts arrive, and the first outcome sticks.
    #[test]
    fn certificates_resolve_exactly_once(
        attempts in proptest::collection::vec(any::<bool>(), 1..8),
    ) {
        let (mut ledger, cast) = bootstrap();
        let now = t0();
        let id = ledger
            .register_product(&cast.farmer, tomato_draft(now), now)
            .expect("register");
        let cert_id = ledger
            .add_certificate(
                &cast.processor,
                id,
                "ISO".to_string(),
                now + Duration::days(30),
                doc_hash("d"),
                now,
            )
            .expect("add");

        let mut successes = 0usize;
        let mut first_outcome = None;
        for approve in attempts {
            let result = if approve {
                ledger.approve_certificate(&cast.inspector, cert_id, now)
            } else {
                ledger.reject_certificate(&cast.inspector, cert_id, now)
            };
            if result.is_ok() {
                successes += 1;
                first_outcome = Some(ledger.get_certificate(cert_id).expect("lookup").outcome);
            } else {
                prop_assert_eq!(
                    result.expect_err("checked").kind(),
                    ErrorKind::InvalidTransition
                );
            }
        }
        prop_assert_eq!(successes, 1);
        prop_assert_eq!(
            Some(ledger.get_certificate(cert_id).expect("lookup").outcome),
            first_outcome,
            "first resolution sticks"
        );
        prop_assert_eq!(ledger.pending_certificates().count(), 0);
    }
}
