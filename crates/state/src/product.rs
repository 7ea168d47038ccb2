//! Product records and their lifecycle state machine.
//!
//! Transitions are strictly forward, one stage at a time, each driven by
//! the role expected at that stage. Every check runs before any field is
//! written, so a failed call leaves the record untouched.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use agrotrace_types::{
    Address, BatchId, GeoTag, HarvestRecord, LedgerError, LedgerEvent, Product, ProductDraft,
    ProductId, ProductStatus, Result, RetailListing, Role,
    config::ValidationConfig,
    validation::{validate_latitude, validate_longitude, validate_name, validate_text},
};

use crate::access::AccessControl;

/// Table of product records, keyed by dense id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductLedger {
    records: BTreeMap<ProductId, Product>,
    next_id: u64,
}

impl ProductLedger {
    /// Creates an empty table; the first registered product gets id 1.
    pub fn new() -> Self {
        Self { records: BTreeMap::new(), next_id: 1 }
    }

    /// Registers a product. Farmer only.
    ///
    /// The new record starts `Planted` with the caller as custodian.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Unauthorized`] if the caller is not a farmer,
    /// or an `InvalidInput`-kind error if the name or coordinates fail
    /// validation or the expected harvest does not follow planting.
    pub fn register(
        &mut self,
        access: &AccessControl,
        caller: &Address,
        draft: ProductDraft,
        config: &ValidationConfig,
        now: DateTime<Utc>,
    ) -> Result<(ProductId, LedgerEvent)> {
        access.require(caller, &[Role::Farmer])?;
        validate_name(&draft.name, config)?;
        validate_latitude(&draft.latitude)?;
        validate_longitude(&draft.longitude)?;
        if draft.expected_harvest_at <= draft.planted_at {
            return Err(LedgerError::DateOrder {
                field: "expected_harvest_at",
                reason: format!("must be after planted_at {}", draft.planted_at),
            });
        }

        let id = ProductId::new(self.next_id);
        let product = Product {
            id,
            name: draft.name,
            crop_type: draft.crop_type,
            photo_hash: draft.photo_hash,
            origin: GeoTag {
                latitude: draft.latitude,
                longitude: draft.longitude,
                recorded_at: now,
            },
            planted_at: draft.planted_at,
            expected_harvest_at: draft.expected_harvest_at,
            harvest: None,
            status: ProductStatus::Planted,
            batch_ids: Vec::new(),
            custodian: caller.clone(),
            transferred_at: None,
            received_at: None,
            retail: None,
            recalled: false,
            recall_reason: None,
        };
        let event = LedgerEvent::ProductRegistered {
            principal: caller.clone(),
            at: now,
            product: product.clone(),
        };
        self.records.insert(id, product);
        self.next_id += 1;
        Ok((id, event))
    }

    /// Moves a product one step forward in its lifecycle.
    ///
    /// A [`HarvestRecord`] must accompany the transition into `Harvested`
    /// and only that transition. Entering `Processing` onward transfers
    /// custody to the caller; the ledger records attestation, not verified
    /// physical possession.
    ///
    /// Returns the status-change event, preceded by a custody event when
    /// the custodian changed.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown id, `Unauthorized` when the caller's role
    /// does not drive the target stage, `InvalidTransition` for anything
    /// but the next forward step (including targets no role drives, such
    /// as `Planted`), and `InvalidInput` for harvest-record misuse or a
    /// harvest date preceding planting.
    pub fn update_status(
        &mut self,
        access: &AccessControl,
        caller: &Address,
        id: ProductId,
        new_status: ProductStatus,
        harvest: Option<HarvestRecord>,
        config: &ValidationConfig,
        now: DateTime<Utc>,
    ) -> Result<Vec<LedgerEvent>> {
        let product = self.records.get(&id).ok_or(LedgerError::ProductNotFound { id })?;
        let drivers = new_status.driving_roles();
        if drivers.is_empty() {
            // No role drives a transition into this stage; no caller could
            // ever be authorized for it.
            return Err(LedgerError::ProductTransition {
                id,
                from: product.status,
                to: new_status,
            });
        }
        access.require(caller, drivers)?;
        if product.status.next() != Some(new_status) {
            return Err(LedgerError::ProductTransition {
                id,
                from: product.status,
                to: new_status,
            });
        }
        match (&harvest, new_status == ProductStatus::Harvested) {
            (Some(_), true) | (None, false) => {},
            (None, true) => {
                return Err(LedgerError::HarvestRecord {
                    reason: "required when entering harvested",
                });
            },
            (Some(_), false) => {
                return Err(LedgerError::HarvestRecord {
                    reason: "only accepted when entering harvested",
                });
            },
        }
        if let Some(record) = &harvest {
            if record.date < product.planted_at {
                return Err(LedgerError::DateOrder {
                    field: "harvest.date",
                    reason: format!("must not precede planted_at {}", product.planted_at),
                });
            }
            validate_text("harvest.notes", &record.notes, config.max_notes_bytes)?;
        }

        // All checks passed; mutate.
        let mut events = Vec::with_capacity(2);
        let product = self
            .records
            .get_mut(&id)
            .ok_or(LedgerError::ProductNotFound { id })?;
        let from = product.status;
        if new_status.transfers_custody() && product.custodian != *caller {
            events.push(LedgerEvent::CustodyTransferred {
                principal: caller.clone(),
                at: now,
                product_id: id,
                from: product.custodian.clone(),
                to: caller.clone(),
            });
            product.custodian = caller.clone();
            product.transferred_at = Some(now);
        }
        if new_status == ProductStatus::Delivered {
            product.received_at = Some(now);
        }
        if let Some(record) = harvest {
            product.harvest = Some(record);
        }
        product.status = new_status;
        events.push(LedgerEvent::ProductStatusChanged {
            principal: caller.clone(),
            at: now,
            product_id: id,
            from,
            to: new_status,
        });
        Ok(events)
    }

    /// Sets the recall flag. Inspector or Admin.
    ///
    /// Recall does not change `status`; consumers must check the flag
    /// independently.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown id, `Unauthorized` for other roles, and
    /// `InvalidTransition` when the product is already sold or already
    /// recalled.
    pub fn recall(
        &mut self,
        access: &AccessControl,
        caller: &Address,
        id: ProductId,
        reason: String,
        config: &ValidationConfig,
        now: DateTime<Utc>,
    ) -> Result<LedgerEvent> {
        let product = self.records.get(&id).ok_or(LedgerError::ProductNotFound { id })?;
        access.require(caller, &[Role::Inspector, Role::Admin])?;
        if product.status.is_terminal() {
            return Err(LedgerError::RecallRejected { id, reason: "lifecycle complete" });
        }
        if product.recalled {
            return Err(LedgerError::RecallRejected { id, reason: "already recalled" });
        }
        validate_text("recall.reason", &reason, config.max_notes_bytes)?;

        let product = self
            .records
            .get_mut(&id)
            .ok_or(LedgerError::ProductNotFound { id })?;
        product.recalled = true;
        product.recall_reason = Some(reason.clone());
        Ok(LedgerEvent::ProductRecalled { principal: caller.clone(), at: now, product_id: id, reason })
    }

    /// Records a retail listing. Retailer only; the product must be in
    /// transit or delivered.
    ///
    /// # Errors
    ///
    /// `NotFound`, `Unauthorized`, `InvalidTransition` when the product has
    /// not reached transit or is already sold, and `InvalidInput` for
    /// oversized notes.
    pub fn set_retail_listing(
        &mut self,
        access: &AccessControl,
        caller: &Address,
        id: ProductId,
        listing: RetailListing,
        config: &ValidationConfig,
        now: DateTime<Utc>,
    ) -> Result<LedgerEvent> {
        let product = self.records.get(&id).ok_or(LedgerError::ProductNotFound { id })?;
        access.require(caller, &[Role::Retailer])?;
        if !matches!(product.status, ProductStatus::InTransit | ProductStatus::Delivered) {
            return Err(LedgerError::ProductTransition {
                id,
                from: product.status,
                to: product.status,
            });
        }
        validate_text("retail.notes", &listing.notes, config.max_notes_bytes)?;

        let price_cents = listing.price_cents;
        let product = self
            .records
            .get_mut(&id)
            .ok_or(LedgerError::ProductNotFound { id })?;
        product.retail = Some(listing);
        Ok(LedgerEvent::RetailListed { principal: caller.clone(), at: now, product_id: id, price_cents })
    }

    /// Appends a batch id to a product's batch list and moves a harvested
    /// product into `Processing`. Called by the batch ledger after its own
    /// checks pass; returns the prior status.
    pub(crate) fn attach_batch(&mut self, id: ProductId, batch_id: BatchId) -> Result<ProductStatus> {
        let product = self
            .records
            .get_mut(&id)
            .ok_or(LedgerError::ProductNotFound { id })?;
        let from = product.status;
        product.batch_ids.push(batch_id);
        if product.status == ProductStatus::Harvested {
            product.status = ProductStatus::Processing;
        }
        Ok(from)
    }

    /// Returns a product by id.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::ProductNotFound`] for an unknown id.
    pub fn get(&self, id: ProductId) -> Result<&Product> {
        self.records.get(&id).ok_or(LedgerError::ProductNotFound { id })
    }

    /// Number of products ever registered. Never decreases.
    pub fn total(&self) -> u64 {
        self.next_id - 1
    }

    /// Iterates all products in id order.
    pub fn iter(&self) -> impl Iterator<Item = &Product> {
        self.records.values()
    }
}
