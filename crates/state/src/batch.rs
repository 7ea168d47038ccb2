//! Processing batches with append-only sensor and location history.
//!
//! Histories are never rewritten or deleted; the authenticity computation
//! depends on their full retention. The only lifecycle change a batch
//! supports is sealing, which freezes both histories.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use agrotrace_types::{
    Address, Batch, BatchId, BatchStatus, ContentHash, GeoTag, LedgerError, LedgerEvent, ProductId,
    ProductStatus, Result, Role, SensorReading,
    config::{SensorBounds, ValidationConfig},
    validation::{validate_latitude, validate_longitude, validate_text},
};

use crate::{access::AccessControl, product::ProductLedger};

/// Input record for batch creation.
#[derive(Debug, Clone, PartialEq, Eq, bon::Builder)]
pub struct BatchDraft {
    /// The product being processed.
    pub product_id: ProductId,
    /// Quantity entering this batch, in kilograms.
    pub quantity_kg: u64,
    /// Packaging description.
    #[builder(into)]
    pub packaging: String,
    /// Where processing happens.
    #[builder(into)]
    pub processing_location: String,
    /// Free-text processing notes.
    #[builder(into, default)]
    pub processing_notes: String,
    /// Content hash of the processing documentation.
    pub doc_hash: ContentHash,
}

/// Table of batch records, keyed by dense id.
///
/// The id counter is independent of the product counter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchLedger {
    records: BTreeMap<BatchId, Batch>,
    next_id: u64,
}

impl BatchLedger {
    /// Creates an empty table; the first batch gets id 1.
    pub fn new() -> Self {
        Self { records: BTreeMap::new(), next_id: 1 }
    }

    /// Creates a batch from a product. Processor only.
    ///
    /// The product must be `Harvested` or `Processing`; a harvested
    /// product moves to `Processing` as a side effect. The batch id is
    /// appended to the product's batch list.
    ///
    /// # Errors
    ///
    /// `Unauthorized` for non-processors, `NotFound` for an unknown
    /// product, `InvalidTransition` when the product's status does not
    /// permit processing, and `InvalidInput` for oversized text fields.
    pub fn create(
        &mut self,
        access: &AccessControl,
        products: &mut ProductLedger,
        caller: &Address,
        draft: BatchDraft,
        config: &ValidationConfig,
        now: DateTime<Utc>,
    ) -> Result<(BatchId, LedgerEvent)> {
        let product = products.get(draft.product_id)?;
        access.require(caller, &[Role::Processor])?;
        if !matches!(product.status, ProductStatus::Harvested | ProductStatus::Processing) {
            return Err(LedgerError::ProductNotProcessable {
                id: draft.product_id,
                status: product.status,
            });
        }
        validate_text("packaging", &draft.packaging, config.max_detail_bytes)?;
        validate_text("processing_location", &draft.processing_location, config.max_detail_bytes)?;
        validate_text("processing_notes", &draft.processing_notes, config.max_notes_bytes)?;

        let id = BatchId::new(self.next_id);
        let batch = Batch {
            id,
            product_id: draft.product_id,
            processor: caller.clone(),
            processed_at: now,
            quantity_kg: draft.quantity_kg,
            locations: Vec::new(),
            sensor_log: Vec::new(),
            certificate_ids: Vec::new(),
            packaging: draft.packaging,
            processing_location: draft.processing_location,
            processing_notes: draft.processing_notes,
            doc_hash: draft.doc_hash,
            status: BatchStatus::Open,
        };
        products.attach_batch(draft.product_id, id)?;
        self.records.insert(id, batch);
        self.next_id += 1;
        let event = LedgerEvent::BatchCreated {
            principal: caller.clone(),
            at: now,
            batch_id: id,
            product_id: draft.product_id,
        };
        Ok((id, event))
    }

    /// Appends a sensor reading. Processor only.
    ///
    /// The anomaly flag is computed against the configured bounds at
    /// append time and never revised.
    ///
    /// # Errors
    ///
    /// `Unauthorized`, `NotFound` for an unknown batch, and
    /// `InvalidTransition` when the batch is sealed.
    pub fn append_sensor_log(
        &mut self,
        access: &AccessControl,
        caller: &Address,
        id: BatchId,
        temperature_c: i32,
        humidity_pct: u8,
        bounds: &SensorBounds,
        now: DateTime<Utc>,
    ) -> Result<LedgerEvent> {
        self.get(id)?;
        access.require(caller, &[Role::Processor])?;
        let batch = self.open_batch_mut(id)?;
        let reading = SensorReading {
            recorded_at: now,
            temperature_c,
            humidity_pct,
            anomaly: bounds.is_anomalous(temperature_c, humidity_pct),
        };
        batch.sensor_log.push(reading);
        Ok(LedgerEvent::SensorLogAppended { principal: caller.clone(), at: now, batch_id: id, reading })
    }

    /// Appends a location entry. Processor only.
    ///
    /// # Errors
    ///
    /// `Unauthorized`, `NotFound`, `InvalidTransition` when sealed, and
    /// `InvalidInput` for malformed coordinates.
    pub fn append_location(
        &mut self,
        access: &AccessControl,
        caller: &Address,
        id: BatchId,
        latitude: String,
        longitude: String,
        now: DateTime<Utc>,
    ) -> Result<LedgerEvent> {
        self.get(id)?;
        access.require(caller, &[Role::Processor])?;
        let batch = self.open_batch_mut(id)?;
        validate_latitude(&latitude)?;
        validate_longitude(&longitude)?;
        let location = GeoTag { latitude, longitude, recorded_at: now };
        batch.locations.push(location.clone());
        Ok(LedgerEvent::LocationAppended { principal: caller.clone(), at: now, batch_id: id, location })
    }

    /// Seals a batch, freezing both histories. Processor only.
    ///
    /// # Errors
    ///
    /// `Unauthorized`, `NotFound`, and `InvalidTransition` when already
    /// sealed.
    pub fn seal(
        &mut self,
        access: &AccessControl,
        caller: &Address,
        id: BatchId,
        now: DateTime<Utc>,
    ) -> Result<LedgerEvent> {
        self.get(id)?;
        access.require(caller, &[Role::Processor])?;
        let batch = self.open_batch_mut(id)?;
        batch.status = BatchStatus::Sealed;
        Ok(LedgerEvent::BatchSealed { principal: caller.clone(), at: now, batch_id: id })
    }

    /// Appends a certificate id to a batch's list. Caller checks are the
    /// certificate registry's responsibility.
    pub(crate) fn link_certificate(
        &mut self,
        id: BatchId,
        certificate_id: agrotrace_types::CertificateId,
    ) -> Result<()> {
        let batch = self.records.get_mut(&id).ok_or(LedgerError::BatchNotFound { id })?;
        batch.certificate_ids.push(certificate_id);
        Ok(())
    }

    fn open_batch_mut(&mut self, id: BatchId) -> Result<&mut Batch> {
        let batch = self.records.get_mut(&id).ok_or(LedgerError::BatchNotFound { id })?;
        if batch.status == BatchStatus::Sealed {
            return Err(LedgerError::BatchSealed { id });
        }
        Ok(batch)
    }

    /// Returns a batch by id.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::BatchNotFound`] for an unknown id.
    pub fn get(&self, id: BatchId) -> Result<&Batch> {
        self.records.get(&id).ok_or(LedgerError::BatchNotFound { id })
    }

    /// Number of batches ever created.
    pub fn total(&self) -> u64 {
        self.next_id - 1
    }

    /// All batches belonging to a product, in creation order.
    pub fn for_product(&self, product_id: ProductId) -> Vec<&Batch> {
        self.records.values().filter(|b| b.product_id == product_id).collect()
    }
}
