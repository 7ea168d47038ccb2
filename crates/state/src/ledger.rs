//! The ledger aggregate and its serialized entry point.
//!
//! [`Ledger`] owns every record table, the role table, the audit log, and
//! the upgrade counter, and exposes one method per external operation.
//! Operations take `&mut self` and either fully commit (appending their
//! events to the audit log) or fail with a [`LedgerError`] and no state
//! change.
//!
//! [`SharedLedger`] is the mutex-guarded handle callers share; it is the
//! single serialization point — no two operations ever observe
//! interleaved partial state.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info_span};

use agrotrace_types::{
    Address, Batch, BatchId, Certificate, CertificateId, CertificateOutcome, ContentHash,
    HarvestRecord, LedgerEvent, Product, ProductDraft, ProductId, ProductStatus,
    Result, RetailListing, Role, config::LedgerConfig,
};

use crate::{
    access::AccessControl,
    batch::{BatchDraft, BatchLedger},
    certificate::CertificateRegistry,
    product::ProductLedger,
    score::authenticity_score,
    version::{migrate_snapshot, write_snapshot},
};

/// The authoritative ledger state.
///
/// One owned aggregate, mutated only through its operation methods, one
/// serialized operation at a time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ledger {
    config: LedgerConfig,
    access: AccessControl,
    products: ProductLedger,
    batches: BatchLedger,
    certificates: CertificateRegistry,
    /// Monotonically increasing upgrade counter, starts at 1.
    version: u64,
    /// Append-only audit trail of every successful mutation.
    events: Vec<LedgerEvent>,
}

impl Ledger {
    /// Creates a ledger with `deployer` as the initial admin.
    pub fn new(deployer: Address, config: LedgerConfig) -> Self {
        Self {
            config,
            access: AccessControl::new(deployer),
            products: ProductLedger::new(),
            batches: BatchLedger::new(),
            certificates: CertificateRegistry::new(),
            version: 1,
            events: Vec::new(),
        }
    }

    // ------------------------------------------------------------------
    // Access control
    // ------------------------------------------------------------------

    /// Grants a role. Admin only. No-op (but still audited) when the
    /// address already holds the role.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Unauthorized`] for non-admin callers.
    pub fn grant_role(
        &mut self,
        caller: &Address,
        role: Role,
        address: &Address,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let changed = self.access.grant(caller, role, address)?;
        if changed {
            self.emit(LedgerEvent::RoleGranted {
                principal: caller.clone(),
                at: now,
                role,
                grantee: address.clone(),
            });
        }
        Ok(())
    }

    /// Revokes a role. Admin only; never drops the last admin.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Unauthorized`] for non-admin callers and
    /// [`LedgerError::LastAdmin`] when the revocation would leave zero
    /// admins.
    pub fn revoke_role(
        &mut self,
        caller: &Address,
        role: Role,
        address: &Address,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let changed = self.access.revoke(caller, role, address)?;
        if changed {
            self.emit(LedgerEvent::RoleRevoked {
                principal: caller.clone(),
                at: now,
                role,
                holder: address.clone(),
            });
        }
        Ok(())
    }

    /// Pure role lookup; always succeeds.
    pub fn has_role(&self, role: Role, address: &Address) -> bool {
        self.access.has_role(role, address)
    }

    // ------------------------------------------------------------------
    // Products
    // ------------------------------------------------------------------

    /// Registers a product. Farmer only. See [`ProductLedger::register`].
    ///
    /// # Errors
    ///
    /// Propagates the component's `Unauthorized` and `InvalidInput`
    /// failures; on failure `total_products` is unchanged.
    pub fn register_product(
        &mut self,
        caller: &Address,
        draft: ProductDraft,
        now: DateTime<Utc>,
    ) -> Result<ProductId> {
        let (id, event) =
            self.products.register(&self.access, caller, draft, &self.config.validation, now)?;
        self.emit(event);
        Ok(id)
    }

    /// Moves a product one step forward. See [`ProductLedger::update_status`].
    ///
    /// # Errors
    ///
    /// Propagates the component's `NotFound`, `Unauthorized`,
    /// `InvalidTransition`, and `InvalidInput` failures.
    pub fn update_product_status(
        &mut self,
        caller: &Address,
        id: ProductId,
        new_status: ProductStatus,
        harvest: Option<HarvestRecord>,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let events = self.products.update_status(
            &self.access,
            caller,
            id,
            new_status,
            harvest,
            &self.config.validation,
            now,
        )?;
        for event in events {
            self.emit(event);
        }
        Ok(())
    }

    /// Recalls a product. Inspector or Admin. See [`ProductLedger::recall`].
    ///
    /// # Errors
    ///
    /// Propagates the component's `NotFound`, `Unauthorized`, and
    /// `InvalidTransition` failures.
    pub fn recall_product(
        &mut self,
        caller: &Address,
        id: ProductId,
        reason: String,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let event =
            self.products.recall(&self.access, caller, id, reason, &self.config.validation, now)?;
        self.emit(event);
        Ok(())
    }

    /// Records a retail listing. Retailer only.
    /// See [`ProductLedger::set_retail_listing`].
    ///
    /// # Errors
    ///
    /// Propagates the component's `NotFound`, `Unauthorized`,
    /// `InvalidTransition`, and `InvalidInput` failures.
    pub fn set_retail_listing(
        &mut self,
        caller: &Address,
        id: ProductId,
        listing: RetailListing,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let event = self.products.set_retail_listing(
            &self.access,
            caller,
            id,
            listing,
            &self.config.validation,
            now,
        )?;
        self.emit(event);
        Ok(())
    }

    /// Returns a product by id.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::ProductNotFound`] for an unknown id.
    pub fn get_product(&self, id: ProductId) -> Result<&Product> {
        self.products.get(id)
    }

    /// Returns a product together with all its batches, in creation order.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::ProductNotFound`] for an unknown id.
    pub fn get_product_history(&self, id: ProductId) -> Result<(&Product, Vec<&Batch>)> {
        let product = self.products.get(id)?;
        Ok((product, self.batches.for_product(id)))
    }

    /// Number of products ever registered. Increases by exactly 1 per
    /// successful registration; unaffected by failed calls.
    pub fn total_products(&self) -> u64 {
        self.products.total()
    }

    // ------------------------------------------------------------------
    // Batches
    // ------------------------------------------------------------------

    /// Creates a processing batch. Processor only. See [`BatchLedger::create`].
    ///
    /// # Errors
    ///
    /// Propagates the component's `Unauthorized`, `NotFound`, and
    /// `InvalidTransition` failures.
    pub fn create_batch(
        &mut self,
        caller: &Address,
        draft: BatchDraft,
        now: DateTime<Utc>,
    ) -> Result<BatchId> {
        let (id, event) = self.batches.create(
            &self.access,
            &mut self.products,
            caller,
            draft,
            &self.config.validation,
            now,
        )?;
        self.emit(event);
        Ok(id)
    }

    /// Appends a sensor reading to a batch. Processor only.
    /// See [`BatchLedger::append_sensor_log`].
    ///
    /// # Errors
    ///
    /// Propagates the component's `Unauthorized`, `NotFound`, and
    /// `InvalidTransition` failures.
    pub fn append_sensor_log(
        &mut self,
        caller: &Address,
        id: BatchId,
        temperature_c: i32,
        humidity_pct: u8,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let event = self.batches.append_sensor_log(
            &self.access,
            caller,
            id,
            temperature_c,
            humidity_pct,
            &self.config.sensor_bounds,
            now,
        )?;
        self.emit(event);
        Ok(())
    }

    /// Appends a location entry to a batch. Processor only.
    /// See [`BatchLedger::append_location`].
    ///
    /// # Errors
    ///
    /// Propagates the component's `Unauthorized`, `NotFound`,
    /// `InvalidTransition`, and `InvalidInput` failures.
    pub fn append_location(
        &mut self,
        caller: &Address,
        id: BatchId,
        latitude: String,
        longitude: String,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let event =
            self.batches.append_location(&self.access, caller, id, latitude, longitude, now)?;
        self.emit(event);
        Ok(())
    }

    /// Seals a batch, freezing its histories. Processor only.
    ///
    /// # Errors
    ///
    /// Propagates the component's `Unauthorized`, `NotFound`, and
    /// `InvalidTransition` failures.
    pub fn seal_batch(&mut self, caller: &Address, id: BatchId, now: DateTime<Utc>) -> Result<()> {
        let event = self.batches.seal(&self.access, caller, id, now)?;
        self.emit(event);
        Ok(())
    }

    /// Returns a batch by id.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::BatchNotFound`] for an unknown id.
    pub fn get_batch(&self, id: BatchId) -> Result<&Batch> {
        self.batches.get(id)
    }

    /// Number of batches ever created.
    pub fn total_batches(&self) -> u64 {
        self.batches.total()
    }

    // ------------------------------------------------------------------
    // Certificates
    // ------------------------------------------------------------------

    /// Raises a certificate against a product. Processor or Inspector.
    /// See [`CertificateRegistry::add`].
    ///
    /// # Errors
    ///
    /// Propagates the component's `Unauthorized`, `NotFound`, and
    /// `InvalidInput` failures.
    pub fn add_certificate(
        &mut self,
        caller: &Address,
        product_id: ProductId,
        issuer: String,
        valid_until: DateTime<Utc>,
        doc_hash: ContentHash,
        now: DateTime<Utc>,
    ) -> Result<CertificateId> {
        let (id, event) = self.certificates.add(
            &self.access,
            &self.products,
            caller,
            product_id,
            issuer,
            valid_until,
            doc_hash,
            &self.config.validation,
            now,
        )?;
        self.emit(event);
        Ok(id)
    }

    /// Links a certificate to a batch. Processor or Inspector.
    ///
    /// # Errors
    ///
    /// Propagates the component's `Unauthorized` and `NotFound` failures.
    pub fn link_certificate_to_batch(
        &mut self,
        caller: &Address,
        id: CertificateId,
        batch_id: BatchId,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let event = self.certificates.link_to_batch(
            &self.access,
            &mut self.batches,
            caller,
            id,
            batch_id,
            now,
        )?;
        self.emit(event);
        Ok(())
    }

    /// Approves a pending certificate. Inspector or Admin. Terminal.
    ///
    /// # Errors
    ///
    /// Propagates the component's `Unauthorized`, `NotFound`, and
    /// `InvalidTransition` failures; a second resolution always fails.
    pub fn approve_certificate(
        &mut self,
        caller: &Address,
        id: CertificateId,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let event = self.certificates.resolve(
            &self.access,
            caller,
            id,
            CertificateOutcome::Approved,
            now,
        )?;
        self.emit(event);
        Ok(())
    }

    /// Rejects a pending certificate. Inspector or Admin. Terminal.
    ///
    /// # Errors
    ///
    /// Propagates the component's `Unauthorized`, `NotFound`, and
    /// `InvalidTransition` failures; a second resolution always fails.
    pub fn reject_certificate(
        &mut self,
        caller: &Address,
        id: CertificateId,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let event = self.certificates.resolve(
            &self.access,
            caller,
            id,
            CertificateOutcome::Rejected,
            now,
        )?;
        self.emit(event);
        Ok(())
    }

    /// Lazy, restartable iterator over pending certificate ids in
    /// insertion order.
    pub fn pending_certificates(&self) -> impl Iterator<Item = CertificateId> + '_ {
        self.certificates.pending_ids()
    }

    /// Returns a certificate by id.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::CertificateNotFound`] for an unknown id.
    pub fn get_certificate(&self, id: CertificateId) -> Result<&Certificate> {
        self.certificates.get(id)
    }

    /// Number of certificates ever raised.
    pub fn total_certificates(&self) -> u64 {
        self.certificates.total()
    }

    // ------------------------------------------------------------------
    // Scoring
    // ------------------------------------------------------------------

    /// Recomputes a product's authenticity score from its full history.
    ///
    /// Pure read: identical state and `now` always yield the same score.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::ProductNotFound`] for an unknown id.
    pub fn authenticity_score(&self, id: ProductId, now: DateTime<Utc>) -> Result<u8> {
        let (product, batches) = self.get_product_history(id)?;
        Ok(authenticity_score(product, &batches, &self.config.scoring, now))
    }

    // ------------------------------------------------------------------
    // Versioning
    // ------------------------------------------------------------------

    /// Current ledger version. Starts at 1, bumped only by [`Self::upgrade`].
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Bumps the ledger version. Admin only. All records are preserved.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Unauthorized`] for non-admin callers.
    pub fn upgrade(&mut self, caller: &Address, now: DateTime<Utc>) -> Result<u64> {
        self.access.require(caller, &[Role::Admin])?;
        let from_version = self.version;
        self.version += 1;
        self.emit(LedgerEvent::LedgerUpgraded {
            principal: caller.clone(),
            at: now,
            from_version,
            to_version: self.version,
        });
        Ok(self.version)
    }

    /// Serializes the full ledger into a self-describing snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::SnapshotCodec`] if encoding fails.
    pub fn snapshot(&self) -> Result<Vec<u8>> {
        write_snapshot(self)
    }

    /// Restores a ledger from a snapshot, migrating older formats.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::SnapshotCodec`] for undecodable bytes and
    /// [`LedgerError::SnapshotFromFuture`] for snapshots this build cannot
    /// represent.
    pub fn restore(bytes: &[u8]) -> Result<Self> {
        migrate_snapshot(bytes)
    }

    // ------------------------------------------------------------------
    // Audit trail
    // ------------------------------------------------------------------

    /// The append-only audit trail, in commit order.
    pub fn events(&self) -> &[LedgerEvent] {
        &self.events
    }

    fn emit(&mut self, event: LedgerEvent) {
        debug!(event_type = event.event_type(), principal = %event.principal(), "ledger event");
        self.events.push(event);
    }
}

/// Cloneable, mutex-guarded handle to a shared [`Ledger`].
///
/// All mutations funnel through [`SharedLedger::write`], which holds the
/// lock for the whole operation — the message-passing-free realization of
/// the single execution point the design calls for.
#[derive(Debug, Clone)]
pub struct SharedLedger {
    inner: Arc<Mutex<Ledger>>,
}

impl SharedLedger {
    /// Wraps a ledger in a shared handle.
    pub fn new(ledger: Ledger) -> Self {
        Self { inner: Arc::new(Mutex::new(ledger)) }
    }

    /// Runs a read-only closure against the ledger.
    pub fn read<R>(&self, f: impl FnOnce(&Ledger) -> R) -> R {
        let guard = self.inner.lock();
        f(&guard)
    }

    /// Runs a mutating closure against the ledger under a tracing span.
    ///
    /// The closure observes and produces only fully committed state;
    /// failures inside an operation leave the ledger untouched.
    pub fn write<R>(&self, op: &'static str, f: impl FnOnce(&mut Ledger) -> R) -> R {
        let span = info_span!("ledger_op", op);
        let _enter = span.enter();
        let mut guard = self.inner.lock();
        f(&mut guard)
    }
}
