//! Ledger state machine for the AgroTrace produce ledger.
//!
//! This crate owns the authoritative state: role grants, product records
//! and their lifecycle, processing batches with append-only histories,
//! the certificate workflow, and the versioned snapshot format.
//!
//! All mutations go through [`Ledger`], one serialized operation at a
//! time; [`SharedLedger`] is the mutex-guarded entry point for callers
//! that share the aggregate.

pub mod access;
pub mod batch;
pub mod certificate;
pub mod ledger;
pub mod product;
pub mod score;
pub mod version;

pub use access::AccessControl;
pub use batch::{BatchDraft, BatchLedger};
pub use certificate::CertificateRegistry;
pub use ledger::{Ledger, SharedLedger};
pub use product::ProductLedger;
pub use score::authenticity_score;
pub use version::{SNAPSHOT_FORMAT_VERSION, migrate_snapshot};
