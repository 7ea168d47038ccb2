//! Core types, errors, and validation for the AgroTrace produce ledger.
//!
//! This crate provides the foundational types used throughout the ledger:
//! - Type aliases and newtypes for identifiers (ProductId, BatchId, CertificateId)
//! - Domain records for products, batches, and certificates
//! - Content-addressed document hashes (SHA-256)
//! - Ledger events for the append-only audit trail
//! - Error types using snafu

pub mod codec;
pub mod config;
pub mod error;
pub mod events;
pub mod hash;
pub mod types;
pub mod validation;

// Re-export commonly used types at crate root
pub use codec::{CodecError, decode, encode};
pub use error::{ErrorCode, ErrorKind, LedgerError, Result, RetryHint};
pub use events::LedgerEvent;
pub use hash::ContentHash;
pub use types::*;
