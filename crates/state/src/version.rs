//! Versioned snapshots and state-preserving migration.
//!
//! A snapshot is the postcard encoding of the whole [`Ledger`](crate::Ledger)
//! wrapped in an envelope carrying the snapshot format version. Restoring
//! runs an explicit migration from the envelope's format to the current
//! one — never a destructive reinitialize. A snapshot from a newer format
//! than this build supports is a fatal configuration error.

use serde::{Deserialize, Serialize};

use agrotrace_types::{LedgerError, Result, decode, encode};

use crate::ledger::Ledger;

/// Current snapshot format version.
///
/// v1: full ledger state (roles, products, batches, certificates, audit
/// log, upgrade counter).
pub const SNAPSHOT_FORMAT_VERSION: u32 = 1;

/// Snapshot envelope: format version plus the encoded ledger.
#[derive(Debug, Serialize, Deserialize)]
struct SnapshotEnvelope {
    format_version: u32,
    ledger: Ledger,
}

/// Encodes a ledger into a self-describing snapshot.
///
/// # Errors
///
/// Returns [`LedgerError::SnapshotCodec`] if encoding fails.
pub fn write_snapshot(ledger: &Ledger) -> Result<Vec<u8>> {
    let envelope =
        SnapshotEnvelope { format_version: SNAPSHOT_FORMAT_VERSION, ledger: ledger.clone() };
    encode(&envelope).map_err(|source| LedgerError::SnapshotCodec { source })
}

/// Decodes a snapshot and migrates it to the current format.
///
/// Every pre-snapshot id, record, and role grant is preserved exactly;
/// migration only ever reshapes representation between formats.
///
/// # Errors
///
/// Returns [`LedgerError::SnapshotCodec`] for undecodable bytes and
/// [`LedgerError::SnapshotFromFuture`] when the snapshot was produced by
/// a newer format than this build supports.
pub fn migrate_snapshot(bytes: &[u8]) -> Result<Ledger> {
    let envelope: SnapshotEnvelope =
        decode(bytes).map_err(|source| LedgerError::SnapshotCodec { source })?;
    match envelope.format_version {
        SNAPSHOT_FORMAT_VERSION => Ok(envelope.ledger),
        newer if newer > SNAPSHOT_FORMAT_VERSION => Err(LedgerError::SnapshotFromFuture {
            found: newer,
            supported: SNAPSHOT_FORMAT_VERSION,
        }),
        // No older formats exist yet; when v2 lands, the v1 arm migrates here.
        older => Err(LedgerError::SnapshotCodec {
            source: agrotrace_types::CodecError::Decode {
                source: postcard_unknown_format(older),
            },
        }),
    }
}

/// Postcard has no "unknown format" error; a zero-format snapshot can only
/// come from corrupt bytes, so report it as such.
fn postcard_unknown_format(_version: u32) -> postcard::Error {
    postcard::Error::DeserializeBadEncoding
}
