//! Error types for the AgroTrace ledger using snafu.
//!
//! Every failed operation surfaces one [`LedgerError`] synchronously and
//! commits nothing; there are no partial writes to report. Each variant maps
//! to an [`ErrorCode`] with a unique numeric identifier, a coarse
//! [`ErrorKind`], and a [`RetryHint`] so callers can make safe retry
//! decisions without string matching.

use snafu::Snafu;

use crate::{
    codec::CodecError,
    types::{Address, BatchId, CertificateId, CertificateOutcome, ProductId, ProductStatus, Role},
    validation::ValidationError,
};

/// Unified result type for ledger operations.
pub type Result<T, E = LedgerError> = std::result::Result<T, E>;

/// Machine-readable error codes for programmatic error handling.
///
/// Each [`LedgerError`] variant maps to a unique numeric code. Codes are
/// organized into ranges:
///
/// | Range       | Domain       | Examples                                  |
/// |-------------|--------------|-------------------------------------------|
/// | 1000–1099   | Access       | Missing role, last-admin revocation       |
/// | 2000–2099   | Lookup       | Unknown product, batch, certificate       |
/// | 3000–3099   | Input        | Validation, inverted dates, stale expiry  |
/// | 4000–4099   | Transition   | Out-of-order status, resolved certificate |
/// | 5000–5099   | Internal     | Snapshot codec, future-format snapshot    |
///
/// Codes are stable: they may be persisted in audit logs and compared across
/// releases. Use [`ErrorCode::as_u16`] for serialization and
/// [`ErrorCode::from_u16`] for deserialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum ErrorCode {
    // --- Access errors (1000–1099) ---
    /// Caller lacks every role the operation accepts.
    AccessMissingRole = 1000,
    /// Revocation would leave the ledger with zero admins.
    AccessLastAdmin = 1001,

    // --- Lookup errors (2000–2099) ---
    /// Referenced product id does not exist.
    LookupProduct = 2000,
    /// Referenced batch id does not exist.
    LookupBatch = 2001,
    /// Referenced certificate id does not exist.
    LookupCertificate = 2002,

    // --- Input errors (3000–3099) ---
    /// Field-level validation failed.
    InputValidation = 3000,
    /// A date argument is inconsistent with an earlier recorded date.
    InputDateOrder = 3001,
    /// Certificate expiry is not in the future.
    InputStaleExpiry = 3002,
    /// Harvest details supplied for, or missing from, the wrong transition.
    InputHarvestRecord = 3003,

    // --- Transition errors (4000–4099) ---
    /// Product status change is not the next forward step.
    TransitionProduct = 4000,
    /// Batch is sealed and accepts no further appends.
    TransitionBatchSealed = 4001,
    /// Certificate is already resolved; resolution is terminal.
    TransitionCertificateResolved = 4002,
    /// Recall attempted on a terminal or already recalled product.
    TransitionRecall = 4003,

    // --- Internal errors (5000–5099) ---
    /// Snapshot encode or decode failed.
    InternalCodec = 5000,
    /// Snapshot was produced by a newer format than this build supports.
    InternalSnapshotFormat = 5001,
}

impl ErrorCode {
    /// Returns the numeric wire value.
    #[inline]
    pub const fn as_u16(self) -> u16 {
        self as u16
    }

    /// Reconstructs a code from its numeric value.
    pub fn from_u16(value: u16) -> Option<Self> {
        let code = match value {
            1000 => Self::AccessMissingRole,
            1001 => Self::AccessLastAdmin,
            2000 => Self::LookupProduct,
            2001 => Self::LookupBatch,
            2002 => Self::LookupCertificate,
            3000 => Self::InputValidation,
            3001 => Self::InputDateOrder,
            3002 => Self::InputStaleExpiry,
            3003 => Self::InputHarvestRecord,
            4000 => Self::TransitionProduct,
            4001 => Self::TransitionBatchSealed,
            4002 => Self::TransitionCertificateResolved,
            4003 => Self::TransitionRecall,
            5000 => Self::InternalCodec,
            5001 => Self::InternalSnapshotFormat,
            _ => return None,
        };
        Some(code)
    }
}

/// Coarse error taxonomy, one bucket per failure family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Caller lacks a required role.
    Unauthorized,
    /// Referenced id does not exist.
    NotFound,
    /// Malformed or out-of-range argument.
    InvalidInput,
    /// State-machine precondition not met.
    InvalidTransition,
    /// Operation would break a global invariant.
    InvariantViolation,
}

impl ErrorKind {
    /// Returns the kind as a static string label for logs and metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unauthorized => "unauthorized",
            Self::NotFound => "not_found",
            Self::InvalidInput => "invalid_input",
            Self::InvalidTransition => "invalid_transition",
            Self::InvariantViolation => "invariant_violation",
        }
    }
}

/// Guidance for callers deciding whether a retry can ever succeed.
///
/// The ledger never retries internally; this classification exists so
/// external collaborators can distinguish permanent rejections from
/// failures that a corrected request could clear.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RetryHint {
    /// Retrying can never succeed (terminal outcome, broken invariant).
    Never,
    /// Retry after correcting the request arguments.
    AfterCorrection,
    /// Retry after the caller acquires the required role.
    AfterRoleGrant,
    /// Retry after the referenced record reaches the required state.
    AfterStateChange,
}

/// Unified error type for every ledger operation.
///
/// All variants are terminal for the attempted call: no partial state is
/// committed.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum LedgerError {
    /// Caller holds none of the roles the operation accepts.
    #[snafu(display("{address} holds none of the required roles {required:?}"))]
    Unauthorized {
        /// The rejected caller.
        address: Address,
        /// Roles that would have been accepted.
        required: Vec<Role>,
    },

    /// Revoking this grant would leave the ledger with zero admins.
    #[snafu(display("cannot revoke admin from {address}: at least one admin must remain"))]
    LastAdmin {
        /// The sole remaining admin.
        address: Address,
    },

    /// Referenced product does not exist.
    #[snafu(display("product {id} not found"))]
    ProductNotFound {
        /// The unknown id.
        id: ProductId,
    },

    /// Referenced batch does not exist.
    #[snafu(display("batch {id} not found"))]
    BatchNotFound {
        /// The unknown id.
        id: BatchId,
    },

    /// Referenced certificate does not exist.
    #[snafu(display("certificate {id} not found"))]
    CertificateNotFound {
        /// The unknown id.
        id: CertificateId,
    },

    /// Field-level validation failed.
    #[snafu(display("invalid input: {source}"))]
    Validation {
        /// The underlying validation error.
        source: ValidationError,
    },

    /// A date argument contradicts an earlier recorded date.
    #[snafu(display("invalid {field}: {reason}"))]
    DateOrder {
        /// The offending field.
        field: &'static str,
        /// What the date must satisfy.
        reason: String,
    },

    /// Certificate expiry is not in the future.
    #[snafu(display("certificate valid_until must be in the future"))]
    StaleExpiry,

    /// Harvest details were supplied for, or missing from, the wrong transition.
    #[snafu(display("harvest record {reason}"))]
    HarvestRecord {
        /// What went wrong with the harvest argument.
        reason: &'static str,
    },

    /// Product status change is not the next forward step, or targets a
    /// stage no role may drive.
    #[snafu(display("product {id} cannot move from {from} to {to}"))]
    ProductTransition {
        /// The product whose transition was rejected.
        id: ProductId,
        /// Current status.
        from: ProductStatus,
        /// Requested status.
        to: ProductStatus,
    },

    /// The product's current status does not permit batch creation.
    #[snafu(display("product {id} is {status}; batches require harvested or processing"))]
    ProductNotProcessable {
        /// The product that rejected the batch.
        id: ProductId,
        /// Its current status.
        status: ProductStatus,
    },

    /// Batch is sealed; its history is frozen.
    #[snafu(display("batch {id} is sealed"))]
    BatchSealed {
        /// The sealed batch.
        id: BatchId,
    },

    /// Certificate resolution is terminal; a second attempt always fails.
    #[snafu(display("certificate {id} is already {outcome}"))]
    CertificateResolved {
        /// The resolved certificate.
        id: CertificateId,
        /// Its terminal outcome.
        outcome: CertificateOutcome,
    },

    /// Recall attempted on a terminal or already recalled product.
    #[snafu(display("product {id} cannot be recalled: {reason}"))]
    RecallRejected {
        /// The product that rejected the recall.
        id: ProductId,
        /// Why the recall was rejected.
        reason: &'static str,
    },

    /// Snapshot encode or decode failed.
    #[snafu(display("snapshot codec error: {source}"))]
    SnapshotCodec {
        /// The underlying codec error.
        source: CodecError,
    },

    /// Snapshot was produced by a newer format than this build supports.
    ///
    /// This is a fatal configuration error: restoring it would drop or
    /// corrupt records this build cannot represent.
    #[snafu(display("snapshot format {found} is newer than supported format {supported}"))]
    SnapshotFromFuture {
        /// Format version found in the snapshot.
        found: u32,
        /// Newest format this build understands.
        supported: u32,
    },
}

impl LedgerError {
    /// Returns the stable numeric code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Unauthorized { .. } => ErrorCode::AccessMissingRole,
            Self::LastAdmin { .. } => ErrorCode::AccessLastAdmin,
            Self::ProductNotFound { .. } => ErrorCode::LookupProduct,
            Self::BatchNotFound { .. } => ErrorCode::LookupBatch,
            Self::CertificateNotFound { .. } => ErrorCode::LookupCertificate,
            Self::Validation { .. } => ErrorCode::InputValidation,
            Self::DateOrder { .. } => ErrorCode::InputDateOrder,
            Self::StaleExpiry => ErrorCode::InputStaleExpiry,
            Self::HarvestRecord { .. } => ErrorCode::InputHarvestRecord,
            Self::ProductTransition { .. } => ErrorCode::TransitionProduct,
            Self::ProductNotProcessable { .. } => ErrorCode::TransitionProduct,
            Self::BatchSealed { .. } => ErrorCode::TransitionBatchSealed,
            Self::CertificateResolved { .. } => ErrorCode::TransitionCertificateResolved,
            Self::RecallRejected { .. } => ErrorCode::TransitionRecall,
            Self::SnapshotCodec { .. } => ErrorCode::InternalCodec,
            Self::SnapshotFromFuture { .. } => ErrorCode::InternalSnapshotFormat,
        }
    }

    /// Returns the coarse taxonomy bucket for this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Unauthorized { .. } => ErrorKind::Unauthorized,
            Self::LastAdmin { .. } => ErrorKind::InvariantViolation,
            Self::ProductNotFound { .. }
            | Self::BatchNotFound { .. }
            | Self::CertificateNotFound { .. } => ErrorKind::NotFound,
            Self::Validation { .. }
            | Self::DateOrder { .. }
            | Self::StaleExpiry
            | Self::HarvestRecord { .. }
            | Self::SnapshotFromFuture { .. } => ErrorKind::InvalidInput,
            Self::ProductTransition { .. }
            | Self::ProductNotProcessable { .. }
            | Self::BatchSealed { .. }
            | Self::CertificateResolved { .. }
            | Self::RecallRejected { .. } => ErrorKind::InvalidTransition,
            Self::SnapshotCodec { .. } => ErrorKind::InvariantViolation,
        }
    }

    /// Classifies whether and when a retry of the failed call could succeed.
    pub fn retry_hint(&self) -> RetryHint {
        match self {
            Self::Unauthorized { .. } => RetryHint::AfterRoleGrant,
            Self::Validation { .. }
            | Self::DateOrder { .. }
            | Self::StaleExpiry
            | Self::HarvestRecord { .. }
            | Self::ProductNotFound { .. }
            | Self::BatchNotFound { .. }
            | Self::CertificateNotFound { .. } => RetryHint::AfterCorrection,
            // A product that is not yet harvested can become processable, and
            // an out-of-order transition can become the next step later.
            Self::ProductTransition { .. } | Self::ProductNotProcessable { .. } => {
                RetryHint::AfterStateChange
            },
            // Sealed batches, resolved certificates, and broken invariants
            // are permanent rejections.
            Self::BatchSealed { .. }
            | Self::CertificateResolved { .. }
            | Self::RecallRejected { .. }
            | Self::LastAdmin { .. }
            | Self::SnapshotCodec { .. }
            | Self::SnapshotFromFuture { .. } => RetryHint::Never,
        }
    }
}

impl From<ValidationError> for LedgerError {
    fn from(source: ValidationError) -> Self {
        Self::Validation { source }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn sample_errors() -> Vec<LedgerError> {
        vec![
            LedgerError::Unauthorized {
                address: Address::new("alice"),
                required: vec![Role::Farmer],
            },
            LedgerError::LastAdmin { address: Address::new("root") },
            LedgerError::ProductNotFound { id: ProductId::new(9) },
            LedgerError::BatchNotFound { id: BatchId::new(9) },
            LedgerError::CertificateNotFound { id: CertificateId::new(9) },
            LedgerError::Validation {
                source: ValidationError {
                    field: "name".to_string(),
                    constraint: "must not be empty".to_string(),
                },
            },
            LedgerError::DateOrder {
                field: "expected_harvest_at",
                reason: "must be after planted_at".to_string(),
            },
            LedgerError::StaleExpiry,
            LedgerError::HarvestRecord { reason: "required when entering harvested" },
            LedgerError::ProductTransition {
                id: ProductId::new(1),
                from: ProductStatus::Planted,
                to: ProductStatus::Sold,
            },
            LedgerError::ProductNotProcessable {
                id: ProductId::new(1),
                status: ProductStatus::Planted,
            },
            LedgerError::BatchSealed { id: BatchId::new(1) },
            LedgerError::CertificateResolved {
                id: CertificateId::new(1),
                outcome: CertificateOutcome::Rejected,
            },
            LedgerError::RecallRejected { id: ProductId::new(1), reason: "already recalled" },
            LedgerError::SnapshotFromFuture { found: 99, supported: 1 },
        ]
    }

    #[test]
    fn error_codes_roundtrip_through_u16() {
        for err in sample_errors() {
            let code = err.code();
            assert_eq!(ErrorCode::from_u16(code.as_u16()), Some(code), "{err}");
        }
        assert_eq!(ErrorCode::from_u16(9999), None);
    }

    #[test]
    fn code_ranges_match_kinds() {
        for err in sample_errors() {
            let code = err.code().as_u16();
            match err.kind() {
                ErrorKind::Unauthorized => assert_eq!(code, 1000),
                ErrorKind::NotFound => assert!((2000..2100).contains(&code)),
                ErrorKind::InvalidInput => {
                    assert!((3000..3100).contains(&code) || code == 5001, "{err}: {code}");
                },
                ErrorKind::InvalidTransition => assert!((4000..4100).contains(&code)),
                ErrorKind::InvariantViolation => {
                    assert!(code == 1001 || code == 5000, "{err}: {code}");
                },
            }
        }
    }

    #[test]
    fn terminal_rejections_are_never_retryable() {
        let resolved = LedgerError::CertificateResolved {
            id: CertificateId::new(1),
            outcome: CertificateOutcome::Approved,
        };
        assert_eq!(resolved.retry_hint(), RetryHint::Never);

        let last_admin = LedgerError::LastAdmin { address: Address::new("root") };
        assert_eq!(last_admin.retry_hint(), RetryHint::Never);
    }

    #[test]
    fn premature_batch_creation_is_retryable_after_state_change() {
        let err = LedgerError::ProductNotProcessable {
            id: ProductId::new(1),
            status: ProductStatus::Planted,
        };
        assert_eq!(err.retry_hint(), RetryHint::AfterStateChange);
        assert_eq!(err.kind(), ErrorKind::InvalidTransition);
    }
}
