//! Content-addressed document hashes.
//!
//! The ledger stores proofs of existence for off-ledger documents (photos,
//! processing paperwork, certificates) as SHA-256 digests, never the
//! documents themselves. [`ContentHash`] is the validated lowercase-hex
//! representation of such a digest.

use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use snafu::Snafu;

/// Length of a SHA-256 digest rendered as lowercase hex.
pub const HASH_HEX_LEN: usize = 64;

/// Error parsing a content hash from caller input.
#[derive(Debug, Clone, PartialEq, Eq, Snafu)]
pub enum ParseHashError {
    /// The string is not exactly 64 characters.
    #[snafu(display("content hash must be {HASH_HEX_LEN} hex characters, got {len}"))]
    BadLength {
        /// Length of the rejected input.
        len: usize,
    },

    /// The string contains a non-hex or uppercase character.
    #[snafu(display("content hash contains invalid character {found:?} at offset {offset}"))]
    BadCharacter {
        /// The offending character.
        found: char,
        /// Byte offset of the offending character.
        offset: usize,
    },
}

/// A lowercase-hex SHA-256 digest of an off-ledger document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentHash(String);

impl ContentHash {
    /// Computes the content hash of a document's bytes.
    pub fn digest(bytes: &[u8]) -> Self {
        let digest = Sha256::digest(bytes);
        Self(hex::encode(digest))
    }

    /// Parses a caller-supplied hex digest.
    ///
    /// # Errors
    ///
    /// Returns [`ParseHashError`] if the input is not exactly 64 lowercase
    /// hex characters.
    pub fn parse(s: &str) -> Result<Self, ParseHashError> {
        if s.len() != HASH_HEX_LEN {
            return Err(ParseHashError::BadLength { len: s.len() });
        }
        if let Some(offset) = s.find(|c: char| !c.is_ascii_hexdigit() || c.is_ascii_uppercase()) {
            let found = s[offset..].chars().next().unwrap_or('\0');
            return Err(ParseHashError::BadCharacter { found, offset });
        }
        Ok(Self(s.to_string()))
    }

    /// Returns the hex digest as a string slice.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
