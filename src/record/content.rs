//! Content Value Type

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// A piece of managed content: a storage key, a content digest and a filename.
///
/// The digest groups records that share identical bytes (duplicates and prior
/// versions) into one content group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Content {
    /// Key into the owning storage tier
    pub key: String,
    /// Content hash used for dedup grouping
    pub digest: String,
    /// Original filename, used for download references
    pub filename: String,
}

impl Content {
    /// Create a new content value.
    pub fn new(
        key: impl Into<String>,
        digest: impl Into<String>,
        filename: impl Into<String>,
    ) -> Self {
        Self {
            key: key.into(),
            digest: digest.into(),
            filename: filename.into(),
        }
    }

    /// Create a content value whose digest is computed from the given bytes.
    pub fn from_bytes(key: impl Into<String>, filename: impl Into<String>, data: &[u8]) -> Self {
        Self::new(key, Self::digest_of(data), filename)
    }

    /// Calculate the SHA-256 hex digest for data.
    pub fn digest_of(data: &[u8]) -> String {
        let mut hasher = Sha256::new();
        hasher.update(data);
        format!("{:x}", hasher.finalize())
    }
}
