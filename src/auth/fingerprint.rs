/// Refresh token fingerprints
///
/// The store never holds a refresh token itself, only the SHA-256 digest of
/// its exact encoded string. Two fingerprints are equal exactly when the
/// encoded tokens are equal.

use sha2::{Digest, Sha256};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Fingerprint of an encoded refresh token
    pub fn of(token: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(token.as_bytes());
        Self(format!("{:x}", hasher.finalize()))
    }

    /// Rebuild from a digest previously read out of storage
    pub fn from_digest(digest: String) -> Self {
        Self(digest)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}
