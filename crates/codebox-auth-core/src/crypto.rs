//! Cryptographic primitives for token signing and secret comparison
//!
//! Signatures and the admin password are both compared through
//! [`constant_time_eq`], so the outcome is the same as exact equality but the
//! comparison time does not depend on where the inputs differ.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::sync::Arc;
use subtle::ConstantTimeEq;

/// Pre-validated HMAC-SHA256 key, cheap to clone across request handlers.
///
/// The key bytes are fixed at construction and never change afterwards.
#[derive(Clone)]
pub struct HmacKey {
    key_bytes: Arc<[u8]>,
}

impl HmacKey {
    /// Create a new HMAC key from bytes.
    ///
    /// The admin secret doubles as a human-entered password, so any
    /// non-empty value is accepted.
    ///
    /// # Errors
    /// Returns [`HmacKeyError::Empty`] for a zero-length key.
    pub fn new(key: impl AsRef<[u8]>) -> Result<Self, HmacKeyError> {
        let key_bytes = key.as_ref();
        if key_bytes.is_empty() {
            return Err(HmacKeyError::Empty);
        }
        Ok(Self {
            key_bytes: Arc::from(key_bytes),
        })
    }

    /// Sign data and return the MAC bytes
    pub fn sign(&self, data: &[u8]) -> [u8; 32] {
        let mut mac = Hmac::<Sha256>::new_from_slice(&self.key_bytes)
            .expect("HMAC accepts keys of any length");
        mac.update(data);
        mac.finalize().into_bytes().into()
    }

    /// Length of the key in bytes
    pub fn len(&self) -> usize {
        self.key_bytes.len()
    }

    /// Always false for a constructed key
    pub fn is_empty(&self) -> bool {
        self.key_bytes.is_empty()
    }
}

impl std::fmt::Debug for HmacKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HmacKey")
            .field("key_length", &self.key_bytes.len())
            .finish_non_exhaustive()
    }
}

/// Errors that can occur when creating an HMAC key
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HmacKeyError {
    #[error("HMAC key must not be empty")]
    Empty,
}

/// Constant-time byte slice comparison.
///
/// Returns `false` immediately if lengths differ; length is not secret.
#[inline]
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.ct_eq(b).into()
}

/// Constant-time string comparison.
#[inline]
pub fn constant_time_str_eq(a: &str, b: &str) -> bool {
    constant_time_eq(a.as_bytes(), b.as_bytes())
}
