//! Pre-shared key model for payload encryption.
//!
//! The key is a user-configured secret shared by every device of one user.
//! It travels through settings as base64 text and is only turned into raw
//! bytes right before use.

use base64::{engine::general_purpose::STANDARD, Engine};
use std::fmt;
use thiserror::Error;
use zeroize::Zeroize;

pub const KEY_LEN: usize = 32;

/// Every crypto failure (bad key, corrupt ciphertext, tag mismatch) collapses
/// into this one condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("encryption operation failed")]
pub struct EncryptionError;

#[derive(Clone, PartialEq, Eq)]
pub struct SharedKey([u8; KEY_LEN]);

impl fmt::Debug for SharedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SharedKey([REDACTED])")
    }
}

impl Drop for SharedKey {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

impl SharedKey {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, EncryptionError> {
        let raw: [u8; KEY_LEN] = bytes.try_into().map_err(|_| EncryptionError)?;
        Ok(Self(raw))
    }

    /// Parse the base64 text form stored in settings.
    pub fn from_base64(text: &str) -> Result<Self, EncryptionError> {
        let mut decoded = STANDARD
            .decode(text.trim().as_bytes())
            .map_err(|_| EncryptionError)?;
        let key = Self::from_bytes(&decoded);
        decoded.zeroize();
        key
    }

    pub fn to_base64(&self) -> String {
        STANDARD.encode(self.0)
    }

    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base64_round_trip() {
        let key = SharedKey::from_bytes(&[7u8; KEY_LEN]).expect("key");
        let text = key.to_base64();
        assert_eq!(SharedKey::from_base64(&text).expect("parse"), key);
    }

    #[test]
    fn wrong_length_is_rejected() {
        assert_eq!(SharedKey::from_bytes(&[1u8; 16]), Err(EncryptionError));
        assert_eq!(SharedKey::from_base64("c2hvcnQ="), Err(EncryptionError));
        assert_eq!(SharedKey::from_base64("%%%"), Err(EncryptionError));
    }

    #[test]
    fn debug_redacts_key() {
        let key = SharedKey::from_bytes(&[9u8; KEY_LEN]).expect("key");
        assert_eq!(format!("{:?}", key), "SharedKey([REDACTED])");
    }
}
