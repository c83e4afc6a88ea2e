use crate::security::{EncryptionError, SharedKey};

/// Authenticated symmetric encryption keyed by the pre-shared key.
///
/// Every call to `encrypt` uses a fresh nonce. Any failure is the single
/// opaque [`EncryptionError`]; no partial plaintext is ever returned.
pub trait EncryptionPort: Send + Sync {
    fn generate_key(&self) -> Result<SharedKey, EncryptionError>;

    fn encrypt(&self, plaintext: &[u8], key: &SharedKey) -> Result<Vec<u8>, EncryptionError>;

    fn decrypt(&self, ciphertext: &[u8], key: &SharedKey) -> Result<Vec<u8>, EncryptionError>;
}
