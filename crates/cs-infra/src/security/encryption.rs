use chacha20poly1305::aead::Aead;
use chacha20poly1305::{KeyInit, XChaCha20Poly1305, XNonce};
use rand::{rngs::OsRng, TryRngCore};

use cs_core::ports::EncryptionPort;
use cs_core::security::{EncryptionError, SharedKey, KEY_LEN};

pub const NONCE_LEN: usize = 24;

/// XChaCha20-Poly1305 with a random 24-byte nonce per message.
///
/// Output layout is `nonce || ciphertext || tag`.
#[derive(Debug, Clone, Copy, Default)]
pub struct XChaChaEncryption;

impl EncryptionPort for XChaChaEncryption {
    fn generate_key(&self) -> Result<SharedKey, EncryptionError> {
        let mut bytes = [0u8; KEY_LEN];
        OsRng
            .try_fill_bytes(&mut bytes)
            .map_err(|_| EncryptionError)?;
        SharedKey::from_bytes(&bytes)
    }

    fn encrypt(&self, plaintext: &[u8], key: &SharedKey) -> Result<Vec<u8>, EncryptionError> {
        let mut nonce = [0u8; NONCE_LEN];
        OsRng
            .try_fill_bytes(&mut nonce)
            .map_err(|_| EncryptionError)?;

        let cipher =
            XChaCha20Poly1305::new_from_slice(key.as_bytes()).map_err(|_| EncryptionError)?;
        let ciphertext = cipher
            .encrypt(XNonce::from_slice(&nonce), plaintext)
            .map_err(|_| EncryptionError)?;

        let mut out = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        out.extend_from_slice(&nonce);
        out.extend_from_slice(&ciphertext);
        Ok(out)
    }

    fn decrypt(&self, ciphertext: &[u8], key: &SharedKey) -> Result<Vec<u8>, EncryptionError> {
        if ciphertext.len() < NONCE_LEN {
            return Err(EncryptionError);
        }
        let (nonce, body) = ciphertext.split_at(NONCE_LEN);

        let cipher =
            XChaCha20Poly1305::new_from_slice(key.as_bytes()).map_err(|_| EncryptionError)?;
        cipher
            .decrypt(XNonce::from_slice(nonce), body)
            .map_err(|_| EncryptionError)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(byte: u8) -> SharedKey {
        SharedKey::from_bytes(&[byte; KEY_LEN]).expect("key")
    }

    #[test]
    fn encrypt_then_decrypt_round_trip() {
        let service = XChaChaEncryption;
        let k = key(3);
        for plaintext in [&b""[..], b"hello", &[0u8, 255, 1, 254][..], &[7u8; 4096][..]] {
            let encrypted = service.encrypt(plaintext, &k).expect("encrypt");
            assert_eq!(encrypted.len(), NONCE_LEN + plaintext.len() + 16);
            let decrypted = service.decrypt(&encrypted, &k).expect("decrypt");
            assert_eq!(decrypted, plaintext);
        }
    }

    #[test]
    fn nonce_is_fresh_per_call() {
        let service = XChaChaEncryption;
        let k = key(3);
        let a = service.encrypt(b"same", &k).expect("encrypt");
        let b = service.encrypt(b"same", &k).expect("encrypt");
        assert_ne!(a[..NONCE_LEN], b[..NONCE_LEN]);
        assert_ne!(a, b);
    }

    #[test]
    fn decrypt_with_wrong_key_fails() {
        let service = XChaChaEncryption;
        let encrypted = service.encrypt(b"secret", &key(3)).expect("encrypt");
        assert_eq!(service.decrypt(&encrypted, &key(4)), Err(EncryptionError));
    }

    #[test]
    fn tampered_or_truncated_ciphertext_fails() {
        let service = XChaChaEncryption;
        let k = key(5);
        let mut encrypted = service.encrypt(b"secret", &k).expect("encrypt");
        let last = encrypted.len() - 1;
        encrypted[last] ^= 0x01;
        assert_eq!(service.decrypt(&encrypted, &k), Err(EncryptionError));
        assert_eq!(service.decrypt(&[1, 2, 3], &k), Err(EncryptionError));
    }

    #[test]
    fn generated_keys_differ_and_round_trip_through_base64() {
        let service = XChaChaEncryption;
        let a = service.generate_key().expect("key");
        let b = service.generate_key().expect("key");
        assert_ne!(a, b);
        assert_eq!(SharedKey::from_base64(&a.to_base64()).expect("parse"), a);
    }
}
