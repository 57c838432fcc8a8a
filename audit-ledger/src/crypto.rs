//! Cryptographic operations for the ledger
//!
//! This module provides:
//! - SHA-256 digests over canonical encodings (block links, contract hashes)
//! - The [`DataCipher`] capability for ancillary data encryption
//! - An AES-256-GCM implementation keyed by a collaborator-supplied key

use crate::{canonical, Error, Result};
use aes_gcm::{
    aead::{Aead, AeadCore, KeyInit, OsRng},
    Aes256Gcm, Key, Nonce,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fmt;

/// AES-GCM nonce length (96 bits)
const NONCE_LEN: usize = 12;

/// Hash arbitrary bytes using SHA-256
pub fn hash_bytes(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// SHA-256 of arbitrary bytes as 64 lowercase hex characters
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(hash_bytes(data))
}

/// Digest of any serializable value over its canonical JSON encoding
///
/// Map keys are sorted, so the same logical value always yields the same
/// digest regardless of insertion order.
pub fn digest<T>(value: &T) -> Result<String>
where
    T: Serialize + ?Sized,
{
    let bytes = canonical::to_canonical_vec(value)?;
    Ok(sha256_hex(&bytes))
}

/// Symmetric cipher for ancillary data
///
/// Key material is owned by whoever constructs the implementation; the
/// ledger never generates or persists keys.
pub trait DataCipher: Send + Sync {
    /// Encrypt UTF-8 text into an opaque text token
    fn encrypt(&self, plaintext: &str) -> Result<String>;

    /// Decrypt a token produced by [`DataCipher::encrypt`]
    fn decrypt(&self, token: &str) -> Result<String>;
}

/// AES-256-GCM cipher
///
/// Tokens are `base64(nonce || ciphertext)` with a fresh random nonce per
/// call.
pub struct AesGcmCipher {
    cipher: Aes256Gcm,
}

impl AesGcmCipher {
    /// Create from a 32-byte key supplied by the key-management collaborator
    pub fn new(key: &[u8; 32]) -> Self {
        let key = Key::<Aes256Gcm>::from_slice(key);
        Self {
            cipher: Aes256Gcm::new(key),
        }
    }
}

impl fmt::Debug for AesGcmCipher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AesGcmCipher").finish_non_exhaustive()
    }
}

impl DataCipher for AesGcmCipher {
    fn encrypt(&self, plaintext: &str) -> Result<String> {
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);

        let ciphertext = self
            .cipher
            .encrypt(&nonce, plaintext.as_bytes())
            .map_err(|e| Error::Cipher(format!("Encryption failed: {}", e)))?;

        let mut data = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        data.extend_from_slice(&nonce);
        data.extend_from_slice(&ciphertext);

        Ok(BASE64.encode(data))
    }

    fn decrypt(&self, token: &str) -> Result<String> {
        let data = BASE64
            .decode(token)
            .map_err(|e| Error::Cipher(format!("Invalid base64: {}", e)))?;

        if data.len() < NONCE_LEN {
            return Err(Error::Cipher("Token too short".to_string()));
        }

        let nonce = Nonce::from_slice(&data[..NONCE_LEN]);
        let plaintext = self
            .cipher
            .decrypt(nonce, &data[NONCE_LEN..])
            .map_err(|e| Error::Cipher(format!("Decryption failed: {}", e)))?;

        String::from_utf8(plaintext).map_err(|e| Error::Cipher(format!("Invalid UTF-8: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_hash_bytes() {
        let data = b"test data";
        let hash1 = hash_bytes(data);
        let hash2 = hash_bytes(data);

        // Same data should produce same hash
        assert_eq!(hash1, hash2);

        // Different data should produce different hash
        assert_ne!(hash1, hash_bytes(b"different data"));
    }

    #[test]
    fn test_sha256_known_vector() {
        assert_eq!(
            sha256_hex(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_digest_is_order_independent() {
        let first = json!({"salary": 5000, "position": "Engineer"});
        let second = json!({"position": "Engineer", "salary": 5000});

        let digest1 = digest(&first).unwrap();
        assert_eq!(digest1, digest(&second).unwrap());
        assert_eq!(digest1.len(), 64);
    }

    #[test]
    fn test_digest_hashes_canonical_text() {
        let value = json!({"salary": 5000, "position": "Engineer"});
        let expected = sha256_hex(br#"{"position": "Engineer", "salary": 5000}"#);
        assert_eq!(digest(&value).unwrap(), expected);
    }

    #[test]
    fn test_cipher_roundtrip() {
        let cipher = AesGcmCipher::new(&[7u8; 32]);
        let token = cipher.encrypt("salary: 5000").unwrap();

        assert_ne!(token, "salary: 5000");
        assert_eq!(cipher.decrypt(&token).unwrap(), "salary: 5000");
    }

    #[test]
    fn test_cipher_uses_fresh_nonce() {
        let cipher = AesGcmCipher::new(&[7u8; 32]);
        let token1 = cipher.encrypt("same").unwrap();
        let token2 = cipher.encrypt("same").unwrap();
        assert_ne!(token1, token2);
    }

    #[test]
    fn test_cipher_wrong_key_fails() {
        let token = AesGcmCipher::new(&[1u8; 32]).encrypt("secret").unwrap();
        let result = AesGcmCipher::new(&[2u8; 32]).decrypt(&token);
        assert!(matches!(result, Err(Error::Cipher(_))));
    }

    #[test]
    fn test_cipher_rejects_garbage() {
        let cipher = AesGcmCipher::new(&[1u8; 32]);
        assert!(cipher.decrypt("not base64 !!").is_err());
        assert!(cipher.decrypt("AAAA").is_err());
    }
}
