use chacha20poly1305::{
    aead::{Aead, KeyInit},
    ChaCha20Poly1305, Nonce,
};
use rand::RngCore;
use std::fmt;

use crate::PrivacyError;

/// Size of the evidence encryption key (256 bits).
pub const EVIDENCE_KEY_SIZE: usize = 32;

/// Size of the per-encryption nonce (96 bits).
pub const NONCE_SIZE: usize = 12;

/// Process-wide symmetric key for evidence originals.
///
/// Comes from configuration at startup, never from request data. One key per
/// deployment; rotating it requires re-encrypting stored originals.
#[derive(Clone, PartialEq, Eq)]
pub struct EvidenceKey([u8; EVIDENCE_KEY_SIZE]);

impl EvidenceKey {
    pub fn from_bytes(bytes: [u8; EVIDENCE_KEY_SIZE]) -> Self {
        Self(bytes)
    }

    /// Parse a 64-char hex string into a key.
    pub fn from_hex(hex_str: &str) -> Result<Self, PrivacyError> {
        let bytes = hex::decode(hex_str.trim())
            .map_err(|e| PrivacyError::InvalidKey(e.to_string()))?;
        let bytes: [u8; EVIDENCE_KEY_SIZE] = bytes.try_into().map_err(|v: Vec<u8>| {
            PrivacyError::InvalidKey(format!(
                "key must be {EVIDENCE_KEY_SIZE} bytes, got {}",
                v.len()
            ))
        })?;
        Ok(Self(bytes))
    }

    /// Generate a fresh random key. Useful for tests and ephemeral setups;
    /// production deployments configure a stable key.
    pub fn generate() -> Self {
        let mut bytes = [0u8; EVIDENCE_KEY_SIZE];
        rand::rng().fill_bytes(&mut bytes);
        Self(bytes)
    }

    fn as_slice(&self) -> &[u8] {
        &self.0
    }
}

// Never print key material.
impl fmt::Debug for EvidenceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("EvidenceKey(..)")
    }
}

/// Encrypt evidence bytes. Output layout is `nonce ‖ ciphertext`, with the
/// Poly1305 tag inside the ciphertext.
pub fn encrypt_evidence(key: &EvidenceKey, plaintext: &[u8]) -> Result<Vec<u8>, PrivacyError> {
    let cipher = ChaCha20Poly1305::new_from_slice(key.as_slice())
        .map_err(|e| PrivacyError::Encrypt(e.to_string()))?;

    let mut nonce_bytes = [0u8; NONCE_SIZE];
    rand::rng().fill_bytes(&mut nonce_bytes);
    let nonce = Nonce::from_slice(&nonce_bytes);

    let ciphertext = cipher
        .encrypt(nonce, plaintext)
        .map_err(|e| PrivacyError::Encrypt(e.to_string()))?;

    let mut blob = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
    blob.extend_from_slice(&nonce_bytes);
    blob.extend_from_slice(&ciphertext);
    Ok(blob)
}

/// Decrypt a `nonce ‖ ciphertext` blob. Fails on a wrong key, tampering or a
/// truncated input.
pub fn decrypt_evidence(key: &EvidenceKey, blob: &[u8]) -> Result<Vec<u8>, PrivacyError> {
    if blob.len() < NONCE_SIZE {
        return Err(PrivacyError::Decrypt("blob too short for nonce".into()));
    }
    let (nonce_bytes, ciphertext) = blob.split_at(NONCE_SIZE);

    let cipher = ChaCha20Poly1305::new_from_slice(key.as_slice())
        .map_err(|e| PrivacyError::Decrypt(e.to_string()))?;
    cipher
        .decrypt(Nonce::from_slice(nonce_bytes), ciphertext)
        .map_err(|e| PrivacyError::Decrypt(e.to_string()))
}
