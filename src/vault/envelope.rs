use chacha20poly1305::{
    aead::{Aead, KeyInit, OsRng},
    XChaCha20Poly1305, XNonce,
};
use rand_core::RngCore;
use zeroize::Zeroizing;

use super::keys::SymmetricKey;
use crate::error::{BiometricError, Result};

/// XChaCha20-Poly1305 nonce length (192-bit)
pub const NONCE_LEN: usize = 24;

/// Poly1305 tag length
pub const TAG_LEN: usize = 16;

/// Persisted unit: `nonce || ciphertext || tag`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedEnvelope {
    nonce: [u8; NONCE_LEN],
    /// Ciphertext with the authentication tag appended
    sealed: Vec<u8>,
}

impl EncryptedEnvelope {
    /// Encrypt `plaintext` under `key` with a freshly generated nonce
    pub fn seal(key: &SymmetricKey, plaintext: &[u8]) -> Result<Self> {
        let cipher = XChaCha20Poly1305::new(key.as_bytes().into());

        let mut nonce = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce);

        let sealed = cipher
            .encrypt(XNonce::from_slice(&nonce), plaintext)
            .map_err(|_| sealing_failed(plaintext.len()))?;

        Ok(Self { nonce, sealed })
    }

    /// Verify the tag and decrypt. Consumes the envelope.
    pub fn open(self, key: &SymmetricKey) -> Result<Zeroizing<Vec<u8>>> {
        let cipher = XChaCha20Poly1305::new(key.as_bytes().into());
        cipher
            .decrypt(XNonce::from_slice(&self.nonce), self.sealed.as_ref())
            .map(Zeroizing::new)
            .map_err(|_| {
                BiometricError::Integrity("tag mismatch (tampered data or wrong key)".to_string())
            })
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(NONCE_LEN + self.sealed.len());
        out.extend_from_slice(&self.nonce);
        out.extend_from_slice(&self.sealed);
        out
    }

    /// Split stored bytes into nonce and sealed payload.
    ///
    /// A file too short to hold a nonce and tag can only be the result of
    /// truncation, so it is reported as an integrity failure.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < NONCE_LEN + TAG_LEN {
            return Err(BiometricError::Integrity(format!(
                "envelope truncated: {} bytes, need at least {}",
                bytes.len(),
                NONCE_LEN + TAG_LEN
            )));
        }

        let (nonce_bytes, sealed) = bytes.split_at(NONCE_LEN);
        let mut nonce = [0u8; NONCE_LEN];
        nonce.copy_from_slice(nonce_bytes);

        Ok(Self {
            nonce,
            sealed: sealed.to_vec(),
        })
    }
}

/// AEAD sealing only fails on plaintexts beyond the cipher's length limit
fn sealing_failed(len: usize) -> BiometricError {
    BiometricError::Processing(format!("cannot encrypt {} byte template", len))
}
