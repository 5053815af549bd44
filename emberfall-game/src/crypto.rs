//! Save-file encryption and keyed digests.
use chacha20poly1305::{
    XChaCha20Poly1305, XNonce,
    aead::{Aead, AeadCore, KeyInit, OsRng},
};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::constants::{KEY_SIZE, NONCE_SIZE};

pub type SaveKey = [u8; KEY_SIZE];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CryptoError {
    #[error("stored key has {0} bytes, expected {KEY_SIZE}")]
    InvalidKeyLength(usize),
    #[error("encryption failed")]
    EncryptionFailed,
    #[error("decryption failed")]
    DecryptionFailed,
}

/// Fresh random key from the operating system RNG.
#[must_use]
pub fn generate_key() -> SaveKey {
    XChaCha20Poly1305::generate_key(&mut OsRng).into()
}

/// Interpret stored key bytes.
///
/// # Errors
///
/// Returns `InvalidKeyLength` when the slice is not exactly one key long.
pub fn key_from_bytes(bytes: &[u8]) -> Result<SaveKey, CryptoError> {
    SaveKey::try_from(bytes).map_err(|_| CryptoError::InvalidKeyLength(bytes.len()))
}

/// Encrypt `plaintext`, returning `nonce ‖ ciphertext`.
///
/// # Errors
///
/// Returns `EncryptionFailed` if the AEAD rejects the input.
pub fn encrypt(key: &SaveKey, plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let cipher = XChaCha20Poly1305::new(key.into());
    let nonce = XChaCha20Poly1305::generate_nonce(&mut OsRng);
    let ciphertext = cipher
        .encrypt(&nonce, plaintext)
        .map_err(|_| CryptoError::EncryptionFailed)?;

    let mut output = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
    output.extend_from_slice(&nonce);
    output.extend_from_slice(&ciphertext);
    Ok(output)
}

/// Reverse of [`encrypt`].
///
/// # Errors
///
/// Returns `DecryptionFailed` for truncated input, a wrong key, or any
/// modified byte.
pub fn decrypt(key: &SaveKey, data: &[u8]) -> Result<Vec<u8>, CryptoError> {
    if data.len() < NONCE_SIZE {
        return Err(CryptoError::DecryptionFailed);
    }
    let (nonce, ciphertext) = data.split_at(NONCE_SIZE);
    let cipher = XChaCha20Poly1305::new(key.into());
    cipher
        .decrypt(XNonce::from_slice(nonce), ciphertext)
        .map_err(|_| CryptoError::DecryptionFailed)
}

/// HMAC-SHA256 of `parts` under `key`.
#[must_use]
pub fn keyed_digest(key: &[u8], parts: &[&[u8]]) -> [u8; 32] {
    match <Hmac<Sha256> as Mac>::new_from_slice(key) {
        Ok(mut mac) => {
            for part in parts {
                mac.update(part);
            }
            mac.finalize().into_bytes().into()
        }
        // HMAC accepts keys of any length; plain hashing keeps this total.
        Err(_) => {
            let mut hasher = Sha256::new();
            hasher.update(key);
            for part in parts {
                hasher.update(part);
            }
            hasher.finalize().into()
        }
    }
}

/// Hex SHA-256 of `bytes`.
#[must_use]
pub fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}
