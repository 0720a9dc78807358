//! AES-256-GCM content encryption (`A256GCM`).

use aes_gcm::aead::{Aead, KeyInit, Payload};
use aes_gcm::{Aes256Gcm, Nonce};
use rand_core::{OsRng, RngCore};

use crate::error::CryptoError;

/// GCM initialization vector size in bytes.
pub const IV_SIZE: usize = 12;

/// GCM authentication tag size in bytes.
pub const TAG_SIZE: usize = 16;

/// Ciphertext and detached authentication tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SealedContent {
    /// Encrypted payload, same length as the plaintext.
    pub ciphertext: Vec<u8>,
    /// GCM authentication tag.
    pub tag: [u8; TAG_SIZE],
}

/// Generate a random initialization vector.
#[must_use]
pub fn generate_iv() -> [u8; IV_SIZE] {
    let mut iv = [0u8; IV_SIZE];
    OsRng.fill_bytes(&mut iv);
    iv
}

/// Encrypt `plaintext` under `cek`, authenticating `aad`.
///
/// # Errors
///
/// Returns error if the key or IV has the wrong length.
pub fn seal(cek: &[u8], iv: &[u8], aad: &[u8], plaintext: &[u8]) -> Result<SealedContent, CryptoError> {
    if iv.len() != IV_SIZE {
        return Err(CryptoError::encryption_failed(format!(
            "IV must be {} bytes, got {}",
            IV_SIZE,
            iv.len()
        )));
    }

    let cipher = Aes256Gcm::new_from_slice(cek)
        .map_err(|e| CryptoError::encryption_failed(e.to_string()))?;

    let mut sealed = cipher
        .encrypt(Nonce::from_slice(iv), Payload { msg: plaintext, aad })
        .map_err(|_| CryptoError::encryption_failed("AES-GCM encryption error"))?;

    // aes-gcm appends the tag to the ciphertext
    let tag_bytes = sealed.split_off(sealed.len() - TAG_SIZE);
    let mut tag = [0u8; TAG_SIZE];
    tag.copy_from_slice(&tag_bytes);

    Ok(SealedContent {
        ciphertext: sealed,
        tag,
    })
}

/// Decrypt and authenticate content produced by [`seal`].
///
/// # Errors
///
/// Returns [`CryptoError::DecryptionFailed`] for any failure: wrong key,
/// modified ciphertext, modified AAD, bad lengths.
pub fn open(cek: &[u8], iv: &[u8], aad: &[u8], ciphertext: &[u8], tag: &[u8]) -> Result<Vec<u8>, CryptoError> {
    if iv.len() != IV_SIZE || tag.len() != TAG_SIZE {
        return Err(CryptoError::DecryptionFailed);
    }

    let cipher = Aes256Gcm::new_from_slice(cek).map_err(|_| CryptoError::DecryptionFailed)?;

    let mut combined = Vec::with_capacity(ciphertext.len() + TAG_SIZE);
    combined.extend_from_slice(ciphertext);
    combined.extend_from_slice(tag);

    cipher
        .decrypt(Nonce::from_slice(iv), Payload { msg: &combined, aad })
        .map_err(|_| CryptoError::DecryptionFailed)
}
