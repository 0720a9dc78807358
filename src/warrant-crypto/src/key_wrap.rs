//! AES-256 key wrap (RFC 3394).
//!
//! Wraps the per-token content encryption key under the key-encryption key
//! derived from ECDH. Output is 8 bytes longer than input.

use aes_kw::KekAes256;

use crate::error::CryptoError;

/// Wrapping adds one 64-bit integrity block.
const WRAP_OVERHEAD: usize = 8;

/// Wrap `key_data` under a 32-byte key-encryption key.
///
/// # Errors
///
/// Returns error if `key_data` is shorter than 16 bytes or not a multiple
/// of 8 bytes.
pub fn aes_key_wrap(kek: &[u8; 32], key_data: &[u8]) -> Result<Vec<u8>, CryptoError> {
    if key_data.len() < 16 || key_data.len() % 8 != 0 {
        return Err(CryptoError::key_wrap_failed(format!(
            "key data must be a multiple of 8 bytes and at least 16, got {}",
            key_data.len()
        )));
    }

    let mut output = vec![0u8; key_data.len() + WRAP_OVERHEAD];
    KekAes256::new(&(*kek).into())
        .wrap(key_data, &mut output)
        .map_err(|e| CryptoError::key_wrap_failed(e.to_string()))?;
    Ok(output)
}

/// Unwrap a key previously wrapped with [`aes_key_wrap`].
///
/// # Errors
///
/// Returns [`CryptoError::KeyUnwrapFailed`] for malformed input or when the
/// integrity check value does not match, which is what a wrong key-encryption
/// key produces.
pub fn aes_key_unwrap(kek: &[u8; 32], wrapped: &[u8]) -> Result<Vec<u8>, CryptoError> {
    if wrapped.len() < 24 || wrapped.len() % 8 != 0 {
        return Err(CryptoError::KeyUnwrapFailed);
    }

    let mut output = vec![0u8; wrapped.len() - WRAP_OVERHEAD];
    KekAes256::new(&(*kek).into())
        .unwrap(wrapped, &mut output)
        .map_err(|_| CryptoError::KeyUnwrapFailed)?;
    Ok(output)
}
