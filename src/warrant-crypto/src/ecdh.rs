//! ECDH-ES key agreement over P-256 with AES key wrap (`ECDH-ES+A256KW`).
//!
//! The sender generates an ephemeral P-256 key, agrees on a shared secret
//! with the recipient's static key, derives a key-encryption key with the
//! Concat KDF of RFC 7518 §4.6.2, and wraps a fresh content key under it.

use p256::ecdh::{diffie_hellman, EphemeralSecret};
use p256::{PublicKey, SecretKey};
use rand_core::{OsRng, RngCore};
use sha2::Sha256;
use zeroize::Zeroizing;

use crate::error::CryptoError;
use crate::key_wrap::{aes_key_unwrap, aes_key_wrap};
use crate::types::KeyManagementAlgorithm;

/// Content encryption key size in bytes (A256GCM).
pub const CEK_SIZE: usize = 32;

/// Result of wrapping a content key for one recipient.
pub struct WrappedCek {
    /// Public half of the ephemeral key, carried in the token header.
    pub ephemeral_public: PublicKey,
    /// Content key wrapped under the agreed key-encryption key.
    pub encrypted_key: Vec<u8>,
    /// The content key itself, for encrypting the payload.
    pub cek: Zeroizing<[u8; CEK_SIZE]>,
}

/// Derive a 256-bit key from a shared secret with the single-round Concat KDF.
///
/// `PartyUInfo` and `PartyVInfo` are empty; `SuppPubInfo` is the key length
/// in bits.
///
/// # Errors
///
/// Returns error if the derivation is rejected by the KDF.
pub fn concat_kdf(shared_secret: &[u8], algorithm_id: &str) -> Result<Zeroizing<[u8; 32]>, CryptoError> {
    let mut other_info = Vec::with_capacity(algorithm_id.len() + 16);
    other_info.extend_from_slice(&(algorithm_id.len() as u32).to_be_bytes());
    other_info.extend_from_slice(algorithm_id.as_bytes());
    other_info.extend_from_slice(&0u32.to_be_bytes());
    other_info.extend_from_slice(&0u32.to_be_bytes());
    other_info.extend_from_slice(&((CEK_SIZE * 8) as u32).to_be_bytes());

    let mut out = Zeroizing::new([0u8; 32]);
    ::concat_kdf::derive_key_into::<Sha256>(shared_secret, &other_info, &mut out[..])
        .map_err(|e| CryptoError::key_wrap_failed(format!("key derivation: {}", e)))?;
    Ok(out)
}

/// Generate a content key and wrap it for `recipient`.
///
/// # Errors
///
/// Returns error if key wrapping fails.
pub fn wrap_cek(recipient: &PublicKey) -> Result<WrappedCek, CryptoError> {
    let ephemeral = EphemeralSecret::random(&mut OsRng);
    let ephemeral_public = ephemeral.public_key();
    let shared = ephemeral.diffie_hellman(recipient);

    let kek = concat_kdf(
        shared.raw_secret_bytes(),
        KeyManagementAlgorithm::EcdhEsA256Kw.name(),
    )?;

    let mut cek = Zeroizing::new([0u8; CEK_SIZE]);
    OsRng.fill_bytes(&mut cek[..]);

    let encrypted_key = aes_key_wrap(&kek, &cek[..])?;

    Ok(WrappedCek {
        ephemeral_public,
        encrypted_key,
        cek,
    })
}

/// Recover the content key using the recipient's static secret.
///
/// # Errors
///
/// Returns [`CryptoError::KeyUnwrapFailed`] if the wrapped key does not
/// authenticate under the agreed key, which is what a wrong recipient
/// produces.
pub fn unwrap_cek(
    recipient: &SecretKey,
    ephemeral_public: &PublicKey,
    encrypted_key: &[u8],
) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
    let shared = diffie_hellman(recipient.to_nonzero_scalar(), ephemeral_public.as_affine());

    let kek = concat_kdf(
        shared.raw_secret_bytes(),
        KeyManagementAlgorithm::EcdhEsA256Kw.name(),
    )?;

    let cek = aes_key_unwrap(&kek, encrypted_key)?;
    if cek.len() != CEK_SIZE {
        return Err(CryptoError::KeyUnwrapFailed);
    }

    Ok(Zeroizing::new(cek))
}
