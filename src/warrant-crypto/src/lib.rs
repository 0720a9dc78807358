//! # warrant-crypto
//!
//! Cryptographic primitives behind warrant's trust artifacts.
//!
//! This crate implements the two halves of the token system:
//! - **Signing**: Ed25519 (`EdDSA`) for licenses and attestations
//! - **Envelope**: ECDH-ES over P-256 with AES-256 key wrap (`ECDH-ES+A256KW`)
//!   and AES-256-GCM content encryption (`A256GCM`)
//!
//! ## Envelope Construction
//!
//! ```text
//! Z   = ECDH(ephemeral_secret, recipient_public)
//! KEK = ConcatKDF(Z, "ECDH-ES+A256KW", 256)
//! CEK = random(32)
//! encrypted_key = AES-KW(KEK, CEK)
//! ciphertext || tag = AES-256-GCM(CEK, iv, aad, plaintext)
//! ```
//!
//! Token framing (header encoding, base64url segments) lives in
//! `warrant-core`; this crate only deals in raw bytes.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod content;
mod ecdh;
mod ed25519;
mod error;
mod key_wrap;
mod signer;
mod types;

pub use content::{generate_iv, open, seal, SealedContent, IV_SIZE, TAG_SIZE};
pub use ecdh::{concat_kdf, unwrap_cek, wrap_cek, WrappedCek, CEK_SIZE};
pub use ed25519::{Ed25519Signer, Ed25519Verifier};
pub use error::CryptoError;
pub use key_wrap::{aes_key_unwrap, aes_key_wrap};
pub use signer::{Signer, Verifier};
pub use types::{ContentEncryption, KeyManagementAlgorithm, SignatureAlgorithm};

/// Constant-time byte comparison.
///
/// Compares two byte slices in constant time to prevent timing attacks.
/// Returns `true` if the slices are equal, `false` otherwise.
///
/// # Security
///
/// Use this for every comparison of digests, checksums and unwrapped key
/// integrity values. The length check still returns early; lengths of the
/// values compared here are public.
#[must_use]
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    use subtle::ConstantTimeEq;

    if a.len() != b.len() {
        return false;
    }
    a.ct_eq(b).into()
}
