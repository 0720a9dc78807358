//! Signing traits shared by every token signer.

use crate::error::CryptoError;
use crate::types::SignatureAlgorithm;

/// Trait for signature operations.
pub trait Signer {
    /// Get the algorithm used by this signer.
    fn algorithm(&self) -> SignatureAlgorithm;

    /// Get the raw public key bytes.
    fn public_key(&self) -> Vec<u8>;

    /// Sign data and return the signature.
    fn sign(&self, data: &[u8]) -> Result<Vec<u8>, CryptoError>;
}

/// Trait for signature verification.
pub trait Verifier {
    /// Verify a signature against a raw public key.
    ///
    /// Returns `Ok(false)` for a well-formed signature that does not verify,
    /// and `Err` when the key or signature cannot be parsed at all.
    fn verify(&self, public_key: &[u8], data: &[u8], signature: &[u8])
        -> Result<bool, CryptoError>;
}
