//! Ed25519 signature operations.
//!
//! Every license and attestation token is signed with Ed25519.

use ed25519_dalek::{Signature, Signer as _, SigningKey, Verifier as _, VerifyingKey};
use rand_core::OsRng;

use crate::error::CryptoError;
use crate::signer::{Signer, Verifier};
use crate::types::SignatureAlgorithm;

/// Ed25519 public key size in bytes.
const PUBLIC_KEY_SIZE: usize = 32;

/// Ed25519 signature size in bytes.
const SIGNATURE_SIZE: usize = 64;

/// Ed25519 signer.
#[derive(Clone)]
pub struct Ed25519Signer {
    signing_key: SigningKey,
}

impl Ed25519Signer {
    /// Create a new signer with a random key.
    #[must_use]
    pub fn random() -> Self {
        Self {
            signing_key: SigningKey::generate(&mut OsRng),
        }
    }

    /// Create a signer from seed bytes (32 bytes).
    ///
    /// # Errors
    ///
    /// Returns error if the seed is not exactly 32 bytes.
    pub fn from_seed(seed: &[u8]) -> Result<Self, CryptoError> {
        let seed_array: [u8; 32] = seed.try_into().map_err(|_| {
            CryptoError::invalid_private_key(format!(
                "Ed25519 seed must be 32 bytes, got {}",
                seed.len()
            ))
        })?;

        Ok(Self {
            signing_key: SigningKey::from_bytes(&seed_array),
        })
    }

    /// Secret seed bytes, for serialization into a private key document.
    #[must_use]
    pub fn seed(&self) -> [u8; 32] {
        self.signing_key.to_bytes()
    }

    /// Get the verifying key.
    #[must_use]
    pub fn verifying_key(&self) -> VerifyingKey {
        self.signing_key.verifying_key()
    }
}

impl std::fmt::Debug for Ed25519Signer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ed25519Signer")
            .field("public_key", &hex_prefix(&self.public_key()))
            .finish_non_exhaustive()
    }
}

impl Signer for Ed25519Signer {
    fn algorithm(&self) -> SignatureAlgorithm {
        SignatureAlgorithm::EdDsa
    }

    fn public_key(&self) -> Vec<u8> {
        self.signing_key.verifying_key().to_bytes().to_vec()
    }

    fn sign(&self, data: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let signature = self.signing_key.sign(data);
        Ok(signature.to_bytes().to_vec())
    }
}

/// Ed25519 verifier.
#[derive(Debug, Clone, Copy, Default)]
pub struct Ed25519Verifier;

impl Ed25519Verifier {
    /// Create a new verifier.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Parse and validate raw public key bytes.
    ///
    /// # Errors
    ///
    /// Returns error if the key is not 32 bytes or not a valid curve point.
    pub fn parse_public_key(public_key: &[u8]) -> Result<VerifyingKey, CryptoError> {
        let pk_bytes: [u8; PUBLIC_KEY_SIZE] = public_key.try_into().map_err(|_| {
            CryptoError::invalid_public_key(format!(
                "Ed25519 public key must be {} bytes, got {}",
                PUBLIC_KEY_SIZE,
                public_key.len()
            ))
        })?;

        VerifyingKey::from_bytes(&pk_bytes)
            .map_err(|e| CryptoError::invalid_public_key(e.to_string()))
    }
}

impl Verifier for Ed25519Verifier {
    fn verify(&self, public_key: &[u8], data: &[u8], signature: &[u8]) -> Result<bool, CryptoError> {
        let vk = Self::parse_public_key(public_key)?;

        let sig_bytes: [u8; SIGNATURE_SIZE] = signature.try_into().map_err(|_| {
            CryptoError::invalid_signature(format!(
                "Ed25519 signature must be {} bytes, got {}",
                SIGNATURE_SIZE,
                signature.len()
            ))
        })?;

        let sig = Signature::from_bytes(&sig_bytes);

        // verify_strict rejects small-order keys and non-canonical R
        match vk.verify_strict(data, &sig) {
            Ok(()) => Ok(true),
            Err(_) => Ok(false),
        }
    }
}

fn hex_prefix(bytes: &[u8]) -> String {
    bytes.iter().take(4).map(|b| format!("{:02x}", b)).collect()
}
