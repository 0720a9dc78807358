//! Cryptographic error types.

use thiserror::Error;

/// Errors that can occur during cryptographic operations.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// Invalid signature format or length.
    #[error("Invalid signature: {reason}")]
    InvalidSignature {
        /// Reason the signature is invalid.
        reason: String,
    },

    /// Invalid public key format or length.
    #[error("Invalid public key: {reason}")]
    InvalidPublicKey {
        /// Reason the key is invalid.
        reason: String,
    },

    /// Invalid private key format or length.
    #[error("Invalid private key: {reason}")]
    InvalidPrivateKey {
        /// Reason the key is invalid.
        reason: String,
    },

    /// Key wrapping failed.
    #[error("Key wrap failed: {reason}")]
    KeyWrapFailed {
        /// Reason for the failure.
        reason: String,
    },

    /// Wrapped key failed its integrity check or had the wrong shape.
    #[error("Key unwrap failed")]
    KeyUnwrapFailed,

    /// Content encryption failed.
    #[error("Encryption failed: {reason}")]
    EncryptionFailed {
        /// Reason for the failure.
        reason: String,
    },

    /// Authentication tag mismatch or malformed ciphertext.
    #[error("Decryption failed")]
    DecryptionFailed,
}

impl CryptoError {
    /// Create an invalid signature error.
    #[must_use]
    pub fn invalid_signature(reason: impl Into<String>) -> Self {
        Self::InvalidSignature {
            reason: reason.into(),
        }
    }

    /// Create an invalid public key error.
    #[must_use]
    pub fn invalid_public_key(reason: impl Into<String>) -> Self {
        Self::InvalidPublicKey {
            reason: reason.into(),
        }
    }

    /// Create an invalid private key error.
    #[must_use]
    pub fn invalid_private_key(reason: impl Into<String>) -> Self {
        Self::InvalidPrivateKey {
            reason: reason.into(),
        }
    }

    /// Create a key wrap failed error.
    #[must_use]
    pub fn key_wrap_failed(reason: impl Into<String>) -> Self {
        Self::KeyWrapFailed {
            reason: reason.into(),
        }
    }

    /// Create an encryption failed error.
    #[must_use]
    pub fn encryption_failed(reason: impl Into<String>) -> Self {
        Self::EncryptionFailed {
            reason: reason.into(),
        }
    }
}
