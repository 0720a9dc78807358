//! Error types for license, attestation, and revocation operations.

use std::path::PathBuf;

use thiserror::Error;

use crate::keyset::KeySetError;
use crate::revocation::LedgerError;
use crate::token::TokenError;

/// Errors returned by the license and attestation engines.
///
/// Signature and structural failures are folded into [`Self::InvalidLicense`]
/// or [`Self::InvalidAttestation`]; the underlying [`TokenError`] stays
/// reachable through `source()`. Expiry, revocation, and checksum outcomes
/// are reported as their own variants.
#[derive(Debug, Error)]
pub enum TrustError {
    /// License token failed signature or structural verification.
    #[error("Invalid license")]
    InvalidLicense {
        /// Underlying failure.
        #[source]
        cause: TokenError,
    },

    /// Attestation token failed signature or structural verification.
    #[error("Invalid attestation")]
    InvalidAttestation {
        /// Underlying failure.
        #[source]
        cause: TokenError,
    },

    /// License has expired.
    #[error("License expired at {expiry}")]
    LicenseExpired {
        /// Expiration timestamp.
        expiry: i64,
    },

    /// License has been revoked.
    #[error("License {license_id} revoked at {revoked_at}")]
    LicenseRevoked {
        /// Revoked license identifier.
        license_id: String,
        /// Revocation timestamp.
        revoked_at: i64,
    },

    /// Directory contents no longer match the attested checksum.
    #[error("Checksum mismatch")]
    ChecksumMismatch,

    /// A required digest is not in the attested set.
    #[error("Digest not attested: {digest}")]
    DigestNotAttested {
        /// Missing digest.
        digest: String,
    },

    /// Attested directory could not be read.
    #[error("Cannot read {}: {source}", path.display())]
    Io {
        /// Path involved.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// Token could not be produced.
    #[error(transparent)]
    Token(#[from] TokenError),

    /// Key set error.
    #[error(transparent)]
    KeySet(#[from] KeySetError),

    /// Revocation ledger error.
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

impl TrustError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// True when verification failed because the token named no key, or a
    /// key the supplied set does not hold.
    ///
    /// Looks through the [`Self::InvalidLicense`] and
    /// [`Self::InvalidAttestation`] wrappers.
    #[must_use]
    pub fn is_key_not_found(&self) -> bool {
        match self {
            Self::InvalidLicense { cause } | Self::InvalidAttestation { cause } | Self::Token(cause) => {
                cause.is_key_not_found()
            },
            Self::KeySet(KeySetError::KeyNotFound { .. }) => true,
            _ => false,
        }
    }

    /// True for failures that point at a forged or modified token rather
    /// than an expected operational state.
    #[must_use]
    pub fn is_cryptographic(&self) -> bool {
        match self {
            Self::InvalidLicense { cause } | Self::InvalidAttestation { cause } | Self::Token(cause) => {
                matches!(
                    cause,
                    TokenError::SignatureInvalid | TokenError::DecryptionFailed { .. }
                )
            },
            _ => false,
        }
    }
}
