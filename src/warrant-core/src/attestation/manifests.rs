//! Attestation over a directory of manifests.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;
use warrant_crypto::constant_time_eq;

use super::checksum::compute_checksum;
use super::{sign_attestation, verify_attestation, Attestation};
use crate::claims;
use crate::config::VerifyOptions;
use crate::error::TrustError;
use crate::keyset::{PublicKeySet, SigningKey};

/// Signed checksum of a directory tree, with the exclusion patterns used to
/// compute it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestsAttestation {
    #[serde(rename = "iss")]
    issuer: String,
    #[serde(rename = "aud")]
    audience: String,
    #[serde(rename = "iat")]
    issued_at: i64,
    checksum: String,
    #[serde(default)]
    exclusions: Vec<String>,
}

impl ManifestsAttestation {
    /// Build an attestation issued now over an already computed checksum.
    pub fn new(
        issuer: impl Into<String>,
        audience: impl Into<String>,
        checksum: impl Into<String>,
        exclusions: Vec<String>,
    ) -> Self {
        Self {
            issuer: issuer.into(),
            audience: audience.into(),
            issued_at: claims::now(),
            checksum: checksum.into(),
            exclusions,
        }
    }

    /// Override the issue time.
    #[must_use]
    pub fn with_issued_at(mut self, issued_at: i64) -> Self {
        self.issued_at = issued_at;
        self
    }

    /// Checksum `dir` and sign it for `audience`, issued by the key's issuer.
    ///
    /// Returns the token and the included files in sorted order.
    ///
    /// # Errors
    ///
    /// Returns [`TrustError::Io`] if the directory cannot be read, or a
    /// signing error.
    pub fn sign<S: AsRef<str>>(
        key: &SigningKey,
        audience: impl Into<String>,
        dir: impl AsRef<Path>,
        exclusions: &[S],
    ) -> Result<(String, Vec<String>), TrustError> {
        let computed = compute_checksum(dir, exclusions)?;
        let exclusions = exclusions.iter().map(|e| e.as_ref().to_string()).collect();

        let token = Self::new(key.issuer(), audience, computed.checksum.clone(), exclusions)
            .sign_claims(key)?;
        Ok((token, computed.file_list()))
    }

    /// Sign these claims as they are.
    ///
    /// # Errors
    ///
    /// Returns error if signing fails.
    pub fn sign_claims(&self, key: &SigningKey) -> Result<String, TrustError> {
        sign_attestation(self, key)
    }

    /// Verify a token and require `dir` to still match its checksum.
    ///
    /// # Errors
    ///
    /// Returns [`TrustError::InvalidAttestation`] if the token does not
    /// verify, [`TrustError::Io`] if the directory cannot be read, and
    /// [`TrustError::ChecksumMismatch`] if the contents have changed.
    pub fn verify<S: AsRef<str>>(
        token: &str,
        keys: &PublicKeySet,
        dir: impl AsRef<Path>,
        exclusions: &[S],
    ) -> Result<Self, TrustError> {
        Self::verify_with(token, keys, dir, exclusions, &VerifyOptions::default())
    }

    /// [`Self::verify`] with explicit options.
    ///
    /// # Errors
    ///
    /// As for [`Self::verify`], plus an audience other than the expected one.
    pub fn verify_with<S: AsRef<str>>(
        token: &str,
        keys: &PublicKeySet,
        dir: impl AsRef<Path>,
        exclusions: &[S],
        options: &VerifyOptions,
    ) -> Result<Self, TrustError> {
        let attestation: Self = verify_attestation(token, keys, options)?;
        let computed = compute_checksum(dir, exclusions)?;

        if !constant_time_eq(attestation.checksum.as_bytes(), computed.checksum.as_bytes()) {
            warn!(
                attested = %attestation.checksum,
                computed = %computed.checksum,
                "Directory checksum mismatch"
            );
            return Err(TrustError::ChecksumMismatch);
        }

        Ok(attestation)
    }

    /// Attested checksum.
    #[must_use]
    pub fn checksum(&self) -> &str {
        &self.checksum
    }

    /// Exclusion patterns recorded at signing time.
    #[must_use]
    pub fn exclusions(&self) -> &[String] {
        &self.exclusions
    }
}

impl Attestation for ManifestsAttestation {
    const KIND: &'static str = "manifests";

    fn issuer(&self) -> &str {
        &self.issuer
    }

    fn audience(&self) -> &str {
        &self.audience
    }

    fn issued_at(&self) -> i64 {
        self.issued_at
    }
}
