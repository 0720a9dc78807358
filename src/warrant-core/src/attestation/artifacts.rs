//! Attestation over a set of artifact digests.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::{sign_attestation, verify_attestation, Attestation};
use crate::claims;
use crate::config::VerifyOptions;
use crate::error::TrustError;
use crate::keyset::{PublicKeySet, SigningKey};

/// Signed set of content digests (for example OCI image digests).
///
/// Digests are kept sorted, so the same set always serializes the same way.
/// Membership is exact string comparison: no case folding, no algorithm
/// prefix handling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactsAttestation {
    #[serde(rename = "iss")]
    issuer: String,
    #[serde(rename = "aud")]
    audience: String,
    #[serde(rename = "iat")]
    issued_at: i64,
    digests: BTreeSet<String>,
}

impl ArtifactsAttestation {
    /// Build an attestation issued now.
    pub fn new<I, S>(issuer: impl Into<String>, audience: impl Into<String>, digests: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            issuer: issuer.into(),
            audience: audience.into(),
            issued_at: claims::now(),
            digests: digests.into_iter().map(Into::into).collect(),
        }
    }

    /// Override the issue time.
    #[must_use]
    pub fn with_issued_at(mut self, issued_at: i64) -> Self {
        self.issued_at = issued_at;
        self
    }

    /// Attest `digests` for `audience`, issued by the key's issuer.
    ///
    /// # Errors
    ///
    /// Returns error if signing fails.
    pub fn sign<I, S>(key: &SigningKey, audience: impl Into<String>, digests: I) -> Result<String, TrustError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(key.issuer(), audience, digests).sign_claims(key)
    }

    /// Sign these claims as they are.
    ///
    /// # Errors
    ///
    /// Returns error if signing fails.
    pub fn sign_claims(&self, key: &SigningKey) -> Result<String, TrustError> {
        sign_attestation(self, key)
    }

    /// Verify a token with default options.
    ///
    /// # Errors
    ///
    /// Returns [`TrustError::InvalidAttestation`] on any signature or
    /// structural failure.
    pub fn verify(token: &str, keys: &PublicKeySet) -> Result<Self, TrustError> {
        Self::verify_with(token, keys, &VerifyOptions::default())
    }

    /// Verify a token.
    ///
    /// # Errors
    ///
    /// Returns [`TrustError::InvalidAttestation`] on any signature or
    /// structural failure, or an audience other than the expected one.
    pub fn verify_with(token: &str, keys: &PublicKeySet, options: &VerifyOptions) -> Result<Self, TrustError> {
        verify_attestation(token, keys, options)
    }

    /// Verify a token and require every digest in `digests` to be attested.
    ///
    /// # Errors
    ///
    /// Returns [`TrustError::InvalidAttestation`] if the token does not
    /// verify, or [`TrustError::DigestNotAttested`] naming the first digest
    /// that is missing.
    pub fn verify_digests<I, S>(token: &str, keys: &PublicKeySet, digests: I) -> Result<Self, TrustError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let attestation = Self::verify(token, keys)?;
        for digest in digests {
            let digest = digest.as_ref();
            if !attestation.has_digest(digest) {
                warn!(digest = %digest, issuer = %attestation.issuer, "Digest not attested");
                return Err(TrustError::DigestNotAttested {
                    digest: digest.to_string(),
                });
            }
        }
        Ok(attestation)
    }

    /// True if `digest` is exactly one of the attested digests.
    #[must_use]
    pub fn has_digest(&self, digest: &str) -> bool {
        self.digests.contains(digest)
    }

    /// Attested digests in sorted order.
    pub fn digests(&self) -> impl Iterator<Item = &str> {
        self.digests.iter().map(String::as_str)
    }
}

impl Attestation for ArtifactsAttestation {
    const KIND: &'static str = "artifacts";

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
