//! Attestation engine.
//!
//! An attestation is an issuer's signed statement about artifacts. Two kinds
//! share one contract: the issuer signs a claim set carrying an audience and
//! an issue time; a verifier checks the signature, then re-derives the
//! claim's defining computation and requires exact equality.
//!
//! - [`ArtifactsAttestation`]: a set of content digests
//! - [`ManifestsAttestation`]: a checksum over a directory of manifests

mod artifacts;
mod checksum;
mod manifests;

pub use artifacts::ArtifactsAttestation;
pub use checksum::{compute_checksum, DirectoryChecksum, CHECKSUM_PREFIX};
pub use manifests::ManifestsAttestation;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::claims;
use crate::config::VerifyOptions;
use crate::error::TrustError;
use crate::keyset::{PublicKeySet, SigningKey};
use crate::token::{self, TokenError};

/// Claims common to every attestation kind.
pub trait Attestation: Serialize + DeserializeOwned {
    /// Kind name used in logs.
    const KIND: &'static str;

    /// Issuing party.
    fn issuer(&self) -> &str;

    /// Intended consumer.
    fn audience(&self) -> &str;

    /// Issue time (unix seconds).
    fn issued_at(&self) -> i64;
}

pub(crate) fn sign_attestation<A: Attestation>(attestation: &A, key: &SigningKey) -> Result<String, TrustError> {
    let token = token::sign(key, attestation)?;
    debug!(
        kind = A::KIND,
        kid = %key.kid(),
        issuer = %attestation.issuer(),
        "Signed attestation"
    );
    Ok(token)
}

pub(crate) fn verify_attestation<A: Attestation>(
    token: &str,
    keys: &PublicKeySet,
    options: &VerifyOptions,
) -> Result<A, TrustError> {
    let verified = token::verify(token, keys)
        .and_then(|payload| claims::decode::<A>(&payload))
        .and_then(|attestation| {
            check_structure(&attestation, claims::now(), options)?;
            Ok(attestation)
        });

    verified.map_err(|cause| {
        debug!(kind = A::KIND, error = %cause, "Attestation rejected");
        TrustError::InvalidAttestation { cause }
    })
}

fn check_structure<A: Attestation>(attestation: &A, now: i64, options: &VerifyOptions) -> Result<(), TokenError> {
    claims::require_non_empty("iss", attestation.issuer())?;
    claims::require_non_empty("aud", attestation.audience())?;
    claims::check_issued_at(attestation.issued_at(), now, options)?;
    claims::check_audience(attestation.audience(), options)
}
