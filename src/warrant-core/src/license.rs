//! License engine.
//!
//! A license is a signed claim set naming who may use a product, for whom it
//! was issued, and until when. Its `jti` is the handle revocation ledgers
//! refer to.
//!
//! Verification and revocation are separate steps. [`check_license`] runs
//! them in the defined order: signature and structure, then revocation,
//! then expiry.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::claims;
use crate::config::VerifyOptions;
use crate::error::TrustError;
use crate::keyset::{PublicKeySet, SigningKey};
use crate::revocation::{RevocationLedger, RevocationStatus};
use crate::token::{self, TokenError};

/// License claims.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct License {
    /// Unique license identifier (UUID v4).
    #[serde(rename = "jti")]
    pub id: String,
    /// Issuing party.
    #[serde(rename = "iss")]
    pub issuer: String,
    /// Licensee.
    #[serde(rename = "sub")]
    pub subject: String,
    /// Product or service the license is for.
    #[serde(rename = "aud")]
    pub audience: String,
    /// Issue time (unix seconds).
    #[serde(rename = "iat")]
    pub issued_at: i64,
    /// Expiry time (unix seconds).
    #[serde(rename = "exp")]
    pub expires_at: i64,
    /// Granted capabilities.
    #[serde(default)]
    pub capabilities: Vec<String>,
}

/// Non-fatal conditions noticed while building a license.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LicenseWarning {
    /// The duration was negative, so the license is born expired.
    ExpiresBeforeIssued {
        /// Issue time.
        issued_at: i64,
        /// Expiry time, earlier than `issued_at`.
        expires_at: i64,
    },
}

impl fmt::Display for LicenseWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ExpiresBeforeIssued {
                issued_at,
                expires_at,
            } => write!(
                f,
                "license expires at {} before it is issued at {}",
                expires_at, issued_at
            ),
        }
    }
}

impl License {
    /// Build a license valid for `duration` from now.
    ///
    /// A negative duration is accepted and produces a license that is
    /// already expired, together with a warning.
    pub fn new(
        issuer: impl Into<String>,
        subject: impl Into<String>,
        audience: impl Into<String>,
        duration: chrono::Duration,
        capabilities: Vec<String>,
    ) -> (Self, Option<LicenseWarning>) {
        let issued_at = claims::now();
        let expires_at = issued_at.saturating_add(duration.num_seconds());

        let license = Self {
            id: Uuid::new_v4().to_string(),
            issuer: issuer.into(),
            subject: subject.into(),
            audience: audience.into(),
            issued_at,
            expires_at,
            capabilities,
        };

        let warning = (expires_at < issued_at).then(|| {
            warn!(
                license_id = %license.id,
                issued_at,
                expires_at,
                "License expires before it is issued"
            );
            LicenseWarning::ExpiresBeforeIssued {
                issued_at,
                expires_at,
            }
        });

        (license, warning)
    }

    /// True if `capability` was granted.
    #[must_use]
    pub fn has_capability(&self, capability: &str) -> bool {
        self.capabilities.iter().any(|c| c == capability)
    }

    /// Sign into a compact token.
    ///
    /// # Errors
    ///
    /// Returns error if the claims cannot be serialized or signing fails.
    pub fn sign(&self, key: &SigningKey) -> Result<String, TrustError> {
        let token = token::sign(key, self)?;
        debug!(license_id = %self.id, kid = %key.kid(), "Signed license");
        Ok(token)
    }

    /// Verify a license token with default options.
    ///
    /// # Errors
    ///
    /// Returns [`TrustError::InvalidLicense`] on any signature or structural
    /// failure. Does not consult expiry or revocation.
    pub fn verify(token: &str, keys: &PublicKeySet) -> Result<Self, TrustError> {
        Self::verify_with(token, keys, &VerifyOptions::default())
    }

    /// Verify a license token.
    ///
    /// # Errors
    ///
    /// Returns [`TrustError::InvalidLicense`] on any signature or structural
    /// failure, or when `options` names an audience the license is not for.
    /// Does not consult expiry or revocation.
    pub fn verify_with(
        token: &str,
        keys: &PublicKeySet,
        options: &VerifyOptions,
    ) -> Result<Self, TrustError> {
        let verified = token::verify(token, keys)
            .and_then(|payload| claims::decode::<Self>(&payload))
            .and_then(|license| {
                license.check_structure(claims::now(), options)?;
                Ok(license)
            });

        match verified {
            Ok(license) => {
                debug!(license_id = %license.id, "License verified");
                Ok(license)
            },
            Err(cause) => {
                debug!(error = %cause, "License rejected");
                Err(TrustError::InvalidLicense { cause })
            },
        }
    }

    /// True once `exp + skew` has passed.
    #[must_use]
    pub fn is_expired(&self, skew: Duration) -> bool {
        self.is_expired_at(claims::now(), skew)
    }

    /// [`Self::is_expired`] evaluated at `now` (unix seconds).
    #[must_use]
    pub fn is_expired_at(&self, now: i64, skew: Duration) -> bool {
        let skew = i64::try_from(skew.as_secs()).unwrap_or(i64::MAX);
        self.expires_at.saturating_add(skew) < now
    }

    fn check_structure(&self, now: i64, options: &VerifyOptions) -> Result<(), TokenError> {
        claims::require_non_empty("jti", &self.id)?;
        claims::require_non_empty("iss", &self.issuer)?;
        claims::require_non_empty("sub", &self.subject)?;
        claims::require_non_empty("aud", &self.audience)?;
        claims::require_positive("exp", self.expires_at)?;
        claims::check_issued_at(self.issued_at, now, options)?;
        claims::check_audience(&self.audience, options)
    }
}

/// Verify a license token and check it against revocation and expiry.
///
/// Order: signature and structure, then revocation (when a ledger is
/// given), then expiry. A revoked license is rejected even if unexpired; an
/// expired one is rejected whatever its revocation status.
///
/// # Errors
///
/// Returns [`TrustError::InvalidLicense`], [`TrustError::LicenseRevoked`],
/// or [`TrustError::LicenseExpired`].
pub fn check_license(
    token: &str,
    keys: &PublicKeySet,
    ledger: Option<&RevocationLedger>,
    options: &VerifyOptions,
) -> Result<License, TrustError> {
    let license = License::verify_with(token, keys, options)?;

    if let Some(ledger) = ledger {
        if let RevocationStatus {
            revoked: true,
            revoked_at: Some(revoked_at),
            ..
        } = ledger.is_revoked(&license)
        {
            warn!(license_id = %license.id, revoked_at, "Rejected revoked license");
            return Err(TrustError::LicenseRevoked {
                license_id: license.id,
                revoked_at,
            });
        }
    }

    if license.is_expired(options.clock_skew) {
        debug!(license_id = %license.id, expires_at = license.expires_at, "Rejected expired license");
        return Err(TrustError::LicenseExpired {
            expiry: license.expires_at,
        });
    }

    Ok(license)
}
