//! Structural checks shared by license and attestation claims.

use chrono::Utc;
use serde::de::DeserializeOwned;

use crate::config::VerifyOptions;
use crate::token::TokenError;

/// Current unix time in seconds.
pub(crate) fn now() -> i64 {
    Utc::now().timestamp()
}

pub(crate) fn decode<T: DeserializeOwned>(payload: &[u8]) -> Result<T, TokenError> {
    serde_json::from_slice(payload).map_err(|e| TokenError::invalid_claims(e.to_string()))
}

pub(crate) fn require_non_empty(name: &str, value: &str) -> Result<(), TokenError> {
    if value.is_empty() {
        return Err(TokenError::invalid_claims(format!("\"{}\" is empty", name)));
    }
    Ok(())
}

pub(crate) fn require_positive(name: &str, value: i64) -> Result<(), TokenError> {
    if value <= 0 {
        return Err(TokenError::invalid_claims(format!(
            "\"{}\" must be positive, got {}",
            name, value
        )));
    }
    Ok(())
}

/// `iat` must be positive and no further in the future than the skew allows.
pub(crate) fn check_issued_at(issued_at: i64, now: i64, options: &VerifyOptions) -> Result<(), TokenError> {
    require_positive("iat", issued_at)?;
    if issued_at > now.saturating_add(options.skew_seconds()) {
        return Err(TokenError::invalid_claims(format!(
            "issued {}s in the future",
            issued_at.saturating_sub(now)
        )));
    }
    Ok(())
}

pub(crate) fn check_audience(audience: &str, options: &VerifyOptions) -> Result<(), TokenError> {
    match options.expected_audience.as_deref() {
        Some(expected) if expected != audience => Err(TokenError::invalid_claims(format!(
            "audience \"{}\" does not match expected \"{}\"",
            audience, expected
        ))),
        _ => Ok(()),
    }
}
