//! Verification options.

use std::time::Duration;

/// Tolerance for clock differences between issuer and verifier.
pub const DEFAULT_CLOCK_SKEW: Duration = Duration::from_secs(60);

/// Options applied when verifying licenses and attestations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifyOptions {
    /// Audience the token must be addressed to. Unchecked when `None`.
    pub expected_audience: Option<String>,
    /// Allowed clock difference for `iat` and `exp`.
    pub clock_skew: Duration,
}

impl Default for VerifyOptions {
    fn default() -> Self {
        Self {
            expected_audience: None,
            clock_skew: DEFAULT_CLOCK_SKEW,
        }
    }
}

impl VerifyOptions {
    /// Require tokens to be addressed to `audience`.
    #[must_use]
    pub fn with_audience(mut self, audience: impl Into<String>) -> Self {
        self.expected_audience = Some(audience.into());
        self
    }

    /// Replace the clock skew tolerance.
    #[must_use]
    pub fn with_clock_skew(mut self, clock_skew: Duration) -> Self {
        self.clock_skew = clock_skew;
        self
    }

    /// Clock skew in whole seconds, saturating.
    #[must_use]
    pub fn skew_seconds(&self) -> i64 {
        i64::try_from(self.clock_skew.as_secs()).unwrap_or(i64::MAX)
    }
}
