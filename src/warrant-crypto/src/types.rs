//! Algorithm identifiers as they appear in token headers and key documents.

use serde::{Deserialize, Serialize};

/// Signature algorithm for signed tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SignatureAlgorithm {
    /// Ed25519 Edwards curve (RFC 8037 `EdDSA`).
    #[serde(rename = "EdDSA")]
    EdDsa,
}

impl SignatureAlgorithm {
    /// Name used in the `alg` header and key documents.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::EdDsa => "EdDSA",
        }
    }

    /// Look up an algorithm by header name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "EdDSA" => Some(Self::EdDsa),
            _ => None,
        }
    }
}

/// Key management algorithm for encrypted tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyManagementAlgorithm {
    /// ECDH-ES key agreement with AES-256 key wrap of the content key.
    #[serde(rename = "ECDH-ES+A256KW")]
    EcdhEsA256Kw,
}

impl KeyManagementAlgorithm {
    /// Name used in the `alg` header and key documents.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::EcdhEsA256Kw => "ECDH-ES+A256KW",
        }
    }

    /// Look up an algorithm by header name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "ECDH-ES+A256KW" => Some(Self::EcdhEsA256Kw),
            _ => None,
        }
    }
}

/// Content encryption algorithm for encrypted tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContentEncryption {
    /// AES-256 in Galois/Counter Mode.
    #[serde(rename = "A256GCM")]
    A256Gcm,
}

impl ContentEncryption {
    /// Name used in the `enc` header.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::A256Gcm => "A256GCM",
        }
    }

    /// Look up an algorithm by header name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "A256GCM" => Some(Self::A256Gcm),
            _ => None,
        }
    }
}
