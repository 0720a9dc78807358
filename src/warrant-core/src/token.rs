//! Compact token codec.
//!
//! Signed tokens are three-part JWS (`header.payload.signature`) with
//! `alg: EdDSA` and a mandatory `kid`. Encrypted tokens are five-part JWE
//! (`header.encrypted_key.iv.ciphertext.tag`) using `ECDH-ES+A256KW` key
//! management and `A256GCM` content encryption; the base64url protected
//! header is the additional authenticated data.
//!
//! Verification resolves the key by `kid` from the supplied set, so old and
//! new keys can be published side by side during rotation.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;
use warrant_crypto::{
    generate_iv, open, seal, unwrap_cek, wrap_cek, ContentEncryption, CryptoError,
    Ed25519Verifier, KeyManagementAlgorithm, SignatureAlgorithm, Signer as _, Verifier as _,
};

use crate::encoding::{base64url_decode, base64url_decode_array, base64url_encode};
use crate::keyset::{
    p256_coordinates, p256_from_coordinates, KeySetError, PrivateKeySet, PublicKeySet, SigningKey,
};

/// Media type written into signed token headers.
const TOKEN_TYPE: &str = "JWT";

/// Errors from signing, verifying, encrypting, or decrypting tokens.
#[derive(Debug, Error)]
pub enum TokenError {
    /// Token does not have the expected shape.
    #[error("Malformed token: {reason}")]
    Malformed {
        /// What was wrong.
        reason: String,
    },

    /// Header carries no `kid`.
    #[error("Token header has no key id")]
    MissingKeyId,

    /// No key in the supplied set matches the header's `kid`.
    #[error("Key not found: {kid}")]
    KeyNotFound {
        /// Key id from the header.
        kid: String,
    },

    /// Header names an algorithm this codec does not accept.
    #[error("Unsupported algorithm: {alg}")]
    UnsupportedAlgorithm {
        /// Algorithm from the header.
        alg: String,
    },

    /// Signature did not verify.
    #[error("Signature verification failed")]
    SignatureInvalid,

    /// Payload is not a valid claim set.
    #[error("Invalid claims: {reason}")]
    InvalidClaims {
        /// What was wrong.
        reason: String,
    },

    /// Decryption failed. The cause is kept for diagnostics only.
    #[error("Decryption failed")]
    DecryptionFailed {
        /// Underlying failure.
        #[source]
        cause: Box<TokenError>,
    },

    /// Key set could not supply a key.
    #[error(transparent)]
    KeySet(#[from] KeySetError),

    /// Cryptographic primitive failed.
    #[error("Crypto error: {0}")]
    Crypto(#[from] CryptoError),
}

impl TokenError {
    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        Self::Malformed {
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid_claims(reason: impl Into<String>) -> Self {
        Self::InvalidClaims {
            reason: reason.into(),
        }
    }

    /// True when the token named no key or a key the set does not hold.
    ///
    /// Decryption failures are opaque and never report true.
    #[must_use]
    pub fn is_key_not_found(&self) -> bool {
        matches!(
            self,
            Self::MissingKeyId
                | Self::KeyNotFound { .. }
                | Self::KeySet(KeySetError::KeyNotFound { .. })
        )
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct SignedHeader {
    alg: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    kid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    typ: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct EncryptedHeader {
    alg: String,
    enc: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    kid: Option<String>,
    epk: EphemeralKey,
}

#[derive(Debug, Serialize, Deserialize)]
struct EphemeralKey {
    kty: String,
    crv: String,
    x: String,
    y: String,
}

#[derive(Deserialize)]
struct KeyIdOnly {
    #[serde(default)]
    kid: Option<String>,
}

/// Sign `claims` as a compact JWS with `key`.
///
/// Ed25519 is deterministic, so identical claims and key produce an
/// identical token.
///
/// # Errors
///
/// Returns error if the claims cannot be serialized or signing fails.
pub fn sign<C>(key: &SigningKey, claims: &C) -> Result<String, TokenError>
where
    C: Serialize + ?Sized,
{
    let header = SignedHeader {
        alg: SignatureAlgorithm::EdDsa.name().to_string(),
        kid: Some(key.kid().to_string()),
        typ: Some(TOKEN_TYPE.to_string()),
    };
    let header_json = serde_json::to_vec(&header).map_err(|e| TokenError::malformed(e.to_string()))?;
    let payload = serde_json::to_vec(claims).map_err(|e| TokenError::invalid_claims(e.to_string()))?;

    let signing_input = format!(
        "{}.{}",
        base64url_encode(&header_json),
        base64url_encode(&payload)
    );
    let signature = key.signer().sign(signing_input.as_bytes())?;

    debug!(kid = %key.kid(), "Signed token");
    Ok(format!("{}.{}", signing_input, base64url_encode(&signature)))
}

/// Verify a compact JWS against `keys` and return its payload bytes.
///
/// # Errors
///
/// - [`TokenError::Malformed`] for a token that is not three base64url
///   parts with a JSON header
/// - [`TokenError::UnsupportedAlgorithm`] unless `alg` is `EdDSA`
/// - [`TokenError::MissingKeyId`] / [`TokenError::KeyNotFound`] when the
///   key cannot be resolved
/// - [`TokenError::SignatureInvalid`] when the signature does not verify
pub fn verify(token: &str, keys: &PublicKeySet) -> Result<Vec<u8>, TokenError> {
    let parts: Vec<&str> = token.split('.').collect();
    let [header_b64, payload_b64, signature_b64] = parts.as_slice() else {
        return Err(TokenError::malformed(format!(
            "expected 3 parts, got {}",
            parts.len()
        )));
    };

    let header: SignedHeader = decode_json(header_b64)?;
    if SignatureAlgorithm::from_name(&header.alg).is_none() {
        return Err(TokenError::UnsupportedAlgorithm { alg: header.alg });
    }
    let kid = require_key_id(header.kid)?;

    let key = keys
        .signing_key(&kid)
        .map_err(|_| TokenError::KeyNotFound { kid: kid.clone() })?;

    let signature = base64url_decode(signature_b64)
        .map_err(|e| TokenError::malformed(format!("signature: {}", e)))?;
    let signing_input_len = header_b64.len() + 1 + payload_b64.len();
    let signing_input = &token.as_bytes()[..signing_input_len];

    let valid = Ed25519Verifier::new()
        .verify(&key.to_bytes(), signing_input, &signature)
        .map_err(|_| TokenError::SignatureInvalid)?;
    if !valid {
        debug!(kid = %kid, "Token signature rejected");
        return Err(TokenError::SignatureInvalid);
    }

    base64url_decode(payload_b64).map_err(|e| TokenError::malformed(format!("payload: {}", e)))
}

/// Read the `kid` from a token header without verifying anything.
///
/// Works for both signed and encrypted tokens.
///
/// # Errors
///
/// Returns [`TokenError::Malformed`] if the header cannot be decoded and
/// [`TokenError::MissingKeyId`] if it has no `kid`.
pub fn peek_key_id(token: &str) -> Result<String, TokenError> {
    let header_b64 = token
        .split('.')
        .next()
        .filter(|h| !h.is_empty())
        .ok_or_else(|| TokenError::malformed("empty token"))?;
    let header: KeyIdOnly = decode_json(header_b64)?;
    require_key_id(header.kid)
}

/// Encrypt `plaintext` to an encryption key in `keys`.
///
/// With `kid` unset, the first encryption key in set order is used.
///
/// # Errors
///
/// Returns [`TokenError::KeyNotFound`] for an unknown `kid`, a
/// [`TokenError::KeySet`] error when the set has no encryption key, or a
/// crypto error if key agreement or sealing fails.
pub fn encrypt(plaintext: &[u8], keys: &PublicKeySet, kid: Option<&str>) -> Result<String, TokenError> {
    let recipient = keys.encryption_key(kid).map_err(|e| match e {
        KeySetError::KeyNotFound { kid } => TokenError::KeyNotFound { kid },
        other => TokenError::KeySet(other),
    })?;

    let wrapped = wrap_cek(recipient.public_key())?;
    let (epk_x, epk_y) = p256_coordinates(&wrapped.ephemeral_public);

    let header = EncryptedHeader {
        alg: KeyManagementAlgorithm::EcdhEsA256Kw.name().to_string(),
        enc: ContentEncryption::A256Gcm.name().to_string(),
        kid: Some(recipient.kid().to_string()),
        epk: EphemeralKey {
            kty: "EC".to_string(),
            crv: "P-256".to_string(),
            x: epk_x,
            y: epk_y,
        },
    };
    let header_json = serde_json::to_vec(&header).map_err(|e| TokenError::malformed(e.to_string()))?;
    let protected = base64url_encode(&header_json);

    let iv = generate_iv();
    let sealed = seal(&wrapped.cek[..], &iv, protected.as_bytes(), plaintext)?;

    debug!(kid = %recipient.kid(), bytes = plaintext.len(), "Encrypted token");
    Ok(format!(
        "{}.{}.{}.{}.{}",
        protected,
        base64url_encode(&wrapped.encrypted_key),
        base64url_encode(&iv),
        base64url_encode(&sealed.ciphertext),
        base64url_encode(&sealed.tag)
    ))
}

/// Decrypt a compact JWE with the matching key from `keys`.
///
/// # Errors
///
/// Every failure is reported as [`TokenError::DecryptionFailed`], so callers
/// cannot distinguish a wrong key from a modified token. The underlying
/// cause is available through [`std::error::Error::source`].
pub fn decrypt(token: &str, keys: &PrivateKeySet) -> Result<Vec<u8>, TokenError> {
    open_compact(token, keys).map_err(|cause| {
        debug!(error = %cause, "Token decryption failed");
        TokenError::DecryptionFailed {
            cause: Box::new(cause),
        }
    })
}

fn open_compact(token: &str, keys: &PrivateKeySet) -> Result<Vec<u8>, TokenError> {
    let parts: Vec<&str> = token.split('.').collect();
    let [protected, encrypted_key, iv, ciphertext, tag] = parts.as_slice() else {
        return Err(TokenError::malformed(format!(
            "expected 5 parts, got {}",
            parts.len()
        )));
    };

    let header: EncryptedHeader = decode_json(protected)?;
    if KeyManagementAlgorithm::from_name(&header.alg).is_none() {
        return Err(TokenError::UnsupportedAlgorithm { alg: header.alg });
    }
    if ContentEncryption::from_name(&header.enc).is_none() {
        return Err(TokenError::UnsupportedAlgorithm { alg: header.enc });
    }
    let kid = require_key_id(header.kid)?;

    let key = keys
        .decryption_key(&kid)
        .map_err(|_| TokenError::KeyNotFound { kid: kid.clone() })?;

    if header.epk.kty != "EC" || header.epk.crv != "P-256" {
        return Err(TokenError::malformed("ephemeral key is not P-256"));
    }
    let epk = base64url_decode_array::<32>(&header.epk.x)
        .zip(base64url_decode_array::<32>(&header.epk.y))
        .and_then(|(x, y)| p256_from_coordinates(&x, &y))
        .ok_or_else(|| TokenError::malformed("invalid ephemeral key"))?;

    let decode = |part: &str, name: &str| {
        base64url_decode(part).map_err(|e| TokenError::malformed(format!("{}: {}", name, e)))
    };
    let encrypted_key = decode(*encrypted_key, "encrypted key")?;
    let iv = decode(*iv, "iv")?;
    let ciphertext = decode(*ciphertext, "ciphertext")?;
    let tag = decode(*tag, "tag")?;

    let cek = unwrap_cek(key.secret(), &epk, &encrypted_key)?;
    let plaintext = open(&cek, &iv, protected.as_bytes(), &ciphertext, &tag)?;

    debug!(kid = %kid, bytes = plaintext.len(), "Decrypted token");
    Ok(plaintext)
}

fn decode_json<T: for<'de> Deserialize<'de>>(part: &str) -> Result<T, TokenError> {
    let bytes =
        base64url_decode(part).map_err(|e| TokenError::malformed(format!("header: {}", e)))?;
    serde_json::from_slice(&bytes).map_err(|e| TokenError::malformed(format!("header: {}", e)))
}

fn require_key_id(kid: Option<String>) -> Result<String, TokenError> {
    kid.filter(|k| !k.is_empty()).ok_or(TokenError::MissingKeyId)
}
