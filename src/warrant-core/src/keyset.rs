//! Key set store.
//!
//! Keys travel as JWKS documents. Signing keys are Ed25519 (`OKP`),
//! encryption keys are P-256 (`EC`). A [`PublicKeySet`] can never hold
//! private material: parsing a document that carries a `d` member into one
//! is rejected, and its serialization has no field to put one in.
//!
//! Every generated key gets a fresh UUID v4 key id. Private signing keys
//! carry the issuer they were created for, so attestation engines can stamp
//! tokens without the caller repeating it.

use std::fmt;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use p256::elliptic_curve::sec1::ToEncodedPoint;
use rand_core::OsRng;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};
use uuid::Uuid;
use warrant_crypto::{
    Ed25519Signer, Ed25519Verifier, KeyManagementAlgorithm, SignatureAlgorithm, Signer as _,
};

use crate::encoding::{base64url_decode_array, base64url_encode};

/// What a key may be used for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyPurpose {
    /// Ed25519 token signing.
    Signing,
    /// P-256 key agreement for token encryption.
    Encryption,
}

impl KeyPurpose {
    /// JWK `use` value.
    #[must_use]
    pub const fn jwk_use(&self) -> &'static str {
        match self {
            Self::Signing => "sig",
            Self::Encryption => "enc",
        }
    }
}

impl fmt::Display for KeyPurpose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Signing => write!(f, "signing"),
            Self::Encryption => write!(f, "encryption"),
        }
    }
}

/// Errors from loading, saving, or querying key sets.
#[derive(Debug, Error)]
pub enum KeySetError {
    /// Document is not a valid key set.
    #[error("Malformed key set: {reason}")]
    Malformed {
        /// What was wrong.
        reason: String,
    },

    /// A public key set document carried private key material.
    #[error("Public key set contains private material for key {kid}")]
    PrivateMaterialInPublicSet {
        /// Offending key id.
        kid: String,
    },

    /// Two keys share an id.
    #[error("Duplicate key id: {kid}")]
    DuplicateKeyId {
        /// Repeated key id.
        kid: String,
    },

    /// The key's declared use does not match its type.
    #[error("Key {kid} cannot be used for {purpose}")]
    WrongPurpose {
        /// Offending key id.
        kid: String,
        /// Purpose implied by the key type.
        purpose: KeyPurpose,
    },

    /// A private signing key has no issuer stamp.
    #[error("Signing key {kid} has no issuer")]
    MissingIssuer {
        /// Offending key id.
        kid: String,
    },

    /// No key with the requested id and purpose.
    #[error("Key not found: {kid}")]
    KeyNotFound {
        /// Requested key id.
        kid: String,
    },

    /// The set has no key for the requested purpose.
    #[error("No usable {purpose} key in key set")]
    NoUsableKey {
        /// Requested purpose.
        purpose: KeyPurpose,
    },

    /// The set has more than one key where exactly one is required.
    #[error("Expected one {purpose} key, found {count}")]
    AmbiguousKey {
        /// Requested purpose.
        purpose: KeyPurpose,
        /// How many were present.
        count: usize,
    },

    /// File could not be read or written.
    #[error("Key set I/O error on {}: {source}", path.display())]
    Io {
        /// File involved.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
}

impl KeySetError {
    fn malformed(reason: impl Into<String>) -> Self {
        Self::Malformed {
            reason: reason.into(),
        }
    }

    fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Public half of an Ed25519 signing key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicSigningKey {
    kid: String,
    key: ed25519_dalek::VerifyingKey,
}

impl PublicSigningKey {
    /// Key id.
    #[must_use]
    pub fn kid(&self) -> &str {
        &self.kid
    }

    /// Raw 32-byte public key.
    #[must_use]
    pub fn to_bytes(&self) -> [u8; 32] {
        self.key.to_bytes()
    }
}

/// Public P-256 key that tokens are encrypted to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptionKey {
    kid: String,
    key: p256::PublicKey,
}

impl EncryptionKey {
    /// Key id.
    #[must_use]
    pub fn kid(&self) -> &str {
        &self.kid
    }

    /// Underlying curve point.
    #[must_use]
    pub fn public_key(&self) -> &p256::PublicKey {
        &self.key
    }
}

/// Private Ed25519 key with its issuer stamp.
#[derive(Debug, Clone)]
pub struct SigningKey {
    kid: String,
    issuer: String,
    signer: Ed25519Signer,
}

impl SigningKey {
    /// Key id, written into every token header this key signs.
    #[must_use]
    pub fn kid(&self) -> &str {
        &self.kid
    }

    /// Issuer this key was generated for.
    #[must_use]
    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    /// Signer over the secret seed.
    #[must_use]
    pub fn signer(&self) -> &Ed25519Signer {
        &self.signer
    }

    /// The matching public key.
    #[must_use]
    pub fn public_key(&self) -> PublicSigningKey {
        PublicSigningKey {
            kid: self.kid.clone(),
            key: self.signer.verifying_key(),
        }
    }
}

/// Private P-256 key that decrypts tokens.
#[derive(Clone)]
pub struct DecryptionKey {
    kid: String,
    secret: p256::SecretKey,
}

impl DecryptionKey {
    /// Key id.
    #[must_use]
    pub fn kid(&self) -> &str {
        &self.kid
    }

    /// Secret scalar.
    #[must_use]
    pub fn secret(&self) -> &p256::SecretKey {
        &self.secret
    }

    /// The matching public key.
    #[must_use]
    pub fn public_key(&self) -> EncryptionKey {
        EncryptionKey {
            kid: self.kid.clone(),
            key: self.secret.public_key(),
        }
    }
}

impl fmt::Debug for DecryptionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DecryptionKey")
            .field("kid", &self.kid)
            .finish_non_exhaustive()
    }
}

/// One key in a [`PublicKeySet`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublicKeyEntry {
    /// Verifies signatures.
    Signing(PublicSigningKey),
    /// Encrypts tokens.
    Encryption(EncryptionKey),
}

impl PublicKeyEntry {
    /// Key id.
    #[must_use]
    pub fn kid(&self) -> &str {
        match self {
            Self::Signing(k) => k.kid(),
            Self::Encryption(k) => k.kid(),
        }
    }

    /// What the key is for.
    #[must_use]
    pub fn purpose(&self) -> KeyPurpose {
        match self {
            Self::Signing(_) => KeyPurpose::Signing,
            Self::Encryption(_) => KeyPurpose::Encryption,
        }
    }
}

/// One key in a [`PrivateKeySet`].
#[derive(Debug, Clone)]
pub enum PrivateKeyEntry {
    /// Signs tokens.
    Signing(SigningKey),
    /// Decrypts tokens.
    Encryption(DecryptionKey),
}

impl PrivateKeyEntry {
    /// Key id.
    #[must_use]
    pub fn kid(&self) -> &str {
        match self {
            Self::Signing(k) => k.kid(),
            Self::Encryption(k) => k.kid(),
        }
    }

    /// What the key is for.
    #[must_use]
    pub fn purpose(&self) -> KeyPurpose {
        match self {
            Self::Signing(_) => KeyPurpose::Signing,
            Self::Encryption(_) => KeyPurpose::Encryption,
        }
    }

    /// Public half of this key.
    #[must_use]
    pub fn public(&self) -> PublicKeyEntry {
        match self {
            Self::Signing(k) => PublicKeyEntry::Signing(k.public_key()),
            Self::Encryption(k) => PublicKeyEntry::Encryption(k.public_key()),
        }
    }
}

/// A set of public keys, safe to distribute.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PublicKeySet {
    keys: Vec<PublicKeyEntry>,
}

impl PublicKeySet {
    /// Empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Keys in document order.
    #[must_use]
    pub fn keys(&self) -> &[PublicKeyEntry] {
        &self.keys
    }

    /// Key ids in document order.
    pub fn key_ids(&self) -> impl Iterator<Item = &str> {
        self.keys.iter().map(PublicKeyEntry::kid)
    }

    /// Number of keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// True when the set holds no keys.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Add a key.
    ///
    /// # Errors
    ///
    /// Returns [`KeySetError::DuplicateKeyId`] if the id is already present.
    pub fn insert(&mut self, entry: PublicKeyEntry) -> Result<(), KeySetError> {
        if self.keys.iter().any(|k| k.kid() == entry.kid()) {
            return Err(KeySetError::DuplicateKeyId {
                kid: entry.kid().to_string(),
            });
        }
        self.keys.push(entry);
        Ok(())
    }

    /// Remove a key by id, returning it if it was present.
    pub fn remove(&mut self, kid: &str) -> Option<PublicKeyEntry> {
        let index = self.keys.iter().position(|k| k.kid() == kid)?;
        Some(self.keys.remove(index))
    }

    /// Add every key of `other`, for publishing old and new keys together
    /// during rotation. Keys already present with identical material are
    /// skipped.
    ///
    /// # Errors
    ///
    /// Returns [`KeySetError::DuplicateKeyId`] if `other` reuses an id for
    /// different key material. `self` is left unchanged in that case.
    pub fn merge(&mut self, other: &PublicKeySet) -> Result<(), KeySetError> {
        let mut merged = self.keys.clone();
        for entry in &other.keys {
            match merged.iter().find(|k| k.kid() == entry.kid()) {
                Some(existing) if existing == entry => {},
                Some(_) => {
                    return Err(KeySetError::DuplicateKeyId {
                        kid: entry.kid().to_string(),
                    })
                },
                None => merged.push(entry.clone()),
            }
        }
        self.keys = merged;
        Ok(())
    }

    /// Look up a signing key by id.
    ///
    /// # Errors
    ///
    /// Returns [`KeySetError::KeyNotFound`] if no signing key has this id.
    pub fn signing_key(&self, kid: &str) -> Result<&PublicSigningKey, KeySetError> {
        self.keys
            .iter()
            .find_map(|k| match k {
                PublicKeyEntry::Signing(key) if key.kid == kid => Some(key),
                _ => None,
            })
            .ok_or_else(|| KeySetError::KeyNotFound {
                kid: kid.to_string(),
            })
    }

    /// Look up an encryption key by id, or take the first one in the set
    /// when `kid` is `None`.
    ///
    /// # Errors
    ///
    /// Returns [`KeySetError::KeyNotFound`] for an unknown id and
    /// [`KeySetError::NoUsableKey`] when the set has no encryption key.
    pub fn encryption_key(&self, kid: Option<&str>) -> Result<&EncryptionKey, KeySetError> {
        let mut candidates = self.keys.iter().filter_map(|k| match k {
            PublicKeyEntry::Encryption(key) => Some(key),
            PublicKeyEntry::Signing(_) => None,
        });

        match kid {
            Some(kid) => candidates
                .find(|k| k.kid == kid)
                .ok_or_else(|| KeySetError::KeyNotFound {
                    kid: kid.to_string(),
                }),
            None => candidates.next().ok_or(KeySetError::NoUsableKey {
                purpose: KeyPurpose::Encryption,
            }),
        }
    }

    /// Parse a JWKS document.
    ///
    /// Keys of unsupported types are skipped.
    ///
    /// # Errors
    ///
    /// Fails on malformed JSON or key parameters, duplicate ids, and any key
    /// that carries private material.
    pub fn from_json(bytes: &[u8]) -> Result<Self, KeySetError> {
        let document: JwkSetDocument = serde_json::from_slice(bytes)
            .map_err(|e| KeySetError::malformed(e.to_string()))?;

        let mut set = Self::new();
        for jwk in document.keys {
            let Some(parsed) = parse_jwk(jwk)? else {
                continue;
            };
            if parsed.private.is_some() {
                return Err(KeySetError::PrivateMaterialInPublicSet {
                    kid: parsed.public.kid().to_string(),
                });
            }
            set.insert(parsed.public)?;
        }

        debug!(keys = set.len(), "Loaded public key set");
        Ok(set)
    }

    /// Serialize as a pretty-printed JWKS document.
    ///
    /// # Errors
    ///
    /// Returns error if serialization fails.
    pub fn to_json(&self) -> Result<Vec<u8>, KeySetError> {
        let document = JwkSetDocument {
            keys: self.keys.iter().map(public_jwk).collect(),
        };
        serde_json::to_vec_pretty(&document).map_err(|e| KeySetError::malformed(e.to_string()))
    }

    /// Read and parse a JWKS file.
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read or parsed.
    pub fn read_from(path: impl AsRef<Path>) -> Result<Self, KeySetError> {
        let path = path.as_ref();
        let bytes = fs::read(path).map_err(|e| KeySetError::io(path, e))?;
        Self::from_json(&bytes)
    }

    /// Write the set to a file, replacing any existing content.
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be written.
    pub fn write_to(&self, path: impl AsRef<Path>) -> Result<(), KeySetError> {
        write_document(path.as_ref(), &self.to_json()?, false)
    }
}

/// A set of private keys. Never distribute.
#[derive(Debug, Clone, Default)]
pub struct PrivateKeySet {
    keys: Vec<PrivateKeyEntry>,
}

impl PrivateKeySet {
    /// Empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Keys in document order.
    #[must_use]
    pub fn keys(&self) -> &[PrivateKeyEntry] {
        &self.keys
    }

    /// Number of keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// True when the set holds no keys.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Add a key.
    ///
    /// # Errors
    ///
    /// Returns [`KeySetError::DuplicateKeyId`] if the id is already present.
    pub fn insert(&mut self, entry: PrivateKeyEntry) -> Result<(), KeySetError> {
        if self.keys.iter().any(|k| k.kid() == entry.kid()) {
            return Err(KeySetError::DuplicateKeyId {
                kid: entry.kid().to_string(),
            });
        }
        self.keys.push(entry);
        Ok(())
    }

    /// Public halves of every key.
    #[must_use]
    pub fn public(&self) -> PublicKeySet {
        PublicKeySet {
            keys: self.keys.iter().map(PrivateKeyEntry::public).collect(),
        }
    }

    /// The set's single signing key.
    ///
    /// # Errors
    ///
    /// Returns [`KeySetError::NoUsableKey`] if there is none and
    /// [`KeySetError::AmbiguousKey`] if there are several.
    pub fn signing_key(&self) -> Result<&SigningKey, KeySetError> {
        let signing: Vec<&SigningKey> = self
            .keys
            .iter()
            .filter_map(|k| match k {
                PrivateKeyEntry::Signing(key) => Some(key),
                PrivateKeyEntry::Encryption(_) => None,
            })
            .collect();

        match signing.as_slice() {
            [key] => Ok(*key),
            [] => Err(KeySetError::NoUsableKey {
                purpose: KeyPurpose::Signing,
            }),
            many => Err(KeySetError::AmbiguousKey {
                purpose: KeyPurpose::Signing,
                count: many.len(),
            }),
        }
    }

    /// Look up a decryption key by id.
    ///
    /// # Errors
    ///
    /// Returns [`KeySetError::KeyNotFound`] if no encryption key has this id.
    pub fn decryption_key(&self, kid: &str) -> Result<&DecryptionKey, KeySetError> {
        self.keys
            .iter()
            .find_map(|k| match k {
                PrivateKeyEntry::Encryption(key) if key.kid == kid => Some(key),
                _ => None,
            })
            .ok_or_else(|| KeySetError::KeyNotFound {
                kid: kid.to_string(),
            })
    }

    /// Parse a JWKS document in which every key carries its private part.
    ///
    /// # Errors
    ///
    /// Fails on malformed JSON or key parameters, duplicate ids, a key
    /// without private material, or a signing key without an issuer.
    pub fn from_json(bytes: &[u8]) -> Result<Self, KeySetError> {
        let document: JwkSetDocument = serde_json::from_slice(bytes)
            .map_err(|e| KeySetError::malformed(e.to_string()))?;

        let mut set = Self::new();
        for jwk in document.keys {
            let Some(parsed) = parse_jwk(jwk)? else {
                continue;
            };
            let kid = parsed.public.kid().to_string();
            let private = parsed.private.ok_or_else(|| {
                KeySetError::malformed(format!("key {} has no private component", kid))
            })?;
            set.insert(private)?;
        }

        debug!(keys = set.len(), "Loaded private key set");
        Ok(set)
    }

    /// Serialize as a pretty-printed JWKS document, private parts included.
    ///
    /// # Errors
    ///
    /// Returns error if serialization fails.
    pub fn to_json(&self) -> Result<Vec<u8>, KeySetError> {
        let document = JwkSetDocument {
            keys: self.keys.iter().map(private_jwk).collect(),
        };
        serde_json::to_vec_pretty(&document).map_err(|e| KeySetError::malformed(e.to_string()))
    }

    /// Read and parse a private JWKS file.
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read or parsed.
    pub fn read_from(path: impl AsRef<Path>) -> Result<Self, KeySetError> {
        let path = path.as_ref();
        let bytes = fs::read(path).map_err(|e| KeySetError::io(path, e))?;
        Self::from_json(&bytes)
    }

    /// Write the set to a file readable only by its owner.
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be written.
    pub fn write_to(&self, path: impl AsRef<Path>) -> Result<(), KeySetError> {
        write_document(path.as_ref(), &self.to_json()?, true)
    }
}

/// Generate a signing key pair for `issuer`.
///
/// # Errors
///
/// Returns [`KeySetError::Malformed`] if `issuer` is empty.
pub fn new_signing_key_set(issuer: &str) -> Result<(PublicKeySet, PrivateKeySet), KeySetError> {
    if issuer.is_empty() {
        return Err(KeySetError::malformed("issuer must not be empty"));
    }

    let key = SigningKey {
        kid: new_key_id(),
        issuer: issuer.to_string(),
        signer: Ed25519Signer::random(),
    };

    debug!(kid = %key.kid, issuer = %issuer, "Generated signing key");

    let public = PublicKeySet {
        keys: vec![PublicKeyEntry::Signing(key.public_key())],
    };
    let private = PrivateKeySet {
        keys: vec![PrivateKeyEntry::Signing(key)],
    };
    Ok((public, private))
}

/// Generate an encryption key pair.
#[must_use]
pub fn new_encryption_key_set() -> (PublicKeySet, PrivateKeySet) {
    let key = DecryptionKey {
        kid: new_key_id(),
        secret: p256::SecretKey::random(&mut OsRng),
    };

    debug!(kid = %key.kid, "Generated encryption key");

    let public = PublicKeySet {
        keys: vec![PublicKeyEntry::Encryption(key.public_key())],
    };
    let private = PrivateKeySet {
        keys: vec![PrivateKeyEntry::Encryption(key)],
    };
    (public, private)
}

/// Extract the single private signing key from a JWKS document.
///
/// # Errors
///
/// Fails if the document is malformed, or does not hold exactly one private
/// signing key.
pub fn private_signing_key(jwks: &[u8]) -> Result<SigningKey, KeySetError> {
    PrivateKeySet::from_json(jwks)?.signing_key().cloned()
}

/// Extract the public signing key with id `kid` from a JWKS document.
///
/// # Errors
///
/// Fails if the document is malformed or has no signing key with that id.
pub fn public_signing_key(jwks: &[u8], kid: &str) -> Result<PublicSigningKey, KeySetError> {
    PublicKeySet::from_json(jwks)?.signing_key(kid).cloned()
}

fn new_key_id() -> String {
    Uuid::new_v4().to_string()
}

#[derive(Serialize, Deserialize)]
struct JwkSetDocument {
    keys: Vec<Jwk>,
}

/// Wire form of a single JWK. Not `Debug`: it may hold `d`.
#[derive(Default, Serialize, Deserialize)]
struct Jwk {
    kty: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    crv: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    x: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    y: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    d: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    kid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    alg: Option<String>,
    #[serde(rename = "use", default, skip_serializing_if = "Option::is_none")]
    key_use: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    iss: Option<String>,
}

struct ParsedKey {
    public: PublicKeyEntry,
    private: Option<PrivateKeyEntry>,
}

fn parse_jwk(jwk: Jwk) -> Result<Option<ParsedKey>, KeySetError> {
    let kid = match jwk.kid.as_deref() {
        Some(kid) if !kid.is_empty() => kid.to_string(),
        _ => return Err(KeySetError::malformed("key is missing \"kid\"")),
    };

    match (jwk.kty.as_str(), jwk.crv.as_deref()) {
        ("OKP", Some("Ed25519")) => parse_ed25519(kid, &jwk).map(Some),
        ("EC", Some("P-256")) => parse_p256(kid, &jwk).map(Some),
        (kty, crv) => {
            warn!(kid = %kid, kty = %kty, crv = ?crv, "Skipping unsupported key type");
            Ok(None)
        },
    }
}

fn check_use_and_alg(
    kid: &str,
    jwk: &Jwk,
    purpose: KeyPurpose,
    alg: &str,
) -> Result<(), KeySetError> {
    if let Some(key_use) = jwk.key_use.as_deref() {
        if key_use != purpose.jwk_use() {
            return Err(KeySetError::WrongPurpose {
                kid: kid.to_string(),
                purpose,
            });
        }
    }
    if let Some(declared) = jwk.alg.as_deref() {
        if declared != alg {
            return Err(KeySetError::malformed(format!(
                "key {} declares algorithm {}, expected {}",
                kid, declared, alg
            )));
        }
    }
    Ok(())
}

fn required_coordinate(kid: &str, name: &str, value: Option<&str>) -> Result<[u8; 32], KeySetError> {
    value
        .and_then(base64url_decode_array::<32>)
        .ok_or_else(|| KeySetError::malformed(format!("key {} has invalid \"{}\"", kid, name)))
}

fn parse_ed25519(kid: String, jwk: &Jwk) -> Result<ParsedKey, KeySetError> {
    check_use_and_alg(&kid, jwk, KeyPurpose::Signing, SignatureAlgorithm::EdDsa.name())?;

    let x = required_coordinate(&kid, "x", jwk.x.as_deref())?;
    let key = Ed25519Verifier::parse_public_key(&x)
        .map_err(|e| KeySetError::malformed(format!("key {}: {}", kid, e)))?;

    let private = match jwk.d.as_deref() {
        None => None,
        Some(d) => {
            let seed = required_coordinate(&kid, "d", Some(d))?;
            let signer = Ed25519Signer::from_seed(&seed)
                .map_err(|e| KeySetError::malformed(format!("key {}: {}", kid, e)))?;
            if signer.public_key() != x {
                return Err(KeySetError::malformed(format!(
                    "key {} private component does not match its public key",
                    kid
                )));
            }
            let issuer = match jwk.iss.as_deref() {
                Some(iss) if !iss.is_empty() => iss.to_string(),
                _ => return Err(KeySetError::MissingIssuer { kid }),
            };
            Some(PrivateKeyEntry::Signing(SigningKey {
                kid: kid.clone(),
                issuer,
                signer,
            }))
        },
    };

    Ok(ParsedKey {
        public: PublicKeyEntry::Signing(PublicSigningKey { kid, key }),
        private,
    })
}

fn parse_p256(kid: String, jwk: &Jwk) -> Result<ParsedKey, KeySetError> {
    check_use_and_alg(
        &kid,
        jwk,
        KeyPurpose::Encryption,
        KeyManagementAlgorithm::EcdhEsA256Kw.name(),
    )?;

    let x = required_coordinate(&kid, "x", jwk.x.as_deref())?;
    let y = required_coordinate(&kid, "y", jwk.y.as_deref())?;
    let key = p256_from_coordinates(&x, &y)
        .ok_or_else(|| KeySetError::malformed(format!("key {} is not a P-256 point", kid)))?;

    let private = match jwk.d.as_deref() {
        None => None,
        Some(d) => {
            let scalar = required_coordinate(&kid, "d", Some(d))?;
            let secret = p256::SecretKey::from_bytes(&scalar.into())
                .map_err(|_| KeySetError::malformed(format!("key {} has invalid \"d\"", kid)))?;
            if secret.public_key() != key {
                return Err(KeySetError::malformed(format!(
                    "key {} private component does not match its public key",
                    kid
                )));
            }
            Some(PrivateKeyEntry::Encryption(DecryptionKey {
                kid: kid.clone(),
                secret,
            }))
        },
    };

    Ok(ParsedKey {
        public: PublicKeyEntry::Encryption(EncryptionKey { kid, key }),
        private,
    })
}

/// Build a P-256 public key from raw affine coordinates.
pub(crate) fn p256_from_coordinates(x: &[u8; 32], y: &[u8; 32]) -> Option<p256::PublicKey> {
    let point = p256::EncodedPoint::from_affine_coordinates(&(*x).into(), &(*y).into(), false);
    p256::PublicKey::from_sec1_bytes(point.as_bytes()).ok()
}

/// Base64url affine coordinates of a P-256 public key.
pub(crate) fn p256_coordinates(key: &p256::PublicKey) -> (String, String) {
    let point = key.to_encoded_point(false);
    let encode = |c: Option<&p256::FieldBytes>| c.map(|c| base64url_encode(c)).unwrap_or_default();
    (encode(point.x()), encode(point.y()))
}

fn public_jwk(entry: &PublicKeyEntry) -> Jwk {
    match entry {
        PublicKeyEntry::Signing(key) => Jwk {
            kty: "OKP".to_string(),
            crv: Some("Ed25519".to_string()),
            x: Some(base64url_encode(&key.to_bytes())),
            kid: Some(key.kid.clone()),
            alg: Some(SignatureAlgorithm::EdDsa.name().to_string()),
            key_use: Some(KeyPurpose::Signing.jwk_use().to_string()),
            ..Jwk::default()
        },
        PublicKeyEntry::Encryption(key) => {
            let (x, y) = p256_coordinates(&key.key);
            Jwk {
                kty: "EC".to_string(),
                crv: Some("P-256".to_string()),
                x: Some(x),
                y: Some(y),
                kid: Some(key.kid.clone()),
                alg: Some(KeyManagementAlgorithm::EcdhEsA256Kw.name().to_string()),
                key_use: Some(KeyPurpose::Encryption.jwk_use().to_string()),
                ..Jwk::default()
            }
        },
    }
}

fn private_jwk(entry: &PrivateKeyEntry) -> Jwk {
    let mut jwk = public_jwk(&entry.public());
    match entry {
        PrivateKeyEntry::Signing(key) => {
            jwk.d = Some(base64url_encode(&key.signer.seed()));
            jwk.iss = Some(key.issuer.clone());
        },
        PrivateKeyEntry::Encryption(key) => {
            jwk.d = Some(base64url_encode(&key.secret.to_bytes()));
        },
    }
    jwk
}

fn write_document(path: &Path, bytes: &[u8], private: bool) -> Result<(), KeySetError> {
    let mut options = fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    restrict_to_owner(&mut options, private);

    let mut file = options.open(path).map_err(|e| KeySetError::io(path, e))?;
    // mode() only applies on creation; an existing file keeps its old mode
    if private {
        set_owner_only(&file).map_err(|e| KeySetError::io(path, e))?;
    }
    file.write_all(bytes).map_err(|e| KeySetError::io(path, e))?;
    file.sync_all().map_err(|e| KeySetError::io(path, e))?;

    debug!(path = %path.display(), private, "Wrote key set");
    Ok(())
}

#[cfg(unix)]
fn restrict_to_owner(options: &mut fs::OpenOptions, private: bool) {
    use std::os::unix::fs::OpenOptionsExt;
    if private {
        options.mode(0o600);
    }
}

#[cfg(not(unix))]
fn restrict_to_owner(_options: &mut fs::OpenOptions, _private: bool) {}

#[cfg(unix)]
fn set_owner_only(file: &fs::File) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    file.set_permissions(fs::Permissions::from_mode(0o600))
}

#[cfg(not(unix))]
fn set_owner_only(_file: &fs::File) -> std::io::Result<()> {
    Ok(())
}
