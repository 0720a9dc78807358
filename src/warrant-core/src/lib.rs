//! # warrant-core
//!
//! Issues and verifies warrant's signed trust artifacts: license keys,
//! supply-chain attestations, the revocation ledger, and the encrypted
//! envelope used to hand tokens to key holders.
//!
//! ## Data Flow
//!
//! ```text
//! issue:   KeySet ──▶ License / Attestation ──▶ token::sign ──▶ compact JWS
//!
//! verify:  compact JWS ──▶ token::verify ──▶ License / Attestation ──▶ caller
//!                                                 │
//!                                                 └──▶ RevocationLedger (licenses)
//!
//! deliver: bytes ──▶ token::encrypt ──▶ compact JWE ──▶ token::decrypt ──▶ bytes
//! ```
//!
//! The crate does no network I/O. Callers hand in JWKS bytes, token strings,
//! directory paths, and digest lists, and get back tokens, verified claims,
//! or typed errors.
//!
//! ## Failure Classes
//!
//! - Malformed input is reported with a description.
//! - A missing or unknown `kid` is detectable with
//!   [`TrustError::is_key_not_found`], even through wrappers.
//! - Signature and structural failures are folded into
//!   [`TrustError::InvalidLicense`] / [`TrustError::InvalidAttestation`];
//!   every decryption failure is [`TokenError::DecryptionFailed`].
//! - Expiry, revocation, checksum, and digest outcomes have their own
//!   variants.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)] // Allow Type in module::Type
#![allow(clippy::must_use_candidate)] // Not all functions need must_use

pub mod attestation;
pub mod config;
pub mod error;
pub mod keyset;
pub mod license;
pub mod revocation;
pub mod token;

mod claims;
mod encoding;

pub use attestation::{
    compute_checksum, ArtifactsAttestation, Attestation, DirectoryChecksum, ManifestsAttestation,
};
pub use config::{VerifyOptions, DEFAULT_CLOCK_SKEW};
pub use error::TrustError;
pub use keyset::{
    new_encryption_key_set, new_signing_key_set, private_signing_key, public_signing_key,
    DecryptionKey, EncryptionKey, KeyPurpose, KeySetError, PrivateKeyEntry, PrivateKeySet,
    PublicKeyEntry, PublicKeySet, PublicSigningKey, SigningKey,
};
pub use license::{check_license, License, LicenseWarning};
pub use revocation::{LedgerError, RevocationLedger, RevocationStatus};
pub use token::{decrypt, encrypt, peek_key_id, TokenError};
