//! Tamper detection and hostile input.

use std::fs;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use proptest::prelude::*;
use tempfile::TempDir;

use warrant_core::{
    decrypt, encrypt, new_encryption_key_set, new_signing_key_set, peek_key_id, token,
    ArtifactsAttestation, License, ManifestsAttestation, PrivateKeySet, PublicKeySet, SigningKey,
    TokenError, TrustError,
};

fn issuer_keys() -> (PublicKeySet, SigningKey) {
    let (public, private) = new_signing_key_set("acme.example").unwrap();
    (public, private.signing_key().unwrap().clone())
}

/// Flip one bit of the decoded payload and re-encode, leaving header and
/// signature as they were.
fn flip_payload(token: &str, index: usize, bit: u8) -> String {
    let parts: Vec<&str> = token.split('.').collect();
    assert_eq!(parts.len(), 3);

    let mut payload = URL_SAFE_NO_PAD.decode(parts[1]).unwrap();
    let index = index % payload.len();
    payload[index] ^= 1 << (bit % 8);

    format!("{}.{}.{}", parts[0], URL_SAFE_NO_PAD.encode(payload), parts[2])
}

/// Flip one bit in segment `segment` of a compact JWE.
fn flip_envelope(token: &str, segment: usize, index: usize, bit: u8) -> String {
    let mut parts: Vec<String> = token.split('.').map(str::to_string).collect();
    assert_eq!(parts.len(), 5);

    let mut bytes = URL_SAFE_NO_PAD.decode(&parts[segment]).unwrap();
    if bytes.is_empty() {
        bytes.push(0);
    } else {
        let index = index % bytes.len();
        bytes[index] ^= 1 << (bit % 8);
    }
    parts[segment] = URL_SAFE_NO_PAD.encode(bytes);
    parts.join(".")
}

fn manifests_dir() -> TempDir {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("deployment.yaml"), "replicas: 3\n").unwrap();
    fs::write(dir.path().join("service.yaml"), "port: 443\n").unwrap();
    dir
}

fn envelope_keys() -> (PublicKeySet, PrivateKeySet) {
    new_encryption_key_set()
}

#[test]
fn unsigned_token_is_rejected() {
    let (public, key) = issuer_keys();
    let (license, _) = License::new("acme.example", "Acme Inc", "product", chrono::Duration::days(1), vec![]);
    let token = license.sign(&key).unwrap();

    let mut parts: Vec<&str> = token.split('.').collect();
    parts[2] = "";
    let stripped = parts.join(".");

    assert!(License::verify(&stripped, &public).is_err());
}

#[test]
fn algorithm_swap_is_rejected() {
    let (public, key) = issuer_keys();
    let (license, _) = License::new("acme.example", "Acme Inc", "product", chrono::Duration::days(1), vec![]);
    let signed = license.sign(&key).unwrap();
    let parts: Vec<&str> = signed.split('.').collect();

    let header = format!(r#"{{"alg":"none","kid":"{}","typ":"JWT"}}"#, key.kid());
    let forged = format!("{}.{}.{}", URL_SAFE_NO_PAD.encode(header), parts[1], parts[2]);

    let err = token::verify(&forged, &public).unwrap_err();
    assert!(matches!(err, TokenError::UnsupportedAlgorithm { .. }));
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 32,
        max_shrink_iters: 200,
        ..ProptestConfig::default()
    })]

    #[test]
    fn tampered_license_fails_signature(index in any::<usize>(), bit in any::<u8>()) {
        let (public, key) = issuer_keys();
        let (license, _) = License::new(
            "acme.example",
            "Acme Inc",
            "product",
            chrono::Duration::days(30),
            vec!["feature-x".to_string()],
        );
        let tampered = flip_payload(&license.sign(&key).unwrap(), index, bit);

        let err = License::verify(&tampered, &public).unwrap_err();
        prop_assert!(matches!(err, TrustError::InvalidLicense { .. }), "unexpected error: {:?}", err);
        prop_assert!(err.is_cryptographic());
    }

    #[test]
    fn tampered_artifacts_fails_signature(index in any::<usize>(), bit in any::<u8>()) {
        let (public, key) = issuer_keys();
        let token = ArtifactsAttestation::sign(
            &key,
            "cluster-prod",
            ["sha256:0a1b2c3d4e5f60718293a4b5c6d7e8f90a1b2c3d4e5f60718293a4b5c6d7e8f9"],
        )
        .unwrap();
        let tampered = flip_payload(&token, index, bit);

        let err = ArtifactsAttestation::verify(&tampered, &public).unwrap_err();
        prop_assert!(matches!(err, TrustError::InvalidAttestation { .. }), "unexpected error: {:?}", err);
        prop_assert!(err.is_cryptographic());
    }

    #[test]
    fn tampered_manifests_fails_signature(index in any::<usize>(), bit in any::<u8>()) {
        let (public, key) = issuer_keys();
        let dir = manifests_dir();
        let none: &[&str] = &[];
        let (token, _) = ManifestsAttestation::sign(&key, "cluster-prod", dir.path(), none).unwrap();
        let tampered = flip_payload(&token, index, bit);

        let err = ManifestsAttestation::verify(&tampered, &public, dir.path(), none).unwrap_err();
        prop_assert!(matches!(err, TrustError::InvalidAttestation { .. }), "unexpected error: {:?}", err);
        prop_assert!(err.is_cryptographic());
    }

    #[test]
    fn tampered_envelope_fails_decryption(
        segment in 1usize..5,
        index in any::<usize>(),
        bit in any::<u8>(),
    ) {
        let (public, private) = envelope_keys();
        let envelope = encrypt(b"license token bytes", &public, None).unwrap();
        let tampered = flip_envelope(&envelope, segment, index, bit);

        let err = decrypt(&tampered, &private).unwrap_err();
        prop_assert!(matches!(err, TokenError::DecryptionFailed { .. }), "unexpected error: {:?}", err);
    }

    #[test]
    fn arbitrary_input_never_panics(input in ".{0,512}") {
        let (public, _) = issuer_keys();
        let (_, private) = envelope_keys();

        let _ = token::verify(&input, &public);
        let _ = decrypt(&input, &private);
        let _ = peek_key_id(&input);
        let _ = License::verify(&input, &public);
        let _ = ArtifactsAttestation::verify(&input, &public);
        let _ = PublicKeySet::from_json(input.as_bytes());
        let _ = PrivateKeySet::from_json(input.as_bytes());
    }

    #[test]
    fn dotted_garbage_never_panics(
        parts in prop::collection::vec("[A-Za-z0-9_-]{0,64}", 0..7),
    ) {
        let (public, _) = issuer_keys();
        let (_, private) = envelope_keys();
        let input = parts.join(".");

        prop_assert!(token::verify(&input, &public).is_err());
        prop_assert!(decrypt(&input, &private).is_err());
        let _ = peek_key_id(&input);
    }
}
