//! License issuance and verification end to end.

use std::time::Duration;

use proptest::prelude::*;
use tempfile::TempDir;

use warrant_core::{
    check_license, new_signing_key_set, private_signing_key, License, LicenseWarning,
    PublicKeySet, RevocationLedger, SigningKey, TrustError, VerifyOptions,
};

fn issuer_keys(issuer: &str) -> (PublicKeySet, SigningKey) {
    let (public, private) = new_signing_key_set(issuer).unwrap();
    let key = private_signing_key(&private.to_json().unwrap()).unwrap();
    (public, key)
}

#[test]
fn acme_scenario() {
    let (public, key) = issuer_keys("acme.example");

    let (license, warning) = License::new(
        "acme.example",
        "Acme Inc",
        "product",
        chrono::Duration::days(30),
        vec!["feature-x".to_string()],
    );
    assert!(warning.is_none());

    let token = license.sign(&key).unwrap();
    let verified = License::verify(&token, &public).unwrap();

    assert_eq!(verified.issuer, "acme.example");
    assert_eq!(verified.subject, "Acme Inc");
    assert_eq!(verified.audience, "product");
    assert_eq!(verified.capabilities, vec!["feature-x".to_string()]);
    assert!(!verified.is_expired(Duration::from_secs(1)));

    let dir = TempDir::new().unwrap();
    let path = dir.path().join("revocations.json");
    let mut ledger = RevocationLedger::new("acme.example");
    assert!(!ledger.is_revoked(&verified).revoked);

    ledger.add_key(&verified.id);
    ledger.persist(&path).unwrap();

    let reloaded = RevocationLedger::load(&path).unwrap();
    let status = reloaded.is_revoked(&verified);
    assert!(status.revoked);
    assert_eq!(status.license_id, verified.id);
    assert!(status.revoked_at.is_some());
}

#[test]
fn negative_duration_passes_verification_but_is_expired() {
    let (public, key) = issuer_keys("acme.example");
    let (license, warning) = License::new(
        "acme.example",
        "Acme Inc",
        "product",
        chrono::Duration::days(-1),
        vec![],
    );

    assert!(matches!(
        warning,
        Some(LicenseWarning::ExpiresBeforeIssued { .. })
    ));

    let token = license.sign(&key).unwrap();
    let verified = License::verify(&token, &public).unwrap();
    assert!(verified.is_expired(Duration::ZERO));

    assert!(matches!(
        check_license(&token, &public, None, &VerifyOptions::default()),
        Err(TrustError::LicenseExpired { .. })
    ));
}

#[test]
fn revoked_unexpired_license_is_rejected() {
    let (public, key) = issuer_keys("acme.example");
    let (license, _) = License::new(
        "acme.example",
        "Acme Inc",
        "product",
        chrono::Duration::days(30),
        vec![],
    );
    let token = license.sign(&key).unwrap();

    let mut ledger = RevocationLedger::new("acme.example");
    ledger.add_key_at(&license.id, 1_700_000_000);

    let err = check_license(&token, &public, Some(&ledger), &VerifyOptions::default()).unwrap_err();
    match err {
        TrustError::LicenseRevoked {
            license_id,
            revoked_at,
        } => {
            assert_eq!(license_id, license.id);
            assert_eq!(revoked_at, 1_700_000_000);
        },
        other => panic!("expected LicenseRevoked, got {:?}", other),
    }
}

#[test]
fn audience_replay_blocked_when_expected_audience_set() {
    let (public, key) = issuer_keys("acme.example");
    let (license, _) = License::new(
        "acme.example",
        "Acme Inc",
        "product-a",
        chrono::Duration::days(30),
        vec![],
    );
    let token = license.sign(&key).unwrap();

    let for_b = VerifyOptions::default().with_audience("product-b");
    let err = check_license(&token, &public, None, &for_b).unwrap_err();
    assert!(matches!(err, TrustError::InvalidLicense { .. }));

    let for_a = VerifyOptions::default().with_audience("product-a");
    assert!(check_license(&token, &public, None, &for_a).is_ok());
}

#[test]
fn encryption_key_set_cannot_verify_licenses() {
    let (_, key) = issuer_keys("acme.example");
    let (enc_public, _) = warrant_core::new_encryption_key_set();
    let (license, _) = License::new(
        "acme.example",
        "Acme Inc",
        "product",
        chrono::Duration::days(1),
        vec![],
    );
    let token = license.sign(&key).unwrap();

    let err = License::verify(&token, &enc_public).unwrap_err();
    assert!(err.is_key_not_found());
}

fn name() -> impl Strategy<Value = String> {
    "[A-Za-z0-9][A-Za-z0-9 .-]{0,31}"
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 32,
        max_shrink_iters: 200,
        ..ProptestConfig::default()
    })]

    /// A freshly signed license verifies back to equal fields.
    #[test]
    fn signed_license_round_trips(
        issuer in name(),
        subject in name(),
        audience in name(),
        days in 1i64..3650,
        capabilities in prop::collection::vec("[a-z][a-z0-9-]{0,15}", 0..5),
    ) {
        let (public, key) = issuer_keys(&issuer);
        let (license, warning) = License::new(
            issuer.clone(),
            subject,
            audience,
            chrono::Duration::days(days),
            capabilities,
        );
        prop_assert!(warning.is_none());

        let token = license.sign(&key).unwrap();
        let verified = License::verify(&token, &public).unwrap();
        prop_assert_eq!(&verified, &license);
        prop_assert!(!verified.is_expired(Duration::ZERO));
    }
}
