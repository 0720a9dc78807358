//! Key rotation through multi-key public sets.

use warrant_core::{
    new_signing_key_set, peek_key_id, License, PublicKeySet, SigningKey, TrustError,
};

fn generation(issuer: &str) -> (PublicKeySet, SigningKey) {
    let (public, private) = new_signing_key_set(issuer).unwrap();
    (public, private.signing_key().unwrap().clone())
}

fn issue(key: &SigningKey) -> String {
    License::new(key.issuer(), "Acme Inc", "product", chrono::Duration::days(30), vec![])
        .0
        .sign(key)
        .unwrap()
}

#[test]
fn published_set_verifies_both_generations() {
    let (old_public, old_key) = generation("acme.example");
    let (new_public, new_key) = generation("acme.example");
    assert_ne!(old_key.kid(), new_key.kid());

    let mut published = old_public.clone();
    published.merge(&new_public).unwrap();
    assert_eq!(published.len(), 2);

    let old_token = issue(&old_key);
    let new_token = issue(&new_key);
    assert_eq!(peek_key_id(&old_token).unwrap(), old_key.kid());
    assert_eq!(peek_key_id(&new_token).unwrap(), new_key.kid());

    assert!(License::verify(&old_token, &published).is_ok());
    assert!(License::verify(&new_token, &published).is_ok());
}

#[test]
fn retired_key_is_reported_as_not_found() {
    let (old_public, old_key) = generation("acme.example");
    let (new_public, new_key) = generation("acme.example");

    let mut published = old_public.clone();
    published.merge(&new_public).unwrap();
    let old_token = issue(&old_key);

    assert!(published.remove(old_key.kid()).is_some());

    let err = License::verify(&old_token, &published).unwrap_err();
    assert!(matches!(err, TrustError::InvalidLicense { .. }));
    assert!(err.is_key_not_found());
    assert!(!err.is_cryptographic());

    assert!(License::verify(&issue(&new_key), &published).is_ok());
}

#[test]
fn published_set_survives_json_round_trip() {
    let (old_public, old_key) = generation("acme.example");
    let (new_public, _) = generation("acme.example");

    let mut published = old_public.clone();
    published.merge(&new_public).unwrap();

    let reparsed = PublicKeySet::from_json(&published.to_json().unwrap()).unwrap();
    assert_eq!(reparsed, published);
    assert!(License::verify(&issue(&old_key), &reparsed).is_ok());
}

#[test]
fn merging_same_set_twice_is_a_no_op() {
    let (public, _) = generation("acme.example");
    let mut published = public.clone();
    published.merge(&public).unwrap();
    assert_eq!(published, public);
}
