//! Encrypted token delivery and key set files.

use std::error::Error as _;

use tempfile::TempDir;

use warrant_core::{
    decrypt, encrypt, new_encryption_key_set, new_signing_key_set, License, PrivateKeySet,
    PublicKeySet, TokenError,
};

#[test]
fn license_delivered_inside_envelope() {
    let (sign_public, sign_private) = new_signing_key_set("acme.example").unwrap();
    let (enc_public, enc_private) = new_encryption_key_set();
    let key = sign_private.signing_key().unwrap();

    let (license, _) = License::new(
        "acme.example",
        "Acme Inc",
        "product",
        chrono::Duration::days(30),
        vec!["feature-x".to_string()],
    );
    let token = license.sign(key).unwrap();

    let envelope = encrypt(token.as_bytes(), &enc_public, None).unwrap();
    assert_eq!(envelope.split('.').count(), 5);

    let opened = decrypt(&envelope, &enc_private).unwrap();
    let opened = String::from_utf8(opened).unwrap();
    assert_eq!(opened, token);
    assert_eq!(License::verify(&opened, &sign_public).unwrap(), license);
}

#[test]
fn wrong_recipient_cannot_decrypt() {
    let (enc_public, _) = new_encryption_key_set();
    let (_, other_private) = new_encryption_key_set();

    let envelope = encrypt(b"secret", &enc_public, None).unwrap();
    let err = decrypt(&envelope, &other_private).unwrap_err();

    assert!(matches!(err, TokenError::DecryptionFailed { .. }));
    assert!(!err.is_key_not_found());
    assert!(err.source().is_some());
}

#[test]
fn recipient_selected_by_key_id() {
    let (first_public, first_private) = new_encryption_key_set();
    let (second_public, second_private) = new_encryption_key_set();

    let mut published = first_public.clone();
    published.merge(&second_public).unwrap();
    let second_kid = second_public.key_ids().next().unwrap().to_string();

    let envelope = encrypt(b"for second", &published, Some(&second_kid)).unwrap();
    assert_eq!(decrypt(&envelope, &second_private).unwrap(), b"for second");
    assert!(decrypt(&envelope, &first_private).is_err());

    // Without a kid, the first key in set order is used.
    let envelope = encrypt(b"for first", &published, None).unwrap();
    assert_eq!(decrypt(&envelope, &first_private).unwrap(), b"for first");
}

#[test]
fn unknown_recipient_kid_is_not_found() {
    let (enc_public, _) = new_encryption_key_set();
    let err = encrypt(b"x", &enc_public, Some("nobody")).unwrap_err();
    assert!(err.is_key_not_found());
}

#[test]
fn signing_only_set_has_no_recipient() {
    let (sign_public, _) = new_signing_key_set("acme.example").unwrap();
    let err = encrypt(b"x", &sign_public, None).unwrap_err();
    assert!(matches!(err, TokenError::KeySet(_)));
}

#[test]
fn empty_plaintext_round_trips() {
    let (enc_public, enc_private) = new_encryption_key_set();
    let envelope = encrypt(b"", &enc_public, None).unwrap();
    assert!(decrypt(&envelope, &enc_private).unwrap().is_empty());
}

#[test]
fn key_set_files_round_trip() {
    let dir = TempDir::new().unwrap();
    let (enc_public, enc_private) = new_encryption_key_set();

    let public_path = dir.path().join("enc.pub.json");
    let private_path = dir.path().join("enc.json");
    enc_public.write_to(&public_path).unwrap();
    enc_private.write_to(&private_path).unwrap();

    let public = PublicKeySet::read_from(&public_path).unwrap();
    let private = PrivateKeySet::read_from(&private_path).unwrap();
    assert_eq!(public, enc_public);
    assert_eq!(private.public(), enc_public);

    let envelope = encrypt(b"from disk", &public, None).unwrap();
    assert_eq!(decrypt(&envelope, &private).unwrap(), b"from disk");

    // A private file is never accepted as a public set.
    assert!(PublicKeySet::read_from(&private_path).is_err());
}
