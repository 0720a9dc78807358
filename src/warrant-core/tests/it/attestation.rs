//! Artifact and manifest attestations end to end.

use std::fs;

use tempfile::TempDir;

use warrant_core::{
    compute_checksum, new_signing_key_set, ArtifactsAttestation, Attestation,
    ManifestsAttestation, PublicKeySet, SigningKey, TrustError,
};

const NGINX: &str = "sha256:2d1f0a6f7f1c8f0c3c5d1f4f3b2a6d4e8c9b0a1f2e3d4c5b6a7980716253e4f5";
const REDIS: &str = "sha256:b5a9c3d2e1f0a9b8c7d6e5f4a3b2c1d0e9f8a7b6c5d4e3f2a1b0c9d8e7f6a5b4";

fn issuer_keys() -> (PublicKeySet, SigningKey) {
    let (public, private) = new_signing_key_set("acme.example").unwrap();
    (public, private.signing_key().unwrap().clone())
}

fn manifests_dir() -> TempDir {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    fs::create_dir_all(root.join("base")).unwrap();
    fs::create_dir_all(root.join("overlays/prod")).unwrap();
    fs::create_dir_all(root.join("tmp")).unwrap();
    fs::write(root.join("kustomization.yaml"), "resources:\n- base\n").unwrap();
    fs::write(root.join("base/deployment.yaml"), "kind: Deployment\n").unwrap();
    fs::write(root.join("base/configmap.yaml"), "kind: ConfigMap\n").unwrap();
    fs::write(root.join("overlays/prod/replicas.yaml"), "replicas: 5\n").unwrap();
    fs::write(root.join("tmp/render.log"), "rendered\n").unwrap();
    fs::write(root.join("base/deployment.yaml.bak"), "old\n").unwrap();
    dir
}

const EXCLUSIONS: &[&str] = &["tmp/", "*.bak"];

#[test]
fn artifacts_membership_is_exact() {
    let (public, key) = issuer_keys();
    let token = ArtifactsAttestation::sign(&key, "cluster-prod", [NGINX, REDIS]).unwrap();
    let attestation = ArtifactsAttestation::verify(&token, &public).unwrap();

    assert_eq!(attestation.issuer(), "acme.example");
    assert!(attestation.has_digest(NGINX));
    assert!(attestation.has_digest(REDIS));
    assert!(!attestation.has_digest(&NGINX.to_uppercase()));
    assert!(!attestation.has_digest(NGINX.strip_prefix("sha256:").unwrap()));
    assert!(!attestation.has_digest(&format!("sha512:{}", &NGINX[7..])));
}

#[test]
fn artifacts_missing_digest_is_reported() {
    let (public, key) = issuer_keys();
    let token = ArtifactsAttestation::sign(&key, "cluster-prod", [NGINX]).unwrap();

    let err = ArtifactsAttestation::verify_digests(&token, &public, [REDIS]).unwrap_err();
    assert!(matches!(err, TrustError::DigestNotAttested { .. }));
    assert!(!err.is_cryptographic());
}

#[test]
fn manifests_checksum_stable_and_sensitive() {
    let dir = manifests_dir();

    let first = compute_checksum(dir.path(), EXCLUSIONS).unwrap();
    let second = compute_checksum(dir.path(), EXCLUSIONS).unwrap();
    assert_eq!(first.checksum, second.checksum);
    assert_eq!(
        first.file_list(),
        vec![
            "base/configmap.yaml",
            "base/deployment.yaml",
            "kustomization.yaml",
            "overlays/prod/replicas.yaml",
        ]
    );

    fs::write(dir.path().join("tmp/render.log"), "rendered again\n").unwrap();
    fs::write(dir.path().join("base/deployment.yaml.bak"), "older\n").unwrap();
    let excluded_changed = compute_checksum(dir.path(), EXCLUSIONS).unwrap();
    assert_eq!(first.checksum, excluded_changed.checksum);

    fs::write(dir.path().join("overlays/prod/replicas.yaml"), "replicas: 6\n").unwrap();
    let included_changed = compute_checksum(dir.path(), EXCLUSIONS).unwrap();
    assert_ne!(first.checksum, included_changed.checksum);
}

#[test]
fn manifests_checksum_independent_of_creation_order() {
    let a = TempDir::new().unwrap();
    let b = TempDir::new().unwrap();

    for name in ["one.yaml", "two.yaml", "three.yaml"] {
        fs::write(a.path().join(name), name).unwrap();
    }
    for name in ["three.yaml", "one.yaml", "two.yaml"] {
        fs::write(b.path().join(name), name).unwrap();
    }

    let none: &[&str] = &[];
    assert_eq!(
        compute_checksum(a.path(), none).unwrap().checksum,
        compute_checksum(b.path(), none).unwrap().checksum
    );
}

#[test]
fn manifests_mutation_fails_with_checksum_mismatch() {
    let (public, key) = issuer_keys();
    let dir = manifests_dir();

    let (token, files) = ManifestsAttestation::sign(&key, "cluster-prod", dir.path(), EXCLUSIONS).unwrap();
    assert_eq!(files.len(), 4);

    let attestation = ManifestsAttestation::verify(&token, &public, dir.path(), EXCLUSIONS).unwrap();
    assert_eq!(attestation.issuer(), "acme.example");
    assert!(attestation.issued_at() > 0);

    fs::write(dir.path().join("base/configmap.yaml"), "kind: ConfigMap\ndata: {}\n").unwrap();
    let err = ManifestsAttestation::verify(&token, &public, dir.path(), EXCLUSIONS).unwrap_err();
    assert!(matches!(err, TrustError::ChecksumMismatch));
}

#[test]
fn manifests_deleted_file_fails() {
    let (public, key) = issuer_keys();
    let dir = manifests_dir();

    let (token, _) = ManifestsAttestation::sign(&key, "cluster-prod", dir.path(), EXCLUSIONS).unwrap();
    fs::remove_file(dir.path().join("kustomization.yaml")).unwrap();

    assert!(matches!(
        ManifestsAttestation::verify(&token, &public, dir.path(), EXCLUSIONS),
        Err(TrustError::ChecksumMismatch)
    ));
}

#[test]
fn attestation_kinds_are_not_interchangeable() {
    let (public, key) = issuer_keys();
    let dir = manifests_dir();

    let artifacts = ArtifactsAttestation::sign(&key, "cluster-prod", [NGINX]).unwrap();
    let err = ManifestsAttestation::verify(&artifacts, &public, dir.path(), EXCLUSIONS).unwrap_err();
    assert!(matches!(err, TrustError::InvalidAttestation { .. }));

    let (manifests, _) = ManifestsAttestation::sign(&key, "cluster-prod", dir.path(), EXCLUSIONS).unwrap();
    let err = ArtifactsAttestation::verify(&manifests, &public).unwrap_err();
    assert!(matches!(err, TrustError::InvalidAttestation { .. }));
}
