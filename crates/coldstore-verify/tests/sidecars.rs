use std::fs;

use coldstore_verify::{
    Algorithm, CheckStatus, generate_and_persist, sidecar_path, verify_against_sidecars,
};
use tempfile::tempdir;

#[test]
fn test_persisted_sidecars_verify() {
    let dir = tempdir().unwrap();
    let artifact = dir.path().join("photos.tar.zst");
    fs::write(&artifact, b"pretend this is zstd").unwrap();

    let digests = generate_and_persist(&artifact).unwrap();

    let sha_line = fs::read_to_string(sidecar_path(&artifact, Algorithm::Sha256)).unwrap();
    assert_eq!(sha_line, format!("{}  photos.tar.zst\n", digests.sha256));

    let report = verify_against_sidecars(&artifact).unwrap();
    assert_eq!(report.sha256.status, CheckStatus::Passed);
    assert_eq!(report.blake3.status, CheckStatus::Passed);
}

#[test]
fn test_single_flipped_byte_fails_both() {
    let dir = tempdir().unwrap();
    let artifact = dir.path().join("a.tar.zst");
    let mut data: Vec<u8> = (0..=255u8).cycle().take(10_000).collect();
    fs::write(&artifact, &data).unwrap();
    generate_and_persist(&artifact).unwrap();

    data[5_000] ^= 0x01;
    fs::write(&artifact, &data).unwrap();

    let report = verify_against_sidecars(&artifact).unwrap();
    assert_eq!(report.sha256.status, CheckStatus::Failed);
    assert_eq!(report.blake3.status, CheckStatus::Failed);
}

#[test]
fn test_uppercase_sidecar_still_matches() {
    let dir = tempdir().unwrap();
    let artifact = dir.path().join("b.tar.zst");
    fs::write(&artifact, b"case").unwrap();
    let digests = generate_and_persist(&artifact).unwrap();
    fs::write(
        sidecar_path(&artifact, Algorithm::Blake3),
        format!("{}  b.tar.zst\n", digests.blake3.to_uppercase()),
    )
    .unwrap();

    let report = verify_against_sidecars(&artifact).unwrap();
    assert_eq!(report.blake3.status, CheckStatus::Passed);
}

#[test]
fn test_missing_sidecar_is_indeterminate() {
    let dir = tempdir().unwrap();
    let artifact = dir.path().join("c.tar.zst");
    fs::write(&artifact, b"payload").unwrap();
    generate_and_persist(&artifact).unwrap();
    fs::remove_file(sidecar_path(&artifact, Algorithm::Sha256)).unwrap();

    let report = verify_against_sidecars(&artifact).unwrap();
    assert_eq!(report.sha256.status, CheckStatus::Indeterminate);
    assert_eq!(report.blake3.status, CheckStatus::Passed);
}

#[test]
fn test_empty_sidecar_is_failure() {
    let dir = tempdir().unwrap();
    let artifact = dir.path().join("d.tar.zst");
    fs::write(&artifact, b"payload").unwrap();
    generate_and_persist(&artifact).unwrap();
    fs::write(sidecar_path(&artifact, Algorithm::Blake3), "\n").unwrap();

    let report = verify_against_sidecars(&artifact).unwrap();
    assert_eq!(report.blake3.status, CheckStatus::Failed);
}
