//! Ledger and fingerprint tests.

use std::fs;

use framesplit::{FileBackend, Fingerprint, Ledger, MemoryBackend, SplitError};
use sha2::{Digest, Sha256};

#[test]
fn same_name_and_size_same_identity() {
    let first = Fingerprint::from_parts("clip.mp4", 1_048_576);
    let second = Fingerprint::from_parts("clip.mp4", 1_048_576);
    assert_eq!(first, second);
    assert_eq!(first.as_str().len(), 64);
}

#[test]
fn name_or_size_change_identity() {
    let base = Fingerprint::from_parts("clip.mp4", 100);
    assert_ne!(base, Fingerprint::from_parts("clip.mp4", 101));
    assert_ne!(base, Fingerprint::from_parts("clip2.mp4", 100));
}

#[test]
fn known_digest() {
    let fingerprint = Fingerprint::from_parts("a.mp4", 3);
    assert_eq!(
        fingerprint.to_string(),
        hex::encode(Sha256::digest(b"a.mp4-3"))
    );
}

#[test]
fn fingerprint_ignores_directory_and_content() {
    let directory = tempfile::tempdir().expect("tempdir");
    let nested = directory.path().join("nested");
    fs::create_dir_all(&nested).expect("mkdir");

    let first = directory.path().join("video.mp4");
    let second = nested.join("video.mp4");
    fs::write(&first, b"abcd").expect("write");
    fs::write(&second, b"wxyz").expect("write");

    assert_eq!(
        Fingerprint::of(&first).expect("fingerprint"),
        Fingerprint::of(&second).expect("fingerprint"),
    );
    assert_eq!(
        Fingerprint::of(&first).expect("fingerprint"),
        Fingerprint::from_parts("video.mp4", 4),
    );
}

#[test]
fn fingerprint_of_missing_file_is_an_error() {
    assert!(Fingerprint::of("does/not/exist.mp4").is_err());
}

#[test]
fn missing_store_means_unprocessed() {
    let ledger = Ledger::new(MemoryBackend::new());
    let fingerprint = Fingerprint::from_parts("a.mp4", 10);
    assert!(!ledger.is_processed(&fingerprint).unwrap());
    assert!(ledger.backend().contents().is_none());
}

#[test]
fn mark_then_query() {
    let mut ledger = Ledger::new(MemoryBackend::new());
    let first = Fingerprint::from_parts("a.mp4", 10);
    let second = Fingerprint::from_parts("b.mp4", 10);

    ledger.mark_processed(&first).unwrap();
    assert!(ledger.is_processed(&first).unwrap());
    assert!(!ledger.is_processed(&second).unwrap());
}

#[test]
fn repeated_marks_are_kept() {
    let mut ledger = Ledger::new(MemoryBackend::new());
    let fingerprint = Fingerprint::from_parts("a.mp4", 10);
    ledger.mark_processed(&fingerprint).unwrap();
    ledger.mark_processed(&fingerprint).unwrap();
    assert_eq!(ledger.entries().unwrap().len(), 2);
}

#[test]
fn truncated_line_does_not_match() {
    let fingerprint = Fingerprint::from_parts("a.mp4", 10);
    let truncated = &fingerprint.as_str()[..20];
    let ledger = Ledger::new(MemoryBackend::with_contents(truncated));
    assert!(!ledger.is_processed(&fingerprint).unwrap());
}

#[test]
fn file_store_round_trip() {
    let directory = tempfile::tempdir().expect("tempdir");
    let path = directory.path().join(".processed_videos");
    let fingerprint = Fingerprint::from_parts("a.mp4", 10);

    let mut ledger = Ledger::new(FileBackend::new(&path));
    assert!(!ledger.is_processed(&fingerprint).unwrap());
    assert!(!path.exists());

    ledger.mark_processed(&fingerprint).unwrap();
    let contents = fs::read_to_string(&path).unwrap();
    assert_eq!(contents, format!("{fingerprint}\n"));

    let reopened = Ledger::new(FileBackend::new(&path));
    assert!(reopened.is_processed(&fingerprint).unwrap());
}

#[test]
fn unreadable_store_is_ledger_error() {
    let directory = tempfile::tempdir().expect("tempdir");
    // A directory where the file should be cannot be read as text.
    let ledger = Ledger::new(FileBackend::new(directory.path()));
    let error = ledger
        .is_processed(&Fingerprint::from_parts("a.mp4", 1))
        .unwrap_err();
    assert!(matches!(error, SplitError::Ledger { .. }));
}
