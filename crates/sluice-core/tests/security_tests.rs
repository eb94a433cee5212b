//! Hostile archive integration tests.
//!
//! Zip-slip names, absolute paths and decompression bombs run through the
//! full pipeline; nothing may land outside the files directory.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use sluice_core::IngestConfig;
use sluice_core::IngestError;
use sluice_core::IngestPipeline;
use sluice_core::SniffingClassifier;
use sluice_core::UploadSession;
use sluice_core::test_utils::ZipTestBuilder;
use sluice_core::test_utils::create_test_zip;
use std::fs;
use std::io::Cursor;
use std::path::Path;
use tempfile::TempDir;

/// `<root>/files/temp`, with `<root>` left free to detect escapes.
fn setup() -> (TempDir, IngestConfig) {
    let root = TempDir::new().unwrap();
    fs::create_dir_all(root.path().join("files/temp")).unwrap();
    let config = IngestConfig::new(root.path().join("files"));
    (root, config)
}

fn listing(dir: &Path) -> Vec<String> {
    let mut names: Vec<_> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

fn ingest(config: &IngestConfig, data: Vec<u8>, name: &str) -> sluice_core::IngestResult {
    IngestPipeline::new(config, SniffingClassifier::new())
        .ingest(UploadSession::new(Cursor::new(data), name))
        .unwrap()
}

#[test]
fn test_zip_slip_rejects_whole_archive() {
    let (root, config) = setup();
    let malicious_names = [
        "../escape.txt",
        "../../escape.txt",
        "data/../../escape.txt",
        "..\\escape.txt",
    ];

    for name in malicious_names {
        let data = create_test_zip(&[("innocent.txt", b"fine"), (name, b"pwned")]);
        let result = ingest(&config, data, "slip.zip");

        assert!(result.data_files().is_empty(), "{name} should be rejected");
        assert_eq!(result.errors().len(), 1);
        assert_eq!(result.errors()[0].name, "slip.zip");
        assert!(
            matches!(result.errors()[0].error, IngestError::PathTraversal { .. }),
            "{name}: {:?}",
            result.errors()[0].error
        );
    }

    assert_eq!(listing(root.path()), ["files"]);
    assert_eq!(listing(&root.path().join("files")), ["temp"]);
    assert!(listing(&root.path().join("files/temp")).is_empty());
}

#[test]
fn test_absolute_entry_rejected() {
    let (root, config) = setup();
    let target = root.path().join("absolute.txt");
    let name = target.to_string_lossy().into_owned();

    let data = create_test_zip(&[("ok.txt", b"ok"), (name.as_str(), b"pwned")]);
    let result = ingest(&config, data, "abs.zip");

    assert!(result.data_files().is_empty());
    assert!(result.errors()[0].error.is_security_violation());
    assert!(!target.exists());
}

#[test]
fn test_drive_prefixed_entry_rejected() {
    let (_root, config) = setup();
    let data = create_test_zip(&[("ok.txt", b"ok"), ("C:\\Windows\\win.ini", b"pwned")]);
    let result = ingest(&config, data, "drive.zip");

    assert!(result.data_files().is_empty());
    assert!(result.errors()[0].error.is_security_violation());
}

#[test]
fn test_decompression_bomb_is_cut_off() {
    let (root, config) = setup();
    let config = config.with_max_upload_size(Some(1024 * 1024));

    let data = ZipTestBuilder::new()
        .add_deflated("bomb.bin", &vec![0u8; 10 * 1024 * 1024])
        .add_file("readme.txt", b"hello")
        .build();
    assert!(data.len() < 1024 * 1024);
    let result = ingest(&config, data, "bomb.zip");

    assert_eq!(result.data_files().len(), 1);
    assert_eq!(result.data_files()[0].label, "readme.txt");
    assert_eq!(result.errors()[0].name, "bomb.bin");
    assert!(matches!(
        result.errors()[0].error,
        IngestError::SizeLimitExceeded { limit: 1_048_576, .. }
    ));
    // only the accepted file remains
    assert_eq!(listing(&root.path().join("files/temp")).len(), 1);
}

#[test]
fn test_platform_metadata_is_not_ingested() {
    let (_root, config) = setup();
    let data = create_test_zip(&[
        ("report.csv", b"a,b\n"),
        ("__MACOSX/._report.csv", b"\0\x05\x16\x07"),
        (".DS_Store", b"\0\0\0\x01Bud1"),
        ("notes.txt", b"notes"),
    ]);
    let result = ingest(&config, data, "mac.zip");

    let labels: Vec<_> = result.data_files().iter().map(|f| f.label.as_str()).collect();
    assert_eq!(labels, ["report.csv", "notes.txt"]);
    assert!(result.errors().is_empty());
}
