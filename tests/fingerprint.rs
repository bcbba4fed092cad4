use std::fs;

use subfetch::media::fingerprint::{fingerprint, MIN_FILE_SIZE};
use subfetch::Error;
use tempfile::TempDir;

#[test]
fn test_zero_file_hash_is_its_size() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("zeros.mkv");
    fs::write(&path, vec![0u8; 131_072]).unwrap();

    let fp = fingerprint(&path).unwrap();
    assert_eq!(fp.hash, "0000000000020000");
    assert_eq!(fp.size, 131_072);
}

#[test]
fn test_small_file_is_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("tiny.mkv");
    fs::write(&path, vec![7u8; 100]).unwrap();

    match fingerprint(&path) {
        Err(Error::TooSmall { size, min, .. }) => {
            assert_eq!(size, 100);
            assert_eq!(min, MIN_FILE_SIZE);
        }
        other => panic!("expected TooSmall, got {other:?}"),
    }
}

#[test]
fn test_missing_file_is_io_error() {
    let temp_dir = TempDir::new().unwrap();
    assert!(matches!(
        fingerprint(&temp_dir.path().join("absent.mkv")),
        Err(Error::Io { .. })
    ));
}

#[test]
fn test_hash_wraps_and_is_deterministic() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("ones.mkv");
    fs::write(&path, vec![1u8; 131_072]).unwrap();

    let first = fingerprint(&path).unwrap();
    assert_eq!(first.hash, "4040404040424000");
    assert_eq!(fingerprint(&path).unwrap(), first);
}

#[test]
fn test_only_head_and_tail_blocks_count() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("three.mkv");
    let mut data = vec![1u8; 65_536];
    data.extend(vec![0xAAu8; 65_536]);
    data.extend(vec![2u8; 65_536]);
    fs::write(&path, data).unwrap();

    assert_eq!(fingerprint(&path).unwrap().hash, "6060606060636000");
}
