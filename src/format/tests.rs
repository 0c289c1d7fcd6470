use proptest::prelude::*;

use crate::error::StashError;
use crate::format::{
    FILE_STORE_VERSION, FileHashRecord, FileStorage, HEADER_LEN, STORE_MAGIC,
};

fn sample_storage() -> FileStorage {
    FileStorage::from_entries([
        ("lib/main.dart", "aaaa"),
        ("lib/widgets.dart", "bbbb"),
        ("pubspec.yaml", "cccc"),
    ])
}

proptest! {
    #[test]
    fn prop_round_trip(
        entries in prop::collection::hash_map("[a-z0-9_/.]{1,24}", "[0-9a-f]{64}", 0..32)
    ) {
        let storage = FileStorage::from_entries(entries);
        let buffer = storage.to_buffer().unwrap();
        let decoded = FileStorage::decode(&buffer).unwrap();
        prop_assert_eq!(decoded, storage);
    }
}

#[test]
fn test_empty_storage_round_trip() {
    let buffer = FileStorage::new().to_buffer().unwrap();
    assert_eq!(&buffer[..4], &STORE_MAGIC);

    let decoded = FileStorage::decode(&buffer).unwrap();
    assert_eq!(decoded.version, FILE_STORE_VERSION);
    assert!(decoded.is_empty());
}

#[test]
fn test_from_entries_sorts_by_path() {
    let storage = FileStorage::from_entries([("b", "2"), ("a", "1")]);
    assert_eq!(
        storage.files,
        vec![FileHashRecord::new("a", "1"), FileHashRecord::new("b", "2")]
    );
}

#[test]
fn test_short_buffer_is_corrupt() {
    let result = FileStorage::decode(&[0x46, 0x53, 0x54]);
    assert!(matches!(result, Err(StashError::CorruptStore(_))));
}

#[test]
fn test_wrong_magic_is_corrupt() {
    let mut buffer = sample_storage().to_buffer().unwrap();
    buffer[0] = b'X';

    let result = FileStorage::decode(&buffer);
    assert!(matches!(result, Err(StashError::CorruptStore(_))));
}

#[test]
fn test_truncated_payload_is_rejected() {
    let buffer = sample_storage().to_buffer().unwrap();

    let result = FileStorage::decode(&buffer[..HEADER_LEN + 3]);
    assert!(matches!(result, Err(StashError::DeserializationError(_))));
}

#[test]
fn test_version_checked_before_payload() {
    let mut buffer = Vec::new();
    buffer.extend_from_slice(&STORE_MAGIC);
    buffer.extend_from_slice(&1u32.to_le_bytes());
    buffer.extend_from_slice(b"not an archive at all");

    match FileStorage::decode(&buffer) {
        Err(StashError::VersionMismatch { found, expected }) => {
            assert_eq!(found, 1);
            assert_eq!(expected, FILE_STORE_VERSION);
        }
        other => panic!("Expected VersionMismatch, got: {other:?}"),
    }
}

#[test]
fn test_future_version_is_rejected() {
    let mut storage = sample_storage();
    storage.version = FILE_STORE_VERSION + 1;
    let buffer = storage.to_buffer().unwrap();

    let result = FileStorage::decode(&buffer);
    assert!(matches!(result, Err(StashError::VersionMismatch { .. })));
}

#[test]
fn test_header_payload_version_disagreement_is_corrupt() {
    let mut storage = sample_storage();
    storage.version = FILE_STORE_VERSION + 7;
    let mut buffer = storage.to_buffer().unwrap();
    buffer[4..HEADER_LEN].copy_from_slice(&FILE_STORE_VERSION.to_le_bytes());

    let result = FileStorage::decode(&buffer);
    assert!(matches!(result, Err(StashError::CorruptStore(_))));
}

#[test]
fn test_duplicate_paths_are_corrupt() {
    let storage = FileStorage {
        version: FILE_STORE_VERSION,
        files: vec![
            FileHashRecord::new("lib/main.dart", "aaaa"),
            FileHashRecord::new("lib/main.dart", "bbbb"),
        ],
    };
    let buffer = storage.to_buffer().unwrap();

    match FileStorage::decode(&buffer) {
        Err(StashError::CorruptStore(message)) => assert!(message.contains("lib/main.dart")),
        other => panic!("Expected CorruptStore, got: {other:?}"),
    }
}

#[test]
fn test_from_buffer_falls_back_to_empty() {
    let storage = FileStorage::from_buffer(b"garbage that is long enough");
    assert_eq!(storage, FileStorage::new());

    let valid = sample_storage();
    assert_eq!(FileStorage::from_buffer(&valid.to_buffer().unwrap()), valid);
}
