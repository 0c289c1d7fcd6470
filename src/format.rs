//! Versioned binary encoding of the persisted file store.
//!
//! A store file is an 8-byte header followed by an rkyv archive:
//!
//! | offset | size | content                              |
//! |--------|------|--------------------------------------|
//! | 0      | 4    | magic `FSTS`                         |
//! | 4      | 4    | format version, u32 little endian    |
//! | 8      | ..   | archived [`FileStorage`]             |
//!
//! The header is checked before the payload is looked at, so a store written
//! by any other version is rejected without attempting to validate its
//! archive.

use std::collections::HashSet;

use rkyv::util::AlignedVec;
use rkyv::{Archive, Deserialize, Serialize};

use crate::error::{Result, StashError};

#[cfg(test)]
mod tests;

/// Current version of the store format.
///
/// Bump this whenever the archived layout changes. Stores with any other
/// version are treated as absent.
pub const FILE_STORE_VERSION: u32 = 2;

/// Leading bytes of every store file.
pub const STORE_MAGIC: [u8; 4] = *b"FSTS";

/// Length of the magic plus version header.
pub const HEADER_LEN: usize = 8;

/// The last observed digest of one file.
#[derive(Archive, Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct FileHashRecord {
    /// Absolute or project-relative path; unique within a store.
    pub path: String,

    /// Hex-encoded content digest, or a decimal nanosecond modification time
    /// when the store tracks timestamps.
    pub hash: String,
}

impl FileHashRecord {
    pub fn new(path: impl Into<String>, hash: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            hash: hash.into(),
        }
    }
}

/// The container that gets written to disk.
#[derive(Archive, Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct FileStorage {
    pub version: u32,
    pub files: Vec<FileHashRecord>,
}

impl FileStorage {
    /// Creates an empty storage with the current format version.
    pub fn new() -> Self {
        Self {
            version: FILE_STORE_VERSION,
            files: Vec::new(),
        }
    }

    /// Builds a storage at the current version from `(path, hash)` pairs.
    ///
    /// Records are sorted by path so identical state always encodes to
    /// identical bytes.
    pub fn from_entries<I, P, H>(entries: I) -> Self
    where
        I: IntoIterator<Item = (P, H)>,
        P: Into<String>,
        H: Into<String>,
    {
        let mut files: Vec<FileHashRecord> = entries
            .into_iter()
            .map(|(path, hash)| FileHashRecord::new(path, hash))
            .collect();
        files.sort_by(|a, b| a.path.cmp(&b.path));
        Self {
            version: FILE_STORE_VERSION,
            files,
        }
    }

    /// Encodes the header followed by the archived storage.
    ///
    /// The header carries `self.version`, not [`FILE_STORE_VERSION`].
    pub fn to_buffer(&self) -> Result<Vec<u8>> {
        let archived = rkyv::to_bytes::<rkyv::rancor::BoxedError>(self)
            .map_err(StashError::SerializationError)?;

        let mut buffer = Vec::with_capacity(HEADER_LEN + archived.len());
        buffer.extend_from_slice(&STORE_MAGIC);
        buffer.extend_from_slice(&self.version.to_le_bytes());
        buffer.extend_from_slice(&archived);
        Ok(buffer)
    }

    /// Decodes a buffer produced by [`FileStorage::to_buffer`].
    ///
    /// # Errors
    ///
    /// - [`StashError::CorruptStore`] if the header is short or has the wrong
    ///   magic, if the archived version disagrees with the header, or if a
    ///   path appears more than once
    /// - [`StashError::VersionMismatch`] if the header version is not
    ///   [`FILE_STORE_VERSION`]
    /// - [`StashError::DeserializationError`] if the payload fails validation
    pub fn decode(buffer: &[u8]) -> Result<Self> {
        if buffer.len() < HEADER_LEN {
            return Err(StashError::CorruptStore(format!(
                "store is {} bytes, shorter than its {HEADER_LEN}-byte header",
                buffer.len()
            )));
        }

        let (header, payload) = buffer.split_at(HEADER_LEN);
        if header[..4] != STORE_MAGIC {
            return Err(StashError::CorruptStore(
                "missing file store magic".to_string(),
            ));
        }

        let mut version_bytes = [0u8; 4];
        version_bytes.copy_from_slice(&header[4..]);
        let version = u32::from_le_bytes(version_bytes);
        if version != FILE_STORE_VERSION {
            return Err(StashError::VersionMismatch {
                found: version,
                expected: FILE_STORE_VERSION,
            });
        }

        // rkyv needs the archive aligned; the payload sits at an arbitrary
        // offset of the caller's buffer.
        let mut aligned: AlignedVec = AlignedVec::with_capacity(payload.len());
        aligned.extend_from_slice(payload);

        let storage = rkyv::from_bytes::<FileStorage, rkyv::rancor::BoxedError>(&aligned[..])
            .map_err(StashError::DeserializationError)?;

        if storage.version != version {
            return Err(StashError::CorruptStore(format!(
                "header version {version} disagrees with archived version {}",
                storage.version
            )));
        }

        let mut seen = HashSet::with_capacity(storage.files.len());
        for record in &storage.files {
            if !seen.insert(record.path.as_str()) {
                return Err(StashError::CorruptStore(format!(
                    "duplicate record for '{}'",
                    record.path
                )));
            }
        }

        Ok(storage)
    }

    /// Like [`FileStorage::decode`], but falls back to an empty storage for
    /// anything it rejects.
    pub fn from_buffer(buffer: &[u8]) -> Self {
        Self::decode(buffer).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

impl Default for FileStorage {
    fn default() -> Self {
        Self::new()
    }
}
