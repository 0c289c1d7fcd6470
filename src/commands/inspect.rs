//! Inspect command implementation.

use std::path::Path;

use crate::error::{Result, StashError};
use crate::format::FileStorage;
use crate::fs::FileSystem;
use crate::logging::Logger;

/// State of the cache file as seen by `inspect`.
#[derive(Debug)]
pub enum CacheStatus {
    /// There is no cache file.
    Missing,
    /// The cache file decodes.
    Valid(FileStorage),
    /// The cache file exists but would be ignored by the next build.
    Invalid(StashError),
}

/// Reads and decodes the cache file without modifying it.
///
/// Only I/O errors reading an existing cache file are returned; a cache that
/// does not decode is reported as [`CacheStatus::Invalid`].
pub fn inspect(cache_file: &Path, fs: &dyn FileSystem, log: &Logger) -> Result<CacheStatus> {
    log.verbose(1, format!("Inspecting {}", cache_file.display()));

    if !fs.exists(cache_file) {
        return Ok(CacheStatus::Missing);
    }

    let bytes = fs.read(cache_file)?;
    log.verbose(1, format!("Cache size: {} bytes", bytes.len()));

    Ok(match FileStorage::decode(&bytes) {
        Ok(storage) => CacheStatus::Valid(storage),
        Err(err) => CacheStatus::Invalid(err),
    })
}
