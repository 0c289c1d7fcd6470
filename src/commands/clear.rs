//! Clear command implementation.

use std::path::Path;

use crate::error::Result;
use crate::fs::FileSystem;
use crate::logging::Logger;

/// Removes the cache file.
///
/// Idempotent: returns `Ok(false)` if there was nothing to remove.
pub fn clear(cache_file: &Path, fs: &dyn FileSystem, log: &Logger) -> Result<bool> {
    log.verbose(1, format!("Clearing cache at {}", cache_file.display()));

    if !fs.exists(cache_file) {
        log.verbose(1, "No cache file to clear");
        return Ok(false);
    }

    fs.remove_file(cache_file)?;
    log.verbose(1, "Cache cleared");

    Ok(true)
}
