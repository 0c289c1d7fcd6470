use std::fs::File;
use std::path::Path;

use blake3::Hasher;
use memmap2::Mmap;

use crate::error::StashError;

/// Computes the hex-encoded BLAKE3 digest of an in-memory byte buffer.
pub fn hash_bytes(bytes: &[u8]) -> String {
    blake3::hash(bytes).to_hex().to_string()
}

/// Computes the BLAKE3 hash of a file using memory mapping and parallel
/// processing.
///
/// Produces the same digest as [`hash_bytes`] over the file's contents.
/// Symbolic links and directories are rejected.
///
/// # Errors
///
/// Returns an error if:
/// - The file cannot be read
/// - The path points to a symbolic link or a directory
/// - Memory mapping fails
pub fn hash_file(path: &Path) -> Result<String, StashError> {
    let metadata =
        std::fs::symlink_metadata(path).map_err(|source| StashError::io(path, source))?;

    if metadata.is_symlink() {
        return Err(StashError::InvalidFileType(
            path.to_path_buf(),
            "Symbolic links are not supported".to_string(),
        ));
    }

    if metadata.is_dir() {
        return Err(StashError::InvalidFileType(
            path.to_path_buf(),
            "Directories are not supported".to_string(),
        ));
    }

    // Empty files cannot be mapped
    if metadata.len() == 0 {
        return Ok(Hasher::new().finalize().to_hex().to_string());
    }

    let file = File::open(path).map_err(|source| StashError::io(path, source))?;

    // SAFETY: the mapping is read-only and dropped before returning. A
    // concurrent writer can only change the digest, which then reads as dirty.
    let mmap = unsafe { Mmap::map(&file) }.map_err(|source| StashError::io(path, source))?;

    let mut hasher = Hasher::new();
    hasher.update_rayon(&mmap);

    Ok(hasher.finalize().to_hex().to_string())
}
