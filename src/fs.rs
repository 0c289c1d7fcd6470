//! Filesystem capabilities used by the file store.
//!
//! The store never touches `std::fs` directly. It is handed a [`FileSystem`]
//! at construction: [`OsFileSystem`] for real builds, [`MemoryFileSystem`]
//! for tests that need to inject I/O failures or control timestamps.

use std::collections::{HashMap, HashSet};
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::error::{Result, StashError};
use crate::hashing::{hash_bytes, hash_file};

/// The narrow set of filesystem operations a file store needs.
pub trait FileSystem: Send + Sync {
    /// Returns `true` if something exists at `path`.
    fn exists(&self, path: &Path) -> bool;

    /// Reads the whole file.
    fn read(&self, path: &Path) -> Result<Vec<u8>>;

    /// Content digest of the file. Defaults to hashing [`FileSystem::read`].
    fn hash(&self, path: &Path) -> Result<String> {
        Ok(hash_bytes(&self.read(path)?))
    }

    /// Last modification time of the file.
    fn modified(&self, path: &Path) -> Result<SystemTime>;

    /// Replaces the file's contents. The parent directory must exist.
    fn write(&self, path: &Path, bytes: &[u8]) -> Result<()>;

    fn create_dir_all(&self, path: &Path) -> Result<()>;

    fn remove_file(&self, path: &Path) -> Result<()>;
}

/// The host filesystem.
#[derive(Clone, Copy, Debug, Default)]
pub struct OsFileSystem;

impl FileSystem for OsFileSystem {
    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn read(&self, path: &Path) -> Result<Vec<u8>> {
        fs::read(path).map_err(|source| StashError::io(path, source))
    }

    /// Hashes the file a symlinked input points at, so a link is as
    /// observable as its target.
    fn hash(&self, path: &Path) -> Result<String> {
        let target = fs::canonicalize(path).map_err(|source| StashError::io(path, source))?;
        hash_file(&target)
    }

    fn modified(&self, path: &Path) -> Result<SystemTime> {
        fs::metadata(path)
            .and_then(|metadata| metadata.modified())
            .map_err(|source| StashError::io(path, source))
    }

    /// Writes to a sibling temporary file and renames it into place, so the
    /// target is never left partially written. The temporary file is removed
    /// if any step fails.
    fn write(&self, path: &Path, bytes: &[u8]) -> Result<()> {
        let temp_path = temp_path_for(path);

        let result = write_and_rename(&temp_path, path, bytes);
        if result.is_err() && temp_path.exists() {
            let _ = fs::remove_file(&temp_path);
        }
        result
    }

    fn create_dir_all(&self, path: &Path) -> Result<()> {
        fs::create_dir_all(path).map_err(|source| StashError::io(path, source))
    }

    fn remove_file(&self, path: &Path) -> Result<()> {
        fs::remove_file(path).map_err(|source| StashError::io(path, source))
    }
}

/// `<file name>.tmp` next to `path`. Appending keeps it distinct from `path`
/// even when the file name already ends in `.tmp`.
fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

fn write_and_rename(temp_path: &Path, path: &Path, bytes: &[u8]) -> Result<()> {
    let mut temp_file =
        File::create(temp_path).map_err(|source| StashError::io(temp_path, source))?;

    temp_file
        .write_all(bytes)
        .map_err(|source| StashError::io(temp_path, source))?;

    temp_file
        .sync_all()
        .map_err(|source| StashError::io(temp_path, source))?;

    fs::rename(temp_path, path).map_err(|source| StashError::io(path, source))
}

/// Nanoseconds since the epoch at which the in-memory clock starts.
const MEMORY_CLOCK_START_NANOS: u64 = 1_700_000_000_000_000_000;

/// Amount the in-memory clock advances on every write.
const MEMORY_CLOCK_TICK_NANOS: u64 = 1_000_000;

#[derive(Debug, Clone)]
struct MemoryFile {
    bytes: Vec<u8>,
    modified_nanos: u64,
}

#[derive(Debug, Default)]
struct MemoryState {
    files: HashMap<PathBuf, MemoryFile>,
    dirs: HashSet<PathBuf>,
    clock_nanos: u64,
    read_failures: HashMap<PathBuf, String>,
    write_failures: HashMap<PathBuf, String>,
}

impl MemoryState {
    fn tick(&mut self) -> u64 {
        if self.clock_nanos == 0 {
            self.clock_nanos = MEMORY_CLOCK_START_NANOS;
        }
        self.clock_nanos += MEMORY_CLOCK_TICK_NANOS;
        self.clock_nanos
    }

    fn parent_exists(&self, path: &Path) -> bool {
        match path.parent() {
            None => true,
            Some(parent) if parent.as_os_str().is_empty() => true,
            Some(parent) => parent.parent().is_none() || self.dirs.contains(parent),
        }
    }
}

/// An in-memory filesystem.
///
/// Every write advances a logical clock by one millisecond, so consecutive
/// writes to the same file always produce a newer modification time. Reads
/// and writes of individual paths can be made to fail with a chosen message.
#[derive(Debug, Default)]
pub struct MemoryFileSystem {
    state: Mutex<MemoryState>,
}

fn not_found(path: &Path) -> StashError {
    StashError::io(
        path,
        io::Error::new(io::ErrorKind::NotFound, "No such file or directory"),
    )
}

impl MemoryFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Creates (or replaces) a file, creating its parent directories.
    pub fn add_file(&self, path: impl AsRef<Path>, contents: impl AsRef<[u8]>) {
        let path = path.as_ref();
        let mut state = self.state();
        if let Some(parent) = path.parent() {
            for dir in parent.ancestors() {
                if !dir.as_os_str().is_empty() {
                    state.dirs.insert(dir.to_path_buf());
                }
            }
        }
        let modified_nanos = state.tick();
        state.files.insert(
            path.to_path_buf(),
            MemoryFile {
                bytes: contents.as_ref().to_vec(),
                modified_nanos,
            },
        );
    }

    /// Overrides a file's modification time.
    pub fn set_modified(&self, path: impl AsRef<Path>, time: SystemTime) {
        let nanos = time
            .duration_since(UNIX_EPOCH)
            .unwrap_or(Duration::ZERO)
            .as_nanos()
            .min(u64::MAX as u128) as u64;
        if let Some(file) = self.state().files.get_mut(path.as_ref()) {
            file.modified_nanos = nanos;
        }
    }

    /// Current contents of a file, if it exists.
    pub fn contents(&self, path: impl AsRef<Path>) -> Option<Vec<u8>> {
        self.state()
            .files
            .get(path.as_ref())
            .map(|file| file.bytes.clone())
    }

    /// Removes a directory together with everything below it.
    pub fn remove_dir_all(&self, path: impl AsRef<Path>) {
        let path = path.as_ref();
        let mut state = self.state();
        state.dirs.retain(|dir| !dir.starts_with(path));
        state.files.retain(|file, _| !file.starts_with(path));
    }

    /// Makes every subsequent read of `path` fail with `message`.
    pub fn fail_read(&self, path: impl AsRef<Path>, message: impl Into<String>) {
        self.state()
            .read_failures
            .insert(path.as_ref().to_path_buf(), message.into());
    }

    /// Makes every subsequent write of `path` fail with `message`.
    pub fn fail_write(&self, path: impl AsRef<Path>, message: impl Into<String>) {
        self.state()
            .write_failures
            .insert(path.as_ref().to_path_buf(), message.into());
    }

    /// Clears all injected failures.
    pub fn clear_failures(&self) {
        let mut state = self.state();
        state.read_failures.clear();
        state.write_failures.clear();
    }
}

impl FileSystem for MemoryFileSystem {
    fn exists(&self, path: &Path) -> bool {
        let state = self.state();
        state.files.contains_key(path) || state.dirs.contains(path)
    }

    fn read(&self, path: &Path) -> Result<Vec<u8>> {
        let state = self.state();
        if let Some(message) = state.read_failures.get(path) {
            return Err(StashError::io(path, io::Error::other(message.clone())));
        }
        state
            .files
            .get(path)
            .map(|file| file.bytes.clone())
            .ok_or_else(|| not_found(path))
    }

    fn modified(&self, path: &Path) -> Result<SystemTime> {
        self.state()
            .files
            .get(path)
            .map(|file| UNIX_EPOCH + Duration::from_nanos(file.modified_nanos))
            .ok_or_else(|| not_found(path))
    }

    fn write(&self, path: &Path, bytes: &[u8]) -> Result<()> {
        let mut state = self.state();
        if let Some(message) = state.write_failures.get(path) {
            return Err(StashError::io(path, io::Error::other(message.clone())));
        }
        if !state.parent_exists(path) {
            return Err(not_found(path));
        }
        let modified_nanos = state.tick();
        state.files.insert(
            path.to_path_buf(),
            MemoryFile {
                bytes: bytes.to_vec(),
                modified_nanos,
            },
        );
        Ok(())
    }

    fn create_dir_all(&self, path: &Path) -> Result<()> {
        let mut state = self.state();
        for dir in path.ancestors() {
            if dir.as_os_str().is_empty() {
                continue;
            }
            if state.files.contains_key(dir) {
                return Err(StashError::io(
                    dir,
                    io::Error::new(io::ErrorKind::AlreadyExists, "File exists"),
                ));
            }
            state.dirs.insert(dir.to_path_buf());
        }
        Ok(())
    }

    fn remove_file(&self, path: &Path) -> Result<()> {
        self.state()
            .files
            .remove(path)
            .map(|_| ())
            .ok_or_else(|| not_found(path))
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn test_os_write_replaces_contents() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("store.cache");

        OsFileSystem.write(&path, b"first").unwrap();
        OsFileSystem.write(&path, b"second").unwrap();

        assert_eq!(OsFileSystem.read(&path).unwrap(), b"second");
        assert!(!temp_path_for(&path).exists());
    }

    #[test]
    fn test_os_write_to_tmp_named_target() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("store.tmp");

        assert_ne!(temp_path_for(&path), path);
        OsFileSystem.write(&path, b"bytes").unwrap();

        assert_eq!(OsFileSystem.read(&path).unwrap(), b"bytes");
        assert!(!temp_dir.path().join("store.tmp.tmp").exists());
    }

    #[test]
    fn test_os_write_failure_removes_temp_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("store.cache");
        // A non-empty directory at the target makes the final rename fail.
        fs::create_dir(&path).unwrap();
        fs::write(path.join("occupied"), "x").unwrap();

        let result = OsFileSystem.write(&path, b"bytes");

        assert!(matches!(result, Err(StashError::IoError { .. })));
        assert!(!temp_path_for(&path).exists());
        assert!(path.is_dir());
    }

    #[test]
    #[cfg(unix)]
    fn test_os_hash_follows_symlink() {
        use std::os::unix::fs::symlink;

        let temp_dir = TempDir::new().unwrap();
        let target = temp_dir.path().join("real.txt");
        let link = temp_dir.path().join("link.txt");
        fs::write(&target, "hello").unwrap();
        symlink(&target, &link).unwrap();

        assert_eq!(OsFileSystem.hash(&link).unwrap(), hash_bytes(b"hello"));
    }

    #[test]
    fn test_os_write_without_parent_fails() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("missing/store.cache");

        let result = OsFileSystem.write(&path, b"bytes");
        assert!(matches!(result, Err(StashError::IoError { .. })));
    }

    #[test]
    fn test_os_hash_matches_default_hash() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("a.txt");
        fs::write(&path, "hello").unwrap();

        assert_eq!(OsFileSystem.hash(&path).unwrap(), hash_bytes(b"hello"));
    }

    #[test]
    fn test_memory_clock_advances_on_write() {
        let memory = MemoryFileSystem::new();
        let path = Path::new("/project/a.txt");
        memory.add_file(path, "one");
        let first = memory.modified(path).unwrap();

        memory.write(path, b"two").unwrap();
        let second = memory.modified(path).unwrap();

        assert!(second > first);
        assert_eq!(memory.read(path).unwrap(), b"two");
    }

    #[test]
    fn test_memory_write_requires_parent() {
        let memory = MemoryFileSystem::new();
        let path = Path::new("/project/build/store.cache");

        assert!(memory.write(path, b"x").is_err());
        memory.create_dir_all(path.parent().unwrap()).unwrap();
        memory.write(path, b"x").unwrap();

        memory.remove_dir_all("/project/build");
        assert!(!memory.exists(path));
        assert!(memory.write(path, b"x").is_err());
    }

    #[test]
    fn test_memory_injected_failures() {
        let memory = MemoryFileSystem::new();
        let path = Path::new("/store.cache");
        memory.add_file(path, "bytes");
        memory.fail_read(path, "Bad read");
        memory.fail_write(path, "Out of space!");

        let read_err = memory.read(path).unwrap_err().to_string();
        assert!(read_err.contains("Bad read"));
        let write_err = memory.write(path, b"new").unwrap_err().to_string();
        assert!(write_err.contains("Out of space!"));

        memory.clear_failures();
        assert_eq!(memory.read(path).unwrap(), b"bytes");
    }
}
