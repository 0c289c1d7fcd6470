//! Tracks which input files changed since the last successful build.
//!
//! A [`FileStore`] keeps two indices keyed by path:
//!
//! - `previous_asset_keys`: what the cache file said at [`FileStore::initialize`]
//!   (or what the last [`FileStore::persist_incremental`] promoted)
//! - `current_asset_keys`: what [`FileStore::diff_file_list`] has observed in
//!   this build
//!
//! None of the public operations fail. A cache that cannot be read is a cold
//! start, a cache that cannot be written is skipped, and a file that cannot be
//! observed is dirty. Every such failure is reported through the [`Logger`].
//!
//! # Example
//!
//! ```no_run
//! use std::path::PathBuf;
//! use std::sync::Arc;
//!
//! use file_stash::file_store::{FileStore, FileStoreStrategy};
//! use file_stash::fs::OsFileSystem;
//! use file_stash::logging::Logger;
//!
//! let mut store = FileStore::new(
//!     ".file_stash/file_store.cache",
//!     Arc::new(OsFileSystem),
//!     Logger::new(0, false),
//!     FileStoreStrategy::Hash,
//! );
//! store.initialize();
//! let dirty = store.diff_file_list(&[PathBuf::from("src/main.rs")]);
//! println!("{} file(s) changed", dirty.len());
//! store.persist();
//! ```

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use clap::ValueEnum;

use crate::error::{Result, StashError, StoreFailure};
use crate::format::FileStorage;
use crate::fs::FileSystem;
use crate::logging::Logger;
use crate::timestamp::{decode_mtime, encode_mtime};


/// How a file is decided to have changed. Fixed for the lifetime of a store.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum FileStoreStrategy {
    /// Compare BLAKE3 digests of the file contents.
    #[default]
    Hash,
    /// Compare modification times; a newer time than recorded is a change.
    Timestamp,
}

/// What [`FileStore::initialize`] found.
#[derive(Debug)]
pub enum InitializeOutcome {
    /// No cache file existed.
    ColdStart,
    /// The cache file was loaded.
    Loaded { files: usize },
    /// The cache file could not be used and the store starts empty.
    Recovered(StoreFailure),
}

/// What [`FileStore::persist`] did.
#[derive(Debug)]
pub enum PersistOutcome {
    Written { files: usize, bytes: usize },
    /// Nothing reached the disk; the failure has already been logged.
    Skipped(StoreFailure),
}

/// Result of looking at one file on disk.
enum Observation {
    Missing,
    Seen { key: String, value: String },
}

pub struct FileStore {
    cache_file: PathBuf,
    fs: Arc<dyn FileSystem>,
    logger: Logger,
    strategy: FileStoreStrategy,
    previous_asset_keys: HashMap<String, String>,
    current_asset_keys: Mutex<HashMap<String, String>>,
}

impl FileStore {
    /// Creates a store owning `cache_file`. Nothing is read until
    /// [`FileStore::initialize`].
    pub fn new(
        cache_file: impl Into<PathBuf>,
        fs: Arc<dyn FileSystem>,
        logger: Logger,
        strategy: FileStoreStrategy,
    ) -> Self {
        Self {
            cache_file: cache_file.into(),
            fs,
            logger,
            strategy,
            previous_asset_keys: HashMap::new(),
            current_asset_keys: Mutex::new(HashMap::new()),
        }
    }

    /// Loads the previous state from the cache file.
    ///
    /// A missing cache file is a cold start. A cache that cannot be read or
    /// decoded is logged as an error and also leaves the previous state
    /// empty. The current state is always reset.
    pub fn initialize(&mut self) -> InitializeOutcome {
        self.current_mut().clear();
        self.previous_asset_keys.clear();

        if !self.fs.exists(&self.cache_file) {
            self.logger.verbose(
                1,
                format!(
                    "No file store at {}, starting cold",
                    self.cache_file.display()
                ),
            );
            return InitializeOutcome::ColdStart;
        }

        match self.load() {
            Ok(storage) => {
                let files = storage.len();
                self.previous_asset_keys = storage
                    .files
                    .into_iter()
                    .map(|record| (record.path, record.hash))
                    .collect();
                self.logger.verbose(
                    1,
                    format!(
                        "Loaded {files} record(s) from {}",
                        self.cache_file.display()
                    ),
                );
                InitializeOutcome::Loaded { files }
            }
            Err(err) => {
                self.logger.error(format!(
                    "Failed to load file store at {}, starting from an empty cache: {err}",
                    self.cache_file.display()
                ));
                InitializeOutcome::Recovered(StoreFailure::Load(err))
            }
        }
    }

    fn load(&self) -> Result<FileStorage> {
        let bytes = self.fs.read(&self.cache_file)?;
        FileStorage::decode(&bytes)
    }

    /// Returns the files that changed since the previous state, in input
    /// order.
    ///
    /// Missing files are always reported and never recorded. Every file that
    /// could be observed is recorded into the current state whether or not it
    /// changed. Safe to call from several threads at once.
    pub fn diff_file_list<P: AsRef<Path>>(&self, files: &[P]) -> Vec<PathBuf> {
        let mut dirty = Vec::new();
        let mut observed = Vec::with_capacity(files.len());
        let mut verdicts: HashMap<&Path, bool> = HashMap::new();

        for file in files {
            let path = file.as_ref();
            let is_dirty = match verdicts.get(path) {
                Some(&is_dirty) => is_dirty,
                None => {
                    let is_dirty = match self.observe(path) {
                        Ok(Observation::Missing) => true,
                        Ok(Observation::Seen { key, value }) => {
                            let is_dirty = self.changed(&key, &value);
                            observed.push((key, value));
                            is_dirty
                        }
                        Err(err) => {
                            self.logger.verbose(
                                1,
                                format!("Treating {} as changed: {err}", path.display()),
                            );
                            true
                        }
                    };
                    verdicts.insert(path, is_dirty);
                    is_dirty
                }
            };

            if is_dirty {
                dirty.push(path.to_path_buf());
            }
        }

        if !observed.is_empty() {
            self.current().extend(observed);
        }

        self.logger.verbose(
            2,
            format!("{} of {} file(s) changed", dirty.len(), files.len()),
        );

        dirty
    }

    fn observe(&self, path: &Path) -> Result<Observation> {
        if !self.fs.exists(path) {
            return Ok(Observation::Missing);
        }

        let key = path
            .to_str()
            .ok_or_else(|| StashError::InvalidUtf8Path(path.to_path_buf()))?
            .to_string();

        let value = match self.strategy {
            FileStoreStrategy::Hash => self.fs.hash(path)?,
            FileStoreStrategy::Timestamp => encode_mtime(self.fs.modified(path)?),
        };

        Ok(Observation::Seen { key, value })
    }

    fn changed(&self, key: &str, value: &str) -> bool {
        let Some(previous) = self.previous_asset_keys.get(key) else {
            return true;
        };

        match self.strategy {
            FileStoreStrategy::Hash => previous != value,
            FileStoreStrategy::Timestamp => match (decode_mtime(previous), decode_mtime(value)) {
                (Some(previous), Some(current)) => current > previous,
                _ => true,
            },
        }
    }

    /// Writes the current state to the cache file, replacing its contents.
    ///
    /// Failures are logged and swallowed; in-memory state is unaffected.
    pub fn persist(&self) -> PersistOutcome {
        match self.write_store() {
            Ok((files, bytes)) => {
                self.logger.verbose(
                    1,
                    format!(
                        "Persisted {files} record(s) ({bytes} bytes) to {}",
                        self.cache_file.display()
                    ),
                );
                PersistOutcome::Written { files, bytes }
            }
            Err(err) => {
                self.logger.error(format!(
                    "Failed to persist file store to {}: {err}",
                    self.cache_file.display()
                ));
                PersistOutcome::Skipped(StoreFailure::Persist(err))
            }
        }
    }

    fn write_store(&self) -> Result<(usize, usize)> {
        let storage = FileStorage::from_entries(
            self.current()
                .iter()
                .map(|(path, hash)| (path.clone(), hash.clone())),
        );
        let buffer = storage.to_buffer()?;

        if let Some(parent) = self.cache_file.parent()
            && !parent.as_os_str().is_empty()
        {
            self.fs.create_dir_all(parent)?;
        }
        self.fs.write(&self.cache_file, &buffer)?;

        Ok((storage.len(), buffer.len()))
    }

    /// Promotes the current state to the previous state without touching
    /// disk, and starts a fresh current state.
    ///
    /// The final phase of a build still needs [`FileStore::persist`].
    pub fn persist_incremental(&mut self) {
        self.previous_asset_keys = std::mem::take(self.current_mut());
    }

    /// Snapshot of the state observed in this build.
    pub fn current_asset_keys(&self) -> HashMap<String, String> {
        self.current().clone()
    }

    /// State as of initialization or the last incremental persist.
    pub fn previous_asset_keys(&self) -> &HashMap<String, String> {
        &self.previous_asset_keys
    }

    pub fn cache_file(&self) -> &Path {
        &self.cache_file
    }

    pub fn strategy(&self) -> FileStoreStrategy {
        self.strategy
    }

    fn current(&self) -> MutexGuard<'_, HashMap<String, String>> {
        self.current_asset_keys
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn current_mut(&mut self) -> &mut HashMap<String, String> {
        self.current_asset_keys
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
    }
}
