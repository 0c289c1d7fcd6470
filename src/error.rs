//! Error types for file-stash.
//!
//! All fallible operations inside the crate return [`StashError`]. The
//! [`FileStore`](crate::file_store::FileStore) never lets one escape its public
//! operations: load and persist failures are wrapped in a [`StoreFailure`],
//! logged, and turned into a cold start or a skipped write.
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//!
//! use file_stash::error::{Result, StashError};
//!
//! fn require_cache(path: &Path) -> Result<()> {
//!     if !path.exists() {
//!         return Err(StashError::ConfigError(format!(
//!             "no cache at {}",
//!             path.display()
//!         )));
//!     }
//!     Ok(())
//! }
//! ```

use std::fmt;
use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

/// Error types that can occur in file-stash operations
#[derive(Error, Debug, Diagnostic)]
pub enum StashError {
    /// Git repository not found in the current directory or any parent.
    ///
    /// Only raised by the `diff` command when no explicit file list is given
    /// and the tracked files have to be discovered from the Git index.
    #[error("Git repository not found in '{0}' or any parent directories")]
    #[diagnostic(
        code(file_stash::git::repo_not_found),
        help("Pass the files to check explicitly, or run from within a Git repository.")
    )]
    RepoNotFound(PathBuf),

    /// Failed to read the Git index to enumerate tracked files.
    #[error("Failed to access Git index")]
    #[diagnostic(code(file_stash::git::index_error))]
    IndexError(#[from] git2::Error),

    /// File system I/O error.
    ///
    /// Common causes: permission denied, file not found, disk full, or memory
    /// mapping failures. The message of the underlying error is part of the
    /// display text so that it survives into log output.
    #[error("I/O error accessing '{path}': {source}")]
    #[diagnostic(code(file_stash::io_error))]
    IoError {
        /// The path that caused the I/O error
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Failed to serialize the file storage to its archived form.
    #[error("Failed to serialize file store: {0}")]
    #[diagnostic(
        code(file_stash::format::serialization_error),
        help("Run 'file-stash clear' to reset the cache.")
    )]
    SerializationError(#[source] rkyv::rancor::BoxedError),

    /// The archived payload of a store could not be validated.
    #[error("Failed to deserialize file store: {0}")]
    #[diagnostic(
        code(file_stash::format::deserialization_error),
        help("The cache file may be corrupted. Run 'file-stash clear' to reset it.")
    )]
    DeserializationError(#[source] rkyv::rancor::BoxedError),

    /// The store header is missing, truncated, or structurally invalid.
    #[error("Corrupt file store: {0}")]
    #[diagnostic(
        code(file_stash::format::corrupt),
        help("The cache file may be corrupted. Run 'file-stash clear' to reset it.")
    )]
    CorruptStore(String),

    /// The store was written with a different format version.
    #[error("File store version {found} does not match supported version {expected}")]
    #[diagnostic(
        code(file_stash::format::version_mismatch),
        help("The cache will be rebuilt from scratch on the next persist.")
    )]
    VersionMismatch {
        /// Version found in the store header
        found: u32,
        /// Version this build reads and writes
        expected: u32,
    },

    /// Attempted to hash a non-regular file (symlink or directory).
    #[error("Invalid file type for '{0}': {1}")]
    #[diagnostic(
        code(file_stash::file::invalid_type),
        help("Only regular files can be tracked.")
    )]
    InvalidFileType(PathBuf, String),

    /// A path could not be used as a store key.
    #[error("Invalid UTF-8 in path: {0}")]
    #[diagnostic(
        code(file_stash::path::invalid_utf8),
        help("Tracked file paths must be valid UTF-8.")
    )]
    InvalidUtf8Path(PathBuf),

    /// Invalid or incomplete configuration.
    #[error("Configuration error: {0}")]
    #[diagnostic(
        code(file_stash::config::error),
        help("Check the required configuration parameters.")
    )]
    ConfigError(String),
}

impl StashError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        StashError::IoError {
            path: path.into(),
            source,
        }
    }
}

/// The two failure modes a [`FileStore`](crate::file_store::FileStore)
/// recovers from.
#[derive(Debug)]
pub enum StoreFailure {
    /// Reading or decoding the cache file failed; the store cold-started.
    Load(StashError),
    /// Writing the cache file failed; the on-disk state was left as it was.
    Persist(StashError),
}

impl StoreFailure {
    /// The underlying error.
    pub fn error(&self) -> &StashError {
        match self {
            StoreFailure::Load(err) | StoreFailure::Persist(err) => err,
        }
    }
}

impl fmt::Display for StoreFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreFailure::Load(err) => write!(f, "failed to load file store: {err}"),
            StoreFailure::Persist(err) => write!(f, "failed to persist file store: {err}"),
        }
    }
}

/// Type alias for Results in this crate
pub type Result<T> = std::result::Result<T, StashError>;
