//! # file-stash
//!
//! An incremental build cache that tracks which input files changed between
//! build invocations.
//!
//! ## Overview
//!
//! A build driver asks a [`FileStore`](file_store::FileStore) which of its
//! inputs changed since the last successful build. The store compares each
//! file's BLAKE3 digest (or modification time) against what it recorded last
//! time, reports the ones that differ, and writes the new state back to a
//! versioned binary cache file.
//!
//! The store is conservative: a cache it cannot read is a cold start, a cache
//! it cannot write is skipped, and a file it cannot observe is reported as
//! changed. Rebuilding something unchanged is acceptable; skipping something
//! that changed is not.
//!
//! ## Architecture
//!
//! - [`file_store`]: previous/current state, diffing, persistence
//! - [`format`]: the versioned on-disk encoding
//! - [`fs`]: the filesystem capabilities the store is given
//! - [`logging`]: leveled logger with pluggable sinks
//! - [`cli`] and [`commands`]: a minimal build driver
//! - [`error`]: error types with thiserror + miette
//!
//! Internal modules:
//! - `hashing`: BLAKE3 file hashing
//! - `timestamp`: modification time encoding
//! - `discovery`: Git integration for listing tracked files
//!
//! ## Library Usage
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
//!     "build/file_store.cache",
//!     Arc::new(OsFileSystem),
//!     Logger::new(1, false),
//!     FileStoreStrategy::Hash,
//! );
//! store.initialize();
//!
//! let inputs = [PathBuf::from("assets/logo.png"), PathBuf::from("lib/main.dart")];
//! for changed in store.diff_file_list(&inputs) {
//!     println!("rebuild needed for {}", changed.display());
//! }
//!
//! store.persist();
//! ```
//!
//! ## CLI
//!
//! ```bash
//! # Print files changed since the last run and record their state
//! file-stash diff lib/main.dart pubspec.yaml
//!
//! # Check every Git-tracked file, compare modification times instead of hashes
//! file-stash --strategy timestamp diff
//! ```

pub mod cli;
pub mod commands;
pub mod error;
pub mod file_store;
pub mod format;
pub mod fs;
pub mod logging;

mod discovery;
mod hashing;
mod timestamp;
