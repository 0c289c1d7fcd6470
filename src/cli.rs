//! Command-line interface definitions for file-stash.
//!
//! The CLI is the smallest build driver that can exercise the cache: hand it
//! a list of files and it prints the ones that changed since the last run.
//!
//! # Example
//!
//! ```no_run
//! use file_stash::cli::{Cli, Commands};
//!
//! let cli = Cli::parse_args();
//!
//! match cli.command() {
//!     Commands::Diff { files, .. } => println!("checking {} file(s)", files.len()),
//!     Commands::Inspect => println!("inspecting the cache"),
//!     Commands::Clear => println!("clearing the cache"),
//! }
//! ```

use std::path::{Component, Path, PathBuf};

use clap::{Parser, Subcommand};

use crate::error::{Result, StashError};
use crate::file_store::FileStoreStrategy;

#[cfg(test)]
mod tests;

/// Cache file location used when none is configured, relative to the working
/// directory.
pub const DEFAULT_CACHE_FILE: &str = ".file_stash/file_store.cache";

/// Main command-line interface for file-stash.
#[derive(Parser)]
#[command(
    name = "file-stash",
    bin_name = "file-stash",
    author,
    version,
    about = "An incremental build cache that reports which files changed since the last build",
    long_about = None,
    propagate_version = true
)]
pub struct Cli {
    #[command(flatten)]
    global_opts: GlobalOpts,

    #[command(subcommand)]
    command: Commands,
}

/// Options that apply to every command.
#[derive(Parser)]
pub struct GlobalOpts {
    /// Path to the cache file (defaults to `.file_stash/file_store.cache`)
    #[arg(long, global = true, env = "FILE_STASH_CACHE_FILE")]
    cache_file: Option<PathBuf>,

    /// How changed files are detected
    #[arg(
        long,
        global = true,
        value_enum,
        default_value_t = FileStoreStrategy::Hash,
        env = "FILE_STASH_STRATEGY"
    )]
    strategy: FileStoreStrategy,

    /// Enable verbose output (use multiple times for more verbosity)
    #[arg(short, long, global = true, action = clap::ArgAction::Count, env = "FILE_STASH_VERBOSE")]
    verbose: u8,

    /// Silence all output except for errors and the list of changed files
    #[arg(
        short,
        long,
        global = true,
        conflicts_with = "verbose",
        env = "FILE_STASH_QUIET"
    )]
    quiet: bool,
}

impl GlobalOpts {
    pub fn builder() -> GlobalOptsBuilder {
        GlobalOptsBuilder::default()
    }

    /// The effective cache file, absolute and resolved against `working_dir`.
    pub fn get_cache_file(&self, working_dir: &Path) -> PathBuf {
        let path = self
            .cache_file()
            .unwrap_or_else(|| Path::new(DEFAULT_CACHE_FILE));
        normalize_path(path, working_dir)
    }

    pub fn cache_file(&self) -> Option<&Path> {
        self.cache_file.as_deref()
    }

    pub fn strategy(&self) -> FileStoreStrategy {
        self.strategy
    }

    pub fn verbose(&self) -> u8 {
        self.verbose
    }

    pub fn quiet(&self) -> bool {
        self.quiet
    }
}

/// Builder for constructing `GlobalOpts` without command-line parsing.
#[derive(Default)]
pub struct GlobalOptsBuilder {
    cache_file: Option<PathBuf>,
    strategy: FileStoreStrategy,
    verbose: u8,
    quiet: bool,
}

impl GlobalOptsBuilder {
    pub fn cache_file(mut self, path: Option<impl Into<PathBuf>>) -> Self {
        self.cache_file = path.map(|p| p.into());
        self
    }

    pub fn strategy(mut self, strategy: FileStoreStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn verbose(mut self, level: u8) -> Self {
        self.verbose = level;
        self
    }

    pub fn quiet(mut self, quiet: bool) -> Self {
        self.quiet = quiet;
        self
    }

    pub fn build(self) -> GlobalOpts {
        GlobalOpts {
            cache_file: self.cache_file,
            strategy: self.strategy,
            verbose: self.verbose,
            quiet: self.quiet,
        }
    }
}

impl Cli {
    pub fn global_opts(&self) -> &GlobalOpts {
        &self.global_opts
    }

    pub fn command(&self) -> &Commands {
        &self.command
    }

    /// Create a builder for programmatic construction
    pub fn builder() -> CliBuilder {
        CliBuilder::default()
    }

    /// Parse the process arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

/// Builder for [`Cli`]
#[derive(Debug, Default)]
pub struct CliBuilder {
    cache_file: Option<PathBuf>,
    strategy: FileStoreStrategy,
    verbose: u8,
    quiet: bool,
    command: Option<Commands>,
}

impl CliBuilder {
    pub fn cache_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.cache_file = Some(path.into());
        self
    }

    pub fn strategy(mut self, strategy: FileStoreStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn verbose(mut self, level: u8) -> Self {
        self.verbose = level;
        self
    }

    pub fn quiet(mut self, enabled: bool) -> Self {
        self.quiet = enabled;
        self
    }

    pub fn command(mut self, command: Commands) -> Self {
        self.command = Some(command);
        self
    }

    pub fn build(self) -> Result<Cli> {
        let command = self
            .command
            .ok_or_else(|| StashError::ConfigError("Command is required".to_string()))?;

        Ok(Cli {
            global_opts: GlobalOpts::builder()
                .cache_file(self.cache_file)
                .strategy(self.strategy)
                .verbose(self.verbose)
                .quiet(self.quiet)
                .build(),
            command,
        })
    }
}

/// Makes `path` absolute against `base` and removes `.` and `..` components.
///
/// Symlinks are not resolved and the path does not need to exist.
pub(crate) fn normalize_path(path: impl AsRef<Path>, base: &Path) -> PathBuf {
    let path = path.as_ref();

    let absolute = if path.is_relative() {
        base.join(path)
    } else {
        path.to_path_buf()
    };

    let mut components = Vec::new();
    for component in absolute.components() {
        match component {
            Component::ParentDir => {
                if let Some(last) = components.last()
                    && !matches!(last, Component::ParentDir | Component::RootDir)
                {
                    components.pop();
                    continue;
                }
                if matches!(components.last(), Some(Component::RootDir)) {
                    continue;
                }
                components.push(component);
            }
            Component::CurDir => continue,
            _ => components.push(component),
        }
    }

    components.iter().collect()
}

/// Available file-stash subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Print the files that changed since the last recorded build
    ///
    /// Loads the cache, checks every given file (or every file tracked by Git
    /// when none are given), prints the changed ones to stdout, and records
    /// the new state. Missing files are always reported as changed.
    Diff {
        /// Files to check (defaults to all Git-tracked files)
        files: Vec<PathBuf>,

        /// Do not write the observed state back to the cache file
        #[arg(long, env = "FILE_STASH_NO_PERSIST")]
        no_persist: bool,

        /// Number of parallel diff workers (defaults to the number of CPUs)
        #[arg(short, long, env = "FILE_STASH_JOBS")]
        jobs: Option<usize>,
    },

    /// Show what the cache file currently records
    ///
    /// Prints the format version and number of records; with -v, every
    /// recorded path and its hash.
    Inspect,

    /// Remove the cache file, forcing every file to read as changed next time
    Clear,
}
