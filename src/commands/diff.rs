//! Diff command: the build driver that consults the file store.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use rayon::prelude::*;

use crate::cli::normalize_path;
use crate::discovery::discover_tracked_files;
use crate::error::{Result, StashError};
use crate::file_store::{FileStore, FileStoreStrategy, PersistOutcome};
use crate::fs::{FileSystem, OsFileSystem};
use crate::logging::Logger;

/// What a diff run found.
#[derive(Debug)]
pub struct DiffReport {
    /// Number of files checked.
    pub checked: usize,
    /// Changed files, in the order they were checked.
    pub dirty: Vec<PathBuf>,
    /// Whether the observed state reached the cache file.
    pub persisted: bool,
}

pub struct Diff<'a> {
    cache_file: &'a Path,
    working_dir: &'a Path,
    files: &'a [PathBuf],
    strategy: FileStoreStrategy,
    persist: bool,
    jobs: Option<usize>,
    fs: Arc<dyn FileSystem>,
    logger: Logger,
}

pub struct DiffBuilder<'a> {
    cache_file: Option<&'a Path>,
    working_dir: Option<&'a Path>,
    files: &'a [PathBuf],
    strategy: FileStoreStrategy,
    persist: bool,
    jobs: Option<usize>,
    fs: Option<Arc<dyn FileSystem>>,
    logger: Option<Logger>,
}

impl Default for DiffBuilder<'_> {
    fn default() -> Self {
        Self {
            cache_file: None,
            working_dir: None,
            files: &[],
            strategy: FileStoreStrategy::Hash,
            persist: true,
            jobs: None,
            fs: None,
            logger: None,
        }
    }
}

impl<'a> DiffBuilder<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cache_file(mut self, path: &'a Path) -> Self {
        self.cache_file = Some(path);
        self
    }

    /// Directory relative file arguments are resolved against, and where Git
    /// discovery starts when no files are given.
    pub fn working_dir(mut self, dir: &'a Path) -> Self {
        self.working_dir = Some(dir);
        self
    }

    /// Files to check. Empty means every Git-tracked file.
    pub fn files(mut self, files: &'a [PathBuf]) -> Self {
        self.files = files;
        self
    }

    pub fn strategy(mut self, strategy: FileStoreStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn persist(mut self, persist: bool) -> Self {
        self.persist = persist;
        self
    }

    pub fn jobs(mut self, jobs: Option<usize>) -> Self {
        self.jobs = jobs;
        self
    }

    /// Filesystem the store reads and writes through (defaults to the host
    /// filesystem).
    pub fn file_system(mut self, fs: Arc<dyn FileSystem>) -> Self {
        self.fs = Some(fs);
        self
    }

    pub fn logger(mut self, logger: Logger) -> Self {
        self.logger = Some(logger);
        self
    }

    pub fn build(self) -> Result<Diff<'a>> {
        let cache_file = self
            .cache_file
            .ok_or_else(|| StashError::ConfigError("cache_file is required".to_string()))?;
        let working_dir = self
            .working_dir
            .ok_or_else(|| StashError::ConfigError("working_dir is required".to_string()))?;

        if self.jobs == Some(0) {
            return Err(StashError::ConfigError(
                "--jobs must be at least 1".to_string(),
            ));
        }

        Ok(Diff {
            cache_file,
            working_dir,
            files: self.files,
            strategy: self.strategy,
            persist: self.persist,
            jobs: self.jobs,
            fs: self.fs.unwrap_or_else(|| Arc::new(OsFileSystem)),
            logger: self.logger.unwrap_or_else(|| Logger::new(0, false)),
        })
    }
}

impl<'a> Diff<'a> {
    pub fn builder() -> DiffBuilder<'a> {
        DiffBuilder::new()
    }

    /// Loads the cache, diffs the files across a pool of workers sharing one
    /// store, and persists the result unless told not to.
    pub fn run(self) -> Result<DiffReport> {
        let log = &self.logger;
        let files = self.resolve_files()?;

        let mut store = FileStore::new(
            self.cache_file,
            Arc::clone(&self.fs),
            log.clone(),
            self.strategy,
        );
        store.initialize();

        let workers = worker_count(self.jobs, files.len());
        if let Some(requested) = self.jobs
            && requested > workers
        {
            log.verbose(
                1,
                format!("Limiting --jobs {requested} to {workers} worker(s)"),
            );
        }
        log.verbose(
            1,
            format!(
                "Checking {} file(s) with {workers} worker(s) using the {:?} strategy",
                files.len(),
                self.strategy
            ),
        );

        let dirty = diff_in_parallel(&store, &files, workers)?;

        let persisted = if self.persist {
            matches!(store.persist(), PersistOutcome::Written { .. })
        } else {
            log.verbose(1, "Skipping persist (--no-persist)");
            false
        };

        log.info(format!("{} of {} file(s) changed", dirty.len(), files.len()));

        Ok(DiffReport {
            checked: files.len(),
            dirty,
            persisted,
        })
    }

    fn resolve_files(&self) -> Result<Vec<PathBuf>> {
        if !self.files.is_empty() {
            return Ok(self
                .files
                .iter()
                .map(|file| normalize_path(file, self.working_dir))
                .collect());
        }

        let tracked = discover_tracked_files(self.working_dir)?;
        self.logger.verbose(
            1,
            format!(
                "Found {} tracked file(s) in {}",
                tracked.files.len(),
                tracked.repo_root.display()
            ),
        );
        if tracked.symlinks_skipped > 0 {
            self.logger.info(format!(
                "Note: Skipped {} symbolic link{}",
                tracked.symlinks_skipped,
                if tracked.symlinks_skipped == 1 { "" } else { "s" }
            ));
        }
        Ok(tracked.files)
    }
}

/// Upper bound on workers per available CPU when `--jobs` is explicit.
const MAX_WORKERS_PER_CPU: usize = 4;

/// Number of diff workers to start: the requested count (or one per CPU),
/// never more than there are files or than a small multiple of the CPUs.
fn worker_count(requested: Option<usize>, files: usize) -> usize {
    let cpus = rayon::current_num_threads();
    requested
        .unwrap_or(cpus)
        .min(cpus.saturating_mul(MAX_WORKERS_PER_CPU))
        .min(files)
        .max(1)
}

/// Splits `files` into one contiguous chunk per worker and diffs the chunks
/// concurrently against the same store. Results keep the input order.
fn diff_in_parallel(store: &FileStore, files: &[PathBuf], workers: usize) -> Result<Vec<PathBuf>> {
    if files.is_empty() {
        return Ok(Vec::new());
    }

    let chunk_size = files.len().div_ceil(workers).max(1);
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .build()
        .map_err(|e| {
            StashError::ConfigError(format!("failed to start {workers} diff worker(s): {e}"))
        })?;

    let chunks: Vec<Vec<PathBuf>> = pool.install(|| {
        files
            .par_chunks(chunk_size)
            .map(|chunk| store.diff_file_list(chunk))
            .collect()
    });

    Ok(chunks.concat())
}
