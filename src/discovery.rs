use std::path::{Path, PathBuf};

use git2::{Index, Repository};

use crate::error::StashError;

/// Index mode of a submodule entry.
const SUBMODULE_MODE: u32 = 0o160000;

/// Files listed in a Git index.
#[derive(Debug)]
pub struct TrackedFiles {
    /// Absolute working directory of the repository.
    pub repo_root: PathBuf,
    /// Absolute paths of tracked regular files, in index order.
    pub files: Vec<PathBuf>,
    /// Tracked symbolic links that were left out.
    pub symlinks_skipped: usize,
}

/// Discovers all tracked files in the Git repository containing `start`.
///
/// The Git index is the source of truth, so `.gitignore` is respected and
/// tracked-but-deleted files are still listed (and will diff as changed).
/// Submodules and symbolic links are skipped.
///
/// # Errors
///
/// Returns an error if:
/// - No Git repository is found at or above `start`, or it is bare
/// - The Git index cannot be read
/// - A tracked path is not valid UTF-8
pub fn discover_tracked_files(start: &Path) -> Result<TrackedFiles, StashError> {
    let repo = Repository::discover(start)
        .map_err(|_| StashError::RepoNotFound(start.to_path_buf()))?;

    let repo_root = repo
        .workdir()
        .ok_or_else(|| StashError::RepoNotFound(start.to_path_buf()))?
        .to_path_buf();

    let index = repo.index()?;
    let (files, symlinks_skipped) = collect_index_paths(&index, &repo_root)?;

    Ok(TrackedFiles {
        repo_root,
        files,
        symlinks_skipped,
    })
}

fn collect_index_paths(
    index: &Index,
    repo_root: &Path,
) -> Result<(Vec<PathBuf>, usize), StashError> {
    let mut paths = Vec::new();
    let mut symlinks_skipped = 0;

    for entry in index.iter() {
        if entry.mode == SUBMODULE_MODE {
            continue;
        }

        let relative = std::str::from_utf8(&entry.path).map_err(|_| {
            StashError::InvalidUtf8Path(PathBuf::from(
                String::from_utf8_lossy(&entry.path).into_owned(),
            ))
        })?;
        let full_path = repo_root.join(relative);

        if let Ok(metadata) = std::fs::symlink_metadata(&full_path)
            && metadata.is_symlink()
        {
            symlinks_skipped += 1;
            continue;
        }

        paths.push(full_path);
    }

    Ok((paths, symlinks_skipped))
}
