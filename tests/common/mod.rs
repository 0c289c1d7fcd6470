use std::path::{Path, PathBuf};
use std::sync::Arc;

use assert_fs::TempDir;
use assert_fs::prelude::*;
use file_stash::file_store::{FileStore, FileStoreStrategy};
use file_stash::fs::OsFileSystem;
use file_stash::logging::{Logger, MemorySink};

/// A project directory with a couple of source files and a cache location
/// inside a build directory.
pub struct Project {
    pub dir: TempDir,
}

impl Project {
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        dir.child("lib/main.dart")
            .write_str("void main() => runApp(App());")
            .unwrap();
        dir.child("pubspec.yaml").write_str("name: app").unwrap();
        Self { dir }
    }

    /// Same layout, also registered in a Git index.
    pub fn with_git() -> Self {
        let project = Self::new();
        let repo = git2::Repository::init(project.dir.path()).unwrap();
        let mut index = repo.index().unwrap();
        index.add_path(Path::new("lib/main.dart")).unwrap();
        index.add_path(Path::new("pubspec.yaml")).unwrap();
        index.write().unwrap();
        project
    }

    pub fn path(&self, relative: &str) -> PathBuf {
        self.dir.path().join(relative)
    }

    pub fn inputs(&self) -> Vec<PathBuf> {
        vec![self.path("lib/main.dart"), self.path("pubspec.yaml")]
    }

    pub fn cache_file(&self) -> PathBuf {
        self.path("build/file_store.cache")
    }

    /// A store over the project's cache file, logging into the returned sink.
    pub fn store(&self, strategy: FileStoreStrategy) -> (Arc<MemorySink>, FileStore) {
        let sink = Arc::new(MemorySink::new());
        let store = FileStore::new(
            self.cache_file(),
            Arc::new(OsFileSystem),
            Logger::with_sink(1, false, sink.clone()),
            strategy,
        );
        (sink, store)
    }
}
