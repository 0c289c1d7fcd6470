//! Implementation of file-stash subcommands.
//!
//! `mod.rs` is a thin dispatcher; command logic lives in `diff`, `inspect`
//! and `clear`. Commands report through the [`Logger`] on stderr and print
//! their results (changed files, cache contents) on stdout.

use std::path::{Path, PathBuf};

use crate::cli::{Cli, Commands};
use crate::error::{Result, StashError};
use crate::fs::OsFileSystem;
use crate::logging::Logger;

pub(crate) mod clear;
pub(crate) mod diff;
pub(crate) mod inspect;

pub use clear::clear;
pub use diff::{Diff, DiffBuilder, DiffReport};
pub use inspect::{CacheStatus, inspect};


/// Execute commands based on the parsed CLI arguments.
pub fn execute(cli: &Cli) -> Result<()> {
    execute_with_dir(cli, None)
}

/// Execute commands with an explicit working directory.
pub fn execute_with_dir(cli: &Cli, working_dir: Option<&Path>) -> Result<()> {
    let quiet = cli.global_opts().quiet();
    let verbose = if quiet {
        0
    } else {
        cli.global_opts().verbose()
    };
    let log = Logger::new(verbose, quiet);

    let current_dir = if let Some(dir) = working_dir {
        dir.to_path_buf()
    } else {
        std::env::current_dir().map_err(|source| StashError::IoError {
            path: PathBuf::from("."),
            source,
        })?
    };

    let cache_file = cli.global_opts().get_cache_file(&current_dir);

    match cli.command() {
        Commands::Diff {
            files,
            no_persist,
            jobs,
        } => {
            let report = Diff::builder()
                .cache_file(&cache_file)
                .working_dir(&current_dir)
                .files(files)
                .strategy(cli.global_opts().strategy())
                .persist(!no_persist)
                .jobs(*jobs)
                .logger(log)
                .build()?
                .run()?;

            for path in &report.dirty {
                println!("{}", path.display());
            }
            Ok(())
        }
        Commands::Inspect => {
            match inspect(&cache_file, &OsFileSystem, &log)? {
                CacheStatus::Missing => {
                    log.info(format!("No cache file at {}", cache_file.display()));
                }
                CacheStatus::Valid(storage) => {
                    println!("version: {}", storage.version);
                    println!("records: {}", storage.len());
                    if verbose > 0 {
                        for record in &storage.files {
                            println!("{}  {}", record.hash, record.path);
                        }
                    }
                }
                CacheStatus::Invalid(err) => {
                    log.warn(format!(
                        "Cache file at {} will be ignored by the next build: {err}",
                        cache_file.display()
                    ));
                }
            }
            Ok(())
        }
        Commands::Clear => {
            clear(&cache_file, &OsFileSystem, &log)?;
            Ok(())
        }
    }
}
