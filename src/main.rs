//! # file-stash CLI
//!
//! Reports which files changed since the last recorded build.
//!
//! ## Commands
//!
//! - **diff**: print changed files and record the new state
//! - **inspect**: show what the cache file records
//! - **clear**: remove the cache file
//!
//! ## Environment Variables
//!
//! - `FILE_STASH_CACHE_FILE`: cache file location (default:
//!   `.file_stash/file_store.cache`)
//! - `FILE_STASH_STRATEGY`: `hash` or `timestamp`
//! - `FILE_STASH_VERBOSE`: enable verbose output
//! - `FILE_STASH_QUIET`: silence all output except errors and results

use std::io::IsTerminal;

use file_stash::cli::Cli;

fn main() -> miette::Result<()> {
    miette::set_panic_hook();

    if std::io::stderr().is_terminal() {
        miette::set_hook(Box::new(|_| {
            Box::new(
                miette::GraphicalReportHandler::new()
                    .with_theme(miette::GraphicalTheme::unicode_nocolor())
                    .with_context_lines(3),
            )
        }))?;
    } else {
        // CI and log files
        miette::set_hook(Box::new(|_| {
            Box::new(
                miette::GraphicalReportHandler::new()
                    .with_theme(miette::GraphicalTheme::none())
                    .with_context_lines(0),
            )
        }))?;
    }

    let cli = Cli::parse_args();

    file_stash::commands::execute(&cli).map_err(Into::into)
}
