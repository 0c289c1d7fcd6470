use std::path::{Path, PathBuf};

use clap::Parser;

use crate::cli::{Cli, Commands, normalize_path};
use crate::file_store::FileStoreStrategy;

#[test]
fn test_cli_parsing() {
    let cli = Cli::parse_from(["file-stash", "diff", "a.txt", "b.txt"]);
    match cli.command() {
        Commands::Diff {
            files,
            no_persist,
            jobs,
        } => {
            assert_eq!(files, &vec![PathBuf::from("a.txt"), PathBuf::from("b.txt")]);
            assert!(!no_persist);
            assert!(jobs.is_none());
        }
        other => panic!("Expected Diff, got: {other:?}"),
    }
    assert!(cli.global_opts().cache_file().is_none());
    assert_eq!(cli.global_opts().strategy(), FileStoreStrategy::Hash);
    assert_eq!(cli.global_opts().verbose(), 0);
    assert!(!cli.global_opts().quiet());
}

#[test]
fn test_default_cache_file_resolves_against_working_dir() {
    let cli = Cli::parse_from(["file-stash", "inspect"]);
    assert_eq!(
        cli.global_opts().get_cache_file(Path::new("/work/app")),
        PathBuf::from("/work/app/.file_stash/file_store.cache")
    );
}

#[test]
fn test_custom_cache_file() {
    let cli = Cli::parse_from(["file-stash", "--cache-file", "../build/stash.bin", "clear"]);
    assert_eq!(
        cli.global_opts().cache_file(),
        Some(Path::new("../build/stash.bin"))
    );
    assert_eq!(
        cli.global_opts().get_cache_file(Path::new("/work/app")),
        PathBuf::from("/work/build/stash.bin")
    );
    assert!(matches!(cli.command(), Commands::Clear));
}

#[test]
fn test_strategy_flag() {
    let cli = Cli::parse_from(["file-stash", "--strategy", "timestamp", "diff"]);
    assert_eq!(cli.global_opts().strategy(), FileStoreStrategy::Timestamp);

    assert!(Cli::try_parse_from(["file-stash", "--strategy", "sha1", "diff"]).is_err());
}

#[test]
fn test_diff_options() {
    let cli = Cli::parse_from(["file-stash", "-vv", "diff", "--no-persist", "-j", "4"]);
    assert_eq!(cli.global_opts().verbose(), 2);
    match cli.command() {
        Commands::Diff {
            files,
            no_persist,
            jobs,
        } => {
            assert!(files.is_empty());
            assert!(*no_persist);
            assert_eq!(*jobs, Some(4));
        }
        other => panic!("Expected Diff, got: {other:?}"),
    }
}

#[test]
fn test_global_flag_positioning() {
    let cli = Cli::parse_from(["file-stash", "inspect", "--verbose"]);
    assert_eq!(cli.global_opts().verbose(), 1);
    assert!(matches!(cli.command(), Commands::Inspect));
}

#[test]
fn test_quiet_conflicts_with_verbose() {
    assert!(Cli::try_parse_from(["file-stash", "-q", "-v", "inspect"]).is_err());
}

#[test]
fn test_cli_builder() {
    let cli = Cli::builder()
        .cache_file("custom.cache")
        .strategy(FileStoreStrategy::Timestamp)
        .verbose(2)
        .command(Commands::Inspect)
        .build()
        .expect("Failed to build CLI");

    assert_eq!(cli.global_opts().cache_file(), Some(Path::new("custom.cache")));
    assert_eq!(cli.global_opts().strategy(), FileStoreStrategy::Timestamp);
    assert_eq!(cli.global_opts().verbose(), 2);
    assert!(matches!(cli.command(), Commands::Inspect));

    assert!(Cli::builder().build().is_err());
}

#[test]
fn test_normalize_path() {
    let base = Path::new("/home/dev/project");

    let normalized = normalize_path("./target/./debug", base);
    assert_eq!(normalized, PathBuf::from("/home/dev/project/target/debug"));

    let normalized = normalize_path("target/../other/target", base);
    assert_eq!(normalized, PathBuf::from("/home/dev/project/other/target"));

    let normalized = normalize_path("/abs/path", base);
    assert_eq!(normalized, PathBuf::from("/abs/path"));

    let normalized = normalize_path("./a/b/../c/./d/../e", base);
    assert!(normalized.ends_with("a/c/e"));

    let normalized = normalize_path("/../../etc", base);
    assert_eq!(normalized, PathBuf::from("/etc"));
}
