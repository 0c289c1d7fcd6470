//! Leveled logging with a pluggable output sink.
//!
//! The [`Logger`] is handed to a [`FileStore`](crate::file_store::FileStore)
//! at construction. The binary writes to stderr through [`StderrSink`]; tests
//! plug in a [`MemorySink`] and inspect what was reported.

use std::fmt::{self, Display};
use std::sync::{Arc, Mutex, PoisonError};

/// Severity attached to a logged line.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Level {
    Info,
    Warn,
    Error,
}

impl Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Level::Info => f.write_str("info"),
            Level::Warn => f.write_str("warning"),
            Level::Error => f.write_str("error"),
        }
    }
}

/// Destination for log lines.
pub trait LogSink: Send + Sync {
    fn write(&self, level: Level, message: &str);
}

/// Writes every line to stderr, prefixing warnings and errors.
#[derive(Debug, Default)]
pub struct StderrSink;

impl LogSink for StderrSink {
    fn write(&self, level: Level, message: &str) {
        match level {
            Level::Info => eprintln!("{message}"),
            Level::Warn | Level::Error => eprintln!("{level}: {message}"),
        }
    }
}

/// Keeps every line in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    lines: Mutex<Vec<(Level, String)>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// All captured lines, oldest first.
    pub fn lines(&self) -> Vec<(Level, String)> {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Captured lines of the given level.
    pub fn messages(&self, level: Level) -> Vec<String> {
        self.lines()
            .into_iter()
            .filter(|(l, _)| *l == level)
            .map(|(_, message)| message)
            .collect()
    }

    /// Returns `true` if any captured line contains `needle`.
    pub fn contains(&self, needle: &str) -> bool {
        self.lines()
            .iter()
            .any(|(_, message)| message.contains(needle))
    }
}

impl LogSink for MemorySink {
    fn write(&self, level: Level, message: &str) {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((level, message.to_string()));
    }
}

#[derive(Clone)]
pub struct Logger {
    verbose: u8,
    quiet: bool,
    sink: Arc<dyn LogSink>,
}

impl Logger {
    /// Logger writing to stderr.
    pub fn new(verbose: u8, quiet: bool) -> Self {
        Self::with_sink(verbose, quiet, Arc::new(StderrSink))
    }

    pub fn with_sink(verbose: u8, quiet: bool, sink: Arc<dyn LogSink>) -> Self {
        Self {
            verbose,
            quiet,
            sink,
        }
    }

    pub fn info(&self, message: impl Display) {
        if !self.quiet {
            self.sink.write(Level::Info, &message.to_string());
        }
    }

    pub fn verbose(&self, level: u8, message: impl Display) {
        if !self.quiet && self.verbose >= level {
            self.sink.write(Level::Info, &message.to_string());
        }
    }

    pub fn warn(&self, message: impl Display) {
        if !self.quiet {
            self.sink.write(Level::Warn, &message.to_string());
        }
    }

    /// Errors are reported even in quiet mode.
    pub fn error(&self, message: impl Display) {
        self.sink.write(Level::Error, &message.to_string());
    }

    pub fn quiet(&self) -> bool {
        self.quiet
    }

    pub fn level(&self) -> u8 {
        self.verbose
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("verbose", &self.verbose)
            .field("quiet", &self.quiet)
            .finish_non_exhaustive()
    }
}
