use std::path::PathBuf;

use thiserror::Error;

/// Fatal errors surfaced by a query run.
///
/// Everything here is a configuration or environment problem and aborts the run
/// before extraction starts. Per-file problems (parse failures, unresolved
/// specifiers, alias cycles) are never errors; they become [`crate::Warning`]s.
#[derive(Error, Debug)]
pub enum Error {
    #[error(
        "unknown analyzer {0:?} (expected one of: {known})",
        known = crate::analyzers::AnalyzerName::known_names()
    )]
    UnknownAnalyzer(String),

    #[error("project path does not exist or is not a directory: {}", .0.display())]
    ProjectNotFound(PathBuf),

    #[error("project pattern {0:?} matched no directories")]
    EmptyProjectPattern(String),

    #[error("invalid project pattern {pattern:?}: {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("invalid option {key:?} for analyzer {analyzer}: {reason}")]
    InvalidOption {
        analyzer: String,
        key: String,
        reason: String,
    },

    #[error("failed to build worker pool: {0}")]
    ThreadPool(String),

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cache error: {0}")]
    Cache(String),
}

pub type Result<T> = std::result::Result<T, Error>;
