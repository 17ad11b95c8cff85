use std::path::PathBuf;

use thiserror::Error;

use crate::filter::FilterError;

/// The unified error type for per-game work in the `player_stats` crate.
///
/// Any of these fails a single game; the batch driver records it and moves on.
#[derive(Debug, Error)]
pub enum Error {
    /// A file or directory could not be read, created or written.
    #[error("I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The CSV layer failed (bad quoting, unreadable header, write failure).
    #[error("CSV error in {}: {source}", path.display())]
    Csv { path: PathBuf, source: csv::Error },

    /// A table lacks a column the pipeline needs.
    #[error("{}: missing required column {column}", path.display())]
    MissingColumn { path: PathBuf, column: String },

    /// The filter stage rejected the game's readings.
    #[error("filter stage failed: {0}")]
    Filter(#[from] FilterError),

    /// Refused to replace a file a human maintains.
    #[error("refusing to overwrite {}", .0.display())]
    WouldOverwrite(PathBuf),
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn csv(path: impl Into<PathBuf>, source: csv::Error) -> Self {
        Self::Csv {
            path: path.into(),
            source,
        }
    }
}

/// Crate-wide result alias.
pub type Result<T, E = Error> = std::result::Result<T, E>;
