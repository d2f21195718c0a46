//! Crate-level error type
//!
//! Query-path misses (invalid or absent k-mers) are not errors: they surface
//! as zero TF and empty position lists. This enum covers the conditions that
//! do abort an operation: I/O and mmap failures, malformed companion files,
//! and index corruption detected at query time.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while loading, building, or interrogating an index.
#[derive(Error, Debug)]
pub enum AindexError {
    /// I/O errors (open, read, write, mmap)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A companion file has the wrong size or internal layout
    #[error("Malformed index file {path}: {message}")]
    Format {
        /// Offending file
        path: PathBuf,
        /// What was wrong with it
        message: String,
    },

    /// A record-index line could not be parsed
    #[error("Record index line {line}: {message}")]
    RecordIndex {
        /// 1-based line number
        line: usize,
        /// What was wrong with the line
        message: String,
    },

    /// A byte offset is covered by no read record. A posting pointing outside
    /// every record means the position index and the reads blob disagree.
    #[error("Byte offset {0} is not covered by any read record")]
    UncoveredOffset(u64),

    /// Unsupported k-mer width
    #[error("Unsupported k-mer width {0} (supported: 13, 23)")]
    UnsupportedK(usize),

    /// Arrays that must be parallel have diverging lengths
    #[error("Companion arrays disagree: {message}")]
    Inconsistent {
        /// Description of the disagreement
        message: String,
    },

    /// FASTA/FASTQ parsing error
    #[error("FASTA/FASTQ parsing error: {0}")]
    Parse(#[from] needletail::errors::ParseError),
}

impl AindexError {
    /// Create a Format error.
    pub fn format(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Format {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a RecordIndex error.
    pub fn record_index(line: usize, message: impl Into<String>) -> Self {
        Self::RecordIndex {
            line,
            message: message.into(),
        }
    }

    /// Create an Inconsistent error.
    pub fn inconsistent(message: impl Into<String>) -> Self {
        Self::Inconsistent {
            message: message.into(),
        }
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, AindexError>;
