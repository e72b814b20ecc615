//! Error types for search specification loading.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur when loading or resolving search specifications.
#[derive(Debug, Error)]
pub enum SpecError {
    /// Failed to read a specification file.
    #[error("failed to read spec file {path}: {source}")]
    ReadFile {
        /// Path to the file that could not be read.
        path: PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },

    /// Failed to parse YAML specification content.
    #[error("failed to parse spec file {path}: {source}")]
    ParseYaml {
        /// Path to the file that could not be parsed.
        path: PathBuf,
        /// Underlying YAML parse error.
        source: serde_yaml::Error,
    },

    /// A custom munge declared an invalid regular expression.
    #[error("invalid pattern '{pattern}' in munge '{munge}' of handler '{handler}': {source}")]
    InvalidPattern {
        /// Handler declaring the munge.
        handler: String,
        /// Name of the munge.
        munge: String,
        /// The invalid pattern.
        pattern: String,
        /// Underlying regex error.
        source: regex::Error,
    },

    /// A custom munge declared an operation that is not recognized.
    #[error("invalid munge operation {op:?} in munge '{munge}' of handler '{handler}'")]
    InvalidMunge {
        /// Handler declaring the munge.
        handler: String,
        /// Name of the munge.
        munge: String,
        /// The offending operation tuple.
        op: Vec<String>,
    },

    /// Failed to stat a specification file while fingerprinting.
    #[error("failed to stat spec file {path}: {source}")]
    Stat {
        /// Path to the file that could not be inspected.
        path: PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },
}
