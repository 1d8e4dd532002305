//! Error types for manifest building.
//!
//! Fatal failures surface as [`Error`]. Per-container and per-entry failures
//! have their own types because the pipeline recovers from them locally.

use std::path::PathBuf;
use thiserror::Error;

/// Fatal errors that abort a manifest run.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid input {path:?}: {reason}")]
    InvalidInput { path: PathBuf, reason: String },

    #[error("provider initialization failed: {0}")]
    ProviderInit(#[from] ProviderInitError),

    #[error("aggregation failed: {0}")]
    Aggregation(#[from] AggregationError),

    #[error("failed to write manifest to {dest}: {source}")]
    OutputWrite {
        dest: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize manifest: {0}")]
    Serialize(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// The archive provider could not be brought up at all.
#[derive(Debug, Error)]
pub enum ProviderInitError {
    #[error("not a directory: {0:?}")]
    NotADirectory(PathBuf),

    #[error("directory walk failed: {0}")]
    Walk(#[from] walkdir::Error),
}

/// Building the record for one archive or one toc/payload pair failed.
#[derive(Debug, Error)]
pub enum ContainerProcessingError {
    #[error("no file name in {0:?}")]
    NoFileName(PathBuf),

    #[error("{path:?} is not under package root {root:?}")]
    OutsideRoot { path: PathBuf, root: PathBuf },
}

/// One catalog entry could not be resolved to its metadata.
#[derive(Debug, Error)]
#[error("entry {path}: {reason}")]
pub struct EntryIntrospectionError {
    pub path: String,
    pub reason: String,
}

#[derive(Debug, Error)]
pub enum AggregationError {
    #[error("{field} of {container} does not fit in i64: {value}")]
    Unrepresentable { container: String, field: &'static str, value: u64 },

    #[error("{field} total overflowed while adding {container}")]
    Overflow { container: String, field: &'static str },
}

/// Decoding failures for a single container index.
#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("bad magic")]
    BadMagic,

    #[error("unsupported version {0}")]
    UnsupportedVersion(u32),

    #[error("unexpected end of data reading {0}")]
    Truncated(&'static str),

    #[error("index is encrypted")]
    Encrypted,

    #[error("{what} too large: {got} (limit {limit})")]
    LimitExceeded { what: &'static str, got: u64, limit: u64 },

    #[error("malformed: {0}")]
    Malformed(String),

    #[error("missing payload file {0:?}")]
    MissingPayload(PathBuf),
}
