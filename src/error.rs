use std::path::PathBuf;

use thiserror::Error;

use crate::parse::ParseError;

pub type Result<T, E = BrcError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum BrcError {
    #[error("failed to open {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("chunk {chunk}: read of {len} bytes at offset {offset} failed: {source}")]
    ChunkRead {
        chunk: usize,
        offset: u64,
        len: usize,
        #[source]
        source: std::io::Error,
    },

    #[error("chunk {chunk}: malformed line at byte {offset}: {reason}")]
    MalformedLine {
        chunk: usize,
        offset: u64,
        reason: LineError,
    },

    #[error("chunk {chunk}: cancelled after another chunk failed")]
    Cancelled { chunk: usize },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("failed to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error("failed to write report: {0}")]
    Report(#[from] std::io::Error),

    #[error("failed to encode report: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Why a single line was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LineError {
    #[error("missing ';' separator")]
    MissingSeparator,
    #[error("empty key")]
    EmptyKey,
    #[error("key is not valid UTF-8")]
    InvalidKey,
    #[error("bad value: {0}")]
    Value(#[from] ParseError),
}
