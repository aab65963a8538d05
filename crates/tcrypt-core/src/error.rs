//! Core error types

use std::path::PathBuf;

use thiserror::Error;

use crate::digits::Constant;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid digit range: start={start}, length={length}")]
    InvalidRange { start: u64, length: usize },

    #[error("Invalid pattern: {0}")]
    InvalidPattern(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Digit source for {constant} unavailable at {}: {source}", path.display())]
    SourceUnavailable {
        constant: Constant,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Digit source for {constant} is corrupt: {reason}")]
    SourceCorrupt { constant: Constant, reason: String },

    #[error("No offsets given for either constant")]
    NoOffsets,

    #[error(
        "Insufficient stream: needed {required} matches, found {found} in {stream_length} digits. Grow the stream."
    )]
    InsufficientStream {
        required: usize,
        found: usize,
        stream_length: usize,
    },

    #[error("Search cancelled")]
    Cancelled,

    #[error("Search deadline exceeded")]
    DeadlineExceeded,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
