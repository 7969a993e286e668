use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, StreamError>;

/// Failures that prevent a stream (or a collaborator bound to one)
/// from being constructed.
///
/// Operations on an already constructed stream never produce these;
/// they report short transfers and rejected seeks through
/// [`Transfer`](crate::stream::Transfer) and plain `bool`s instead.
#[derive(Error, Debug)]
pub enum StreamError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to open {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Source buffer is empty")]
    EmptySource,
    #[error("Window at {offset} of {size} bytes exceeds base of {length}")]
    WindowOutOfBounds { offset: u64, size: u64, length: u64 },
    #[error("Stream is not writable")]
    NotWritable,
    #[error("Unexpected end of stream: requested {requested}, got {actual}")]
    UnexpectedEnd { requested: u64, actual: u64 },
}
