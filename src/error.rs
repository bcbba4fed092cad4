use std::path::PathBuf;

use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("file {path:?} is {size} bytes, at least {min} are required to fingerprint it")]
    TooSmall { path: PathBuf, size: u64, min: u64 },

    #[error("login rejected: {0}")]
    Auth(String),

    #[error("query failed after {attempts} attempt(s): {source}")]
    Query {
        attempts: usize,
        #[source]
        source: Box<Error>,
    },

    /// The remote service answered with something other than the success status.
    #[error("unexpected status: {0}")]
    Status(String),

    #[error("malformed response: {0}")]
    Parse(String),

    /// Corrupt cache entry. Absorbed by the cache and never returned to callers.
    #[error("corrupt cache entry {path:?}: {reason}")]
    Cache { path: PathBuf, reason: String },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("configuration error: {0}")]
    Config(String),
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
