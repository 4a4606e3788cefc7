use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("no documents available to index")]
    EmptyCorpus,

    #[error("embedding failed: {0}")]
    Embedding(String),

    #[error("no index at {}", .0.display())]
    IndexMissing(PathBuf),

    #[error("index is corrupt: {0}")]
    IndexCorrupt(String),

    #[error("vector dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("storage operation failed: {0}")]
    Storage(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Failures of `load` that the retrieval gate answers with a rebuild.
    pub fn is_index_failure(&self) -> bool {
        matches!(
            self,
            Error::IndexMissing(_) | Error::IndexCorrupt(_) | Error::DimensionMismatch { .. } | Error::Storage(_) | Error::Io(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
