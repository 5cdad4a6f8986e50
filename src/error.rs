use std::io;
use thiserror::Error;

/// Errors surfaced by decode, build and search.
#[derive(Debug, Error)]
pub enum KnnError {
    #[error("io error ({context}): {source}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("cannot allocate storage for {elements} elements")]
    Allocation { elements: usize },
}

impl KnnError {
    pub fn io(context: impl Into<String>, source: io::Error) -> Self {
        KnnError::Io { context: context.into(), source }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        KnnError::InvalidConfig(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, KnnError>;
