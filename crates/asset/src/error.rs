//! Fatal-to-load errors. Everything recoverable is logged and defaulted instead.

use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read {file}: {source}")]
    Io {
        file: String,
        #[source]
        source: io::Error,
    },

    #[error("invalid material file {file} (line {line}): '{token}' appears before any 'newmtl'")]
    FieldBeforeNewmtl {
        file: String,
        line: usize,
        token: String,
    },

    #[error("invalid face in {file} (line {line}): {reason}")]
    InvalidFace {
        file: String,
        line: usize,
        reason: String,
    },

    #[error("model {file} exceeds the 32-bit index space")]
    TooManyVertices { file: String },
}

impl LoadError {
    pub(crate) fn io(file: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            file: file.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, LoadError>;
