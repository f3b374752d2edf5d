use std::path::PathBuf;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// A required configuration value is missing or an instruction line is unreadable.
    #[error("configuration error: {0}")]
    Config(String),

    #[error("input not found: {}", path.display())]
    NotFound { path: PathBuf },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// A record in a delimited input file could not be decoded. `line` is 1-based.
    #[error("malformed record in {} at line {line}: {reason}", path.display())]
    Malformed {
        path: PathBuf,
        line: usize,
        reason: String,
    },

    #[error("unsupported model format: {0}")]
    ModelFormat(String),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Bincode(#[from] bincode::Error),

    #[error("cannot format timestamp: {0}")]
    Timestamp(#[from] time::error::Format),
}

impl Error {
    pub(crate) fn malformed(path: impl Into<PathBuf>, line: usize, reason: impl Into<String>) -> Self {
        Self::Malformed { path: path.into(), line, reason: reason.into() }
    }

    /// Re-anchors a malformed-record error at a concrete file position.
    pub(crate) fn at(self, path: impl Into<PathBuf>, line: usize) -> Self {
        match self {
            Self::Malformed { reason, .. } => Self::Malformed { path: path.into(), line, reason },
            other => other,
        }
    }
}

pub type Result<T> = core::result::Result<T, Error>;
