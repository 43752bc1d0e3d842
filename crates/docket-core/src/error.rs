use std::path::PathBuf;

/// Underlying cause of a failed read or write of a JSON document.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid input: {0}")]
    Validation(String),
    #[error("task not found: {0}")]
    NotFound(String),
    #[error("task reference is ambiguous: {0}")]
    AmbiguousReference(String),
    #[error("failed to load {}: {source}", path.display())]
    Load {
        path: PathBuf,
        #[source]
        source: StorageError,
    },
    #[error("failed to save {}: {source}", path.display())]
    Save {
        path: PathBuf,
        #[source]
        source: StorageError,
    },
}

impl Error {
    pub(crate) fn load(path: impl Into<PathBuf>, source: impl Into<StorageError>) -> Self {
        Self::Load {
            path: path.into(),
            source: source.into(),
        }
    }

    pub(crate) fn save(path: impl Into<PathBuf>, source: impl Into<StorageError>) -> Self {
        Self::Save {
            path: path.into(),
            source: source.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
