use std::path::PathBuf;

/// Errors raised while reading or publishing persisted files.
///
/// These are the only errors that cross component boundaries: a run whose
/// snapshot cannot be published must fail loudly.
///
/// # Examples
///
/// ```rust
/// use scintel_storage::error::StorageError;
///
/// let err = StorageError::Io {
///     path: "data/snapshot.json".into(),
///     source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
/// };
/// assert!(err.to_string().contains("snapshot.json"));
/// ```
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Filesystem operation on `path` failed.
    #[error("Storage: I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The persisted document is not valid JSON for the expected type.
    #[error("Storage: invalid JSON in {}: {source}", path.display())]
    Corrupt {
        path: PathBuf,
        source: serde_json::Error,
    },

    /// Serializing a document failed.
    #[error("Storage: JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl StorageError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        StorageError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Convenience `Result` alias for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;
