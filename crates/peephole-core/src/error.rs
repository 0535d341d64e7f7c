use thiserror::Error;

/// Result type for record store operations.
pub type Result<T> = std::result::Result<T, StorageError>;

/// Failures raised by a record store.
///
/// A missing record is not an error: stores report it as
/// [`Applied::NotFound`](crate::store::Applied::NotFound) or `Ok(None)`.
#[derive(Debug, Clone, Error)]
pub enum StorageError {
    #[error("identifier already exists: {0}")]
    Conflict(String),
    #[error("storage backend unavailable: {0}")]
    Unavailable(String),
    #[error("storage operation timed out: {0}")]
    Timeout(String),
    #[error("storage query failed: {0}")]
    Query(String),
    #[error("stored data is invalid: {0}")]
    InvalidData(String),
    #[error("storage operation failed: {0}")]
    Operation(String),
}

impl StorageError {
    /// Whether the backend could not be reached at all, as opposed to a
    /// query that reached it and failed.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, StorageError::Unavailable(_) | StorageError::Timeout(_))
    }
}
