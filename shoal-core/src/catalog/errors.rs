//! Error types for catalog operations

use thiserror::Error;

/// Errors that can occur when mutating the catalog
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogError {
    /// An entry with this id is already shared
    #[error("file already shared: {0}")]
    AlreadyShared(String),

    /// Removal refused because bytes have been acquired for the entry
    #[error("transfer in progress for file: {0}")]
    TransferInProgress(String),

    /// Progress update would move acquired bytes backwards
    #[error("invalid progress for file {id}: {current} -> {requested}")]
    InvalidProgress {
        id: String,
        current: u64,
        requested: u64,
    },

    /// Progress update would exceed the declared total size
    #[error("progress overflow for file {id}: {requested} > {total}")]
    ProgressOverflow {
        id: String,
        requested: u64,
        total: u64,
    },

    /// No entry with this id exists
    #[error("unknown file: {0}")]
    UnknownFile(String),

    /// Persisted snapshot could not be read or written
    #[error("snapshot persistence failed: {0}")]
    Persistence(String),
}

/// Result type for catalog operations
pub type CatalogResult<T> = Result<T, CatalogError>;

impl From<std::io::Error> for CatalogError {
    fn from(err: std::io::Error) -> Self {
        CatalogError::Persistence(err.to_string())
    }
}

impl From<serde_json::Error> for CatalogError {
    fn from(err: serde_json::Error) -> Self {
        CatalogError::Persistence(err.to_string())
    }
}
