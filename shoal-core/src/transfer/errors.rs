//! Error types for the transfer subsystem

use thiserror::Error;

/// Errors that can occur while reserving channels or downloading files
#[derive(Debug, Clone, Error)]
pub enum TransferError {
    /// The pool holds no available channel
    #[error("no channel available")]
    NoChannelAvailable,

    /// No transfer channel could be resolved for a download request
    #[error("no free tubes to download from")]
    NoFreeTubes,

    /// The file is already fully or partially acquired, or a job is running
    #[error("download already in progress: {0}")]
    AlreadyInProgress(String),

    /// The requested file is not in the catalog
    #[error("unknown file: {0}")]
    UnknownFile(String),

    /// The byte transport failed to start or aborted mid-transfer
    #[error("file transport failure: {0}")]
    Transport(String),

    /// No job exists for this file
    #[error("no download job for file: {0}")]
    NoSuchJob(String),
}

/// Result type for transfer operations
pub type TransferResult<T> = Result<T, TransferError>;
