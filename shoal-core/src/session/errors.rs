//! Error types for session operations

use crate::bundle::BundleError;
use crate::catalog::CatalogError;
use crate::control::ControlError;
use crate::transfer::TransferError;
use thiserror::Error;

/// Errors surfaced to the session's caller
#[derive(Debug, Error)]
pub enum SessionError {
    /// A server round-trip failed (list, remove, user-list, user-mod, probe)
    #[error("server request failed: {0}")]
    ServerRequestFailure(String),

    /// An upload failed; the caller may roll back a local add
    #[error("file upload failed: {0}")]
    FileUploadFailure(String),

    /// A server round-trip exceeded its deadline
    #[error("server request timed out")]
    TimeOut,

    /// No fallback server is configured for this session
    #[error("no server configured")]
    ServerNotConfigured,

    /// The local permission level does not allow this operation
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// The operation is not legal in the current session mode
    #[error("operation not legal in mode {0}")]
    WrongMode(&'static str),

    /// Catalog-level failure
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    /// Control channel failure
    #[error(transparent)]
    Control(#[from] ControlError),

    /// Transfer-level failure
    #[error(transparent)]
    Transfer(#[from] TransferError),

    /// Bundle store failure
    #[error(transparent)]
    Bundle(#[from] BundleError),
}

/// Result type for session operations
pub type SessionResult<T> = Result<T, SessionError>;
