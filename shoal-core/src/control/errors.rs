//! Error types for the control channel

use thiserror::Error;

/// Errors that can occur on the control channel
#[derive(Debug, Clone, Error)]
pub enum ControlError {
    /// The group transport failed to carry a message
    #[error("group transport failure: {0}")]
    Transport(String),

    /// A control message could not be encoded for the wire
    #[error("control message encode failed: {0}")]
    Encode(String),

    /// An inbound payload was not a valid control message
    #[error("control message decode failed: {0}")]
    Decode(String),
}

/// Result type for control channel operations
pub type ControlResult<T> = Result<T, ControlError>;
