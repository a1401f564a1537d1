//! Group transport seam
//!
//! The surrounding membership system (whatever carries the peer group)
//! delivers ordered one-to-all broadcast and point-to-point sends. The
//! session consumes it through this trait and feeds inbound payloads and
//! membership deltas back into the `ControlChannel` handler methods.

use crate::control::errors::ControlResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque identifier of a peer on the group transport
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PeerId(pub String);

impl PeerId {
    pub fn new(id: impl Into<String>) -> Self {
        PeerId(id.into())
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Ordered group-broadcast primitive supplied by the embedder
#[async_trait]
pub trait GroupTransport: Send + Sync {
    /// The local peer's identity on this transport
    fn local_peer(&self) -> PeerId;

    /// Deliver `payload` to every current member, including the sender
    async fn broadcast(&self, payload: Vec<u8>) -> ControlResult<()>;

    /// Deliver `payload` to a single peer
    async fn send_to(&self, peer: &PeerId, payload: Vec<u8>) -> ControlResult<()>;
}
