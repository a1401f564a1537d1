//! File transport seam
//!
//! The concrete byte mover (peer stream or server HTTP) is an external
//! collaborator. It is driven identically on both paths: start a transfer
//! against an endpoint, then consume progress/completion events from the
//! returned handle until it closes.

use crate::catalog::FileId;
use crate::transfer::errors::TransferResult;
use crate::transfer::pool::Endpoint;
use async_trait::async_trait;
use tokio::sync::mpsc;

/// Events emitted by an in-flight transfer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferEvent {
    /// Cumulative bytes received so far
    Progress(u64),
    /// Transfer finished; the full payload
    Complete(Vec<u8>),
    /// Transfer aborted with a transport-level reason
    Error(String),
}

/// Handle on a running transfer. Dropping it abandons the transfer.
pub struct TransferHandle {
    pub events: mpsc::Receiver<TransferEvent>,
}

impl TransferHandle {
    pub fn new(events: mpsc::Receiver<TransferEvent>) -> Self {
        TransferHandle { events }
    }
}

/// Byte-transport capability used for both peer-channel and server
/// downloads
#[async_trait]
pub trait FileTransport: Send + Sync {
    /// Begin streaming `file_id` from `endpoint`
    async fn start_transfer(
        &self,
        endpoint: &Endpoint,
        file_id: &FileId,
    ) -> TransferResult<TransferHandle>;
}
