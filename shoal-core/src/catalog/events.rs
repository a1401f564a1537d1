//! Catalog change events
//!
//! Observers (UI layers, the CLI, tests) subscribe to catalog changes over a
//! tokio broadcast channel instead of holding references into the records.

use crate::catalog::record::{FileId, FileStatus};
use tokio::sync::broadcast;

/// A change to the catalog, emitted after the mutation has been applied
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogEvent {
    EntryAdded(FileId),
    EntryRemoved(FileId),
    ProgressChanged { id: FileId, acquired_bytes: u64 },
    StatusChanged { id: FileId, status: FileStatus },
}

/// Broadcast fan-out for catalog events
#[derive(Clone)]
pub struct CatalogEvents {
    tx: broadcast::Sender<CatalogEvent>,
}

impl CatalogEvents {
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Emit an event to all subscribers, returning the receiver count
    pub fn emit(&self, event: CatalogEvent) -> usize {
        self.tx.send(event).unwrap_or(0)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CatalogEvent> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for CatalogEvents {
    fn default() -> Self {
        Self::new(128)
    }
}
