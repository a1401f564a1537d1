//! Mock file transport
//!
//! Transfers are fed either from a pre-recorded event script or through a
//! manual sender the test holds, so job states can be observed mid-flight.

use crate::catalog::FileId;
use crate::transfer::{
    Endpoint, FileTransport, TransferError, TransferEvent, TransferHandle, TransferResult,
};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use tokio::sync::mpsc;

pub struct MockFileTransport {
    pending: Mutex<HashMap<FileId, mpsc::Receiver<TransferEvent>>>,
    started: Mutex<Vec<(Endpoint, FileId)>>,
    fail_start: Mutex<Option<String>>,
}

impl MockFileTransport {
    pub fn new() -> Self {
        MockFileTransport {
            pending: Mutex::new(HashMap::new()),
            started: Mutex::new(Vec::new()),
            fail_start: Mutex::new(None),
        }
    }

    /// Queue a fixed event sequence for the next transfer of `id`
    pub fn script(&self, id: &FileId, events: Vec<TransferEvent>) {
        let (tx, rx) = mpsc::channel(events.len().max(1));
        for event in events {
            tx.try_send(event).expect("script channel sized to fit");
        }
        self.pending.lock().unwrap().insert(id.clone(), rx);
    }

    /// Open a manually driven event feed for the next transfer of `id`
    pub fn manual(&self, id: &FileId) -> mpsc::Sender<TransferEvent> {
        let (tx, rx) = mpsc::channel(16);
        self.pending.lock().unwrap().insert(id.clone(), rx);
        tx
    }

    /// Make `start_transfer` fail with the given reason
    pub fn fail_start(&self, reason: impl Into<String>) {
        *self.fail_start.lock().unwrap() = Some(reason.into());
    }

    /// Every `(endpoint, file_id)` pair a transfer was started for
    pub fn started(&self) -> Vec<(Endpoint, FileId)> {
        self.started.lock().unwrap().clone()
    }
}

impl Default for MockFileTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FileTransport for MockFileTransport {
    async fn start_transfer(
        &self,
        endpoint: &Endpoint,
        file_id: &FileId,
    ) -> TransferResult<TransferHandle> {
        if let Some(reason) = self.fail_start.lock().unwrap().clone() {
            return Err(TransferError::Transport(reason));
        }
        self.started
            .lock()
            .unwrap()
            .push((endpoint.clone(), file_id.clone()));

        let rx = self
            .pending
            .lock()
            .unwrap()
            .remove(file_id)
            .unwrap_or_else(|| {
                // No script: hand back an already-closed stream
                let (_tx, rx) = mpsc::channel(1);
                rx
            });
        Ok(TransferHandle::new(rx))
    }
}
