//! Mock group transport
//!
//! Records outbound traffic for inspection instead of carrying it
//! anywhere. Inbound traffic is injected by calling the session's handler
//! methods directly.

use crate::control::{ControlError, ControlResult, GroupTransport, PeerId};
use async_trait::async_trait;
use std::sync::Mutex;

pub struct MockGroupTransport {
    local: PeerId,
    broadcasts: Mutex<Vec<Vec<u8>>>,
    unicasts: Mutex<Vec<(PeerId, Vec<u8>)>>,
    fail: Mutex<bool>,
}

impl MockGroupTransport {
    pub fn new(local: impl Into<String>) -> Self {
        MockGroupTransport {
            local: PeerId::new(local),
            broadcasts: Mutex::new(Vec::new()),
            unicasts: Mutex::new(Vec::new()),
            fail: Mutex::new(false),
        }
    }

    /// Make every subsequent send fail with a transport error
    pub fn fail_sends(&self, fail: bool) {
        *self.fail.lock().unwrap() = fail;
    }

    /// Payloads broadcast so far
    pub fn broadcasts(&self) -> Vec<Vec<u8>> {
        self.broadcasts.lock().unwrap().clone()
    }

    /// Unicast payloads sent so far
    pub fn unicasts(&self) -> Vec<(PeerId, Vec<u8>)> {
        self.unicasts.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.broadcasts.lock().unwrap().clear();
        self.unicasts.lock().unwrap().clear();
    }
}

#[async_trait]
impl GroupTransport for MockGroupTransport {
    fn local_peer(&self) -> PeerId {
        self.local.clone()
    }

    async fn broadcast(&self, payload: Vec<u8>) -> ControlResult<()> {
        if *self.fail.lock().unwrap() {
            return Err(ControlError::Transport("mock broadcast failure".into()));
        }
        self.broadcasts.lock().unwrap().push(payload);
        Ok(())
    }

    async fn send_to(&self, peer: &PeerId, payload: Vec<u8>) -> ControlResult<()> {
        if *self.fail.lock().unwrap() {
            return Err(ControlError::Transport("mock send failure".into()));
        }
        self.unicasts.lock().unwrap().push((peer.clone(), payload));
        Ok(())
    }
}
