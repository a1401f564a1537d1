/*
    pool.rs - Transfer channel pool

    Channels are fungible byte-transport endpoints to the same counterpart,
    so selection is documented as arbitrary; FIFO is used for deterministic
    tests. Establishing an endpoint is costly, so the first successfully
    reserved endpoint is cached and reused for subsequent downloads within
    the same peer relationship. Transfers are serialized per counterpart;
    channels are single-use per endpoint resolution.
*/

use crate::transfer::errors::{TransferError, TransferResult};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;
use std::sync::Mutex;
use tracing::debug;

/// Identifier of a point-to-point byte channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChannelId(pub u64);

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque transfer address resolved from a channel
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Endpoint(pub String);

impl Endpoint {
    pub fn new(addr: impl Into<String>) -> Self {
        Endpoint(addr.into())
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle of a transfer channel. Channels are single-use: once handed
/// to a job they are consumed and never return to the pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    /// Held by the pool, waiting for a job
    Available,
    /// Handed to a download job
    Reserved,
}

/// A single point-to-point byte-transport channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferChannel {
    pub channel_id: ChannelId,
    pub endpoint: Endpoint,
    pub state: ChannelState,
}

impl TransferChannel {
    pub fn new(channel_id: ChannelId, endpoint: Endpoint) -> Self {
        TransferChannel {
            channel_id,
            endpoint,
            state: ChannelState::Available,
        }
    }
}

/// Pool of asynchronously-arriving transfer channels
pub struct TransferChannelPool {
    available: Mutex<VecDeque<TransferChannel>>,
    /// Endpoint cached after the first successful reservation
    resolved: Mutex<Option<Endpoint>>,
}

impl TransferChannelPool {
    pub fn new() -> Self {
        TransferChannelPool {
            available: Mutex::new(VecDeque::new()),
            resolved: Mutex::new(None),
        }
    }

    /// Absorb a newly established channel. Retained until claimed.
    pub fn offer(&self, mut channel: TransferChannel) {
        channel.state = ChannelState::Available;
        debug!(id = %channel.channel_id, endpoint = %channel.endpoint, "channel offered");
        self.available
            .lock()
            .expect("pool lock poisoned")
            .push_back(channel);
    }

    /// Remove and return one available channel. Fails fast with
    /// `NoChannelAvailable` instead of blocking.
    pub fn reserve(&self) -> TransferResult<TransferChannel> {
        let mut available = self.available.lock().expect("pool lock poisoned");
        match available.pop_front() {
            Some(mut channel) => {
                channel.state = ChannelState::Reserved;
                debug!(id = %channel.channel_id, "channel reserved");
                Ok(channel)
            }
            None => Err(TransferError::NoChannelAvailable),
        }
    }

    /// Endpoint for the next download: the cached endpoint if one has been
    /// resolved for this peer relationship, otherwise one reserved from the
    /// pool (whose endpoint then becomes the cached one).
    pub fn resolve_endpoint(&self) -> TransferResult<Endpoint> {
        let mut resolved = self.resolved.lock().expect("pool lock poisoned");
        if let Some(endpoint) = resolved.as_ref() {
            debug!(%endpoint, "reusing resolved endpoint");
            return Ok(endpoint.clone());
        }

        let channel = self.reserve()?;
        debug!(id = %channel.channel_id, endpoint = %channel.endpoint, "endpoint resolved");
        *resolved = Some(channel.endpoint.clone());
        Ok(channel.endpoint)
    }

    /// Forget the resolved endpoint; the underlying channel is closed, not
    /// returned to the pool. The next download resolves afresh.
    pub fn invalidate_endpoint(&self) {
        let mut resolved = self.resolved.lock().expect("pool lock poisoned");
        if resolved.take().is_some() {
            debug!("resolved endpoint invalidated");
        }
    }

    /// The endpoint currently cached for this peer relationship, if any
    pub fn resolved_endpoint(&self) -> Option<Endpoint> {
        self.resolved.lock().expect("pool lock poisoned").clone()
    }

    /// Number of channels waiting to be claimed
    pub fn available_count(&self) -> usize {
        self.available.lock().expect("pool lock poisoned").len()
    }
}

impl Default for TransferChannelPool {
    fn default() -> Self {
        Self::new()
    }
}
