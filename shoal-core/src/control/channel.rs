/*
    channel.rs - Control channel state machine

    Per-peer protocol state: NotEntered -> Entered on the first membership
    callback. The elected responder (the session's initiator) answers Join
    announcements with a unicast catalog snapshot; every other peer sends
    Join once and thereafter follows incremental add/remove broadcasts.

    A misbehaving or lagging peer must never corrupt local state: malformed
    payloads and illegal remote removals are logged and dropped.
*/

use crate::catalog::{Catalog, FileRecord};
use crate::control::errors::ControlResult;
use crate::control::message::ControlMessage;
use crate::control::transport::{GroupTransport, PeerId};
use std::sync::Arc;
use tracing::{debug, warn};

/// Role of the local peer on the control channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlRole {
    /// Created the group; owes exactly one snapshot reply per Join
    Responder,
    /// Joined an existing group; announces itself and follows broadcasts
    Member,
}

/// The group-wide link carrying join, snapshot, and catalog-mutation
/// messages for one session
pub struct ControlChannel {
    transport: Arc<dyn GroupTransport>,
    catalog: Arc<Catalog>,
    role: ControlRole,
    /// Set on the first membership callback
    entered: bool,
    /// A responder that has switched out of serving mode stops answering Join
    serving: bool,
    /// Cleared when the session detaches the channel (server mode switch);
    /// a detached channel ignores all inbound traffic
    attached: bool,
}

impl ControlChannel {
    pub fn new(transport: Arc<dyn GroupTransport>, catalog: Arc<Catalog>, role: ControlRole) -> Self {
        ControlChannel {
            transport,
            catalog,
            role,
            entered: false,
            serving: role == ControlRole::Responder,
            attached: true,
        }
    }

    pub fn role(&self) -> ControlRole {
        self.role
    }

    pub fn is_entered(&self) -> bool {
        self.entered
    }

    pub fn is_attached(&self) -> bool {
        self.attached
    }

    /// First membership delta moves the channel to Entered; a member
    /// announces itself so the responder can hand over the catalog.
    pub async fn handle_membership_change(
        &mut self,
        added: &[PeerId],
        removed: &[PeerId],
    ) -> ControlResult<()> {
        debug!(added = added.len(), removed = removed.len(), "membership changed");
        if self.entered || !self.attached {
            return Ok(());
        }
        self.entered = true;

        match self.role {
            ControlRole::Responder => {
                debug!("entered as responder, awaiting join announcements");
            }
            ControlRole::Member => {
                debug!("entered as member, announcing join");
                self.transport.broadcast(ControlMessage::Join.encode()?).await?;
            }
        }
        Ok(())
    }

    /// Process one inbound payload from the group transport.
    ///
    /// Never fails on remote misbehavior; only transport errors while
    /// replying to a Join propagate.
    pub async fn handle_message(&mut self, sender: &PeerId, payload: &[u8]) -> ControlResult<()> {
        if !self.attached {
            debug!(%sender, "detached channel, message ignored");
            return Ok(());
        }
        if *sender == self.transport.local_peer() {
            // Own echo from the broadcast primitive
            return Ok(());
        }

        let message = match ControlMessage::decode(payload) {
            Ok(m) => m,
            Err(err) => {
                warn!(%sender, %err, "malformed control message dropped");
                return Ok(());
            }
        };

        match message {
            ControlMessage::Join => self.handle_join(sender).await,
            ControlMessage::CatalogSnapshot(entries) => {
                debug!(%sender, count = entries.len(), "catalog snapshot received");
                let inserted = self
                    .catalog
                    .merge_entries(entries.into_values().collect())
                    .await;
                debug!(inserted = inserted.len(), "snapshot merged");
                Ok(())
            }
            ControlMessage::FileAdd(entry) => {
                debug!(%sender, id = %entry.id(), "remote file add");
                self.catalog.add(FileRecord::remote(&entry)).await;
                Ok(())
            }
            ControlMessage::FileRemove(id) => {
                debug!(%sender, %id, "remote file remove");
                // Never remove an entry that is mid-transfer or fully
                // acquired on behalf of a remote peer; the refusal stays
                // local and is not surfaced to the sender.
                if let Err(err) = self.catalog.remove(&id, None).await {
                    warn!(%id, %err, "remote remove refused");
                }
                Ok(())
            }
        }
    }

    async fn handle_join(&self, sender: &PeerId) -> ControlResult<()> {
        if self.role != ControlRole::Responder {
            return Ok(());
        }
        if !self.serving {
            debug!(%sender, "join ignored, no longer serving the group");
            return Ok(());
        }

        debug!(%sender, "welcoming joiner with catalog snapshot");
        let snapshot = self.catalog.snapshot().await;
        let reply = ControlMessage::CatalogSnapshot(snapshot).encode()?;
        self.transport.send_to(sender, reply).await
    }

    /// Broadcast a newly registered file to the group
    pub async fn broadcast_add(&self, record: &FileRecord) -> ControlResult<()> {
        self.transport
            .broadcast(ControlMessage::FileAdd(record.to_entry()).encode()?)
            .await
    }

    /// Broadcast the removal of a file from the group
    pub async fn broadcast_remove(&self, id: &crate::catalog::FileId) -> ControlResult<()> {
        self.transport
            .broadcast(ControlMessage::FileRemove(id.clone()).encode()?)
            .await
    }

    /// Stop answering Join announcements (the responder left serving mode)
    pub fn stop_serving(&mut self) {
        self.serving = false;
    }

    /// Detach the broadcast listeners; all inbound traffic is ignored from
    /// here on. One-way, used by the server mode switch.
    pub fn detach(&mut self) {
        debug!("control channel detached");
        self.attached = false;
        self.serving = false;
    }
}
