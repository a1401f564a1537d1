/*
    controller.rs - Session orchestration

    Owns the catalog, control channel, transfer pool, and download
    coordinator, and gates every caller-facing operation on the current
    mode and permission level. Catalog mutation stays serialized through
    the catalog's own entry points; transfer I/O runs off this line of
    control on the coordinator's tasks.
*/

use crate::bundle::{BundleError, BundleStore};
use crate::catalog::{Catalog, CatalogError, CatalogEvent, CatalogEvents, FileId, FileRecord};
use crate::config::Config;
use crate::control::{ControlChannel, ControlRole, GroupTransport, PeerId};
use crate::session::errors::{SessionError, SessionResult};
use crate::session::mode::{PermissionLevel, SessionMode};
use crate::session::server::{ServerApi, UserListing};
use crate::transfer::{
    ChannelId, DownloadCoordinator, Endpoint, FileTransport, JobState, TransferChannel,
    TransferChannelPool,
};
use std::future::Future;
use std::path::Path;
use std::sync::{Arc, Mutex as StdMutex, RwLock};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Result of the server capability probe
#[derive(Debug, Clone, Copy)]
struct ServerProbe {
    version: u32,
    level: PermissionLevel,
}

/// One file-sharing session: catalog, protocol state, and transfers
pub struct Session {
    config: Config,
    catalog: Arc<Catalog>,
    pool: Arc<TransferChannelPool>,
    coordinator: DownloadCoordinator,
    bundles: Arc<dyn BundleStore>,
    server: Arc<dyn ServerApi>,
    control: Mutex<Option<ControlChannel>>,
    mode: RwLock<SessionMode>,
    probe: StdMutex<Option<ServerProbe>>,
}

impl Session {
    /// Create a session for the peer that creates the group. It owns the
    /// control channel as responder and may mutate the catalog freely.
    pub fn initiate(
        config: Config,
        group: Arc<dyn GroupTransport>,
        files: Arc<dyn FileTransport>,
        bundles: Arc<dyn BundleStore>,
        server: Arc<dyn ServerApi>,
    ) -> Self {
        Self::p2p(config, group, files, bundles, server, SessionMode::P2pInitiator)
    }

    /// Create a session for a peer joining an existing group. It announces
    /// itself on the first membership callback and receives the catalog
    /// snapshot from the responder.
    pub fn join(
        config: Config,
        group: Arc<dyn GroupTransport>,
        files: Arc<dyn FileTransport>,
        bundles: Arc<dyn BundleStore>,
        server: Arc<dyn ServerApi>,
    ) -> Self {
        Self::p2p(config, group, files, bundles, server, SessionMode::P2pJoiner)
    }

    fn p2p(
        config: Config,
        group: Arc<dyn GroupTransport>,
        files: Arc<dyn FileTransport>,
        bundles: Arc<dyn BundleStore>,
        server: Arc<dyn ServerApi>,
        mode: SessionMode,
    ) -> Self {
        info!(mode = %mode, nick = %config.identity.nick, "starting session");
        let catalog = Arc::new(Catalog::with_events(CatalogEvents::new(
            config.events.capacity,
        )));
        let pool = Arc::new(TransferChannelPool::new());
        let coordinator =
            DownloadCoordinator::new(catalog.clone(), pool.clone(), files, bundles.clone());
        let role = match mode {
            SessionMode::P2pInitiator => ControlRole::Responder,
            _ => ControlRole::Member,
        };
        let control = ControlChannel::new(group, catalog.clone(), role);

        Session {
            config,
            catalog,
            pool,
            coordinator,
            bundles,
            server,
            control: Mutex::new(Some(control)),
            mode: RwLock::new(mode),
            probe: StdMutex::new(None),
        }
    }

    /// Create a session talking directly to a catalog server, with the
    /// permission level the probe grants. There is no peer group.
    pub async fn connect_server(
        config: Config,
        files: Arc<dyn FileTransport>,
        bundles: Arc<dyn BundleStore>,
        server: Arc<dyn ServerApi>,
    ) -> SessionResult<Self> {
        let catalog = Arc::new(Catalog::with_events(CatalogEvents::new(
            config.events.capacity,
        )));
        let pool = Arc::new(TransferChannelPool::new());
        let coordinator =
            DownloadCoordinator::new(catalog.clone(), pool.clone(), files, bundles.clone());

        let session = Session {
            config,
            catalog,
            pool,
            coordinator,
            bundles,
            server,
            control: Mutex::new(None),
            mode: RwLock::new(SessionMode::ServerClient {
                level: PermissionLevel::Viewer,
            }),
            probe: StdMutex::new(None),
        };

        let level = session.check_server_available().await?;
        *session.mode.write().expect("mode lock poisoned") =
            SessionMode::ServerClient { level };
        session.fetch_server_catalog().await?;
        info!(level = %level, "connected to catalog server");
        Ok(session)
    }

    pub fn mode(&self) -> SessionMode {
        *self.mode.read().expect("mode lock poisoned")
    }

    pub fn catalog(&self) -> Arc<Catalog> {
        self.catalog.clone()
    }

    /// Subscribe to catalog change events
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<CatalogEvent> {
        self.catalog.subscribe()
    }

    /// Permission level granted by the server, if a probe has completed
    pub fn permission_level(&self) -> Option<PermissionLevel> {
        self.probe
            .lock()
            .expect("probe lock poisoned")
            .map(|p| p.level)
    }

    // --- group transport callbacks -------------------------------------

    /// Feed a membership delta from the group transport
    pub async fn handle_membership_change(
        &self,
        added: &[PeerId],
        removed: &[PeerId],
    ) -> SessionResult<()> {
        if let Some(control) = self.control.lock().await.as_mut() {
            control.handle_membership_change(added, removed).await?;
        }
        Ok(())
    }

    /// Feed an inbound control payload from the group transport
    pub async fn handle_control_message(
        &self,
        sender: &PeerId,
        payload: &[u8],
    ) -> SessionResult<()> {
        if let Some(control) = self.control.lock().await.as_mut() {
            control.handle_message(sender, payload).await?;
        }
        Ok(())
    }

    /// Absorb a newly established point-to-point byte channel
    pub fn handle_new_channel(&self, channel_id: ChannelId, endpoint: Endpoint) {
        self.pool.offer(TransferChannel::new(channel_id, endpoint));
    }

    // --- downloads ------------------------------------------------------

    /// Start downloading `file_id` over the path the current mode dictates
    pub async fn request_download(&self, file_id: &FileId) -> SessionResult<()> {
        match self.mode() {
            SessionMode::P2pInitiator | SessionMode::P2pJoiner => {
                self.coordinator.request_download(file_id).await?;
                Ok(())
            }
            SessionMode::ServerHost | SessionMode::ServerClient { .. } => {
                // The server path requires a completed capability check
                self.ensure_probe().await?;
                let endpoint = self.server_endpoint()?;
                self.coordinator
                    .request_download_from(file_id, endpoint)
                    .await?;
                Ok(())
            }
        }
    }

    /// Abandon an in-flight download; the catalog entry ends in Failed
    pub async fn cancel_download(&self, file_id: &FileId) -> SessionResult<()> {
        self.coordinator.cancel(file_id).await?;
        Ok(())
    }

    /// Wait for the download of `file_id` to reach a terminal state
    pub async fn wait_for_download(&self, file_id: &FileId) -> SessionResult<JobState> {
        Ok(self.coordinator.wait(file_id).await?)
    }

    // --- catalog mutation ----------------------------------------------

    /// Register a locally produced file: persist its bundle, insert a
    /// fully-held catalog entry, and publish it to the group or server.
    pub async fn request_add(
        &self,
        title: impl Into<String>,
        description: impl Into<String>,
        tags: impl Into<String>,
        bytes: Vec<u8>,
    ) -> SessionResult<FileId> {
        let mode = self.mode();
        if mode.is_server() {
            self.require_mutation_permission()?;
        }

        let id = FileId::from_bytes(&bytes);
        if self.catalog.contains(&id).await {
            return Err(CatalogError::AlreadyShared(id.to_string()).into());
        }

        let record = FileRecord::local(id.clone(), title, description, tags, bytes.len() as u64);
        self.bundles.put(&id, record.to_entry(), bytes).await?;
        if !self.catalog.add(record.clone()).await {
            return Err(CatalogError::AlreadyShared(id.to_string()).into());
        }
        info!(%id, "file registered locally");

        match mode {
            SessionMode::P2pInitiator | SessionMode::P2pJoiner => {
                // Loss is tolerated: a later snapshot handoff reconciles
                if let Some(control) = self.control.lock().await.as_ref() {
                    if let Err(err) = control.broadcast_add(&record).await {
                        warn!(%id, %err, "file add broadcast failed");
                    }
                }
                Ok(id)
            }
            SessionMode::ServerHost | SessionMode::ServerClient { .. } => {
                match self.upload_to_server(&record, bytes_for_upload(&self.bundles, &id).await?).await {
                    Ok(()) => Ok(id),
                    Err(err) => {
                        // Roll back the local add so the catalog and the
                        // server never disagree about a failed upload
                        let _ = self.catalog.remove(&id, Some(self.override_token())).await;
                        let _ = self.bundles.delete(&id).await;
                        Err(err)
                    }
                }
            }
        }
    }

    /// Rewrite the descriptive metadata of an existing entry. Acquisition
    /// state is untouched. The edit stays local: peers learn current
    /// metadata from the snapshot handoff, and the server has no metadata
    /// update call.
    pub async fn request_update(
        &self,
        file_id: &FileId,
        title: impl Into<String>,
        description: impl Into<String>,
        tags: impl Into<String>,
    ) -> SessionResult<()> {
        if self.mode().is_server() {
            self.require_mutation_permission()?;
        }

        let mut record = self
            .catalog
            .get(file_id)
            .await
            .ok_or_else(|| CatalogError::UnknownFile(file_id.to_string()))?;
        record.title = title.into();
        record.description = description.into();
        record.tags = tags.into();

        if !self.catalog.update_record(record).await {
            return Err(CatalogError::UnknownFile(file_id.to_string()).into());
        }
        debug!(id = %file_id, "entry metadata updated");
        Ok(())
    }

    /// Unregister a file. In P2P mode the removal is broadcast; in server
    /// mode it is pushed to the server first and applied locally after.
    pub async fn request_remove(&self, file_id: &FileId) -> SessionResult<()> {
        match self.mode() {
            SessionMode::P2pInitiator => {
                // The initiator acts on its own authoritative copy
                self.catalog
                    .remove(file_id, Some(self.override_token()))
                    .await?;
                self.broadcast_remove(file_id).await;
                self.delete_bundle(file_id).await;
                Ok(())
            }
            SessionMode::P2pJoiner => {
                self.catalog.remove(file_id, None).await?;
                self.broadcast_remove(file_id).await;
                self.delete_bundle(file_id).await;
                Ok(())
            }
            SessionMode::ServerHost | SessionMode::ServerClient { .. } => {
                self.require_mutation_permission()?;
                let probe = self.ensure_probe().await?;
                let user_key = (probe.version >= 2).then(|| self.config.identity.user_key_hash.clone());
                self.with_deadline(self.server.remove(user_key.as_deref(), file_id))
                    .await?;
                self.catalog
                    .remove(file_id, Some(self.override_token()))
                    .await?;
                self.delete_bundle(file_id).await;
                Ok(())
            }
        }
    }

    // --- server mode ----------------------------------------------------

    /// Probe the fallback server: query its protocol version and, on
    /// version >= 2, announce the local user to obtain a permission level.
    /// Older servers know no levels; level 1 is assumed.
    pub async fn check_server_available(&self) -> SessionResult<PermissionLevel> {
        if self.config.server.host.is_none() {
            return Err(SessionError::ServerNotConfigured);
        }

        let version = self.with_deadline(self.server.version()).await?;
        let level = if version >= 2 {
            let raw = self
                .with_deadline(self.server.announce_user(
                    &self.config.identity.user_key_hash,
                    &self.config.identity.nick,
                ))
                .await?;
            PermissionLevel::from_level(raw)
        } else {
            PermissionLevel::Contributor
        };

        debug!(version, level = %level, "server probe complete");
        *self.probe.lock().expect("probe lock poisoned") = Some(ServerProbe { version, level });
        Ok(level)
    }

    /// One-way transition from P2P initiator to serving through the
    /// catalog server. Detaches the control channel listeners, clears the
    /// displayed catalog (bytes stay in the bundle store for peers still
    /// downloading), and loads the server's file list. Idempotent once in
    /// ServerHost; never reverts.
    pub async fn switch_to_server_mode(&self) -> SessionResult<()> {
        match self.mode() {
            SessionMode::ServerHost => return Ok(()),
            SessionMode::P2pInitiator => {}
            other => return Err(SessionError::WrongMode(other.name())),
        }
        if self.config.server.host.is_none() {
            return Err(SessionError::ServerNotConfigured);
        }

        self.ensure_probe().await?;

        if let Some(control) = self.control.lock().await.as_mut() {
            control.stop_serving();
            control.detach();
        }
        self.catalog.clear().await;
        *self.mode.write().expect("mode lock poisoned") = SessionMode::ServerHost;
        info!("switched to server mode");

        self.fetch_server_catalog().await
    }

    /// Fetch the server's user list; requires admin permission
    pub async fn request_admin_user_list(&self) -> SessionResult<UserListing> {
        self.require_server_mode()?;
        self.require_admin_permission()?;
        self.with_deadline(
            self.server
                .user_list(&self.config.identity.user_key_hash),
        )
        .await
    }

    /// Change another user's permission level; requires admin permission
    pub async fn change_user_permission(
        &self,
        user_id: &str,
        level: PermissionLevel,
    ) -> SessionResult<()> {
        self.require_server_mode()?;
        self.require_admin_permission()?;
        self.with_deadline(self.server.user_mod(
            &self.config.identity.user_key_hash,
            user_id,
            level.level(),
        ))
        .await
    }

    // --- persistence ----------------------------------------------------

    /// Persist the catalog snapshot next to the bundle payloads
    pub async fn save_catalog(&self, path: impl AsRef<Path>) -> SessionResult<()> {
        let snapshot = self.catalog.snapshot().await;
        crate::catalog::save_snapshot(&snapshot, path)?;
        Ok(())
    }

    /// Restore a persisted snapshot. Only entries whose payload is still
    /// held in the bundle store come back; the rest were never ours.
    pub async fn restore_catalog(&self, path: impl AsRef<Path>) -> SessionResult<usize> {
        let snapshot = crate::catalog::load_snapshot(path)?;
        let held = self.bundles.list_ids().await?;

        let mut restored = 0;
        for (id, entry) in snapshot {
            if !held.contains(&id) {
                debug!(%id, "skipping saved entry without payload");
                continue;
            }
            let record = FileRecord::local(
                id,
                entry.1.clone(),
                entry.2.clone(),
                entry.3.clone(),
                entry.4,
            );
            if self.catalog.add(record).await {
                restored += 1;
            }
        }
        info!(restored, "catalog restored from snapshot");
        Ok(restored)
    }

    // --- internals ------------------------------------------------------

    fn override_token(&self) -> crate::catalog::RemoveOverride {
        crate::catalog::RemoveOverride::token()
    }

    async fn broadcast_remove(&self, file_id: &FileId) {
        if let Some(control) = self.control.lock().await.as_ref() {
            if let Err(err) = control.broadcast_remove(file_id).await {
                warn!(id = %file_id, %err, "file remove broadcast failed");
            }
        }
    }

    async fn delete_bundle(&self, file_id: &FileId) {
        match self.bundles.delete(file_id).await {
            Ok(()) | Err(BundleError::NotFound(_)) => {}
            Err(err) => warn!(id = %file_id, %err, "could not delete bundle"),
        }
    }

    async fn upload_to_server(&self, record: &FileRecord, bytes: Vec<u8>) -> SessionResult<()> {
        let probe = self.ensure_probe().await?;
        let user_key = (probe.version >= 2).then(|| self.config.identity.user_key_hash.clone());
        match tokio::time::timeout(
            self.config.server.request_timeout,
            self.server
                .upload(user_key.as_deref(), record.to_entry(), bytes),
        )
        .await
        {
            Ok(Ok(())) => Ok(()),
            Ok(Err(SessionError::FileUploadFailure(msg))) => {
                Err(SessionError::FileUploadFailure(msg))
            }
            Ok(Err(err)) => Err(SessionError::FileUploadFailure(err.to_string())),
            Err(_) => Err(SessionError::TimeOut),
        }
    }

    async fn fetch_server_catalog(&self) -> SessionResult<()> {
        let entries = self.with_deadline(self.server.file_list()).await?;
        let inserted = self.catalog.merge_entries(entries).await;
        debug!(inserted = inserted.len(), "server file list merged");
        Ok(())
    }

    async fn ensure_probe(&self) -> SessionResult<ServerProbe> {
        if let Some(probe) = *self.probe.lock().expect("probe lock poisoned") {
            return Ok(probe);
        }
        self.check_server_available().await?;
        Ok(self
            .probe
            .lock()
            .expect("probe lock poisoned")
            .expect("probe just completed"))
    }

    fn server_endpoint(&self) -> SessionResult<Endpoint> {
        self.config
            .server_address()
            .map(Endpoint::new)
            .ok_or(SessionError::ServerNotConfigured)
    }

    fn require_server_mode(&self) -> SessionResult<()> {
        let mode = self.mode();
        if mode.is_server() {
            Ok(())
        } else {
            Err(SessionError::WrongMode(mode.name()))
        }
    }

    /// Mutation gate for server modes; pure P2P peers may always mutate
    fn require_mutation_permission(&self) -> SessionResult<()> {
        match self.permission_level() {
            Some(level) if level.allows_mutation() => Ok(()),
            Some(level) => Err(SessionError::PermissionDenied(format!(
                "level {level} cannot mutate the catalog"
            ))),
            None => Err(SessionError::PermissionDenied(
                "no permission level granted yet".to_string(),
            )),
        }
    }

    fn require_admin_permission(&self) -> SessionResult<()> {
        match self.permission_level() {
            Some(level) if level.allows_admin() => Ok(()),
            Some(level) => Err(SessionError::PermissionDenied(format!(
                "level {level} cannot administer users"
            ))),
            None => Err(SessionError::PermissionDenied(
                "no permission level granted yet".to_string(),
            )),
        }
    }

    /// Enforce the caller-visible deadline on one server round-trip
    async fn with_deadline<T>(
        &self,
        fut: impl Future<Output = SessionResult<T>>,
    ) -> SessionResult<T> {
        match tokio::time::timeout(self.config.server.request_timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(SessionError::TimeOut),
        }
    }
}

/// Payload for a server upload, re-read from the bundle store so the
/// uploaded bytes are exactly the installed bytes
async fn bytes_for_upload(
    bundles: &Arc<dyn BundleStore>,
    id: &FileId,
) -> SessionResult<Vec<u8>> {
    let (_, bytes) = bundles.get(id).await?;
    Ok(bytes)
}
