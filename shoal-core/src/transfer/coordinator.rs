/*
    coordinator.rs - Per-file download state machine

    AwaitingChannel -> Transferring -> {Succeeded, Failed}

    A job exists only while a transfer is wanted; channel-resolution failure
    surfaces as NoFreeTubes before any job state is created. Transfer I/O
    runs on a spawned task so catalog and control-message handling never
    block on it.
*/

use crate::bundle::BundleStore;
use crate::catalog::{Catalog, FileId, SnapshotEntry};
use crate::transfer::errors::{TransferError, TransferResult};
use crate::transfer::pool::{Endpoint, TransferChannelPool};
use crate::transfer::transport::{FileTransport, TransferEvent, TransferHandle};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Lifecycle of a download job
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    /// Waiting for a channel to be resolved
    AwaitingChannel,
    /// Bytes are moving
    Transferring,
    /// Payload installed, catalog entry marked installed
    Succeeded,
    /// Transfer or install failed, catalog entry marked failed
    Failed,
}

/// State of one download, shared with the driving task
#[derive(Debug, Clone)]
pub struct DownloadJob {
    pub file_id: FileId,
    pub endpoint: Endpoint,
    pub bytes_transferred: u64,
    pub state: JobState,
}

struct ActiveJob {
    job: Arc<Mutex<DownloadJob>>,
    task: Option<JoinHandle<()>>,
}

/// Drives downloads: resolves endpoints, consumes transfer events, and
/// keeps the catalog's acquisition state current
pub struct DownloadCoordinator {
    catalog: Arc<Catalog>,
    pool: Arc<TransferChannelPool>,
    transport: Arc<dyn FileTransport>,
    bundles: Arc<dyn BundleStore>,
    jobs: Mutex<HashMap<FileId, ActiveJob>>,
}

impl DownloadCoordinator {
    pub fn new(
        catalog: Arc<Catalog>,
        pool: Arc<TransferChannelPool>,
        transport: Arc<dyn FileTransport>,
        bundles: Arc<dyn BundleStore>,
    ) -> Self {
        DownloadCoordinator {
            catalog,
            pool,
            transport,
            bundles,
            jobs: Mutex::new(HashMap::new()),
        }
    }

    /// Start downloading `file_id` over a pooled peer channel.
    ///
    /// Rejected with `AlreadyInProgress` when any bytes are already
    /// acquired (including locally produced files, which hold all their
    /// bytes from creation) or when a job is still running. An empty pool
    /// surfaces as `NoFreeTubes` without creating any job state.
    pub async fn request_download(&self, file_id: &FileId) -> TransferResult<()> {
        let entry = self.check_downloadable(file_id).await?;
        let endpoint = self.pool.resolve_endpoint().map_err(|err| match err {
            TransferError::NoChannelAvailable => TransferError::NoFreeTubes,
            other => other,
        })?;
        self.start(entry, endpoint).await
    }

    /// Server-mode path: structurally identical, but the endpoint is the
    /// session's fixed server address instead of a pooled channel.
    pub async fn request_download_from(
        &self,
        file_id: &FileId,
        endpoint: Endpoint,
    ) -> TransferResult<()> {
        let entry = self.check_downloadable(file_id).await?;
        self.start(entry, endpoint).await
    }

    async fn check_downloadable(&self, file_id: &FileId) -> TransferResult<SnapshotEntry> {
        let record = self
            .catalog
            .get(file_id)
            .await
            .ok_or_else(|| TransferError::UnknownFile(file_id.to_string()))?;

        if record.acquired_bytes > 0 {
            return Err(TransferError::AlreadyInProgress(file_id.to_string()));
        }

        let jobs = self.jobs.lock().expect("job map lock poisoned");
        if let Some(active) = jobs.get(file_id) {
            let state = active.job.lock().expect("job lock poisoned").state;
            if matches!(state, JobState::AwaitingChannel | JobState::Transferring) {
                return Err(TransferError::AlreadyInProgress(file_id.to_string()));
            }
        }

        Ok(record.to_entry())
    }

    async fn start(&self, entry: SnapshotEntry, endpoint: Endpoint) -> TransferResult<()> {
        let file_id = entry.id().clone();
        let handle = self.transport.start_transfer(&endpoint, &file_id).await?;
        debug!(id = %file_id, %endpoint, "transfer started");

        let job = Arc::new(Mutex::new(DownloadJob {
            file_id: file_id.clone(),
            endpoint,
            bytes_transferred: 0,
            state: JobState::Transferring,
        }));

        let task = tokio::spawn(drive_transfer(
            self.catalog.clone(),
            self.bundles.clone(),
            job.clone(),
            handle,
            entry,
        ));

        self.jobs.lock().expect("job map lock poisoned").insert(
            file_id,
            ActiveJob {
                job,
                task: Some(task),
            },
        );
        Ok(())
    }

    /// Current state of the job for `file_id`, if one exists
    pub fn job_state(&self, file_id: &FileId) -> Option<JobState> {
        self.jobs
            .lock()
            .expect("job map lock poisoned")
            .get(file_id)
            .map(|active| active.job.lock().expect("job lock poisoned").state)
    }

    /// Bytes moved so far by the job for `file_id`
    pub fn job_progress(&self, file_id: &FileId) -> Option<u64> {
        self.jobs
            .lock()
            .expect("job map lock poisoned")
            .get(file_id)
            .map(|active| active.job.lock().expect("job lock poisoned").bytes_transferred)
    }

    /// Wait for the job for `file_id` to reach a terminal state
    pub async fn wait(&self, file_id: &FileId) -> TransferResult<JobState> {
        let task = {
            let mut jobs = self.jobs.lock().expect("job map lock poisoned");
            let active = jobs
                .get_mut(file_id)
                .ok_or_else(|| TransferError::NoSuchJob(file_id.to_string()))?;
            active.task.take()
        };

        if let Some(task) = task {
            let _ = task.await;
        }
        self.job_state(file_id)
            .ok_or_else(|| TransferError::NoSuchJob(file_id.to_string()))
    }

    /// Abandon an in-flight download. The reserved channel is closed (never
    /// returned to the pool) and the catalog entry ends in Failed.
    pub async fn cancel(&self, file_id: &FileId) -> TransferResult<()> {
        let active = self
            .jobs
            .lock()
            .expect("job map lock poisoned")
            .remove(file_id)
            .ok_or_else(|| TransferError::NoSuchJob(file_id.to_string()))?;

        if let Some(task) = active.task {
            task.abort();
        }
        active.job.lock().expect("job lock poisoned").state = JobState::Failed;

        // The endpoint's channel is gone with the aborted transfer
        self.pool.invalidate_endpoint();

        if let Err(err) = self.catalog.mark_failed(file_id).await {
            warn!(id = %file_id, %err, "cancel could not mark entry failed");
        }
        debug!(id = %file_id, "download cancelled");
        Ok(())
    }
}

/// Consume transfer events until the transfer reaches a terminal state
async fn drive_transfer(
    catalog: Arc<Catalog>,
    bundles: Arc<dyn BundleStore>,
    job: Arc<Mutex<DownloadJob>>,
    mut handle: TransferHandle,
    entry: SnapshotEntry,
) {
    let file_id = entry.id().clone();
    loop {
        match handle.events.recv().await {
            Some(TransferEvent::Progress(bytes)) => {
                job.lock().expect("job lock poisoned").bytes_transferred = bytes;
                if let Err(err) = catalog.update_progress(&file_id, bytes).await {
                    warn!(id = %file_id, %err, "progress update rejected");
                }
            }
            Some(TransferEvent::Complete(bytes)) => {
                match bundles.put(&file_id, entry.clone(), bytes).await {
                    Ok(()) => {
                        if let Err(err) = catalog.mark_installed(&file_id).await {
                            warn!(id = %file_id, %err, "could not mark entry installed");
                        }
                        job.lock().expect("job lock poisoned").state = JobState::Succeeded;
                        debug!(id = %file_id, "download complete and installed");
                    }
                    Err(err) => {
                        warn!(id = %file_id, %err, "bundle install failed");
                        let _ = catalog.mark_failed(&file_id).await;
                        job.lock().expect("job lock poisoned").state = JobState::Failed;
                    }
                }
                return;
            }
            Some(TransferEvent::Error(reason)) => {
                warn!(id = %file_id, %reason, "transfer failed");
                let _ = catalog.mark_failed(&file_id).await;
                job.lock().expect("job lock poisoned").state = JobState::Failed;
                return;
            }
            None => {
                // Transport dropped the handle without a terminal event
                warn!(id = %file_id, "transfer ended without completion");
                let _ = catalog.mark_failed(&file_id).await;
                job.lock().expect("job lock poisoned").state = JobState::Failed;
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{FileRecord, FileStatus};
    use crate::test_utils::{MemoryBundleStore, MockFileTransport};
    use crate::transfer::pool::{ChannelId, TransferChannel};

    struct Fixture {
        catalog: Arc<Catalog>,
        pool: Arc<TransferChannelPool>,
        transport: Arc<MockFileTransport>,
        bundles: Arc<MemoryBundleStore>,
        coordinator: DownloadCoordinator,
    }

    fn fixture() -> Fixture {
        let catalog = Arc::new(Catalog::new());
        let pool = Arc::new(TransferChannelPool::new());
        let transport = Arc::new(MockFileTransport::new());
        let bundles = Arc::new(MemoryBundleStore::new());
        let coordinator = DownloadCoordinator::new(
            catalog.clone(),
            pool.clone(),
            transport.clone(),
            bundles.clone(),
        );
        Fixture {
            catalog,
            pool,
            transport,
            bundles,
            coordinator,
        }
    }

    fn remote_record(id: &str, size: u64) -> FileRecord {
        FileRecord::remote(&SnapshotEntry(
            FileId::new(id),
            format!("title-{id}"),
            String::new(),
            String::new(),
            size,
        ))
    }

    #[tokio::test]
    async fn test_download_of_locally_held_file_is_rejected() {
        let fx = fixture();
        fx.catalog
            .add(FileRecord::local(FileId::new("a"), "A", "", "", 100))
            .await;

        let err = fx.coordinator.request_download(&FileId::new("a")).await;
        assert!(matches!(err, Err(TransferError::AlreadyInProgress(_))));
    }

    #[tokio::test]
    async fn test_download_with_no_channel_yields_no_free_tubes() {
        let fx = fixture();
        fx.catalog.add(remote_record("b", 100)).await;

        let err = fx.coordinator.request_download(&FileId::new("b")).await;
        assert!(matches!(err, Err(TransferError::NoFreeTubes)));
        // No job state was created
        assert!(fx.coordinator.job_state(&FileId::new("b")).is_none());
    }

    #[tokio::test]
    async fn test_download_unknown_file_is_rejected() {
        let fx = fixture();
        let err = fx.coordinator.request_download(&FileId::new("nope")).await;
        assert!(matches!(err, Err(TransferError::UnknownFile(_))));
    }

    #[tokio::test]
    async fn test_failed_transfer_start_creates_no_job() {
        let fx = fixture();
        let id = FileId::new("b");
        fx.catalog.add(remote_record("b", 100)).await;
        fx.pool
            .offer(TransferChannel::new(ChannelId(1), Endpoint::new("peer:9")));
        fx.transport.fail_start("peer unreachable");

        let err = fx.coordinator.request_download(&id).await;
        assert!(matches!(err, Err(TransferError::Transport(_))));
        assert!(fx.coordinator.job_state(&id).is_none());
    }

    #[tokio::test]
    async fn test_successful_download_installs_and_marks_catalog() {
        let fx = fixture();
        let id = FileId::new("b");
        fx.catalog.add(remote_record("b", 100)).await;
        fx.pool
            .offer(TransferChannel::new(ChannelId(1), Endpoint::new("peer:9")));
        fx.transport.script(
            &id,
            vec![
                TransferEvent::Progress(40),
                TransferEvent::Progress(100),
                TransferEvent::Complete(vec![0u8; 100]),
            ],
        );

        fx.coordinator.request_download(&id).await.unwrap();
        let state = fx.coordinator.wait(&id).await.unwrap();
        assert_eq!(state, JobState::Succeeded);

        let record = fx.catalog.get(&id).await.unwrap();
        assert_eq!(record.status, FileStatus::Installed);
        assert_eq!(record.acquired_bytes, 100);
        assert!(record.installed);
        assert!(fx.bundles.contains(&id).await);
    }

    #[tokio::test]
    async fn test_job_is_transferring_while_channel_open() {
        let fx = fixture();
        let id = FileId::new("b");
        fx.catalog.add(remote_record("b", 100)).await;
        fx.pool
            .offer(TransferChannel::new(ChannelId(1), Endpoint::new("peer:9")));
        let feed = fx.transport.manual(&id);

        fx.coordinator.request_download(&id).await.unwrap();
        assert_eq!(fx.coordinator.job_state(&id), Some(JobState::Transferring));

        // A second request while the job runs is rejected
        let err = fx.coordinator.request_download(&id).await;
        assert!(matches!(err, Err(TransferError::AlreadyInProgress(_))));

        feed.send(TransferEvent::Progress(100)).await.unwrap();
        feed.send(TransferEvent::Complete(vec![1u8; 100])).await.unwrap();
        drop(feed);

        assert_eq!(fx.coordinator.wait(&id).await.unwrap(), JobState::Succeeded);
    }

    #[tokio::test]
    async fn test_transport_error_marks_catalog_failed() {
        let fx = fixture();
        let id = FileId::new("b");
        fx.catalog.add(remote_record("b", 100)).await;
        fx.pool
            .offer(TransferChannel::new(ChannelId(1), Endpoint::new("peer:9")));
        fx.transport.script(
            &id,
            vec![
                TransferEvent::Progress(30),
                TransferEvent::Error("connection reset".into()),
            ],
        );

        fx.coordinator.request_download(&id).await.unwrap();
        assert_eq!(fx.coordinator.wait(&id).await.unwrap(), JobState::Failed);

        let record = fx.catalog.get(&id).await.unwrap();
        assert_eq!(record.status, FileStatus::Failed);
        assert_eq!(record.acquired_bytes, 0);
    }

    #[tokio::test]
    async fn test_install_failure_marks_catalog_failed() {
        let fx = fixture();
        let id = FileId::new("b");
        fx.catalog.add(remote_record("b", 10)).await;
        fx.pool
            .offer(TransferChannel::new(ChannelId(1), Endpoint::new("peer:9")));
        fx.bundles.fail_puts(true);
        fx.transport.script(
            &id,
            vec![
                TransferEvent::Progress(10),
                TransferEvent::Complete(vec![2u8; 10]),
            ],
        );

        fx.coordinator.request_download(&id).await.unwrap();
        assert_eq!(fx.coordinator.wait(&id).await.unwrap(), JobState::Failed);
        assert_eq!(
            fx.catalog.get(&id).await.unwrap().status,
            FileStatus::Failed
        );
    }

    #[tokio::test]
    async fn test_dropped_handle_without_completion_fails_job() {
        let fx = fixture();
        let id = FileId::new("b");
        fx.catalog.add(remote_record("b", 10)).await;
        fx.pool
            .offer(TransferChannel::new(ChannelId(1), Endpoint::new("peer:9")));
        // No script: the mock hands back an already-closed event stream
        fx.coordinator.request_download(&id).await.unwrap();
        assert_eq!(fx.coordinator.wait(&id).await.unwrap(), JobState::Failed);
    }

    #[tokio::test]
    async fn test_cancel_releases_endpoint_and_fails_entry() {
        let fx = fixture();
        let id = FileId::new("b");
        fx.catalog.add(remote_record("b", 100)).await;
        fx.pool
            .offer(TransferChannel::new(ChannelId(1), Endpoint::new("peer:9")));
        let feed = fx.transport.manual(&id);

        fx.coordinator.request_download(&id).await.unwrap();
        feed.send(TransferEvent::Progress(10)).await.unwrap();
        // Let the progress event land before cancelling
        tokio::task::yield_now().await;

        fx.coordinator.cancel(&id).await.unwrap();
        assert_eq!(fx.pool.resolved_endpoint(), None);
        assert_eq!(
            fx.catalog.get(&id).await.unwrap().status,
            FileStatus::Failed
        );
    }

    #[tokio::test]
    async fn test_retry_after_failure_is_allowed() {
        let fx = fixture();
        let id = FileId::new("b");
        fx.catalog.add(remote_record("b", 10)).await;
        fx.pool
            .offer(TransferChannel::new(ChannelId(1), Endpoint::new("peer:9")));
        fx.transport
            .script(&id, vec![TransferEvent::Error("reset".into())]);

        fx.coordinator.request_download(&id).await.unwrap();
        assert_eq!(fx.coordinator.wait(&id).await.unwrap(), JobState::Failed);

        // Endpoint stays resolved; a fresh request reuses it
        fx.transport.script(
            &id,
            vec![TransferEvent::Complete(vec![3u8; 10])],
        );
        fx.coordinator.request_download(&id).await.unwrap();
        assert_eq!(fx.coordinator.wait(&id).await.unwrap(), JobState::Succeeded);
    }

    #[tokio::test]
    async fn test_server_path_uses_fixed_endpoint() {
        let fx = fixture();
        let id = FileId::new("b");
        fx.catalog.add(remote_record("b", 10)).await;
        fx.transport
            .script(&id, vec![TransferEvent::Complete(vec![4u8; 10])]);

        fx.coordinator
            .request_download_from(&id, Endpoint::new("server:14623"))
            .await
            .unwrap();
        assert_eq!(fx.coordinator.wait(&id).await.unwrap(), JobState::Succeeded);

        let started = fx.transport.started();
        assert_eq!(started, vec![(Endpoint::new("server:14623"), id)]);
    }
}
