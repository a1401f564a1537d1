//! Bundle store collaborator
//!
//! A bundle pairs a file's bytes with its metadata in some persistent
//! container. The container format and its location are external concerns;
//! the session only needs put/get/delete/list keyed by file id. Tests and
//! the CLI use the in-memory store from `test_utils`.

use crate::catalog::{FileId, SnapshotEntry};
use async_trait::async_trait;
use thiserror::Error;

/// Errors raised by a bundle store implementation
#[derive(Debug, Clone, Error)]
pub enum BundleError {
    /// No bundle stored under this id
    #[error("bundle not found: {0}")]
    NotFound(String),

    /// The backing container rejected the payload
    #[error("bundle install failed: {0}")]
    InstallFailed(String),

    /// Underlying storage failure
    #[error("bundle storage error: {0}")]
    Storage(String),
}

pub type BundleResult<T> = Result<T, BundleError>;

/// Persistent container for file payloads plus their metadata
#[async_trait]
pub trait BundleStore: Send + Sync {
    /// Persist a payload and its metadata under `id`
    async fn put(&self, id: &FileId, metadata: SnapshotEntry, bytes: Vec<u8>)
        -> BundleResult<()>;

    /// Fetch a payload and its metadata
    async fn get(&self, id: &FileId) -> BundleResult<(SnapshotEntry, Vec<u8>)>;

    /// Drop the payload stored under `id`
    async fn delete(&self, id: &FileId) -> BundleResult<()>;

    /// Ids of every bundle currently held
    async fn list_ids(&self) -> BundleResult<Vec<FileId>>;
}
