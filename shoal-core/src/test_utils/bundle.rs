//! In-memory bundle store

use crate::bundle::{BundleError, BundleResult, BundleStore};
use crate::catalog::{FileId, SnapshotEntry};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

pub struct MemoryBundleStore {
    bundles: Mutex<HashMap<FileId, (SnapshotEntry, Vec<u8>)>>,
    fail_puts: Mutex<bool>,
}

impl MemoryBundleStore {
    pub fn new() -> Self {
        MemoryBundleStore {
            bundles: Mutex::new(HashMap::new()),
            fail_puts: Mutex::new(false),
        }
    }

    /// Make every subsequent `put` fail, as a broken install would
    pub fn fail_puts(&self, fail: bool) {
        *self.fail_puts.lock().unwrap() = fail;
    }

    pub async fn contains(&self, id: &FileId) -> bool {
        self.bundles.lock().unwrap().contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.bundles.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.bundles.lock().unwrap().is_empty()
    }
}

impl Default for MemoryBundleStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BundleStore for MemoryBundleStore {
    async fn put(
        &self,
        id: &FileId,
        metadata: SnapshotEntry,
        bytes: Vec<u8>,
    ) -> BundleResult<()> {
        if *self.fail_puts.lock().unwrap() {
            return Err(BundleError::InstallFailed("mock install failure".into()));
        }
        self.bundles
            .lock()
            .unwrap()
            .insert(id.clone(), (metadata, bytes));
        Ok(())
    }

    async fn get(&self, id: &FileId) -> BundleResult<(SnapshotEntry, Vec<u8>)> {
        self.bundles
            .lock()
            .unwrap()
            .get(id)
            .cloned()
            .ok_or_else(|| BundleError::NotFound(id.to_string()))
    }

    async fn delete(&self, id: &FileId) -> BundleResult<()> {
        self.bundles
            .lock()
            .unwrap()
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| BundleError::NotFound(id.to_string()))
    }

    async fn list_ids(&self) -> BundleResult<Vec<FileId>> {
        Ok(self.bundles.lock().unwrap().keys().cloned().collect())
    }
}
