//! Mock catalog server
//!
//! Behaves like a small in-memory server: configurable protocol version
//! and granted level, a file list, and switches to simulate failures and
//! slow responses for timeout coverage.

use crate::catalog::{FileId, SnapshotEntry};
use crate::session::{ServerApi, SessionError, SessionResult, UserListing};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

pub struct MockServerApi {
    version: Mutex<u32>,
    granted_level: Mutex<u8>,
    files: Mutex<Vec<SnapshotEntry>>,
    users: Mutex<UserListing>,
    uploads: Mutex<Vec<(Option<String>, SnapshotEntry, Vec<u8>)>>,
    removals: Mutex<Vec<(Option<String>, FileId)>>,
    announced: Mutex<Vec<(String, String)>>,
    user_mods: Mutex<Vec<(String, u8)>>,
    fail_requests: Mutex<bool>,
    fail_uploads: Mutex<bool>,
    delay: Mutex<Option<Duration>>,
}

impl MockServerApi {
    pub fn new(version: u32) -> Self {
        MockServerApi {
            version: Mutex::new(version),
            granted_level: Mutex::new(1),
            files: Mutex::new(Vec::new()),
            users: Mutex::new(HashMap::new()),
            uploads: Mutex::new(Vec::new()),
            removals: Mutex::new(Vec::new()),
            announced: Mutex::new(Vec::new()),
            user_mods: Mutex::new(Vec::new()),
            fail_requests: Mutex::new(false),
            fail_uploads: Mutex::new(false),
            delay: Mutex::new(None),
        }
    }

    pub fn grant_level(&self, level: u8) {
        *self.granted_level.lock().unwrap() = level;
    }

    pub fn serve_files(&self, files: Vec<SnapshotEntry>) {
        *self.files.lock().unwrap() = files;
    }

    pub fn set_users(&self, users: UserListing) {
        *self.users.lock().unwrap() = users;
    }

    /// Fail every round-trip, as an unreachable server would
    pub fn fail_requests(&self, fail: bool) {
        *self.fail_requests.lock().unwrap() = fail;
    }

    /// Fail uploads only
    pub fn fail_uploads(&self, fail: bool) {
        *self.fail_uploads.lock().unwrap() = fail;
    }

    /// Sleep before answering, to trip the session's deadline
    pub fn respond_after(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }

    pub fn uploads(&self) -> Vec<(Option<String>, SnapshotEntry, Vec<u8>)> {
        self.uploads.lock().unwrap().clone()
    }

    pub fn removals(&self) -> Vec<(Option<String>, FileId)> {
        self.removals.lock().unwrap().clone()
    }

    pub fn announced(&self) -> Vec<(String, String)> {
        self.announced.lock().unwrap().clone()
    }

    pub fn user_mods(&self) -> Vec<(String, u8)> {
        self.user_mods.lock().unwrap().clone()
    }

    async fn respond(&self) -> SessionResult<()> {
        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if *self.fail_requests.lock().unwrap() {
            return Err(SessionError::ServerRequestFailure(
                "mock server unavailable".into(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl ServerApi for MockServerApi {
    async fn version(&self) -> SessionResult<u32> {
        self.respond().await?;
        Ok(*self.version.lock().unwrap())
    }

    async fn file_list(&self) -> SessionResult<Vec<SnapshotEntry>> {
        self.respond().await?;
        Ok(self.files.lock().unwrap().clone())
    }

    async fn announce_user(&self, user_key: &str, nick: &str) -> SessionResult<u8> {
        self.respond().await?;
        self.announced
            .lock()
            .unwrap()
            .push((user_key.to_string(), nick.to_string()));
        Ok(*self.granted_level.lock().unwrap())
    }

    async fn upload(
        &self,
        user_key: Option<&str>,
        entry: SnapshotEntry,
        bytes: Vec<u8>,
    ) -> SessionResult<()> {
        self.respond().await?;
        if *self.fail_uploads.lock().unwrap() {
            return Err(SessionError::FileUploadFailure("mock upload failure".into()));
        }
        self.uploads
            .lock()
            .unwrap()
            .push((user_key.map(String::from), entry, bytes));
        Ok(())
    }

    async fn remove(&self, user_key: Option<&str>, file_id: &FileId) -> SessionResult<()> {
        self.respond().await?;
        self.removals
            .lock()
            .unwrap()
            .push((user_key.map(String::from), file_id.clone()));
        Ok(())
    }

    async fn user_list(&self, _user_key: &str) -> SessionResult<UserListing> {
        self.respond().await?;
        Ok(self.users.lock().unwrap().clone())
    }

    async fn user_mod(&self, _user_key: &str, user_id: &str, level: u8) -> SessionResult<()> {
        self.respond().await?;
        self.user_mods
            .lock()
            .unwrap()
            .push((user_id.to_string(), level));
        Ok(())
    }
}
