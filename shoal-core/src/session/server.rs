//! Server request seam
//!
//! The persistent fallback server exposes an HTTP-shaped surface: version
//! probe, file list, user announcement, upload, remove, and the two admin
//! user calls. The concrete HTTP stack is an external collaborator; the
//! session only sees this trait. Round-trip deadlines are enforced by the
//! session, not by implementations.

use crate::catalog::{FileId, SnapshotEntry};
use crate::session::errors::SessionResult;
use async_trait::async_trait;
use std::collections::HashMap;

/// `user_id -> (nick, level)`, as returned by the user-list call
pub type UserListing = HashMap<String, (String, u8)>;

/// The catalog server's request surface
#[async_trait]
pub trait ServerApi: Send + Sync {
    /// `GET /version` - the server's protocol version
    async fn version(&self) -> SessionResult<u32>;

    /// `GET /filelist` - every entry the server currently serves
    async fn file_list(&self) -> SessionResult<Vec<SnapshotEntry>>;

    /// `POST /announce_user` - announce identity, receive a permission level.
    /// Only meaningful on protocol version >= 2.
    async fn announce_user(&self, user_key: &str, nick: &str) -> SessionResult<u8>;

    /// `POST /upload` - push an entry plus its payload. `user_key` is sent
    /// on protocol version >= 2 only.
    async fn upload(
        &self,
        user_key: Option<&str>,
        entry: SnapshotEntry,
        bytes: Vec<u8>,
    ) -> SessionResult<()>;

    /// `POST /remove` - drop an entry from the server catalog
    async fn remove(&self, user_key: Option<&str>, file_id: &FileId) -> SessionResult<()>;

    /// `GET /user_list` - the server's known users and their levels
    async fn user_list(&self, user_key: &str) -> SessionResult<UserListing>;

    /// `POST /user_mod` - change another user's permission level
    async fn user_mod(&self, user_key: &str, user_id: &str, level: u8) -> SessionResult<()>;
}
