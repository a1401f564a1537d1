//! Shoal - a shared file catalog for transient peer groups
//!
//! A group of peers keeps an eventually-consistent catalog of file entries
//! and moves the underlying bytes between one another over point-to-point
//! transfer channels, with an optional fallback to a persistent server when
//! no peer group exists.
//!
//! Subsystems:
//! - `catalog` - the replicated entry map and its change events
//! - `control` - the group-broadcast protocol keeping catalogs in sync
//! - `transfer` - the channel pool and per-file download coordinator
//! - `session` - the mode/permission state machine tying it all together

pub mod bundle;
pub mod catalog;
pub mod config;
pub mod control;
pub mod logging;
pub mod session;
pub mod test_utils;
pub mod transfer;

pub use catalog::{Catalog, CatalogEvent, FileId, FileRecord, FileStatus};
pub use config::Config;
pub use logging::{init_logging, LogLevel};
pub use session::{PermissionLevel, Session, SessionMode};
