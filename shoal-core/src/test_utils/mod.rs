//! Test doubles for the session's external collaborators
//!
//! In-memory implementations of the group transport, file transport,
//! bundle store, and server surface, used across the test suites.

mod bundle;
mod fixtures;
mod group;
mod server;
mod transfer;

pub use bundle::MemoryBundleStore;
pub use fixtures::{sample_entry, sample_local_record, sample_remote_record};
pub use group::MockGroupTransport;
pub use server::MockServerApi;
pub use transfer::MockFileTransport;
