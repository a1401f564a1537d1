/*
    session - top-level mode/permission state machine

    One Session owns the catalog, the control channel, the transfer pool,
    and the download coordinator, and decides which operations are legal in
    the current mode: P2P initiator/joiner, or server host/client with a
    per-user permission level. The P2P-initiator to server-host transition
    is one-way for the lifetime of the session.
*/

mod controller;
mod errors;
mod mode;
mod server;

#[cfg(test)]
mod tests;

pub use controller::Session;
pub use errors::{SessionError, SessionResult};
pub use mode::{PermissionLevel, SessionMode};
pub use server::{ServerApi, UserListing};
