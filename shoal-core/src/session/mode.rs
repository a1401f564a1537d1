/*
    mode.rs - Session modes and permission levels

    Catalog mutation on a server requires level >= 1; administrative
    user-permission changes require level 2. Servers older than protocol
    version 2 know no levels, so level 1 is assumed there.
*/

use serde::{Deserialize, Serialize};
use std::fmt;

/// Per-user access level granted by a catalog server
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PermissionLevel {
    /// Level 0: download only
    Viewer,
    /// Level 1: may upload and remove entries
    Contributor,
    /// Level 2: may additionally administer user permissions
    Admin,
}

impl PermissionLevel {
    /// Map a server-reported numeric level; anything above 2 clamps to Admin
    pub fn from_level(level: u8) -> Self {
        match level {
            0 => PermissionLevel::Viewer,
            1 => PermissionLevel::Contributor,
            _ => PermissionLevel::Admin,
        }
    }

    pub fn level(&self) -> u8 {
        match self {
            PermissionLevel::Viewer => 0,
            PermissionLevel::Contributor => 1,
            PermissionLevel::Admin => 2,
        }
    }

    /// Whether catalog add/remove is permitted
    pub fn allows_mutation(&self) -> bool {
        *self >= PermissionLevel::Contributor
    }

    /// Whether user administration is permitted
    pub fn allows_admin(&self) -> bool {
        *self == PermissionLevel::Admin
    }
}

impl fmt::Display for PermissionLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.level())
    }
}

/// The session's role
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionMode {
    /// Created the peer group; owns the control channel as responder
    P2pInitiator,
    /// Joined an existing peer group
    P2pJoiner,
    /// Former initiator now serving exclusively through a catalog server;
    /// reachable only from P2pInitiator and never left again
    ServerHost,
    /// Client of a catalog server, with the level the server granted
    ServerClient { level: PermissionLevel },
}

impl SessionMode {
    pub fn name(&self) -> &'static str {
        match self {
            SessionMode::P2pInitiator => "p2p-initiator",
            SessionMode::P2pJoiner => "p2p-joiner",
            SessionMode::ServerHost => "server-host",
            SessionMode::ServerClient { .. } => "server-client",
        }
    }

    pub fn is_p2p(&self) -> bool {
        matches!(self, SessionMode::P2pInitiator | SessionMode::P2pJoiner)
    }

    pub fn is_server(&self) -> bool {
        matches!(self, SessionMode::ServerHost | SessionMode::ServerClient { .. })
    }
}

impl fmt::Display for SessionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}
