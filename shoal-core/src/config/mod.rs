//! Configuration for a shoal session
//!
//! Defaults, an optional TOML file, and `SHOAL_*` environment overrides,
//! layered in that order.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

mod error;

pub use error::ConfigError;

/// Main session configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Local user identity
    pub identity: IdentityConfig,

    /// Fallback catalog server
    pub server: ServerConfig,

    /// Local storage locations
    pub storage: StorageConfig,

    /// Event fan-out
    pub events: EventsConfig,
}

/// Local user identity as presented to servers and peers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityConfig {
    /// Opaque hash of the user's public key
    pub user_key_hash: String,

    /// Display nickname
    pub nick: String,
}

impl IdentityConfig {
    /// Derive the opaque key hash from public key material
    pub fn from_pubkey(pubkey: &[u8], nick: impl Into<String>) -> Self {
        IdentityConfig {
            user_key_hash: hex::encode(Sha256::digest(pubkey)),
            nick: nick.into(),
        }
    }
}

/// Fallback catalog server location and deadlines
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Server host; `None` means no fallback server exists
    pub host: Option<String>,

    /// Server port
    pub port: u16,

    /// Deadline for a single server round-trip
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,
}

/// Local storage locations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory holding bundles and the persisted catalog snapshot
    pub data_dir: PathBuf,
}

/// Event fan-out settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventsConfig {
    /// Buffered catalog events per subscriber
    pub capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            identity: IdentityConfig {
                user_key_hash: String::new(),
                nick: "anonymous".to_string(),
            },
            server: ServerConfig {
                host: None,
                port: 14623,
                request_timeout: Duration::from_secs(10),
            },
            storage: StorageConfig {
                data_dir: PathBuf::from("./shoal-data"),
            },
            events: EventsConfig { capacity: 128 },
        }
    }
}

impl Config {
    /// Load configuration from environment variables, over defaults
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Config::default();

        if let Ok(key) = env::var("SHOAL_USER_KEY_HASH") {
            config.identity.user_key_hash = key;
        }
        if let Ok(nick) = env::var("SHOAL_NICK") {
            config.identity.nick = nick;
        }
        if let Ok(host) = env::var("SHOAL_SERVER_HOST") {
            config.server.host = Some(host);
        }
        if let Ok(port) = env::var("SHOAL_SERVER_PORT") {
            config.server.port = port
                .parse()
                .map_err(|_| ConfigError::InvalidValue(format!("SHOAL_SERVER_PORT={port}")))?;
        }
        if let Ok(secs) = env::var("SHOAL_SERVER_TIMEOUT_SECS") {
            let secs: u64 = secs.parse().map_err(|_| {
                ConfigError::InvalidValue(format!("SHOAL_SERVER_TIMEOUT_SECS={secs}"))
            })?;
            config.server.request_timeout = Duration::from_secs(secs);
        }
        if let Ok(dir) = env::var("SHOAL_DATA_DIR") {
            config.storage.data_dir = PathBuf::from(dir);
        }

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::FileRead(e.to_string()))?;
        let config: Config =
            toml::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check invariants that cannot be expressed in the types
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.request_timeout.is_zero() {
            return Err(ConfigError::InvalidValue(
                "server.request_timeout must be non-zero".to_string(),
            ));
        }
        if self.events.capacity == 0 {
            return Err(ConfigError::InvalidValue(
                "events.capacity must be non-zero".to_string(),
            ));
        }
        if let Some(host) = &self.server.host {
            if host.is_empty() {
                return Err(ConfigError::InvalidValue(
                    "server.host must not be empty".to_string(),
                ));
            }
        }
        Ok(())
    }

    /// `host:port` of the fallback server, if one is configured
    pub fn server_address(&self) -> Option<String> {
        self.server
            .host
            .as_ref()
            .map(|host| format!("{}:{}", host, self.server.port))
    }
}
