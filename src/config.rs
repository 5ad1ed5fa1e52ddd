//! Server configuration
//!
//! Defaults, optionally overridden by a JSON file named in `NIMD_CONFIG`,
//! then by the first command-line argument (a port or a full address).

use std::net::SocketAddr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Environment variable naming an optional JSON config file
pub const CONFIG_ENV: &str = "NIMD_CONFIG";

/// Default server address
pub const DEFAULT_ADDR: &str = "0.0.0.0:5555";

/// Server configuration
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind the listener
    pub bind_address: String,
    /// Maximum entries in the waiting list, including players in a match
    pub queue_capacity: usize,
    /// How often a queued player re-checks for a match, in milliseconds
    pub queue_poll_interval_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: DEFAULT_ADDR.to_string(),
            queue_capacity: 64,
            queue_poll_interval_ms: 100,
        }
    }
}

impl ServerConfig {
    /// Build the configuration from the environment and arguments
    ///
    /// `arg` is the first command-line argument, if any.
    pub fn load(arg: Option<String>) -> Result<Self, AppError> {
        let mut config = match std::env::var(CONFIG_ENV) {
            Ok(path) => Self::from_json(&std::fs::read_to_string(path)?)?,
            Err(_) => Self::default(),
        };

        if let Some(arg) = arg {
            config.bind_address = Self::parse_address(&arg)?;
        }
        Ok(config)
    }

    pub fn from_json(json: &str) -> Result<Self, AppError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Accept either a bare port or a `host:port` address
    pub fn parse_address(arg: &str) -> Result<String, AppError> {
        if let Ok(port) = arg.parse::<u16>() {
            return Ok(format!("0.0.0.0:{}", port));
        }
        arg.parse::<SocketAddr>()
            .map(|addr| addr.to_string())
            .map_err(|_| AppError::InvalidAddress(arg.to_string()))
    }

    pub fn queue_poll_interval(&self) -> Duration {
        Duration::from_millis(self.queue_poll_interval_ms.max(1))
    }
}
