//! Application configuration sections.
//!
//! Loaded by the binary through the `config` crate (defaults, then TOML file,
//! then `CHATRELAY__*` environment variables).

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::auth::AuthConfig;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub logging: LoggingConfig,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub generation: GenerationConfig,
    pub relay: RelayConfig,
    pub auth: AuthConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// HTTP listener settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Deadline for ordinary request/response routes. The streaming route
    /// is not subject to it.
    pub request_timeout_secs: u64,
    /// How long in-flight connections get to drain on shutdown.
    pub shutdown_grace_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            request_timeout_secs: 15,
            shutdown_grace_secs: 10,
        }
    }
}

impl ServerConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// SQLite file. Defaults to `<data_dir>/chatrelay.db`.
    pub path: Option<String>,
}

/// Generation backend settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// Base URL of the generation backend (e.g., "http://localhost:8000").
    pub base_url: String,
    /// Model used for sessions created without one.
    pub default_model: String,
    /// Bound on establishing the TCP/TLS connection only. Streams have no
    /// total deadline.
    pub connect_timeout_secs: u64,
    /// Total deadline for the health check.
    pub health_timeout_secs: u64,
    /// Number of prior turns sent as context.
    pub history_limit: i64,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            default_model: "phi-3-mini".to_string(),
            connect_timeout_secs: 10,
            health_timeout_secs: 5,
            history_limit: 10,
        }
    }
}

/// Streaming relay settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    /// Capacity of the channel between the relay task and the SSE body.
    pub channel_capacity: usize,
    /// Interval between SSE keep-alive comments.
    pub keep_alive_secs: u64,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            channel_capacity: 64,
            keep_alive_secs: 15,
        }
    }
}

impl RelayConfig {
    pub fn keep_alive(&self) -> Duration {
        Duration::from_secs(self.keep_alive_secs)
    }
}
