use std::net::SocketAddr;
use std::path::Path;

use anyhow::Context;
use geonet_core::GraphBuilderConfig;
use serde::{Deserialize, Serialize};

/// Server settings, read from an optional TOML file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: SocketAddr,
    /// Upper bound for a single request, analysis included
    pub request_timeout_secs: u64,
    /// Requests processed at the same time; the rest wait
    pub max_concurrent_analyses: usize,
    pub max_body_bytes: usize,
    pub cors_allow_any_origin: bool,
    pub graph: GraphBuilderConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([0, 0, 0, 0], 8000)),
            request_timeout_secs: 120,
            max_concurrent_analyses: 4,
            max_body_bytes: 64 * 1024 * 1024,
            cors_allow_any_origin: true,
            graph: GraphBuilderConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Reads the configuration file, or returns the defaults without one
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };

        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        toml::from_str(&text).with_context(|| format!("invalid config file {}", path.display()))
    }
}
