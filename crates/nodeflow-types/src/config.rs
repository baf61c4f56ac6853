//! Engine configuration.
//!
//! `EngineConfig` represents the `config.toml` in the nodeflow data directory.
//! All fields have defaults matching the editor's behavior.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::graph::DEFAULT_HTTP_URL;

/// Runtime settings for the traversal engine and its HTTP nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Pause before each node's behavior runs, in milliseconds.
    #[serde(default = "default_node_delay_ms")]
    pub node_delay_ms: u64,

    /// Per-request timeout for `http` nodes, in seconds.
    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,

    /// URL requested by `http` nodes that do not configure one.
    #[serde(default = "default_http_url")]
    pub default_http_url: String,

    /// Capacity of the run event broadcast channel.
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,
}

fn default_node_delay_ms() -> u64 {
    500
}

fn default_http_timeout_secs() -> u64 {
    30
}

fn default_http_url() -> String {
    DEFAULT_HTTP_URL.to_string()
}

fn default_event_capacity() -> usize {
    256
}

impl EngineConfig {
    pub fn node_delay(&self) -> Duration {
        Duration::from_millis(self.node_delay_ms)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            node_delay_ms: default_node_delay_ms(),
            http_timeout_secs: default_http_timeout_secs(),
            default_http_url: default_http_url(),
            event_capacity: default_event_capacity(),
        }
    }
}
