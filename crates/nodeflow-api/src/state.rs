//! Application state for CLI commands.
//!
//! Resolves the data directory, loads `config.toml`, and builds the traversal
//! engine pinned to the infra HTTP fetcher.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use nodeflow_core::engine::traversal::TraversalEngine;
use nodeflow_core::event::bus::EventBus;
use nodeflow_infra::config::load_engine_config;
use nodeflow_infra::filesystem::resolve_data_dir;
use nodeflow_infra::http::ReqwestFetcher;
use nodeflow_types::config::EngineConfig;

/// Engine type pinned to the concrete infra fetcher.
pub type ConcreteEngine = TraversalEngine<ReqwestFetcher>;

pub struct AppState {
    pub config: EngineConfig,
}

impl AppState {
    /// Resolve the data directory and load its config. The directory is not created.
    pub async fn init() -> anyhow::Result<Self> {
        let data_dir = resolve_data_dir();
        let config = load_engine_config(&data_dir).await;
        tracing::debug!(data_dir = %data_dir.display(), ?config, "loaded engine config");
        Ok(Self { config })
    }

    /// Build a traversal engine and the event bus it publishes to.
    ///
    /// `delay_override` takes precedence over `node_delay_ms` from config.
    pub fn engine(&self, delay_override: Option<u64>) -> anyhow::Result<(ConcreteEngine, EventBus)> {
        let fetcher = ReqwestFetcher::new(self.config.http_timeout())
            .context("Failed to build HTTP client")?;
        let bus = EventBus::new(self.config.event_capacity);

        let mut engine = TraversalEngine::new(Arc::new(fetcher), bus.clone(), &self.config);
        if let Some(ms) = delay_override {
            engine = engine.with_node_delay(Duration::from_millis(ms));
        }
        Ok((engine, bus))
    }
}
