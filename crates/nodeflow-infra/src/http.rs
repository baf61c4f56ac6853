//! `reqwest`-backed implementation of the `HttpFetcher` port.
//!
//! The trait is defined in `nodeflow-core`; this is the only place the engine
//! touches the network.

use std::time::Duration;

use nodeflow_core::engine::dispatch::{FetchError, HttpFetcher};
use serde_json::Value;

/// Fetches URLs with a shared `reqwest::Client` and decodes bodies as JSON.
pub struct ReqwestFetcher {
    client: reqwest::Client,
    timeout: Duration,
}

impl ReqwestFetcher {
    /// Build a fetcher whose requests time out after `timeout`.
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent("nodeflow/0.1")
            .build()?;
        Ok(Self { client, timeout })
    }
}

impl HttpFetcher for ReqwestFetcher {
    async fn fetch_json(&self, method: &str, url: &str) -> Result<Value, FetchError> {
        let http_method = reqwest::Method::from_bytes(method.to_uppercase().as_bytes())
            .map_err(|_| FetchError::InvalidMethod(method.to_string()))?;

        let response = self
            .client
            .request(http_method, url)
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = response.status().as_u16();
        let body = response.text().await.map_err(|e| self.classify(e))?;

        tracing::info!(url, status, body_len = body.len(), "HTTP node request completed");

        serde_json::from_str(&body).map_err(|e| FetchError::Decode(e.to_string()))
    }
}

impl ReqwestFetcher {
    fn classify(&self, err: reqwest::Error) -> FetchError {
        if err.is_timeout() {
            FetchError::Timeout(self.timeout.as_secs())
        } else {
            FetchError::Transport(err.to_string())
        }
    }
}
