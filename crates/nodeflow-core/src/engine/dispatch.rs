//! Node dispatcher: per-kind execution of a single node.
//!
//! `NodeDispatcher` maps a `NodeKind` and the input value to a `NodeOutput`.
//! Only `http` nodes perform IO, through the `HttpFetcher` port.

use std::future::Future;
use std::sync::Arc;

use chrono::{SecondsFormat, Utc};
use nodeflow_types::graph::{NodeKind, DEFAULT_HTTP_URL};
use serde_json::{json, Map, Value};

use super::script::{ScriptError, ScriptEvaluator};

/// Method issued by every `http` node.
const HTTP_NODE_METHOD: &str = "GET";

// ---------------------------------------------------------------------------
// HttpFetcher port
// ---------------------------------------------------------------------------

/// Errors returned by an `HttpFetcher`.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("{0}")]
    Transport(String),

    /// The response body was not valid JSON.
    #[error("invalid JSON response: {0}")]
    Decode(String),

    #[error("unsupported HTTP method '{0}'")]
    InvalidMethod(String),

    #[error("request timed out after {0}s")]
    Timeout(u64),
}

/// Port for the single side effect the engine performs: fetching a URL and
/// decoding the body as JSON.
///
/// Uses RPITIT for the async method; implementations live in the infra crate
/// (and as stubs in tests).
pub trait HttpFetcher: Send + Sync + 'static {
    /// Request `url` with `method` and decode the response body as JSON.
    ///
    /// Non-2xx statuses are not errors; only transport and decode failures are.
    fn fetch_json(
        &self,
        method: &str,
        url: &str,
    ) -> impl Future<Output = Result<Value, FetchError>> + Send;
}

// ---------------------------------------------------------------------------
// NodeOutput / NodeError
// ---------------------------------------------------------------------------

/// Result of running one node.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeOutput {
    /// A value passed to every successor.
    Value(Value),
    /// A filter whose condition was falsy. Recorded as `null`; the branch ends here.
    Filtered,
}

impl NodeOutput {
    /// The JSON value recorded for this output.
    pub fn to_value(&self) -> Value {
        match self {
            NodeOutput::Value(v) => v.clone(),
            NodeOutput::Filtered => Value::Null,
        }
    }

    /// Whether successors should be visited.
    pub fn propagates(&self) -> bool {
        matches!(self, NodeOutput::Value(_))
    }
}

/// A node failure. The display text is what lands in the execution record.
#[derive(Debug, Clone, thiserror::Error, PartialEq)]
pub enum NodeError {
    #[error("{0}")]
    HttpFailure(String),

    #[error("{0}")]
    ScriptFailure(String),

    #[error("execution cancelled")]
    Cancelled,
}

// ---------------------------------------------------------------------------
// NodeDispatcher
// ---------------------------------------------------------------------------

/// Executes individual nodes by dispatching on their kind.
pub struct NodeDispatcher<F> {
    fetcher: Arc<F>,
    scripts: ScriptEvaluator,
    default_http_url: String,
}

impl<F: HttpFetcher> NodeDispatcher<F> {
    pub fn new(fetcher: Arc<F>) -> Self {
        Self {
            fetcher,
            scripts: ScriptEvaluator::new(),
            default_http_url: DEFAULT_HTTP_URL.to_string(),
        }
    }

    /// Override the URL used by `http` nodes with no configured URL.
    pub fn with_default_http_url(mut self, url: impl Into<String>) -> Self {
        self.default_http_url = url.into();
        self
    }

    /// Run a node against its input value.
    pub async fn run(&self, kind: &NodeKind, input: &Value) -> Result<NodeOutput, NodeError> {
        match kind {
            NodeKind::Trigger(_) => Ok(NodeOutput::Value(json!({
                "triggered": true,
                "timestamp": Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            }))),

            // `config.method` is kept in the document but not used.
            NodeKind::Http(config) => {
                let url = config.effective_url(&self.default_http_url);
                tracing::debug!(url, "http node request");
                self.fetcher
                    .fetch_json(HTTP_NODE_METHOD, url)
                    .await
                    .map(NodeOutput::Value)
                    .map_err(|e| NodeError::HttpFailure(format!("HTTP request failed: {e}")))
            }

            NodeKind::Transform(config) => self
                .scripts
                .evaluate(config.effective_code(), &bind_input(input))
                .map(NodeOutput::Value)
                .map_err(|e| script_failure("Transform", e)),

            NodeKind::Filter(config) => {
                let passed = self
                    .scripts
                    .evaluate_condition(config.effective_condition(), &bind_input(input))
                    .map_err(|e| script_failure("Filter", e))?;
                if passed {
                    Ok(NodeOutput::Value(input.clone()))
                } else {
                    tracing::debug!("filter condition falsy, branch ends");
                    Ok(NodeOutput::Filtered)
                }
            }

            // The configured URL is never called.
            NodeKind::Webhook(_) => Ok(NodeOutput::Value(json!({
                "webhookSent": true,
                "data": input,
            }))),

            NodeKind::Other { node_type, .. } => {
                tracing::debug!(node_type = node_type.as_str(), "unknown node type, passing input through");
                Ok(NodeOutput::Value(input.clone()))
            }
        }
    }
}

fn bind_input(input: &Value) -> Map<String, Value> {
    let mut bindings = Map::new();
    bindings.insert("input".to_string(), input.clone());
    bindings
}

fn script_failure(label: &str, err: ScriptError) -> NodeError {
    NodeError::ScriptFailure(format!("{label} failed: {err}"))
}
