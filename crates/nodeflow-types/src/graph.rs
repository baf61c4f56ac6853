//! Graph model: nodes, edges, and the JSON document that carries them.
//!
//! A node's configuration is a tagged union keyed by its declared type. Each
//! typed config keeps unrecognized keys in an `extra` map so that a document
//! read from disk serializes back to the same config mapping. Unrecognized
//! node types are preserved verbatim as `NodeKind::Other`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ModelError;

/// Endpoint used by `http` nodes that do not configure a URL.
pub const DEFAULT_HTTP_URL: &str = "https://jsonplaceholder.typicode.com/todos/1";

/// Script used by `transform` nodes that do not configure one.
pub const DEFAULT_TRANSFORM_CODE: &str = "return input;";

/// Condition used by `filter` nodes that do not configure one.
pub const DEFAULT_FILTER_CONDITION: &str = "true";

/// Version string written into exported graph documents.
pub const DOCUMENT_VERSION: &str = "1.0";

// ---------------------------------------------------------------------------
// Typed node configuration
// ---------------------------------------------------------------------------

/// Configuration for `trigger` nodes (no recognized keys).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TriggerConfig {
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Configuration for `http` nodes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HttpConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Method name chosen in the editor. Stored for round-trip only; the
    /// engine always issues a GET.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl HttpConfig {
    /// The URL to request, falling back to `default` when unset or empty.
    pub fn effective_url<'a>(&'a self, default: &'a str) -> &'a str {
        match self.url.as_deref() {
            Some(url) if !url.is_empty() => url,
            _ => default,
        }
    }
}

/// Configuration for `transform` nodes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransformConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl TransformConfig {
    pub fn effective_code(&self) -> &str {
        match self.code.as_deref() {
            Some(code) if !code.is_empty() => code,
            _ => DEFAULT_TRANSFORM_CODE,
        }
    }
}

/// Configuration for `filter` nodes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl FilterConfig {
    pub fn effective_condition(&self) -> &str {
        match self.condition.as_deref() {
            Some(condition) if !condition.is_empty() => condition,
            _ => DEFAULT_FILTER_CONDITION,
        }
    }
}

/// Configuration for `webhook` nodes. The URL is stored but never called.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WebhookConfig {
    #[serde(
        rename = "webhookUrl",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub webhook_url: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// The kind of a node together with its typed configuration.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Trigger(TriggerConfig),
    Http(HttpConfig),
    Transform(TransformConfig),
    Filter(FilterConfig),
    Webhook(WebhookConfig),
    /// A type name the engine does not recognize. Executes as identity.
    Other {
        node_type: String,
        config: Map<String, Value>,
    },
}

impl NodeKind {
    /// Build a node kind from its type name and raw config mapping.
    pub fn from_parts(node_type: &str, config: Map<String, Value>) -> Result<Self, ModelError> {
        fn typed<T: serde::de::DeserializeOwned>(
            node_type: &str,
            config: Map<String, Value>,
        ) -> Result<T, ModelError> {
            serde_json::from_value(Value::Object(config)).map_err(|e| ModelError::InvalidConfig {
                node_type: node_type.to_string(),
                message: e.to_string(),
            })
        }

        Ok(match node_type {
            "trigger" => NodeKind::Trigger(typed(node_type, config)?),
            "http" => NodeKind::Http(typed(node_type, config)?),
            "transform" => NodeKind::Transform(typed(node_type, config)?),
            "filter" => NodeKind::Filter(typed(node_type, config)?),
            "webhook" => NodeKind::Webhook(typed(node_type, config)?),
            other => NodeKind::Other {
                node_type: other.to_string(),
                config,
            },
        })
    }

    /// A node kind of the given type with an empty configuration.
    pub fn with_defaults(node_type: &str) -> Self {
        match node_type {
            "trigger" => NodeKind::Trigger(TriggerConfig::default()),
            "http" => NodeKind::Http(HttpConfig::default()),
            "transform" => NodeKind::Transform(TransformConfig::default()),
            "filter" => NodeKind::Filter(FilterConfig::default()),
            "webhook" => NodeKind::Webhook(WebhookConfig::default()),
            other => NodeKind::Other {
                node_type: other.to_string(),
                config: Map::new(),
            },
        }
    }

    /// The declared type name, as written in graph documents.
    pub fn type_name(&self) -> &str {
        match self {
            NodeKind::Trigger(_) => "trigger",
            NodeKind::Http(_) => "http",
            NodeKind::Transform(_) => "transform",
            NodeKind::Filter(_) => "filter",
            NodeKind::Webhook(_) => "webhook",
            NodeKind::Other { node_type, .. } => node_type,
        }
    }

    pub fn is_trigger(&self) -> bool {
        matches!(self, NodeKind::Trigger(_))
    }

    /// The configuration as an untyped mapping, as written in graph documents.
    pub fn config_map(&self) -> Map<String, Value> {
        let value = match self {
            NodeKind::Trigger(c) => serde_json::to_value(c),
            NodeKind::Http(c) => serde_json::to_value(c),
            NodeKind::Transform(c) => serde_json::to_value(c),
            NodeKind::Filter(c) => serde_json::to_value(c),
            NodeKind::Webhook(c) => serde_json::to_value(c),
            NodeKind::Other { config, .. } => return config.clone(),
        };
        match value {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Node
// ---------------------------------------------------------------------------

/// Canvas position. Presentation-only; ignored by execution.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

/// A typed unit of work in the graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "NodeDocument", into = "NodeDocument")]
pub struct Node {
    /// Unique within a graph.
    pub id: String,
    /// Display name shown in the trace.
    pub name: String,
    pub kind: NodeKind,
    pub position: Position,
}

impl Node {
    pub fn new(id: impl Into<String>, name: impl Into<String>, kind: NodeKind) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind,
            position: Position::default(),
        }
    }
}

/// Wire shape of a node inside a graph document.
///
/// Nodes are written flat. On load, the editor's canvas shape is accepted
/// too: `type` is the canvas renderer (`"workflow"`) and the node's real
/// type, label and config sit under `data`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NodeDocument {
    id: String,
    #[serde(rename = "type", default)]
    node_type: String,
    #[serde(default, alias = "label")]
    display_name: String,
    #[serde(default)]
    config: Map<String, Value>,
    #[serde(default)]
    position: Position,
    #[serde(default, skip_serializing)]
    data: Option<CanvasData>,
}

/// The `data` payload of a canvas node.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CanvasData {
    #[serde(default)]
    node_type: Option<String>,
    #[serde(default)]
    label: Option<String>,
    #[serde(default)]
    config: Map<String, Value>,
}

impl TryFrom<NodeDocument> for Node {
    type Error = ModelError;

    fn try_from(doc: NodeDocument) -> Result<Self, Self::Error> {
        let (node_type, name, config) = match doc.data {
            Some(CanvasData {
                node_type: Some(node_type),
                label,
                config,
            }) => (node_type, label.unwrap_or(doc.display_name), config),
            _ => (doc.node_type, doc.display_name, doc.config),
        };
        let kind = NodeKind::from_parts(&node_type, config)?;
        Ok(Node {
            id: doc.id,
            name,
            kind,
            position: doc.position,
        })
    }
}

impl From<Node> for NodeDocument {
    fn from(node: Node) -> Self {
        NodeDocument {
            node_type: node.kind.type_name().to_string(),
            config: node.kind.config_map(),
            id: node.id,
            display_name: node.name,
            position: node.position,
            data: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Edge and Graph
// ---------------------------------------------------------------------------

/// A directed link from one node's output to another node's input.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Edge {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub source: String,
    pub target: String,
}

impl Edge {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            id: None,
            source: source.into(),
            target: target.into(),
        }
    }
}

/// Ordered nodes plus ordered edges. Edge endpoints are not validated.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Graph {
    #[serde(default)]
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub edges: Vec<Edge>,
}

impl Graph {
    pub fn new(nodes: Vec<Node>, edges: Vec<Edge>) -> Self {
        Self { nodes, edges }
    }

    /// The graph a fresh editor session starts with: one trigger named "Start".
    pub fn starter() -> Self {
        let mut start = Node::new("1", "Start", NodeKind::Trigger(TriggerConfig::default()));
        start.position = Position { x: 250.0, y: 100.0 };
        Self::new(vec![start], vec![])
    }

    /// Look up a node by id.
    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// All edges leaving `node_id`, in edge order.
    pub fn neighbors(&self, node_id: &str) -> Vec<&Edge> {
        self.edges.iter().filter(|e| e.source == node_id).collect()
    }

    /// The first trigger node in node order, if any.
    pub fn entry_node(&self) -> Option<&Node> {
        self.nodes.iter().find(|n| n.kind.is_trigger())
    }
}

/// The JSON document produced by export and consumed by import.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphDocument {
    #[serde(default)]
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub edges: Vec<Edge>,
    /// Written as `"1.0"`; not checked on load.
    #[serde(default = "default_version")]
    pub version: String,
}

fn default_version() -> String {
    DOCUMENT_VERSION.to_string()
}

impl From<Graph> for GraphDocument {
    fn from(graph: Graph) -> Self {
        Self {
            nodes: graph.nodes,
            edges: graph.edges,
            version: default_version(),
        }
    }
}

impl From<GraphDocument> for Graph {
    fn from(doc: GraphDocument) -> Self {
        Graph::new(doc.nodes, doc.edges)
    }
}
