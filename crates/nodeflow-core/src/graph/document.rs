//! Graph document import/export and filesystem operations.
//!
//! Documents are read verbatim: the version string is not checked, missing
//! `nodes`/`edges` default to empty, and edge endpoints are not validated.

use std::path::Path;

use nodeflow_types::graph::{Graph, GraphDocument};

use super::GraphError;

/// Parse a JSON graph document.
pub fn parse_graph_json(json: &str) -> Result<Graph, GraphError> {
    let doc: GraphDocument =
        serde_json::from_str(json).map_err(|e| GraphError::ParseError(e.to_string()))?;
    Ok(doc.into())
}

/// Serialize a graph to a pretty-printed JSON document (`version: "1.0"`).
pub fn serialize_graph_json(graph: &Graph) -> Result<String, GraphError> {
    let doc = GraphDocument::from(graph.clone());
    serde_json::to_string_pretty(&doc).map_err(|e| GraphError::ParseError(e.to_string()))
}

/// Load a graph document from a file.
pub fn load_graph_file(path: &Path) -> Result<Graph, GraphError> {
    let content = std::fs::read_to_string(path)?;
    parse_graph_json(&content)
}

/// Save a graph document to a file, creating parent directories as needed.
pub fn save_graph_file(path: &Path, graph: &Graph) -> Result<(), GraphError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let json = serialize_graph_json(graph)?;
    std::fs::write(path, json)?;
    tracing::debug!(path = %path.display(), nodes = graph.nodes.len(), "saved graph document");
    Ok(())
}
