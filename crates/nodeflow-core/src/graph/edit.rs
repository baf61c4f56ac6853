//! Graph edit messages.
//!
//! Front-ends never mutate a `Graph` field by field; they describe the change
//! as a `GraphEdit` and hand it to `apply_edit`, which is the only place node
//! and edge collections are modified.

use nodeflow_types::graph::{Edge, Graph, Node, NodeKind, Position};
use serde_json::{Map, Value};

use super::GraphError;

/// A single change to a graph.
#[derive(Debug, Clone, PartialEq)]
pub enum GraphEdit {
    /// Append a node of the given type with an empty config.
    AddNode { node_type: String },
    /// Remove a node and every edge touching it.
    RemoveNode { id: String },
    Connect { source: String, target: String },
    Disconnect { source: String, target: String },
    /// Replace a node's config mapping.
    UpdateConfig { id: String, config: Map<String, Value> },
    Rename { id: String, name: String },
    Move { id: String, position: Position },
}

/// What an applied edit changed.
#[derive(Debug, Clone, PartialEq)]
pub enum EditOutcome {
    NodeAdded { id: String },
    NodeRemoved { id: String, edges_removed: usize },
    EdgeAdded,
    EdgeRemoved,
    NodeUpdated { id: String },
}

/// Apply an edit to `graph`. On error the graph is left unchanged.
pub fn apply_edit(graph: &mut Graph, edit: GraphEdit) -> Result<EditOutcome, GraphError> {
    match edit {
        GraphEdit::AddNode { node_type } => {
            let id = next_node_id(graph);
            let mut node = Node::new(
                id.clone(),
                display_name_for(&node_type),
                NodeKind::with_defaults(&node_type),
            );
            node.position = Position {
                x: 250.0,
                y: 100.0 + 120.0 * graph.nodes.len() as f64,
            };
            graph.nodes.push(node);
            tracing::debug!(node_id = id.as_str(), node_type = node_type.as_str(), "node added");
            Ok(EditOutcome::NodeAdded { id })
        }

        GraphEdit::RemoveNode { id } => {
            let index = node_index(graph, &id)?;
            graph.nodes.remove(index);
            let before = graph.edges.len();
            graph.edges.retain(|e| e.source != id && e.target != id);
            let edges_removed = before - graph.edges.len();
            tracing::debug!(node_id = id.as_str(), edges_removed, "node removed");
            Ok(EditOutcome::NodeRemoved { id, edges_removed })
        }

        GraphEdit::Connect { source, target } => {
            node_index(graph, &source)?;
            node_index(graph, &target)?;
            if graph
                .edges
                .iter()
                .any(|e| e.source == source && e.target == target)
            {
                return Err(GraphError::DuplicateEdge {
                    from: source,
                    to: target,
                });
            }
            let mut edge = Edge::new(source, target);
            edge.id = Some(format!("e{}-{}", edge.source, edge.target));
            graph.edges.push(edge);
            Ok(EditOutcome::EdgeAdded)
        }

        GraphEdit::Disconnect { source, target } => {
            let index = graph
                .edges
                .iter()
                .position(|e| e.source == source && e.target == target)
                .ok_or_else(|| GraphError::EdgeNotFound {
                    from: source.clone(),
                    to: target.clone(),
                })?;
            graph.edges.remove(index);
            Ok(EditOutcome::EdgeRemoved)
        }

        GraphEdit::UpdateConfig { id, config } => {
            let index = node_index(graph, &id)?;
            let node = &mut graph.nodes[index];
            let kind = NodeKind::from_parts(node.kind.type_name(), config)
                .map_err(|e| GraphError::InvalidConfig(e.to_string()))?;
            node.kind = kind;
            Ok(EditOutcome::NodeUpdated { id })
        }

        GraphEdit::Rename { id, name } => {
            let index = node_index(graph, &id)?;
            graph.nodes[index].name = name;
            Ok(EditOutcome::NodeUpdated { id })
        }

        GraphEdit::Move { id, position } => {
            let index = node_index(graph, &id)?;
            graph.nodes[index].position = position;
            Ok(EditOutcome::NodeUpdated { id })
        }
    }
}

fn node_index(graph: &Graph, id: &str) -> Result<usize, GraphError> {
    graph
        .nodes
        .iter()
        .position(|n| n.id == id)
        .ok_or_else(|| GraphError::NodeNotFound(id.to_string()))
}

/// `nodes.len() + 1`, bumped until it does not collide with an existing ID.
fn next_node_id(graph: &Graph) -> String {
    let mut candidate = graph.nodes.len() + 1;
    while graph.node(&candidate.to_string()).is_some() {
        candidate += 1;
    }
    candidate.to_string()
}

/// "http" -> "Http"
fn display_name_for(node_type: &str) -> String {
    let mut chars = node_type.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
