//! Structural validation and cycle detection.
//!
//! Uses `petgraph` to model the node graph. Topological sort detects cycles.
//! The engine only rejects cycles reachable from the entry node; the full
//! `validate_graph` check is what the CLI reports before a run.

use std::collections::{HashMap, HashSet, VecDeque};

use nodeflow_types::graph::Graph;
use petgraph::algo::toposort;
use petgraph::graph::DiGraph;

use super::GraphError;

/// Non-fatal findings from `validate_graph`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidationReport {
    pub warnings: Vec<String>,
}

impl ValidationReport {
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }
}

/// Validate a graph.
///
/// Errors:
/// - duplicate node IDs
/// - any cycle (including self-loops)
///
/// Warnings (the engine tolerates these):
/// - no trigger node, or more than one (only the first is used)
/// - edges whose endpoints do not exist
/// - nodes not reachable from the entry node
pub fn validate_graph(graph: &Graph) -> Result<ValidationReport, GraphError> {
    let mut report = ValidationReport::default();

    let mut seen_ids = HashSet::new();
    for node in &graph.nodes {
        if !seen_ids.insert(node.id.as_str()) {
            return Err(GraphError::DuplicateNodeId(node.id.clone()));
        }
    }

    let triggers: Vec<&str> = graph
        .nodes
        .iter()
        .filter(|n| n.kind.is_trigger())
        .map(|n| n.id.as_str())
        .collect();
    match triggers.as_slice() {
        [] => report
            .warnings
            .push("graph has no trigger node; a run will do nothing".to_string()),
        [_] => {}
        [first, ..] => report.warnings.push(format!(
            "graph has {} trigger nodes; only '{}' will be used",
            triggers.len(),
            first
        )),
    }

    for edge in &graph.edges {
        for endpoint in [&edge.source, &edge.target] {
            if !seen_ids.contains(endpoint.as_str()) {
                report.warnings.push(format!(
                    "edge '{}' -> '{}' references unknown node '{}'",
                    edge.source, edge.target, endpoint
                ));
            }
        }
    }

    let all_ids: Vec<&str> = graph.nodes.iter().map(|n| n.id.as_str()).collect();
    detect_cycle(graph, &all_ids)?;

    if let Some(entry) = graph.entry_node() {
        let reachable = reachable_from(graph, &entry.id);
        for node in &graph.nodes {
            if !reachable.contains(node.id.as_str()) {
                report.warnings.push(format!(
                    "node '{}' is not reachable from trigger '{}'",
                    node.id, entry.id
                ));
            }
        }
    }

    Ok(report)
}

/// Check the subgraph reachable from `entry_id` for cycles.
///
/// A cycle here would make a depth-first run recurse forever.
pub fn find_reachable_cycle(graph: &Graph, entry_id: &str) -> Result<(), GraphError> {
    let reachable = reachable_from(graph, entry_id);
    let ids: Vec<&str> = graph
        .nodes
        .iter()
        .map(|n| n.id.as_str())
        .filter(|id| reachable.contains(id))
        .collect();
    detect_cycle(graph, &ids)
}

/// Node IDs reachable from `start` (inclusive), following edges to existing nodes.
pub fn reachable_from<'a>(graph: &'a Graph, start: &'a str) -> HashSet<&'a str> {
    let mut visited = HashSet::new();
    if graph.node(start).is_none() {
        return visited;
    }

    let mut queue = VecDeque::from([start]);
    visited.insert(start);
    while let Some(current) = queue.pop_front() {
        for edge in graph.neighbors(current) {
            let target = edge.target.as_str();
            if graph.node(target).is_some() && visited.insert(target) {
                queue.push_back(target);
            }
        }
    }
    visited
}

/// Run a topological sort over the induced subgraph on `ids`.
fn detect_cycle(graph: &Graph, ids: &[&str]) -> Result<(), GraphError> {
    let mut dag = DiGraph::<&str, ()>::new();
    let id_to_idx: HashMap<&str, _> = ids.iter().map(|id| (*id, dag.add_node(*id))).collect();

    for edge in &graph.edges {
        if let (Some(from), Some(to)) = (
            id_to_idx.get(edge.source.as_str()),
            id_to_idx.get(edge.target.as_str()),
        ) {
            dag.add_edge(*from, *to, ());
        }
    }

    toposort(&dag, None).map_err(|cycle| {
        GraphError::CycleDetected(dag[cycle.node_id()].to_string())
    })?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use nodeflow_types::graph::{Edge, Node, NodeKind};

    fn node(id: &str, node_type: &str) -> Node {
        Node::new(id, id, NodeKind::with_defaults(node_type))
    }

    fn graph(nodes: Vec<Node>, edges: &[(&str, &str)]) -> Graph {
        Graph::new(
            nodes,
            edges.iter().map(|(s, t)| Edge::new(*s, *t)).collect(),
        )
    }

    #[test]
    fn test_valid_chain_is_clean() {
        let g = graph(
            vec![node("1", "trigger"), node("2", "transform"), node("3", "filter")],
            &[("1", "2"), ("2", "3")],
        );
        let report = validate_graph(&g).unwrap();
        assert!(report.is_clean(), "unexpected warnings: {:?}", report.warnings);
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let g = graph(vec![node("1", "trigger"), node("1", "http")], &[]);
        assert!(matches!(
            validate_graph(&g),
            Err(GraphError::DuplicateNodeId(id)) if id == "1"
        ));
    }

    #[test]
    fn test_cycle_rejected() {
        let g = graph(
            vec![node("1", "trigger"), node("2", "transform"), node("3", "transform")],
            &[("1", "2"), ("2", "3"), ("3", "2")],
        );
        let err = validate_graph(&g).unwrap_err();
        assert!(err.to_string().contains("cycle"));
    }

    #[test]
    fn test_self_loop_is_a_cycle() {
        let g = graph(vec![node("1", "trigger")], &[("1", "1")]);
        assert!(matches!(
            find_reachable_cycle(&g, "1"),
            Err(GraphError::CycleDetected(_))
        ));
    }

    #[test]
    fn test_unreachable_cycle_ignored_by_run_check() {
        let g = graph(
            vec![
                node("1", "trigger"),
                node("2", "transform"),
                node("3", "transform"),
                node("4", "transform"),
            ],
            &[("1", "2"), ("3", "4"), ("4", "3")],
        );
        assert!(find_reachable_cycle(&g, "1").is_ok());
        assert!(validate_graph(&g).is_err());
    }

    #[test]
    fn test_fan_in_is_not_a_cycle() {
        let g = graph(
            vec![
                node("1", "trigger"),
                node("a", "transform"),
                node("b", "transform"),
                node("join", "webhook"),
            ],
            &[("1", "a"), ("1", "b"), ("a", "join"), ("b", "join")],
        );
        assert!(find_reachable_cycle(&g, "1").is_ok());
        assert!(validate_graph(&g).unwrap().is_clean());
    }

    #[test]
    fn test_warnings_for_missing_trigger_and_dangling_edges() {
        let g = graph(vec![node("2", "http")], &[("2", "ghost")]);
        let report = validate_graph(&g).unwrap();
        assert!(report.warnings.iter().any(|w| w.contains("no trigger")));
        assert!(report.warnings.iter().any(|w| w.contains("ghost")));
    }

    #[test]
    fn test_warnings_for_extra_trigger_and_unreachable_node() {
        let g = graph(
            vec![node("1", "trigger"), node("2", "trigger"), node("3", "http")],
            &[],
        );
        let report = validate_graph(&g).unwrap();
        assert!(report.warnings.iter().any(|w| w.contains("only '1'")));
        assert!(report.warnings.iter().any(|w| w.contains("node '3'")));
    }

    #[test]
    fn test_reachable_skips_missing_targets() {
        let g = graph(
            vec![node("1", "trigger"), node("2", "http")],
            &[("1", "2"), ("1", "missing")],
        );
        let reachable = reachable_from(&g, "1");
        assert_eq!(reachable.len(), 2);
        assert!(!reachable.contains("missing"));
    }
}
