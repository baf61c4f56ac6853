//! Run lifecycle events for the nodeflow event bus.
//!
//! `RunEvent` is broadcast while the traversal engine walks a graph. All
//! variants are Clone + Send + Sync for use with tokio broadcast channels.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Events emitted during a graph run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RunEvent {
    /// A run has started from the given entry node.
    RunStarted { run_id: Uuid, entry_node_id: String },

    /// A node visit has started (its record is `running`).
    NodeStarted {
        run_id: Uuid,
        node_id: String,
        node_name: String,
        node_type: String,
    },

    /// A node finished successfully.
    NodeCompleted {
        run_id: Uuid,
        node_id: String,
        node_name: String,
        duration_ms: u64,
    },

    /// A node failed; its subtree will not be visited.
    NodeFailed {
        run_id: Uuid,
        node_id: String,
        node_name: String,
        error: String,
    },

    /// The reachable subgraph has been fully visited (or the run was cancelled).
    RunCompleted {
        run_id: Uuid,
        duration_ms: u64,
        nodes_visited: u32,
        cancelled: bool,
    },
}

impl RunEvent {
    /// The run this event belongs to.
    pub fn run_id(&self) -> Uuid {
        match self {
            RunEvent::RunStarted { run_id, .. }
            | RunEvent::NodeStarted { run_id, .. }
            | RunEvent::NodeCompleted { run_id, .. }
            | RunEvent::NodeFailed { run_id, .. }
            | RunEvent::RunCompleted { run_id, .. } => *run_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_with_type_tag() {
        let event = RunEvent::NodeFailed {
            run_id: Uuid::nil(),
            node_id: "3".to_string(),
            node_name: "Shape".to_string(),
            error: "Transform failed: x".to_string(),
        };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["type"], "node_failed");
        assert_eq!(value["node_id"], "3");
    }

    #[test]
    fn run_id_is_shared_by_all_variants() {
        let id = Uuid::now_v7();
        let events = [
            RunEvent::RunStarted {
                run_id: id,
                entry_node_id: "1".to_string(),
            },
            RunEvent::RunCompleted {
                run_id: id,
                duration_ms: 0,
                nodes_visited: 0,
                cancelled: false,
            },
        ];
        assert!(events.iter().all(|e| e.run_id() == id));
    }
}
