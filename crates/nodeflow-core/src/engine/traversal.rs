//! Traversal engine: depth-first execution of a graph from its trigger.
//!
//! # Execution flow
//!
//! 1. Pick the entry node (first `trigger` in node order). None means an empty run.
//! 2. Reject the run if a cycle is reachable from the entry node.
//! 3. Visit nodes depth-first. Each visit appends a `running` record, waits
//!    the configured node delay, dispatches the node, then finalizes the record.
//! 4. On success, successors are visited in edge order with the node's output
//!    as their input. A failed node or a filtered branch stops its subtree only.
//! 5. Cancellation marks the in-flight record as failed and stops the run.
//!
//! Fan-in nodes are visited once per incoming path.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use nodeflow_types::config::EngineConfig;
use nodeflow_types::event::RunEvent;
use nodeflow_types::graph::{Graph, Node};
use nodeflow_types::trace::ExecutionRecord;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::event::bus::EventBus;
use crate::graph::validate::find_reachable_cycle;

use super::dispatch::{HttpFetcher, NodeDispatcher, NodeError, NodeOutput};
use super::trace::TraceRecorder;

/// Errors that prevent a run from starting.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("cycle reachable from entry node: {0}")]
    CycleDetected(String),

    /// A run is already in progress on this engine.
    #[error("a run is already in progress")]
    AlreadyRunning,
}

/// Result of a completed (or cancelled) run.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub run_id: Uuid,
    /// One record per node visit, in visit order.
    pub trace: Vec<ExecutionRecord>,
    /// The entry node's own output; `None` if there was no entry node or it failed.
    pub output: Option<Value>,
    pub cancelled: bool,
}

/// Releases the single-run guard on drop.
struct RunGuard<'a>(&'a AtomicBool);

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Depth-first graph executor.
///
/// Generic over `F: HttpFetcher` so tests can run without a network.
pub struct TraversalEngine<F> {
    dispatcher: NodeDispatcher<F>,
    event_bus: EventBus,
    node_delay: Duration,
    running: AtomicBool,
}

impl<F: HttpFetcher> TraversalEngine<F> {
    pub fn new(fetcher: Arc<F>, event_bus: EventBus, config: &EngineConfig) -> Self {
        Self {
            dispatcher: NodeDispatcher::new(fetcher)
                .with_default_http_url(config.default_http_url.clone()),
            event_bus,
            node_delay: config.node_delay(),
            running: AtomicBool::new(false),
        }
    }

    /// Override the pause before each node is dispatched.
    pub fn with_node_delay(mut self, delay: Duration) -> Self {
        self.node_delay = delay;
        self
    }

    /// Run a graph with a fresh recorder and no cancellation.
    pub async fn execute(&self, graph: &Graph) -> Result<RunOutcome, EngineError> {
        self.run(graph, TraceRecorder::new(), CancellationToken::new())
            .await
    }

    /// Run a graph, recording into `recorder`.
    ///
    /// Subscribe to the recorder before calling to observe records as they change.
    pub async fn run(
        &self,
        graph: &Graph,
        mut recorder: TraceRecorder,
        cancel: CancellationToken,
    ) -> Result<RunOutcome, EngineError> {
        if self
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(EngineError::AlreadyRunning);
        }
        let _guard = RunGuard(&self.running);

        let run_id = Uuid::now_v7();
        let run_start = Instant::now();

        let Some(entry) = graph.entry_node() else {
            tracing::info!(%run_id, "graph has no trigger node, nothing to run");
            return Ok(RunOutcome {
                run_id,
                trace: recorder.finish(),
                output: None,
                cancelled: false,
            });
        };

        find_reachable_cycle(graph, &entry.id)
            .map_err(|e| EngineError::CycleDetected(e.to_string()))?;

        let observers = self.event_bus.publish(RunEvent::RunStarted {
            run_id,
            entry_node_id: entry.id.clone(),
        });
        tracing::info!(%run_id, entry = entry.id.as_str(), observers, "run started");

        let mut stack: Vec<(&Node, Value)> = vec![(entry, Value::Null)];
        let mut entry_output = None;
        let mut entry_visited = false;
        let mut nodes_visited: u32 = 0;
        let mut cancelled = false;

        while let Some((node, input)) = stack.pop() {
            if cancel.is_cancelled() {
                cancelled = true;
                break;
            }

            let is_entry = !entry_visited;
            entry_visited = true;
            nodes_visited += 1;

            let handle = recorder.start(&node.id, &node.name);
            self.event_bus.publish(RunEvent::NodeStarted {
                run_id,
                node_id: node.id.clone(),
                node_name: node.name.clone(),
                node_type: node.kind.type_name().to_string(),
            });
            tracing::debug!(node_id = node.id.as_str(), node_type = node.kind.type_name(), "visiting node");

            match self.visit(node, &input, &cancel).await {
                Ok(output) => {
                    let value = output.to_value();
                    let duration_ms = recorder.complete(handle, format!("{value:#}"));
                    self.event_bus.publish(RunEvent::NodeCompleted {
                        run_id,
                        node_id: node.id.clone(),
                        node_name: node.name.clone(),
                        duration_ms,
                    });
                    tracing::debug!(node_id = node.id.as_str(), duration_ms, "node completed");

                    if output.propagates() {
                        push_successors(graph, node, &value, &mut stack);
                    }
                    if is_entry {
                        entry_output = Some(value);
                    }
                }
                Err(e) => {
                    let message = e.to_string();
                    recorder.fail(handle, message.clone());
                    self.event_bus.publish(RunEvent::NodeFailed {
                        run_id,
                        node_id: node.id.clone(),
                        node_name: node.name.clone(),
                        error: message.clone(),
                    });

                    if e == NodeError::Cancelled {
                        cancelled = true;
                        break;
                    }
                    tracing::warn!(node_id = node.id.as_str(), error = message.as_str(), "node failed");
                }
            }
        }

        let duration_ms = run_start.elapsed().as_millis() as u64;
        self.event_bus.publish(RunEvent::RunCompleted {
            run_id,
            duration_ms,
            nodes_visited,
            cancelled,
        });
        tracing::info!(%run_id, nodes_visited, duration_ms, cancelled, "run finished");

        Ok(RunOutcome {
            run_id,
            trace: recorder.finish(),
            output: entry_output,
            cancelled,
        })
    }

    /// Delay, then dispatch; either step yields to cancellation.
    async fn visit(
        &self,
        node: &Node,
        input: &Value,
        cancel: &CancellationToken,
    ) -> Result<NodeOutput, NodeError> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(NodeError::Cancelled),
            _ = tokio::time::sleep(self.node_delay) => {}
        }

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(NodeError::Cancelled),
            result = self.dispatcher.run(&node.kind, input) => result,
        }
    }
}

/// Push successors in reverse edge order so the first edge is visited first.
fn push_successors<'g>(
    graph: &'g Graph,
    node: &Node,
    value: &Value,
    stack: &mut Vec<(&'g Node, Value)>,
) {
    let successors: Vec<&Node> = graph
        .neighbors(&node.id)
        .into_iter()
        .filter_map(|edge| {
            let target = graph.node(&edge.target);
            if target.is_none() {
                tracing::warn!(
                    source = edge.source.as_str(),
                    target = edge.target.as_str(),
                    "edge target not found, skipping"
                );
            }
            target
        })
        .collect();

    for successor in successors.into_iter().rev() {
        stack.push((successor, value.clone()));
    }
}
