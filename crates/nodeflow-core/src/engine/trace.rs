//! Execution trace recording.
//!
//! The trace is append-only and in visit order. Every change (a new `running`
//! record, or a record reaching its terminal state) is pushed to a `watch`
//! channel so a front-end can re-render the whole list while the run is in
//! flight.

use std::time::Instant;

use chrono::Utc;
use nodeflow_types::trace::ExecutionRecord;
use tokio::sync::watch;

/// Handle to the `running` record of the node currently being visited.
#[derive(Debug)]
pub struct RecordHandle {
    index: usize,
    started: Instant,
}

impl RecordHandle {
    /// Milliseconds since the record was started.
    pub fn elapsed_millis(&self) -> u64 {
        self.started.elapsed().as_millis() as u64
    }
}

/// Owns the trace of one run and publishes snapshots of it.
pub struct TraceRecorder {
    records: Vec<ExecutionRecord>,
    tx: watch::Sender<Vec<ExecutionRecord>>,
}

impl TraceRecorder {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(Vec::new());
        Self {
            records: Vec::new(),
            tx,
        }
    }

    /// Receive a snapshot of the trace after every change.
    pub fn subscribe(&self) -> watch::Receiver<Vec<ExecutionRecord>> {
        self.tx.subscribe()
    }

    /// Append a `running` record for a node visit.
    pub fn start(&mut self, node_id: &str, node_name: &str) -> RecordHandle {
        let started = Instant::now();
        self.records
            .push(ExecutionRecord::running(node_id, node_name, Utc::now()));
        self.publish();
        RecordHandle {
            index: self.records.len() - 1,
            started,
        }
    }

    /// Mark the record `success` with its serialized output. Returns the duration.
    pub fn complete(&mut self, handle: RecordHandle, output: String) -> u64 {
        let duration = handle.elapsed_millis();
        if let Some(record) = self.records.get_mut(handle.index) {
            if let Err(e) = record.succeed(duration, output) {
                tracing::warn!(node_id = record.node_id.as_str(), error = %e, "record already finished");
            }
        }
        self.publish();
        duration
    }

    /// Mark the record `error` with a message. Returns the duration.
    pub fn fail(&mut self, handle: RecordHandle, error: String) -> u64 {
        let duration = handle.elapsed_millis();
        if let Some(record) = self.records.get_mut(handle.index) {
            if let Err(e) = record.fail(duration, error) {
                tracing::warn!(node_id = record.node_id.as_str(), error = %e, "record already finished");
            }
        }
        self.publish();
        duration
    }

    pub fn records(&self) -> &[ExecutionRecord] {
        &self.records
    }

    /// Consume the recorder and return the final trace.
    pub fn finish(self) -> Vec<ExecutionRecord> {
        self.records
    }

    fn publish(&self) {
        self.tx.send_replace(self.records.clone());
    }
}

impl Default for TraceRecorder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nodeflow_types::trace::ExecutionStatus;

    #[test]
    fn test_start_then_complete() {
        let mut recorder = TraceRecorder::new();
        let handle = recorder.start("1", "Start");
        assert_eq!(recorder.records()[0].status, ExecutionStatus::Running);

        recorder.complete(handle, "{}".to_string());
        let records = recorder.finish();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].status, ExecutionStatus::Success);
        assert_eq!(records[0].output.as_deref(), Some("{}"));
        assert!(records[0].duration_millis.is_some());
    }

    #[test]
    fn test_fail_sets_error() {
        let mut recorder = TraceRecorder::new();
        let handle = recorder.start("2", "Shape");
        recorder.fail(handle, "Transform failed: x".to_string());
        let record = &recorder.records()[0];
        assert_eq!(record.status, ExecutionStatus::Error);
        assert_eq!(record.error.as_deref(), Some("Transform failed: x"));
        assert!(record.output.is_none());
    }

    #[test]
    fn test_subscriber_sees_each_change() {
        let mut recorder = TraceRecorder::new();
        let mut rx = recorder.subscribe();
        assert!(rx.borrow_and_update().is_empty());

        let handle = recorder.start("1", "Start");
        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update()[0].status, ExecutionStatus::Running);

        recorder.complete(handle, "null".to_string());
        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update()[0].status, ExecutionStatus::Success);
    }

    #[test]
    fn test_records_keep_visit_order() {
        let mut recorder = TraceRecorder::new();
        for id in ["1", "2", "3"] {
            let handle = recorder.start(id, id);
            recorder.complete(handle, "null".to_string());
        }
        let ids: Vec<_> = recorder.records().iter().map(|r| r.node_id.as_str()).collect();
        assert_eq!(ids, ["1", "2", "3"]);
    }
}
