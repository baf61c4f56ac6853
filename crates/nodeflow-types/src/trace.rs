//! Execution trace records.
//!
//! One `ExecutionRecord` is created per node visit. It starts `running` and
//! transitions exactly once more, to `success` or `error`. The ordered list of
//! records for a run is its trace.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ModelError;

/// Lifecycle state of a single node visit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    Running,
    Success,
    Error,
}

impl ExecutionStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ExecutionStatus::Running)
    }
}

impl fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutionStatus::Running => write!(f, "running"),
            ExecutionStatus::Success => write!(f, "success"),
            ExecutionStatus::Error => write!(f, "error"),
        }
    }
}

/// One node visit within a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionRecord {
    pub node_id: String,
    /// Display name at the time of the visit.
    pub node_name: String,
    pub status: ExecutionStatus,
    /// Set when the record enters `running`. Serialized with millisecond precision.
    #[serde(with = "rfc3339_millis")]
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_millis: Option<u64>,
    /// Pretty-printed JSON of the node's output. Present only on success.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    /// Failure message. Present only on error.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ExecutionRecord {
    /// Create a record in the `running` state.
    pub fn running(
        node_id: impl Into<String>,
        node_name: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            node_id: node_id.into(),
            node_name: node_name.into(),
            status: ExecutionStatus::Running,
            timestamp,
            duration_millis: None,
            output: None,
            error: None,
        }
    }

    /// Transition `running -> success`.
    pub fn succeed(&mut self, duration_millis: u64, output: String) -> Result<(), ModelError> {
        self.ensure_running()?;
        self.status = ExecutionStatus::Success;
        self.duration_millis = Some(duration_millis);
        self.output = Some(output);
        Ok(())
    }

    /// Transition `running -> error`.
    pub fn fail(&mut self, duration_millis: u64, error: String) -> Result<(), ModelError> {
        self.ensure_running()?;
        self.status = ExecutionStatus::Error;
        self.duration_millis = Some(duration_millis);
        self.error = Some(error);
        Ok(())
    }

    fn ensure_running(&self) -> Result<(), ModelError> {
        if self.status.is_terminal() {
            return Err(ModelError::RecordAlreadyTerminal(self.node_id.clone()));
        }
        Ok(())
    }
}

mod rfc3339_millis {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(ts: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&ts.to_rfc3339_opts(SecondsFormat::Millis, true))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        DateTime::<Utc>::deserialize(deserializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_display_matches_wire_name() {
        for status in [
            ExecutionStatus::Running,
            ExecutionStatus::Success,
            ExecutionStatus::Error,
        ] {
            let wire = serde_json::to_value(status).unwrap();
            assert_eq!(wire, serde_json::Value::String(status.to_string()));
        }
    }

    #[test]
    fn record_transitions_once() {
        let mut record = ExecutionRecord::running("1", "Start", Utc::now());
        assert_eq!(record.status, ExecutionStatus::Running);

        record.succeed(12, "{}".to_string()).unwrap();
        assert_eq!(record.status, ExecutionStatus::Success);
        assert_eq!(record.duration_millis, Some(12));
        assert_eq!(record.output.as_deref(), Some("{}"));
        assert!(record.error.is_none());

        let err = record.fail(13, "late".to_string()).unwrap_err();
        assert_eq!(err, ModelError::RecordAlreadyTerminal("1".to_string()));
        assert_eq!(record.status, ExecutionStatus::Success);
    }

    #[test]
    fn failed_record_has_no_output() {
        let mut record = ExecutionRecord::running("2", "Fetch", Utc::now());
        record.fail(5, "HTTP request failed: boom".to_string()).unwrap();
        assert_eq!(record.status, ExecutionStatus::Error);
        assert!(record.output.is_none());
        assert_eq!(record.error.as_deref(), Some("HTTP request failed: boom"));
    }

    #[test]
    fn record_serializes_camel_case() {
        let mut record = ExecutionRecord::running("1", "Start", Utc::now());
        record.succeed(3, "null".to_string()).unwrap();
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["nodeId"], "1");
        assert_eq!(value["nodeName"], "Start");
        assert_eq!(value["status"], "success");
        assert_eq!(value["durationMillis"], 3);
        assert!(value.get("error").is_none());
    }

    #[test]
    fn timestamp_serializes_to_milliseconds() {
        let ts = DateTime::parse_from_rfc3339("2026-01-02T03:04:05.123456789Z")
            .unwrap()
            .with_timezone(&Utc);
        let record = ExecutionRecord::running("1", "Start", ts);

        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["timestamp"], "2026-01-02T03:04:05.123Z");

        let back: ExecutionRecord = serde_json::from_value(value).unwrap();
        assert_eq!(back.timestamp.timestamp_millis(), ts.timestamp_millis());
    }
}
