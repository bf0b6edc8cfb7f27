//! Messages exchanged between workers and the coordinator.
//!
//! Field names on the wire are `Type`, `Id`, `Files` and `NReduce`.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Tag carried by both reports and assignments.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum TaskKind {
    /// Nothing to report. Only meaningful in a [`TaskReport`].
    None,
    Map,
    Reduce,
    /// No task is ready; poll again later.
    Sleep,
    /// The job is finished.
    Exit,
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// What a worker tells the coordinator about the task it just finished.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TaskReport {
    #[serde(rename = "Type")]
    pub kind: TaskKind,
    #[serde(rename = "Id")]
    pub id: usize,
    /// For a map report, indexed by reduce bucket; an empty entry means the
    /// bucket received nothing. For a reduce report, the output artifact.
    #[serde(rename = "Files")]
    pub files: Vec<String>,
}

impl TaskReport {
    /// The report sent on first contact and after a sleep or a failed attempt.
    pub fn none() -> Self {
        Self {
            kind: TaskKind::None,
            id: 0,
            files: Vec::new(),
        }
    }

    pub fn map(id: usize, files: Vec<String>) -> Self {
        Self {
            kind: TaskKind::Map,
            id,
            files,
        }
    }

    pub fn reduce(id: usize, output: String) -> Self {
        Self {
            kind: TaskKind::Reduce,
            id,
            files: vec![output],
        }
    }
}

/// The coordinator's answer to a report.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TaskAssignment {
    #[serde(rename = "Type")]
    pub kind: TaskKind,
    #[serde(rename = "Id")]
    pub id: usize,
    /// The single input for a map task, or every intermediate artifact
    /// collected so far for a reduce task.
    #[serde(rename = "Files")]
    pub files: Vec<String>,
    /// Number of reduce buckets. Only set on map assignments.
    #[serde(rename = "NReduce")]
    pub n_reduce: usize,
}

impl TaskAssignment {
    pub fn sleep() -> Self {
        Self::bare(TaskKind::Sleep)
    }

    pub fn exit() -> Self {
        Self::bare(TaskKind::Exit)
    }

    fn bare(kind: TaskKind) -> Self {
        Self {
            kind,
            id: 0,
            files: Vec::new(),
            n_reduce: 0,
        }
    }
}

/// One record emitted by a map transform.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
pub struct KeyValue {
    #[serde(rename = "Key")]
    pub key: String,
    #[serde(rename = "Value")]
    pub value: String,
}

impl KeyValue {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_uses_wire_field_names() {
        let r = TaskReport::map(3, vec!["mr-3-0".into(), String::new()]);
        let v = serde_json::to_value(&r).unwrap();
        assert_eq!(
            v,
            serde_json::json!({"Type": "Map", "Id": 3, "Files": ["mr-3-0", ""]})
        );
    }

    #[test]
    fn assignment_uses_wire_field_names() {
        let a: TaskAssignment = serde_json::from_str(
            r#"{"Type": "Reduce", "Id": 1, "Files": ["mr-0-1", "mr-2-1"], "NReduce": 0}"#,
        )
        .unwrap();
        assert_eq!(a.kind, TaskKind::Reduce);
        assert_eq!(a.id, 1);
        assert_eq!(a.files.len(), 2);
    }

    #[test]
    fn unknown_kind_is_rejected() {
        let r = serde_json::from_str::<TaskAssignment>(
            r#"{"Type": "Shuffle", "Id": 0, "Files": [], "NReduce": 0}"#,
        );
        assert!(r.is_err());
    }
}
