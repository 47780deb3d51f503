//! Findings and observations (spec.md §3, §4.2).

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Low,
    Medium,
    High,
    Critical,
}

/// A security finding produced during observation parsing (spec.md §3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    pub severity: Severity,
    pub kind: String,
    pub host: String,
    pub location: String,
    pub evidence: String,
    pub remediation: String,
    pub source_tool: String,
}

/// A discovered host record, fed back into the topology sink and re-entering
/// scope admission before any later use (spec.md §3, invariant I4).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostRecord {
    pub hostname: String,
    pub source_tool: String,
}

/// A discovered open-port/service record, fed into the topology sink.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortRecord {
    pub host: String,
    pub port: u16,
    pub service: Option<String>,
}

/// Topology deltas produced by observation parsing (spec.md §3, §4.2).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TopologyDelta {
    pub hosts: Vec<HostRecord>,
    pub ports: Vec<PortRecord>,
}

/// Structured result of executing one tool invocation (spec.md §3, Glossary).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Observation {
    pub raw_output: String,
    pub exit_status: i32,
    pub findings: Vec<Finding>,
    pub topology: TopologyDelta,
    pub kind: ObservationKind,
    pub metadata: HashMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObservationKind {
    Success,
    ToolError,
    SandboxError,
}

impl Observation {
    pub fn success(raw_output: String, exit_status: i32) -> Self {
        Self {
            raw_output,
            exit_status,
            findings: Vec::new(),
            topology: TopologyDelta::default(),
            kind: ObservationKind::Success,
            metadata: HashMap::new(),
        }
    }

    pub fn error(kind: ObservationKind, message: impl Into<String>) -> Self {
        Self {
            raw_output: String::new(),
            exit_status: -1,
            findings: Vec::new(),
            topology: TopologyDelta::default(),
            kind,
            metadata: HashMap::from([("error".to_string(), message.into())]),
        }
    }

    /// One-line summary appended to the mission log (spec.md §4.4 step 5).
    pub fn summary(&self) -> String {
        match self.kind {
            ObservationKind::Success => format!(
                "exit={} findings={} hosts={} ports={} output_bytes={}",
                self.exit_status,
                self.findings.len(),
                self.topology.hosts.len(),
                self.topology.ports.len(),
                self.raw_output.len()
            ),
            ObservationKind::ToolError => format!(
                "tool exited non-zero: {}",
                self.metadata.get("error").cloned().unwrap_or_default()
            ),
            ObservationKind::SandboxError => format!(
                "sandbox error: {}",
                self.metadata.get("error").cloned().unwrap_or_default()
            ),
        }
    }
}
