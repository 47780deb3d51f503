//! Append-only mission log (spec.md §3, invariant I3).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Finding, MissionStatus};

/// The kind of a log record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", content = "payload", rename_all = "snake_case")]
pub enum LogPayload {
    /// Control-plane events: signals received, admission checks, loop verdicts.
    Control(String),
    Plan {
        reasoning: String,
        step_count: usize,
    },
    Thought {
        reasoning: String,
        status_update: String,
    },
    ToolDispatch {
        step_id: String,
        tool: String,
        argument: String,
    },
    ToolOutput {
        step_id: String,
        summary: String,
    },
    Finding(Finding),
    Error {
        code: String,
        message: String,
    },
    Status(MissionStatus),
}

/// A single, monotonically-indexed entry in a mission's append-only log
/// (invariant I3: indices are dense and strictly increasing).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogRecord {
    pub index: u64,
    pub timestamp: DateTime<Utc>,
    pub payload: LogPayload,
}

impl LogRecord {
    pub fn new(index: u64, payload: LogPayload) -> Self {
        Self {
            index,
            timestamp: Utc::now(),
            payload,
        }
    }
}
