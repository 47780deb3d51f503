//! Control API request/response DTOs (spec.md §6.1).

use serde::{Deserialize, Serialize};

use crate::types::{LogRecord, MissionId, StepId};

#[derive(Debug, Deserialize)]
pub struct StartMissionRequest {
    pub prompt: String,
}

#[derive(Debug, Serialize)]
pub struct StartMissionResponse {
    pub mission_id: MissionId,
    pub run_id: MissionId,
    pub status: &'static str,
}

#[derive(Debug, Serialize)]
pub struct MissionResponse {
    pub id: MissionId,
    pub status: String,
    pub logs: Vec<LogRecord>,
}

#[derive(Debug, Deserialize, Default)]
pub struct StopRequest {
    pub run_id: Option<MissionId>,
}

#[derive(Debug, Deserialize)]
pub struct ApproveRequest {
    pub approved_step_ids: Vec<StepId>,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

impl ErrorResponse {
    pub fn new(code: &str, error: impl Into<String>) -> Self {
        Self { error: error.into(), code: code.to_string() }
    }
}
