//! Control API route handlers (spec.md §6.1): thin handlers over `Runtime`,
//! following the grounding codebase's `State(Arc<_>)` + `ErrorResponse`
//! handler shape.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Json;

use crate::runtime::Runtime;
use crate::types::{BudgetPolicy, MissionId, ScopePattern, ScopePolicy};

use super::types::{ApproveRequest, ErrorResponse, MissionResponse, StartMissionResponse, StartMissionRequest, StopRequest};

/// Derive a terminal/most-recent status string from the authoritative log
/// (spec.md §6.1 "Status derivation").
fn derive_status(logs: &[crate::types::LogRecord]) -> String {
    use crate::types::LogPayload;
    logs.iter()
        .rev()
        .find_map(|r| match &r.payload {
            LogPayload::Status(s) => Some(format!("{s:?}")),
            _ => None,
        })
        .unwrap_or_else(|| "planning".to_string())
}

/// Naive objective parser: treats the whole prompt as the mission objective
/// and admits any bare hostname/IP token found in it into scope, matching
/// the end-to-end scenarios in spec.md §8 where the objective names its own
/// target inline (e.g. `"subdomain enumeration on example.com"`).
pub(crate) fn scope_from_prompt(prompt: &str) -> ScopePolicy {
    let patterns = prompt
        .split_whitespace()
        .filter_map(|tok| {
            let trimmed = tok.trim_matches(|c: char| !c.is_ascii_alphanumeric() && c != '.' && c != '-');
            crate::kernel::parse_target(trimmed)?;
            Some(ScopePattern::Hostname(format!("*.{trimmed}")))
        })
        .collect::<Vec<_>>();
    ScopePolicy::new(patterns)
}

pub async fn start_mission(
    State(runtime): State<Arc<Runtime>>,
    Json(req): Json<StartMissionRequest>,
) -> Json<StartMissionResponse> {
    let scope = scope_from_prompt(&req.prompt);
    let mission_id = runtime.start_mission(req.prompt, scope, BudgetPolicy::default());
    Json(StartMissionResponse { mission_id, run_id: mission_id, status: "started" })
}

pub async fn get_mission(
    State(runtime): State<Arc<Runtime>>,
    Path(mission_id): Path<MissionId>,
) -> Result<Json<MissionResponse>, (StatusCode, Json<ErrorResponse>)> {
    let logs = runtime
        .log(mission_id, 0)
        .await
        .map_err(|e| (StatusCode::NOT_FOUND, Json(ErrorResponse::new("MISSION_NOT_FOUND", e.to_string()))))?;
    let status = derive_status(&logs);
    Ok(Json(MissionResponse { id: mission_id, status, logs }))
}

pub async fn stop_mission(
    State(runtime): State<Arc<Runtime>>,
    Path(mission_id): Path<MissionId>,
    Json(_req): Json<StopRequest>,
) -> Result<StatusCode, (StatusCode, Json<ErrorResponse>)> {
    runtime
        .cancel(mission_id)
        .await
        .map_err(|e| (StatusCode::NOT_FOUND, Json(ErrorResponse::new("MISSION_NOT_FOUND", e.to_string()))))?;
    Ok(StatusCode::ACCEPTED)
}

pub async fn pause_mission(
    State(runtime): State<Arc<Runtime>>,
    Path(mission_id): Path<MissionId>,
) -> Result<StatusCode, (StatusCode, Json<ErrorResponse>)> {
    runtime
        .pause(mission_id)
        .await
        .map_err(|e| (StatusCode::NOT_FOUND, Json(ErrorResponse::new("MISSION_NOT_FOUND", e.to_string()))))?;
    Ok(StatusCode::ACCEPTED)
}

pub async fn resume_mission(
    State(runtime): State<Arc<Runtime>>,
    Path(mission_id): Path<MissionId>,
) -> Result<StatusCode, (StatusCode, Json<ErrorResponse>)> {
    runtime
        .resume(mission_id)
        .await
        .map_err(|e| (StatusCode::NOT_FOUND, Json(ErrorResponse::new("MISSION_NOT_FOUND", e.to_string()))))?;
    Ok(StatusCode::ACCEPTED)
}

pub async fn approve_mission(
    State(runtime): State<Arc<Runtime>>,
    Path(mission_id): Path<MissionId>,
    Json(req): Json<ApproveRequest>,
) -> Result<StatusCode, (StatusCode, Json<ErrorResponse>)> {
    runtime
        .approve_plan(mission_id, req.approved_step_ids)
        .await
        .map_err(|e| (StatusCode::NOT_FOUND, Json(ErrorResponse::new("MISSION_NOT_FOUND", e.to_string()))))?;
    Ok(StatusCode::ACCEPTED)
}
