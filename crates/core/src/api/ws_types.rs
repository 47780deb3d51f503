//! Streaming API frame types (spec.md §6.2).

use serde::{Deserialize, Serialize};

use crate::types::{LogRecord, MissionId, MissionStatus, StepId};

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    #[serde(rename = "client:message")]
    Message { content: String },
    #[serde(rename = "client:confirm_plan")]
    ConfirmPlan { plan_id: String, approved_step_ids: Vec<StepId> },
    #[serde(rename = "client:stop")]
    Stop { mission_id: MissionId, run_id: Option<MissionId> },
    #[serde(rename = "client:ping")]
    Ping,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PlanStepView {
    #[serde(rename = "step")]
    Step { id: StepId, tool: String, args: String, enabled: bool },
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum ServerMessage {
    #[serde(rename = "server:connected")]
    Connected,
    #[serde(rename = "server:agent_thought")]
    AgentThought { status: String, log: LogRecord },
    #[serde(rename = "server:plan_proposal")]
    PlanProposal {
        plan_id: String,
        intent: String,
        steps: Vec<PlanStepView>,
    },
    #[serde(rename = "server:job_log")]
    JobLog { mission_id: MissionId, log: LogRecord },
    #[serde(rename = "server:job_status")]
    JobStatus { mission_id: MissionId, run_id: Option<MissionId>, status: MissionStatus },
    #[serde(rename = "server:error")]
    Error { message: String },
    #[serde(rename = "server:pong")]
    Pong,
}
