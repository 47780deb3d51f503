//! Structured response types for the cognitive engine (spec.md §4.3).

use serde::{Deserialize, Serialize};

use crate::types::{Finding, PlanStep};

/// Output of `Plan(objective, tools)`: one LLM call (spec.md §4.3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanResponse {
    pub reasoning: String,
    pub steps: Vec<PlanStep>,
}

/// Output of `Think(objective, history, tools)`: exactly one of
/// `{tool_call, is_complete, findings}` (spec.md §4.3, §9: represented as a
/// tagged variant rather than optional fields, so exhaustiveness is
/// compile-time checkable).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "decision_type", rename_all = "snake_case")]
pub enum Decision {
    ToolCall {
        tool: String,
        arguments: String,
        reasoning: String,
        status_update: String,
    },
    Complete {
        reasoning: String,
        status_update: String,
    },
    Findings {
        findings: Vec<Finding>,
        reasoning: String,
        status_update: String,
    },
}

impl Decision {
    pub fn status_update(&self) -> &str {
        match self {
            Decision::ToolCall { status_update, .. } => status_update,
            Decision::Complete { status_update, .. } => status_update,
            Decision::Findings { status_update, .. } => status_update,
        }
    }

    pub fn reasoning(&self) -> &str {
        match self {
            Decision::ToolCall { reasoning, .. } => reasoning,
            Decision::Complete { reasoning, .. } => reasoning,
            Decision::Findings { reasoning, .. } => reasoning,
        }
    }
}

/// A raw chat-completion response from the LLM transport.
#[derive(Debug, Clone)]
pub struct CompletionResponse {
    pub content: String,
}

#[derive(Debug, thiserror::Error)]
pub enum InferenceError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("provider returned an error: {0}")]
    Provider(String),
}
