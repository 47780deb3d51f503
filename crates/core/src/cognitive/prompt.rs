//! Four-block prompt assembly (spec.md §4.3).

use async_trait::async_trait;
use std::collections::HashMap;

use crate::types::{LogPayload, LogRecord, Mission, ToolDefinition};

/// Default number of recent log records folded into the memory block
/// (spec.md §4.3).
pub const DEFAULT_MEMORY_WINDOW: usize = 5;

/// The retrieval-augmented corpus is an external, read-only semantic-search
/// collaborator (spec.md §1); this trait is the seam for it.
#[async_trait]
pub trait RetrievalCorpus: Send + Sync {
    async fn top_k(&self, objective: &str, k: usize) -> Vec<String>;
}

/// No-op corpus used when no retrieval backend is configured.
pub struct NullCorpus;

#[async_trait]
impl RetrievalCorpus for NullCorpus {
    async fn top_k(&self, _objective: &str, _k: usize) -> Vec<String> {
        Vec::new()
    }
}

const IDENTITY_BLOCK: &str = "\
You are an autonomous security assessor. You are never destructive. You \
never act outside the stated scope. Every conclusion must be evidence-based, \
grounded in tool output you have actually observed. Prefer the minimum \
number of steps that accomplishes the objective. Respond with a single JSON \
object only — no narrative text, no markdown fences unless explicitly \
requested. Every structured field is required even when empty (e.g. \
`findings: []`).";

fn memory_block(log: &[LogRecord], window: usize, retrieved: &[String]) -> String {
    let mut lines = Vec::new();
    for record in log
        .iter()
        .rev()
        .filter(|r| matches!(r.payload, LogPayload::Thought { .. } | LogPayload::ToolOutput { .. }))
        .take(window)
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
    {
        let (kind, content) = match &record.payload {
            LogPayload::Thought {
                reasoning,
                status_update,
            } => ("thought", format!("{status_update} — {reasoning}")),
            LogPayload::ToolOutput { step_id, summary } => {
                ("tool-output", format!("step {step_id}: {summary}"))
            }
            _ => unreachable!(),
        };
        lines.push(format!("Step {} [{kind}]: {content}", record.index));
    }
    if !retrieved.is_empty() {
        lines.push("Relevant retrieved context:".to_string());
        for passage in retrieved {
            lines.push(format!("- {passage}"));
        }
    }
    lines.join("\n")
}

fn tools_block(tools: &HashMap<String, ToolDefinition>) -> String {
    tools
        .values()
        .map(|t| {
            let params = t
                .parameters
                .iter()
                .map(|p| format!("{}:{:?}{}", p.name, p.param_type, if p.required { "" } else { "?" }))
                .collect::<Vec<_>>()
                .join(", ");
            format!("- {} ({}): {}", t.name, params, t.description)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn goal_block(mission: &Mission) -> String {
    let allowed = mission
        .scope
        .allowed
        .iter()
        .map(|p| format!("{p:?}"))
        .collect::<Vec<_>>()
        .join(", ");
    let excluded = mission
        .scope
        .excluded
        .iter()
        .map(|p| format!("{p:?}"))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "Objective: {}\nAllowed targets: [{}]\nExcluded targets: [{}]\nRemaining budget: steps={} cost_cents={} wall_clock_remaining={:?}",
        mission.objective,
        allowed,
        excluded,
        mission.budget_policy.max_steps.saturating_sub(mission.usage.steps_consumed),
        mission.budget_policy.max_cost_cents.saturating_sub(mission.usage.cost_accumulated_cents),
        mission.budget_policy.max_wall_clock.saturating_sub(mission.wall_clock_elapsed()),
    )
}

/// Assemble the four blocks, concatenated in fixed order (spec.md §4.3).
pub async fn assemble_prompt(
    mission: &Mission,
    tools: &HashMap<String, ToolDefinition>,
    corpus: &dyn RetrievalCorpus,
    memory_window: usize,
) -> String {
    let retrieved = corpus.top_k(&mission.objective, 3).await;
    format!(
        "{IDENTITY_BLOCK}\n\n## Memory\n{}\n\n## Tools\n{}\n\n## Goal & Scope\n{}",
        memory_block(&mission.log, memory_window, &retrieved),
        tools_block(tools),
        goal_block(mission),
    )
}
