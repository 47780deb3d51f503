//! Cognitive Engine (spec.md §4.3): the reason step of the reason-act-observe
//! loop. Wraps the LLM transport with prompt assembly and structured-response
//! validation, retrying once on a validation failure with the error folded
//! back into the prompt (spec.md §4.3 "Validate").

pub mod inference;
pub mod llm_client;
pub mod prompt;
pub mod validation;

use std::collections::HashMap;

pub use inference::{CompletionResponse, Decision, InferenceError, PlanResponse};
pub use llm_client::{InferenceProvider, LlmClient, LlmConfig};
pub use prompt::{assemble_prompt, NullCorpus, RetrievalCorpus, DEFAULT_MEMORY_WINDOW};
pub use validation::{validate_decision, ValidationError};

use crate::types::{Mission, PlanStep, StepId, ToolDefinition};

#[derive(Debug, thiserror::Error)]
pub enum CognitiveError {
    #[error(transparent)]
    Inference(#[from] InferenceError),
    #[error("response failed validation twice: {0}")]
    Validation(#[from] ValidationError),
    #[error("plan response was not valid JSON: {0}")]
    MalformedPlan(String),
}

/// Drives `Plan` and `Think` against a configured LLM transport
/// (spec.md §4.3 public contract).
pub struct CognitiveEngine {
    client: Box<dyn InferenceProvider>,
    corpus: Box<dyn RetrievalCorpus>,
    memory_window: usize,
}

impl CognitiveEngine {
    pub fn new(client: impl InferenceProvider + 'static) -> Self {
        Self {
            client: Box::new(client),
            corpus: Box::new(NullCorpus),
            memory_window: DEFAULT_MEMORY_WINDOW,
        }
    }

    pub fn with_corpus(mut self, corpus: Box<dyn RetrievalCorpus>) -> Self {
        self.corpus = corpus;
        self
    }

    /// `Plan(objective, tools) -> plan`: a single LLM call producing an
    /// ordered, disableable step sequence (spec.md §4.3).
    pub async fn plan(
        &self,
        mission: &Mission,
        tools: &HashMap<String, ToolDefinition>,
    ) -> Result<(String, Vec<PlanStep>), CognitiveError> {
        let prompt = assemble_prompt(mission, tools, self.corpus.as_ref(), self.memory_window).await;
        let prompt = format!(
            "{prompt}\n\nProduce a plan: {{\"reasoning\": string, \"steps\": [{{\"id\": string, \"tool\": string, \"argument\": string, \"description\": string, \"enabled\": true}}]}}"
        );
        let completion = self.client.complete(&prompt).await?;
        let response: PlanResponse = serde_json::from_str(strip_fences(&completion.content))
            .map_err(|e| CognitiveError::MalformedPlan(e.to_string()))?;

        // Steps referencing unknown tools are dropped here rather than left
        // for dispatch-time rejection (spec.md §4.3 Plan: "steps referencing
        // unknown tools are dropped with a logged warning").
        let steps = response
            .steps
            .into_iter()
            .filter(|step| {
                let known = tools.contains_key(&step.tool);
                if !known {
                    tracing::warn!(tool = %step.tool, step_id = %step.id, "dropping plan step: unknown tool");
                }
                known
            })
            .collect();
        Ok((response.reasoning, steps))
    }

    /// `Think(objective, history, tools) -> decision`, with one corrective
    /// retry on a validation failure (spec.md §4.3).
    pub async fn think(
        &self,
        mission: &Mission,
        tools: &HashMap<String, ToolDefinition>,
    ) -> Result<Decision, CognitiveError> {
        let base_prompt = assemble_prompt(mission, tools, self.corpus.as_ref(), self.memory_window).await;

        let first = self.client.complete(&base_prompt).await?;
        match validate_decision(&first.content, tools) {
            Ok(decision) => Ok(decision),
            Err(first_err) => {
                let retry_prompt = format!(
                    "{base_prompt}\n\nYour previous response failed validation: {first_err}. \
                     Respond again with a single corrected JSON object only."
                );
                let second = self.client.complete(&retry_prompt).await?;
                Ok(validate_decision(&second.content, tools)?)
            }
        }
    }
}

fn strip_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    if let Some(rest) = trimmed.strip_prefix("```") {
        let rest = rest.strip_prefix("json").unwrap_or(rest);
        if let Some(body) = rest.strip_suffix("```") {
            return body.trim();
        }
    }
    trimmed
}

/// A step identifier generator local to plan assembly, so tests and the
/// workflow don't depend on the LLM supplying well-formed ids.
pub fn next_step_id(index: usize) -> StepId {
    StepId(format!("step-{index}"))
}
