//! HTTP JSON LLM transport (spec.md §6.3: "LLM endpoint URL, API key, model
//! name (single)"). The provider is an external HTTP JSON chat endpoint
//! (spec.md §1); this client speaks the OpenAI-compatible chat-completions
//! shape, which covers the common self-hosted and gateway deployments.

use super::inference::{CompletionResponse, InferenceError};

/// The cognitive engine's transport seam (spec.md §10.4): `LlmClient` is the
/// real HTTP-backed implementation; tests substitute a fake that returns
/// canned completions with no network involved, the same way `SandboxRunner`
/// decouples tool dispatch from a live process.
#[async_trait::async_trait]
pub trait InferenceProvider: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<CompletionResponse, InferenceError>;
}

/// A single chat message.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ChatMessage {
    pub role: &'static str,
    pub content: String,
}

/// Configuration for the LLM client (spec.md §6.3).
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub endpoint: String,
    pub api_key: String,
    pub model: String,
    /// Low and deterministic by default (spec.md §4.3 Determinism).
    pub temperature: f32,
}

impl LlmConfig {
    /// `LLM_ENDPOINT`, `LLM_API_KEY`, `LLM_MODEL` (spec.md §6.3).
    pub fn from_env() -> Option<Self> {
        Some(Self {
            endpoint: std::env::var("LLM_ENDPOINT").ok()?,
            api_key: std::env::var("LLM_API_KEY").unwrap_or_default(),
            model: std::env::var("LLM_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string()),
            temperature: 0.2,
        })
    }
}

pub struct LlmClient {
    http: reqwest::Client,
    config: LlmConfig,
}

impl LlmClient {
    pub fn new(config: LlmConfig) -> Self {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .build()
            .expect("reqwest client builds with a valid default TLS backend");
        Self { http, config }
    }

    /// Single-turn completion: send the assembled prompt as one user
    /// message, forbidding narrative output (spec.md §4.3 Determinism).
    async fn complete_inner(&self, prompt: &str) -> Result<CompletionResponse, InferenceError> {
        let body = serde_json::json!({
            "model": self.config.model,
            "temperature": self.config.temperature,
            "messages": [
                { "role": "user", "content": prompt }
            ],
        });

        let resp = self
            .http
            .post(&self.config.endpoint)
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| InferenceError::Transport(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(InferenceError::Provider(format!("{status}: {text}")));
        }

        let value: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| InferenceError::Transport(e.to_string()))?;

        let content = value
            .pointer("/choices/0/message/content")
            .and_then(|v| v.as_str())
            .ok_or_else(|| InferenceError::Provider("missing choices[0].message.content".into()))?
            .to_string();

        Ok(CompletionResponse { content })
    }
}

#[async_trait::async_trait]
impl InferenceProvider for LlmClient {
    async fn complete(&self, prompt: &str) -> Result<CompletionResponse, InferenceError> {
        self.complete_inner(prompt).await
    }
}
