//! Runtime configuration (spec.md §6.3 Environment): a TOML file overlaid
//! with environment variables, following the grounding codebase's plain
//! env/TOML `config.rs` rather than pulling in a config-loading crate.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::cognitive::LlmConfig;
use crate::events::DEFAULT_CHANNEL_CAPACITY;
use crate::kernel::{LoopDetectorConfig, DEFAULT_SIMILARITY_THRESHOLD, DEFAULT_WINDOW};
use crate::sandbox::SandboxConfig;
use crate::types::BudgetPolicy;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file at {0}: {1}")]
    Read(String, std::io::Error),
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("LLM endpoint is required (config file `llm.endpoint` or `LLM_ENDPOINT` env var)")]
    MissingLlmEndpoint,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmSection {
    pub endpoint: Option<String>,
    pub api_key: Option<String>,
    pub model: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub llm: LlmSection,
    pub tool_registry_path: Option<String>,
    #[serde(with = "humantime_secs")]
    pub default_budget: BudgetPolicy,
    pub sandbox_memory_cap_mb: u64,
    pub sandbox_cpu_cap_cores: f32,
    pub sandbox_activity_timeout_secs: u64,
    pub event_bridge_capacity: usize,
    pub global_blocklist_extra_suffixes: Vec<String>,
    pub loop_window: usize,
    pub loop_similarity_threshold: f64,
    pub bind_address: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            llm: LlmSection { endpoint: None, api_key: None, model: None },
            tool_registry_path: None,
            default_budget: BudgetPolicy::default(),
            sandbox_memory_cap_mb: 512,
            sandbox_cpu_cap_cores: 0.5,
            sandbox_activity_timeout_secs: 600,
            event_bridge_capacity: DEFAULT_CHANNEL_CAPACITY,
            global_blocklist_extra_suffixes: Vec::new(),
            loop_window: DEFAULT_WINDOW,
            loop_similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

impl Config {
    /// Load from an optional TOML file, then overlay environment variables
    /// (`LLM_ENDPOINT`, `LLM_API_KEY`, `LLM_MODEL`, `SENTRYAI_BIND_ADDRESS`,
    /// `SENTRYAI_TOOL_REGISTRY_PATH`) — env wins (spec.md §6.3).
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(p) if p.exists() => {
                let raw = std::fs::read_to_string(p).map_err(|e| ConfigError::Read(p.display().to_string(), e))?;
                toml::from_str(&raw)?
            }
            _ => Self::default(),
        };

        if let Ok(v) = std::env::var("LLM_ENDPOINT") {
            config.llm.endpoint = Some(v);
        }
        if let Ok(v) = std::env::var("LLM_API_KEY") {
            config.llm.api_key = Some(v);
        }
        if let Ok(v) = std::env::var("LLM_MODEL") {
            config.llm.model = Some(v);
        }
        if let Ok(v) = std::env::var("SENTRYAI_BIND_ADDRESS") {
            config.bind_address = v;
        }
        if let Ok(v) = std::env::var("SENTRYAI_TOOL_REGISTRY_PATH") {
            config.tool_registry_path = Some(v);
        }

        Ok(config)
    }

    pub fn llm_config(&self) -> Result<LlmConfig, ConfigError> {
        Ok(LlmConfig {
            endpoint: self.llm.endpoint.clone().ok_or(ConfigError::MissingLlmEndpoint)?,
            api_key: self.llm.api_key.clone().unwrap_or_default(),
            model: self.llm.model.clone().unwrap_or_else(|| "gpt-4o-mini".to_string()),
            temperature: 0.2,
        })
    }

    pub fn sandbox_config(&self) -> SandboxConfig {
        SandboxConfig {
            memory_cap_mb: self.sandbox_memory_cap_mb,
            cpu_cap_cores: self.sandbox_cpu_cap_cores,
            activity_timeout: Duration::from_secs(self.sandbox_activity_timeout_secs),
            heartbeat_interval: Duration::from_secs(30),
            max_output_bytes: 4 * 1024 * 1024,
        }
    }

    pub fn loop_detector_config(&self) -> LoopDetectorConfig {
        LoopDetectorConfig {
            window: self.loop_window,
            similarity_threshold: self.loop_similarity_threshold,
        }
    }
}

/// `BudgetPolicy.max_wall_clock` is a `Duration`; serialise/deserialise it as
/// whole seconds in the TOML file for readability.
mod humantime_secs {
    use super::BudgetPolicy;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    #[derive(Serialize, Deserialize)]
    struct Raw {
        max_steps: u32,
        max_cost_cents: u64,
        max_wall_clock_secs: u64,
    }

    pub fn serialize<S: Serializer>(policy: &BudgetPolicy, s: S) -> Result<S::Ok, S::Error> {
        Raw {
            max_steps: policy.max_steps,
            max_cost_cents: policy.max_cost_cents,
            max_wall_clock_secs: policy.max_wall_clock.as_secs(),
        }
        .serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<BudgetPolicy, D::Error> {
        let raw = Raw::deserialize(d)?;
        Ok(BudgetPolicy {
            max_steps: raw.max_steps,
            max_cost_cents: raw.max_cost_cents,
            max_wall_clock: Duration::from_secs(raw.max_wall_clock_secs),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let config = Config::default();
        assert_eq!(config.event_bridge_capacity, DEFAULT_CHANNEL_CAPACITY);
        assert!(config.llm_config().is_err());
    }

    #[test]
    fn env_overlay_wins_over_file() {
        std::env::set_var("LLM_ENDPOINT", "http://localhost:9999/v1/chat/completions");
        let config = Config::load(None).unwrap();
        assert_eq!(config.llm.endpoint.as_deref(), Some("http://localhost:9999/v1/chat/completions"));
        std::env::remove_var("LLM_ENDPOINT");
    }
}
