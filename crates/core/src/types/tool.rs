//! Tool definitions (spec.md §3, §4.2).

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A single named, typed tool parameter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParameterSpec {
    pub name: String,
    pub param_type: ParameterType,
    pub required: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParameterType {
    String,
    Integer,
    Boolean,
}

/// What family of tool this is, driving observation-parsing behaviour
/// (spec.md §4.2 "Observation parsing").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolFamily {
    SubdomainEnumerator,
    PortScanner,
    VulnTemplateEngine,
    Unknown,
}

/// A registered tool: name, description, parameter schema, command template.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters: Vec<ParameterSpec>,
    /// Command template with `{param}` placeholders, e.g. `"subfinder -d {domain}"`.
    pub command_template: String,
    pub family: ToolFamily,
    pub image: String,
}

impl ToolDefinition {
    pub fn parameter_map(&self) -> HashMap<&str, &ParameterSpec> {
        self.parameters.iter().map(|p| (p.name.as_str(), p)).collect()
    }
}
