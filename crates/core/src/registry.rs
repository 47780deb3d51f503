//! Tool registry: built-in tool set plus an optional TOML overlay, loaded
//! once at startup and treated as immutable configuration thereafter
//! (spec.md §3 "loaded at worker startup", §9 "initialised-once
//! configuration passed explicitly to constructors, not ambient globals").

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;

use crate::types::{ParameterSpec, ParameterType, ToolDefinition, ToolFamily};

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("failed to read tool registry overlay at {0}: {1}")]
    Read(String, std::io::Error),
    #[error("failed to parse tool registry overlay: {0}")]
    Parse(#[from] toml::de::Error),
}

#[derive(Debug, Deserialize)]
struct OverlayFile {
    #[serde(default)]
    tools: Vec<ToolDefinition>,
}

/// The three built-in tool families named throughout spec.md §4.2's
/// observation-parsing examples.
pub fn builtin_tools() -> HashMap<String, ToolDefinition> {
    let tools = [
        ToolDefinition {
            name: "subfinder".to_string(),
            description: "Passive subdomain enumeration".to_string(),
            parameters: vec![ParameterSpec {
                name: "domain".to_string(),
                param_type: ParameterType::String,
                required: true,
            }],
            command_template: "subfinder -silent -d {domain}".to_string(),
            family: ToolFamily::SubdomainEnumerator,
            image: "sentryai/subfinder:latest".to_string(),
        },
        ToolDefinition {
            name: "naabu".to_string(),
            description: "Fast TCP port scan".to_string(),
            parameters: vec![ParameterSpec {
                name: "target".to_string(),
                param_type: ParameterType::String,
                required: true,
            }],
            command_template: "naabu -silent -host {target}".to_string(),
            family: ToolFamily::PortScanner,
            image: "sentryai/naabu:latest".to_string(),
        },
        ToolDefinition {
            name: "nuclei".to_string(),
            description: "HTTP vulnerability template scan".to_string(),
            parameters: vec![ParameterSpec {
                name: "target".to_string(),
                param_type: ParameterType::String,
                required: true,
            }],
            command_template: "nuclei -silent -u {target}".to_string(),
            family: ToolFamily::VulnTemplateEngine,
            image: "sentryai/nuclei:latest".to_string(),
        },
    ];
    tools.into_iter().map(|t| (t.name.clone(), t)).collect()
}

/// Build the registry: built-ins overlaid with any tools from a TOML file
/// (an overlay entry with a name matching a built-in replaces it).
pub fn load_registry(overlay_path: Option<&Path>) -> Result<HashMap<String, ToolDefinition>, RegistryError> {
    let mut registry = builtin_tools();
    if let Some(path) = overlay_path {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| RegistryError::Read(path.display().to_string(), e))?;
        let overlay: OverlayFile = toml::from_str(&raw)?;
        for tool in overlay.tools {
            registry.insert(tool.name.clone(), tool);
        }
    }
    Ok(registry)
}
