//! Structured response validation pipeline (spec.md §4.3): parse, schema
//! check, tool-existence check, argument-type check, safety-pattern check.
//! One corrective retry is issued on failure before the step is abandoned.

use std::collections::HashMap;

use crate::sandbox::template::check_argument_safety;
use crate::types::{ParameterType, ToolDefinition};

use super::inference::Decision;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("response was not valid JSON: {0}")]
    MalformedJson(String),
    #[error("response did not match the expected decision schema: {0}")]
    SchemaMismatch(String),
    #[error("decision references unknown tool: {0}")]
    UnknownTool(String),
    #[error("argument '{0}' failed type check: expected {1:?}")]
    ArgumentType(String, ParameterType),
    #[error("missing required argument: {0}")]
    MissingArgument(String),
    #[error("argument failed the safety-pattern filter: {0}")]
    UnsafeArgument(String),
}

/// Strip a single leading/trailing markdown code fence, if present. LLMs
/// frequently wrap JSON in ```json ... ``` despite instructions not to.
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

fn check_argument_types(
    arguments: &HashMap<String, String>,
    tool: &ToolDefinition,
) -> Result<(), ValidationError> {
    for spec in &tool.parameters {
        let value = match arguments.get(&spec.name) {
            Some(v) => v,
            None if spec.required => {
                return Err(ValidationError::MissingArgument(spec.name.clone()))
            }
            None => continue,
        };
        let ok = match spec.param_type {
            ParameterType::String => true,
            ParameterType::Integer => value.parse::<i64>().is_ok(),
            ParameterType::Boolean => value.parse::<bool>().is_ok(),
        };
        if !ok {
            return Err(ValidationError::ArgumentType(spec.name.clone(), spec.param_type.clone()));
        }
        check_argument_safety(value)
            .map_err(|e| ValidationError::UnsafeArgument(e.to_string()))?;
    }
    Ok(())
}

/// Parse and validate a raw LLM completion against the `Decision` schema
/// (spec.md §4.3, step "Validate" — JSON parse, schema check, tool
/// existence, argument types, safety patterns).
pub fn validate_decision(
    raw: &str,
    tools: &HashMap<String, ToolDefinition>,
) -> Result<Decision, ValidationError> {
    let body = strip_fences(raw);
    let value: serde_json::Value =
        serde_json::from_str(body).map_err(|e| ValidationError::MalformedJson(e.to_string()))?;
    let decision: Decision = serde_json::from_value(value)
        .map_err(|e| ValidationError::SchemaMismatch(e.to_string()))?;

    if let Decision::ToolCall { tool, arguments, .. } = &decision {
        let def = tools
            .get(tool)
            .ok_or_else(|| ValidationError::UnknownTool(tool.clone()))?;
        let parsed: HashMap<String, String> = serde_json::from_str(arguments)
            .map_err(|e| ValidationError::SchemaMismatch(format!("arguments: {e}")))?;
        check_argument_types(&parsed, def)?;
    }

    Ok(decision)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ParameterSpec, ToolFamily};

    fn tools() -> HashMap<String, ToolDefinition> {
        HashMap::from([(
            "subfinder".to_string(),
            ToolDefinition {
                name: "subfinder".into(),
                description: "subdomain enumeration".into(),
                parameters: vec![ParameterSpec {
                    name: "domain".into(),
                    param_type: ParameterType::String,
                    required: true,
                }],
                command_template: "subfinder -d {domain}".into(),
                family: ToolFamily::SubdomainEnumerator,
                image: "n/a".into(),
            },
        )])
    }

    #[test]
    fn accepts_fenced_json() {
        let raw = "```json\n{\"decision_type\":\"complete\",\"reasoning\":\"done\",\"status_update\":\"finished\"}\n```";
        assert!(validate_decision(raw, &tools()).is_ok());
    }

    #[test]
    fn rejects_unknown_tool() {
        let raw = r#"{"decision_type":"tool_call","tool":"nmap","arguments":"{}","reasoning":"r","status_update":"s"}"#;
        assert_eq!(
            validate_decision(raw, &tools()),
            Err(ValidationError::UnknownTool("nmap".to_string()))
        );
    }

    #[test]
    fn rejects_missing_required_argument() {
        let raw = r#"{"decision_type":"tool_call","tool":"subfinder","arguments":"{}","reasoning":"r","status_update":"s"}"#;
        assert_eq!(
            validate_decision(raw, &tools()),
            Err(ValidationError::MissingArgument("domain".to_string()))
        );
    }

    #[test]
    fn rejects_unsafe_argument() {
        let raw = r#"{"decision_type":"tool_call","tool":"subfinder","arguments":"{\"domain\":\"a.com; rm -rf /\"}","reasoning":"r","status_update":"s"}"#;
        assert!(matches!(
            validate_decision(raw, &tools()),
            Err(ValidationError::UnsafeArgument(_))
        ));
    }

    #[test]
    fn rejects_malformed_json() {
        assert!(matches!(
            validate_decision("not json", &tools()),
            Err(ValidationError::MalformedJson(_))
        ));
    }
}
