//! Command template rendering and the safety-pattern filter
//! (spec.md §4.2 step 2, §4.3 validation step 5).

use regex::Regex;
use std::collections::HashMap;
use std::sync::OnceLock;

use crate::types::ToolDefinition;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TemplateError {
    #[error("missing required argument: {0}")]
    MissingArgument(String),
    #[error("argument failed the safety-pattern filter: {0}")]
    UnsafeArgument(String),
    #[error("unbalanced quoting in rendered command")]
    UnbalancedQuoting,
}

fn unsafe_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"[;|&`]|\$\(|>{1,2}|<{1,2}"#).expect("static regex is valid")
    })
}

/// Reject command chaining, redirection, substitution in a single argument
/// value (spec.md §4.2 step 2: "rejects command chaining, redirection,
/// substitution or unbalanced quoting").
pub fn check_argument_safety(value: &str) -> Result<(), TemplateError> {
    if unsafe_pattern().is_match(value) {
        return Err(TemplateError::UnsafeArgument(value.to_string()));
    }
    let quote_count = value.chars().filter(|c| *c == '"' || *c == '\'').count();
    if quote_count % 2 != 0 {
        return Err(TemplateError::UnbalancedQuoting);
    }
    Ok(())
}

/// Substitute `{param}` placeholders in a tool's command template with
/// validated argument values (spec.md §4.2 step 2).
pub fn render_command(
    tool: &ToolDefinition,
    arguments: &HashMap<String, String>,
) -> Result<String, TemplateError> {
    let mut rendered = tool.command_template.clone();
    for spec in &tool.parameters {
        let placeholder = format!("{{{}}}", spec.name);
        if !rendered.contains(&placeholder) {
            continue;
        }
        let value = match arguments.get(&spec.name) {
            Some(v) => v,
            None if spec.required => {
                return Err(TemplateError::MissingArgument(spec.name.clone()))
            }
            None => "",
        };
        check_argument_safety(value)?;
        rendered = rendered.replace(&placeholder, value);
    }
    check_argument_safety(&rendered)?;
    Ok(rendered)
}
