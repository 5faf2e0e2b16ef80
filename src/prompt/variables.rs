//! `%name%` variable substitution from prior answers
//!
//! All-or-nothing: every declared variable that appears in the template
//! must resolve against the structured output, otherwise the call fails
//! with no partial substitution returned. Re-running on already-substituted
//! text is a no-op because no markers remain.

use tracing::debug;

use crate::errors::{EngineError, Result};
use crate::types::StructuredOutput;

/// Replace `%name%` markers in a prompt template with prior answers
pub fn resolve_variables(
    prompt_text: &str,
    variable_names: &[String],
    structured_output: &StructuredOutput,
) -> Result<String> {
    let mut resolved = prompt_text.to_string();

    for name in variable_names {
        let marker = format!("%{name}%");
        if !resolved.contains(&marker) {
            continue;
        }
        match structured_output.substitution_value(name) {
            Some(value) => {
                resolved = resolved.replace(&marker, &value);
            }
            None => return Err(EngineError::MissingVariable(name.clone())),
        }
    }

    if resolved != prompt_text {
        debug!(prompt = %resolved, "Prompt after variable replacement");
    }
    Ok(resolved)
}
