//! The built-in node set (§4.3), grouped into the five categories carried
//! over from the Python original's package split (`model_nodes.py`,
//! `logic_nodes.py`, `memory_nodes.py`, `guard_nodes.py`, `task_nodes.py`,
//! SPEC_FULL §1 [EXPANDED]).

pub mod guard;
pub mod logic;
pub mod memory;
pub mod model;
pub mod task;

use serde_json::Value;

use crate::registry::NodeRegistry;
use crate::state::{ScalarsDelta, WorkflowState};

/// Applies `value` to `field` on `delta`, matching it against the known
/// scalar fields an `outputField`/`routingField` config value can name
/// (§4.3 LLM Call, Conditional Router). Unknown field names are left for
/// the caller to route into `metadata` instead.
pub(crate) fn set_named_scalar(delta: &mut ScalarsDelta, field: &str, value: String) -> bool {
    match field {
        "currentStep" => delta.current_step = Some(value),
        "lastOutput" => delta.last_output = Some(value),
        "answer" => delta.answer = Some(value),
        "reviewFeedback" => delta.review_feedback = Some(value),
        "finalAnswer" => delta.final_answer = Some(value),
        "completionDetail" => delta.completion_detail = Some(value),
        "error" => delta.error = Some(value),
        _ => return false,
    }
    true
}

/// Registers every concrete node type with the registry. Pseudo-nodes
/// `start`/`end` are not registered — the compiler resolves them
/// structurally (§4.6) rather than through the node contract.
pub fn register_builtins(registry: &mut NodeRegistry) {
    model::register(registry);
    task::register(registry);
    memory::register(registry);
    guard::register(registry);
    logic::register(registry);
}

/// Reads a string config value, falling back to `default` if the key is
/// absent or not a string.
#[must_use]
pub fn cfg_str<'a>(config: &'a Value, key: &str, default: &'a str) -> std::borrow::Cow<'a, str> {
    config
        .get(key)
        .and_then(Value::as_str)
        .map(std::borrow::Cow::Borrowed)
        .unwrap_or(std::borrow::Cow::Borrowed(default))
}

#[must_use]
pub fn cfg_u32(config: &Value, key: &str, default: u32) -> u32 {
    config.get(key).and_then(Value::as_u64).map_or(default, |v| v as u32)
}

#[must_use]
pub fn cfg_u64(config: &Value, key: &str, default: u64) -> u64 {
    config.get(key).and_then(Value::as_u64).unwrap_or(default)
}

#[must_use]
pub fn cfg_usize(config: &Value, key: &str, default: usize) -> usize {
    config.get(key).and_then(Value::as_u64).map_or(default, |v| v as usize)
}

#[must_use]
pub fn cfg_bool(config: &Value, key: &str, default: bool) -> bool {
    config.get(key).and_then(Value::as_bool).unwrap_or(default)
}

/// Renders `template`, substituting `{fieldName}` placeholders with values
/// read from `state` (§4.3 LLM Call). A single-level, non-nested scan —
/// consistent with the bracket-tracking scanner's "no regex" convention
/// (see `structured_output.rs`). A placeholder whose field is missing is
/// left verbatim in the output, braces included.
#[must_use]
pub fn render_template(template: &str, state: &WorkflowState) -> String {
    let mut out = String::with_capacity(template.len());
    let chars: Vec<char> = template.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        if chars[i] == '{' {
            if let Some(end) = chars[i + 1..].iter().position(|&c| c == '}').map(|p| i + 1 + p) {
                let field: String = chars[i + 1..end].iter().collect();
                if !field.contains(char::is_whitespace) {
                    if let Some(value) = template_field(state, &field) {
                        out.push_str(&value);
                        i = end + 1;
                        continue;
                    }
                }
            }
        }
        out.push(chars[i]);
        i += 1;
    }
    out
}

pub(crate) fn template_field(state: &WorkflowState, name: &str) -> Option<String> {
    let s = &state.scalars;
    match name {
        "input" => s.input.clone(),
        "currentStep" => s.current_step.clone(),
        "lastOutput" => s.last_output.clone(),
        "answer" => s.answer.clone(),
        "difficulty" => s.difficulty.map(|d| d.to_string()),
        "reviewFeedback" => s.review_feedback.clone(),
        "reviewCount" => Some(s.review_count.to_string()),
        "finalAnswer" => s.final_answer.clone(),
        "completionDetail" => s.completion_detail.clone(),
        "iteration" => Some(s.iteration.to_string()),
        _ => state.metadata.get(name).map(|v| match v {
            Value::String(text) => text.clone(),
            other => other.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_template_substitutes_known_fields() {
        let state = WorkflowState::new_with_input("solve this", 5);
        let rendered = render_template("Task: {input} (iteration {iteration})", &state);
        assert_eq!(rendered, "Task: solve this (iteration 0)");
    }

    #[test]
    fn render_template_leaves_unknown_placeholders_verbatim() {
        let state = WorkflowState::new_with_input("x", 1);
        let rendered = render_template("value: {nope}", &state);
        assert_eq!(rendered, "value: {nope}");
    }
}
