//! Structured output extraction (§4.4): prompt augmentation, layered JSON
//! extraction from raw model text, enum coercion, and the one-shot
//! correction retry. No teacher file does this; the bracket-tracking
//! scanner in particular is new code, grounded only in the surrounding
//! error-handling convention (`thiserror` + `miette::Diagnostic`) — see
//! `DESIGN.md` for the explicit no-existing-source note (Design Notes §9:
//! "without regex for the bracket-matching step").

use miette::Diagnostic;
use serde_json::Value;
use thiserror::Error;

use crate::adapter::InvokeOptions;
use crate::message::ChatMessage;
use crate::node::NodeContext;

#[derive(Debug, Error, Diagnostic)]
pub enum StructuredOutputError {
    #[error("no JSON object or array could be extracted from the model's response")]
    #[diagnostic(
        code(flowgraph::structured_output::no_json_found),
        help("The response must contain a direct JSON value, a ```json fenced block, or a balanced {{}}/[] span.")
    )]
    NoJsonFound,

    #[error("correction retry was issued but the corrected response still failed to parse")]
    #[diagnostic(code(flowgraph::structured_output::correction_exhausted))]
    CorrectionExhausted,
}

/// Appends a strict JSON-schema instruction block to a prompt (§4.4 step 1).
/// `enum_constraints` lists `(field, allowed values)` pairs rendered as
/// hints; this crate does not carry a general JSON-schema dependency, so
/// the "schema" is the textual instruction plus the caller's own
/// validation/coercion of the parsed value.
#[must_use]
pub fn augment_prompt_with_schema(prompt: &str, instruction: &str, enum_constraints: &[(&str, &[&str])]) -> String {
    let mut out = format!("{prompt}\n\n{instruction}\nRespond with JSON only, no prose.");
    for (field, allowed) in enum_constraints {
        out.push_str(&format!("\nThe field `{field}` must be one of: {}.", allowed.join(", ")));
    }
    out
}

/// Layered extraction (§4.4 step 2): whole-parse, then fenced block, then
/// bracket-tracking scan.
pub fn extract_json(raw: &str) -> Result<Value, StructuredOutputError> {
    let trimmed = raw.trim();

    if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
        return Ok(value);
    }

    if let Some(block) = extract_fenced_json_block(trimmed) {
        if let Ok(value) = serde_json::from_str::<Value>(block.trim()) {
            return Ok(value);
        }
    }

    if let Some(value) = bracket_scan(trimmed) {
        return Ok(value);
    }

    Err(StructuredOutputError::NoJsonFound)
}

/// Finds the first ```json fenced block, if any.
fn extract_fenced_json_block(text: &str) -> Option<&str> {
    let start_marker = "```json";
    let start = text.find(start_marker)? + start_marker.len();
    let rest = &text[start..];
    let end = rest.find("```")?;
    Some(&rest[..end])
}

/// Hand-written bracket-tracking scan (no regex, Design Notes §9): walks
/// the text byte by byte, tracking whether we're inside a JSON string
/// (and whether the next char is escaped), and the nesting depth of the
/// first `{`/`[` encountered. Returns the first balanced span that parses.
fn bracket_scan(text: &str) -> Option<Value> {
    let chars: Vec<char> = text.chars().collect();
    let mut i = 0;

    while i < chars.len() {
        let opener = chars[i];
        if opener == '{' || opener == '[' {
            let closer = if opener == '{' { '}' } else { ']' };
            if let Some(end) = find_balanced_end(&chars, i, opener, closer) {
                let candidate: String = chars[i..=end].iter().collect();
                if let Ok(value) = serde_json::from_str::<Value>(&candidate) {
                    return Some(value);
                }
            }
        }
        i += 1;
    }
    None
}

/// Scans forward from `start` (pointing at `opener`) tracking string-escape
/// state and nesting depth, returning the index of the matching `closer`.
fn find_balanced_end(chars: &[char], start: usize, opener: char, closer: char) -> Option<usize> {
    let mut depth: i32 = 0;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, &c) in chars.iter().enumerate().skip(start) {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }

        match c {
            '"' => in_string = true,
            c if c == opener => depth += 1,
            c if c == closer => {
                depth -= 1;
                if depth == 0 {
                    return Some(offset);
                }
            }
            _ => {}
        }
    }
    None
}

/// §4.4 step 3: if the top-level value is an array but the schema expects
/// an object with a single list field, wrap it.
#[must_use]
pub fn wrap_list_if_needed(value: Value, list_field: &str) -> Value {
    match value {
        Value::Array(items) => {
            let mut map = serde_json::Map::new();
            map.insert(list_field.to_string(), Value::Array(items));
            Value::Object(map)
        }
        other => other,
    }
}

/// §4.4 step 4: coerce a free-text value into one of `allowed`, by exact,
/// then case-insensitive, then substring match; falls back to `default`.
#[must_use]
pub fn coerce_enum(raw: &str, allowed: &[&str], default: &str) -> String {
    if let Some(exact) = allowed.iter().find(|candidate| **candidate == raw) {
        return (*exact).to_string();
    }
    let lower = raw.to_ascii_lowercase();
    if let Some(ci) = allowed.iter().find(|candidate| candidate.to_ascii_lowercase() == lower) {
        return (*ci).to_string();
    }
    if let Some(substr) = allowed.iter().find(|candidate| lower.contains(&candidate.to_ascii_lowercase())) {
        return (*substr).to_string();
    }
    default.to_string()
}

/// §4.4 step 5: extract, and on failure issue exactly one correction
/// request carrying the prior text and the validation error, then extract
/// once more. No further retries at this layer.
pub async fn extract_with_correction(
    raw: &str,
    ctx: &NodeContext,
) -> Result<Value, StructuredOutputError> {
    if let Ok(value) = extract_json(raw) {
        return Ok(value);
    }

    let correction_prompt = format!(
        "Your previous response could not be parsed as JSON:\n\n{raw}\n\nError: {}\n\nRespond again with valid JSON only.",
        StructuredOutputError::NoJsonFound
    );
    let messages = [ChatMessage::user(correction_prompt)];
    let corrected = ctx
        .model
        .invoke(&messages, InvokeOptions::default())
        .await
        .map_err(|_| StructuredOutputError::CorrectionExhausted)?;

    extract_json(&corrected.content).map_err(|_| StructuredOutputError::CorrectionExhausted)
}
