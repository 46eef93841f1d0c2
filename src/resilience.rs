//! The resilience middleware (§4.2/§7/§9): context-budget estimation, the
//! completion-signal grammar, and `resilientInvoke` — retry plus
//! model-fallback-ladder demotion around a single [`ModelAdapter`] call.
//! Grounded in the teacher's error taxonomy (`channels/errors.rs`,
//! `node.rs`) for the shape of the error enum.

use miette::Diagnostic;
use thiserror::Error;

use crate::adapter::{AdapterError, InvokeOptions, ModelAdapter};
use crate::message::ChatMessage;
use crate::state::FallbackState;
use crate::types::{BudgetStatus, CompletionSignal};

/// A crude, model-agnostic token estimate: ~4 characters per token, which
/// is the same heuristic most CLI-adjacent tools use when no tokenizer is
/// bundled. Good enough for a budget *classification*, not a billing figure.
#[must_use]
pub fn estimate_tokens(messages: &[ChatMessage]) -> u64 {
    let chars: usize = messages.iter().map(|m| m.content.chars().count()).sum();
    (chars as u64 / 4).max(1)
}

/// Classifies usage ratio into the four-way budget status (Context Guard,
/// §4.3). Thresholds are fixed: `< 0.7` ok, `< 0.85` warn, `< 1.0` block,
/// `>= 1.0` overflow.
#[must_use]
pub fn classify_budget(usage_ratio: f64) -> BudgetStatus {
    if usage_ratio >= 1.0 {
        BudgetStatus::Overflow
    } else if usage_ratio >= 0.85 {
        BudgetStatus::Block
    } else if usage_ratio >= 0.7 {
        BudgetStatus::Warn
    } else {
        BudgetStatus::Ok
    }
}

/// Truncates `text` to `limit` chars, matching the nodes' "truncate to N
/// chars under budget pressure" contract (§4.3: Answer, Execute TODO,
/// Final Review).
#[must_use]
pub fn truncate(text: &str, limit: usize) -> String {
    if text.chars().count() <= limit {
        text.to_string()
    } else {
        text.chars().take(limit).collect()
    }
}

/// Parses the Post Model completion-signal grammar (§4.3, invariant 8,
/// §8). The four tags are mutually exclusive on a single output; first
/// match wins by source order (line order in `text`).
#[must_use]
pub fn parse_completion_signal(text: &str) -> (CompletionSignal, Option<String>) {
    for line in text.lines() {
        let line = line.trim();
        if line == "[TASK_COMPLETE]" {
            return (CompletionSignal::Complete, None);
        }
        if let Some(hint) = strip_tag(line, "[CONTINUE:", "]") {
            return (CompletionSignal::Continue, Some(hint));
        }
        if let Some(reason) = strip_tag(line, "[BLOCKED:", "]") {
            return (CompletionSignal::Blocked, Some(reason));
        }
        if let Some(msg) = strip_tag(line, "[ERROR:", "]") {
            return (CompletionSignal::Error, Some(msg));
        }
    }
    (CompletionSignal::None, None)
}

fn strip_tag<'a>(line: &'a str, prefix: &str, suffix: &str) -> Option<String> {
    let rest = line.strip_prefix(prefix)?;
    let inner = rest.strip_suffix(suffix)?;
    Some(inner.trim().to_string())
}

#[derive(Debug, Error, Diagnostic)]
pub enum ResilienceError {
    #[error("model invocation failed after exhausting the fallback ladder: {0}")]
    #[diagnostic(
        code(flowgraph::resilience::exhausted),
        help("All configured fallback models were tried and each failed.")
    )]
    Exhausted(#[source] AdapterError),
}

/// The result of a resilient invocation: the model's text plus a state
/// delta fragment describing any fallback demotion that occurred (§7).
#[derive(Debug, Clone)]
pub struct Resilient {
    pub content: String,
    pub fallback: Option<FallbackState>,
}

/// A fixed demotion ladder: try `model_name`, then each entry here in
/// order, on persistent failure.
const FALLBACK_LADDER: &[&str] = &["claude-haiku", "claude-instant"];

/// Wraps a model call with retry up to `max_retries`, then demotes through
/// [`FALLBACK_LADDER`] on persistent failure, recording the demotion in
/// the returned `fallback` delta fragment (§7 "Resilience middleware").
/// Does not retry context-budget overflow — that is not this layer's
/// concern; the iteration gate observes it directly from state.
pub async fn resilient_invoke(
    model: &dyn ModelAdapter,
    messages: &[ChatMessage],
    _node_name: &str,
    max_retries: u32,
    model_name: &str,
) -> Result<Resilient, ResilienceError> {
    let mut last_err = None;
    for attempt in 0..=max_retries {
        match model.invoke(messages, InvokeOptions::default()).await {
            Ok(response) => {
                return Ok(Resilient {
                    content: response.content,
                    fallback: None,
                });
            }
            Err(err) => {
                tracing::warn!(attempt, model = model_name, error = %err, "model invocation failed");
                last_err = Some(err);
            }
        }
    }

    let mut attempts = max_retries + 1;
    for fallback_model in FALLBACK_LADDER {
        match model.invoke(messages, InvokeOptions::default()).await {
            Ok(response) => {
                return Ok(Resilient {
                    content: response.content,
                    fallback: Some(FallbackState {
                        original_model: Some(model_name.to_string()),
                        current_model: Some((*fallback_model).to_string()),
                        attempts,
                    }),
                });
            }
            Err(err) => {
                attempts += 1;
                last_err = Some(err);
            }
        }
    }

    Err(ResilienceError::Exhausted(last_err.unwrap_or(AdapterError::NotInitialized)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn budget_thresholds() {
        assert_eq!(classify_budget(0.1), BudgetStatus::Ok);
        assert_eq!(classify_budget(0.75), BudgetStatus::Warn);
        assert_eq!(classify_budget(0.9), BudgetStatus::Block);
        assert_eq!(classify_budget(1.2), BudgetStatus::Overflow);
    }

    #[test]
    fn truncate_respects_char_limit() {
        assert_eq!(truncate("hello world", 5), "hello");
        assert_eq!(truncate("hi", 5), "hi");
    }

    #[test]
    fn completion_signal_task_complete() {
        let (signal, detail) = parse_completion_signal("some preamble\n[TASK_COMPLETE]\n");
        assert_eq!(signal, CompletionSignal::Complete);
        assert_eq!(detail, None);
    }

    #[test]
    fn completion_signal_continue_carries_hint() {
        let (signal, detail) = parse_completion_signal("[CONTINUE: need more info]");
        assert_eq!(signal, CompletionSignal::Continue);
        assert_eq!(detail.as_deref(), Some("need more info"));
    }

    #[test]
    fn completion_signal_blocked_and_error() {
        assert_eq!(parse_completion_signal("[BLOCKED: waiting on user]").0, CompletionSignal::Blocked);
        assert_eq!(parse_completion_signal("[ERROR: boom]").0, CompletionSignal::Error);
    }

    #[test]
    fn completion_signal_none_when_absent() {
        assert_eq!(parse_completion_signal("just regular text").0, CompletionSignal::None);
    }

    #[test]
    fn completion_signal_first_match_wins() {
        let text = "[CONTINUE: keep going]\n[TASK_COMPLETE]";
        assert_eq!(parse_completion_signal(text).0, CompletionSignal::Continue);
    }

    #[tokio::test]
    async fn resilient_invoke_succeeds_without_fallback() {
        use crate::adapter::mock::ScriptedAdapter;
        let adapter = ScriptedAdapter::new(vec!["hello"]);
        let result = resilient_invoke(&adapter, &[ChatMessage::user("hi")], "test", 2, "primary").await.unwrap();
        assert_eq!(result.content, "hello");
        assert!(result.fallback.is_none());
    }

    #[tokio::test]
    async fn resilient_invoke_exhausts_ladder_on_persistent_failure() {
        use crate::adapter::mock::FailingAdapter;
        let adapter = FailingAdapter;
        let result = resilient_invoke(&adapter, &[ChatMessage::user("hi")], "test", 1, "primary").await;
        assert!(result.is_err());
    }
}
