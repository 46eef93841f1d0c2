use async_trait::async_trait;
use serde_json::Value;

use crate::message::ChatMessage;
use crate::node::{Node, NodeContext, NodeError, RoutingFn};
use crate::nodes::{cfg_u32, render_template};
use crate::state::{NodeDelta, ScalarsDelta, WorkflowState};
use crate::types::ReviewResult;

const PROMPT: &str = "Review this answer to \"{input}\":\n\n{answer}\n\n\
Reply with a line starting \"VERDICT: approved\" or \"VERDICT: rejected\", \
followed by a line starting \"FEEDBACK: \" with your reasoning.";

/// Reviews the drafted answer (§4.3). Writes the *effective* verdict —
/// forced approval once `maxRetries` is exhausted counts as approved — so
/// `routing_function` can read `reviewResult` directly with no extra state.
pub struct Review;

#[async_trait]
impl Node for Review {
    async fn execute(&self, state: &WorkflowState, ctx: &NodeContext, config: &Value) -> Result<NodeDelta, NodeError> {
        let max_retries = cfg_u32(config, "maxRetries", 3);
        let prompt = render_template(PROMPT, state);

        let resilient = ctx.resilient_invoke(&[ChatMessage::user(prompt)], "review").await?;
        let (verdict, feedback) = parse_verdict(&resilient.content);

        let review_count = state.scalars.review_count + 1;
        let forced = verdict == ReviewResult::Rejected && review_count >= max_retries;
        if forced {
            tracing::warn!(review_count, max_retries, "forcing approval after exhausting maxRetries");
        }
        let effective = if forced { ReviewResult::Approved } else { verdict };

        // On approval (forced or genuine), the medium path's draft becomes
        // the terminal output — the `approved` port leads straight to
        // `post_model` → `end`, with no separate finalizing node on this
        // leg (§4.3 Answer/Review; spec.md §8 scenario 3).
        let final_answer = (effective == ReviewResult::Approved).then(|| state.scalars.answer.clone()).flatten();

        let scalars = ScalarsDelta {
            review_result: Some(effective),
            review_feedback: feedback,
            review_count: Some(review_count),
            final_answer,
            fallback: resilient.fallback,
            ..Default::default()
        };

        Ok(NodeDelta::new()
            .with_message(ChatMessage::assistant(resilient.content))
            .with_scalars(scalars))
    }

    fn routing_function(&self, _config: &Value) -> Option<RoutingFn> {
        Some(std::sync::Arc::new(|state: &WorkflowState| match state.scalars.review_result {
            Some(ReviewResult::Approved) => "approved".to_string(),
            Some(ReviewResult::Rejected) | None => "retry".to_string(),
        }))
    }
}

fn parse_verdict(text: &str) -> (ReviewResult, Option<String>) {
    let mut verdict = ReviewResult::Rejected;
    let mut feedback = None;
    for line in text.lines() {
        let trimmed = line.trim();
        if let Some(rest) = trimmed.strip_prefix("VERDICT:") {
            verdict = if rest.trim().eq_ignore_ascii_case("approved") {
                ReviewResult::Approved
            } else {
                ReviewResult::Rejected
            };
        } else if let Some(rest) = trimmed.strip_prefix("FEEDBACK:") {
            feedback = Some(rest.trim().to_string());
        }
    }
    (verdict, feedback)
}
