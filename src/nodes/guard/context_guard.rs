use async_trait::async_trait;
use serde_json::Value;

use crate::node::{Node, NodeContext, NodeError};
use crate::nodes::cfg_u64;
use crate::resilience::{classify_budget, estimate_tokens};
use crate::state::{ContextBudget, NodeDelta, ScalarsDelta, WorkflowState};
use crate::types::BudgetStatus;

const DEFAULT_CONTEXT_LIMIT: u64 = 100_000;

/// Estimates token usage of `messages` and classifies the budget status
/// (§4.3). Pure observer — never mutates `messages` itself.
pub struct ContextGuard;

#[async_trait]
impl Node for ContextGuard {
    async fn execute(&self, state: &WorkflowState, _ctx: &NodeContext, config: &Value) -> Result<NodeDelta, NodeError> {
        let context_limit = cfg_u64(config, "contextLimit", DEFAULT_CONTEXT_LIMIT);
        let estimated_tokens = estimate_tokens(&state.messages);
        let usage_ratio = estimated_tokens as f64 / context_limit as f64;
        let status = classify_budget(usage_ratio);

        let compaction_count = if status == BudgetStatus::Block && state.scalars.context_budget.status != BudgetStatus::Block {
            state.scalars.context_budget.compaction_count + 1
        } else {
            state.scalars.context_budget.compaction_count
        };

        let scalars = ScalarsDelta {
            context_budget: Some(ContextBudget {
                estimated_tokens,
                context_limit,
                usage_ratio,
                status,
                compaction_count,
            }),
            ..Default::default()
        };

        Ok(NodeDelta::new().with_scalars(scalars))
    }
}
