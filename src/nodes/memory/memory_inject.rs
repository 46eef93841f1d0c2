use async_trait::async_trait;
use serde_json::Value;

use crate::node::{Node, NodeContext, NodeError};
use crate::nodes::cfg_usize;
use crate::state::{MemoryRef, NodeDelta, WorkflowState};
use crate::types::Role;

const DEFAULT_SEARCH_CHARS: usize = 200;
const DEFAULT_MAX_RESULTS: usize = 5;

/// Queries the memory manager with a prefix of `input` and writes the hits
/// into `memoryRefs` (§4.3). Memory failures are non-fatal (§7): on error
/// this node still returns a (possibly empty) delta rather than failing
/// the graph.
pub struct MemoryInject;

#[async_trait]
impl Node for MemoryInject {
    async fn execute(&self, state: &WorkflowState, ctx: &NodeContext, config: &Value) -> Result<NodeDelta, NodeError> {
        let search_chars = cfg_usize(config, "searchChars", DEFAULT_SEARCH_CHARS);
        let max_results = cfg_usize(config, "maxResults", DEFAULT_MAX_RESULTS);
        let input = state.scalars.input.as_deref().unwrap_or_default();
        let query: String = input.chars().take(search_chars).collect();

        if let Err(err) = ctx.memory.record_message(Role::User, input).await {
            tracing::debug!(error = %err, "memory record_message failed; continuing");
        }

        let refs = match ctx.memory.search(&query, max_results).await {
            Ok(hits) => hits
                .into_iter()
                .map(|hit| MemoryRef {
                    filename: hit.entry.filename,
                    source: hit.entry.source,
                    char_count: hit.entry.char_count,
                    injected_at_turn: state.scalars.iteration,
                })
                .collect(),
            Err(err) => {
                tracing::debug!(error = %err, "memory search failed; continuing without injected memory");
                Vec::new()
            }
        };

        Ok(NodeDelta::new().with_memory_refs(refs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::mock::ScriptedAdapter;
    use crate::memory::mock::InMemoryMemoryManager;
    use crate::memory::MemoryEntry;
    use std::sync::Arc;

    #[tokio::test]
    async fn injects_matching_memory_refs() {
        let corpus = vec![MemoryEntry {
            filename: "notes.md".to_string(),
            source: "project notes about rust".to_string(),
            char_count: 24,
        }];
        let ctx = NodeContext::new(
            "s1",
            Arc::new(ScriptedAdapter::new(vec!["unused"])),
            Arc::new(InMemoryMemoryManager::new(corpus)),
            1,
            "primary",
        );
        let state = WorkflowState::new_with_input("rust question", 5);
        let delta = MemoryInject.execute(&state, &ctx, &serde_json::json!({})).await.unwrap();
        assert_eq!(delta.memory_refs.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn no_match_yields_empty_refs() {
        let ctx = NodeContext::new(
            "s1",
            Arc::new(ScriptedAdapter::new(vec!["unused"])),
            Arc::new(InMemoryMemoryManager::new(vec![])),
            1,
            "primary",
        );
        let state = WorkflowState::new_with_input("anything", 5);
        let delta = MemoryInject.execute(&state, &ctx, &serde_json::json!({})).await.unwrap();
        assert!(delta.memory_refs.unwrap().is_empty());
    }
}
