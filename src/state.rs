//! The shared workflow state (§3.1) and the deltas nodes produce.
//!
//! `WorkflowState` is a struct of typed fields grouped into five channels,
//! each with its own reducer (Design Notes §9: "represent it as a struct
//! with nullable fields ... implement merge as a per-field function").
//! `NodeDelta` is what a node's `execute` returns; [`crate::reducers`]
//! merges it into the state and bumps only the channels that actually
//! changed, mirroring the teacher's `apply_barrier` version-bump-on-change
//! pattern.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::message::ChatMessage;
use crate::types::{BudgetStatus, CompletionSignal, Difficulty, ReviewResult, TodoStatus};

/// A single planned unit of work on the hard path (`todos`, §3.1).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TodoItem {
    pub id: String,
    pub title: String,
    pub description: String,
    pub status: TodoStatus,
    pub result: Option<String>,
}

impl TodoItem {
    #[must_use]
    pub fn new_pending(id: impl Into<String>, title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: description.into(),
            status: TodoStatus::Pending,
            result: None,
        }
    }
}

/// An injected memory entry (`memoryRefs`, §3.1).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MemoryRef {
    pub filename: String,
    pub source: String,
    pub char_count: usize,
    pub injected_at_turn: u32,
}

/// Token-accounting snapshot (`contextBudget`, §3.1).
#[derive(Clone, Debug, PartialEq, Default, Serialize, Deserialize)]
pub struct ContextBudget {
    pub estimated_tokens: u64,
    pub context_limit: u64,
    pub usage_ratio: f64,
    pub status: BudgetStatus,
    pub compaction_count: u32,
}

/// Model demotion trace (`fallback`, §3.1).
#[derive(Clone, Debug, PartialEq, Default, Serialize, Deserialize)]
pub struct FallbackState {
    pub original_model: Option<String>,
    pub current_model: Option<String>,
    pub attempts: u32,
}

/// The `last-wins` scalar fields of §3.1, grouped into one struct so the
/// whole channel can be versioned together. Every field here uses the same
/// reducer: a delta that sets only one field leaves the rest untouched.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Scalars {
    pub input: Option<String>,
    pub current_step: Option<String>,
    pub last_output: Option<String>,
    pub iteration: u32,
    pub max_iterations: u32,
    pub difficulty: Option<Difficulty>,
    pub answer: Option<String>,
    pub review_result: Option<ReviewResult>,
    pub review_feedback: Option<String>,
    pub review_count: u32,
    pub current_todo_index: usize,
    pub final_answer: Option<String>,
    pub completion_signal: CompletionSignal,
    pub completion_detail: Option<String>,
    pub error: Option<String>,
    pub is_complete: bool,
    pub context_budget: ContextBudget,
    pub fallback: FallbackState,
}

/// Per-channel version counters, bumped only when the channel's content
/// actually changes.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ChannelVersions {
    pub messages: u32,
    pub todos: u32,
    pub memory_refs: u32,
    pub metadata: u32,
    pub scalars: u32,
}

/// The full shared state threaded through every node invocation.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct WorkflowState {
    pub messages: Vec<ChatMessage>,
    pub todos: Vec<TodoItem>,
    pub memory_refs: Vec<MemoryRef>,
    pub metadata: FxHashMap<String, Value>,
    pub scalars: Scalars,
    pub versions: ChannelVersions,
}

impl WorkflowState {
    /// Builds the initial state seeded from the user's input (§4.7 step 1).
    #[must_use]
    pub fn new_with_input(input: impl Into<String>, max_iterations: u32) -> Self {
        let input = input.into();
        let mut state = WorkflowState {
            messages: vec![ChatMessage::user(input.clone())],
            scalars: Scalars {
                input: Some(input),
                max_iterations,
                ..Default::default()
            },
            ..Default::default()
        };
        state.versions.messages = 1;
        state.versions.scalars = 1;
        state
    }

    /// First non-empty of `finalAnswer`, `answer`, `lastOutput` — the
    /// `invoke` entry point's return value (§4.7).
    #[must_use]
    pub fn resolved_output(&self) -> Option<&str> {
        [
            self.scalars.final_answer.as_deref(),
            self.scalars.answer.as_deref(),
            self.scalars.last_output.as_deref(),
        ]
        .into_iter()
        .flatten()
        .find(|s| !s.is_empty())
    }
}

/// A per-field override for the scalar channel. `None` means "leave
/// unchanged"; this is what makes the last-wins reducer per-field rather
/// than whole-struct (a delta that sets only `answer` must not clear
/// `error`, invariant-adjacent behavior required by §3.1).
#[derive(Clone, Debug, Default)]
pub struct ScalarsDelta {
    pub current_step: Option<String>,
    pub last_output: Option<String>,
    pub iteration: Option<u32>,
    pub difficulty: Option<Difficulty>,
    pub answer: Option<String>,
    pub review_result: Option<ReviewResult>,
    pub review_feedback: Option<String>,
    pub review_count: Option<u32>,
    pub current_todo_index: Option<usize>,
    pub final_answer: Option<String>,
    pub completion_signal: Option<CompletionSignal>,
    pub completion_detail: Option<String>,
    pub error: Option<String>,
    /// `isComplete` is monotonic (invariant ii): once `Some(true)` has been
    /// observed by the reducer, later deltas cannot clear it back to false.
    pub is_complete: Option<bool>,
    pub context_budget: Option<ContextBudget>,
    pub fallback: Option<FallbackState>,
}

/// What a node's `execute` returns (§4.2): a sparse delta, merged under the
/// state's reducers. Absent fields are unchanged.
#[derive(Clone, Debug, Default)]
pub struct NodeDelta {
    pub messages: Option<Vec<ChatMessage>>,
    pub todos: Option<Vec<TodoItem>>,
    pub memory_refs: Option<Vec<MemoryRef>>,
    pub metadata: Option<FxHashMap<String, Value>>,
    pub scalars: Option<ScalarsDelta>,
}

impl NodeDelta {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_message(mut self, message: ChatMessage) -> Self {
        self.messages.get_or_insert_with(Vec::new).push(message);
        self
    }

    #[must_use]
    pub fn with_todos(mut self, todos: Vec<TodoItem>) -> Self {
        self.todos = Some(todos);
        self
    }

    #[must_use]
    pub fn with_memory_refs(mut self, refs: Vec<MemoryRef>) -> Self {
        self.memory_refs = Some(refs);
        self
    }

    #[must_use]
    pub fn with_metadata(mut self, metadata: FxHashMap<String, Value>) -> Self {
        self.metadata = Some(metadata);
        self
    }

    #[must_use]
    pub fn with_scalars(mut self, scalars: ScalarsDelta) -> Self {
        self.scalars = Some(scalars);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_with_input_seeds_user_message_and_versions() {
        let state = WorkflowState::new_with_input("ping", 10);
        assert_eq!(state.messages.len(), 1);
        assert_eq!(state.scalars.input.as_deref(), Some("ping"));
        assert_eq!(state.scalars.max_iterations, 10);
        assert_eq!(state.versions.messages, 1);
        assert_eq!(state.versions.scalars, 1);
    }

    #[test]
    fn resolved_output_priority_order() {
        let mut state = WorkflowState::default();
        assert_eq!(state.resolved_output(), None);
        state.scalars.last_output = Some("last".into());
        assert_eq!(state.resolved_output(), Some("last"));
        state.scalars.answer = Some("answer".into());
        assert_eq!(state.resolved_output(), Some("answer"));
        state.scalars.final_answer = Some("final".into());
        assert_eq!(state.resolved_output(), Some("final"));
    }

    #[test]
    fn resolved_output_skips_empty_strings() {
        let mut state = WorkflowState::default();
        state.scalars.final_answer = Some(String::new());
        state.scalars.answer = Some("fallback".into());
        assert_eq!(state.resolved_output(), Some("fallback"));
    }
}
