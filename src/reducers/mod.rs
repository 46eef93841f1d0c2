//! The reducer registry: applies a [`NodeDelta`] to [`WorkflowState`] one
//! channel at a time, bumping only the channels whose content actually
//! changed. Ports the teacher's `ReducerRegistry`/`apply_barrier`
//! version-bump-on-change pattern to this state's five channels; the
//! concurrent barrier aggregation across multiple simultaneously-run nodes
//! is dropped (§4.7 [EXPANDED]) since this executor runs one node at a time.

use rustc_hash::FxHashMap;
use std::sync::Arc;

use crate::channels::{AppendMessages, DedupeMemoryRefs, LastWinsScalars, MergeTodosById, ReplaceMetadata};
use crate::state::{NodeDelta, WorkflowState};
use crate::types::ChannelName;

/// A single channel's merge function. Returns whether the channel's
/// content changed, so the registry can decide whether to bump its version.
pub trait Reducer: Send + Sync {
    fn apply(&self, state: &mut WorkflowState, delta: &NodeDelta) -> bool;
}

/// Skips a reducer invocation when the delta carries no data for that
/// channel — mirrors the teacher's `channel_guard` helper.
fn channel_guard(name: ChannelName, delta: &NodeDelta) -> bool {
    match name {
        ChannelName::Messages => delta.messages.as_ref().is_some_and(|m| !m.is_empty()),
        ChannelName::Todos => delta.todos.as_ref().is_some_and(|t| !t.is_empty()),
        ChannelName::MemoryRefs => delta.memory_refs.as_ref().is_some_and(|r| !r.is_empty()),
        ChannelName::Metadata => delta.metadata.is_some(),
        ChannelName::Scalars => delta.scalars.is_some(),
    }
}

/// Maps each channel to the reducer that merges deltas into it. Built once
/// via [`ReducerRegistry::with_builtins`] and shared by the executor.
pub struct ReducerRegistry {
    reducers: FxHashMap<ChannelName, Arc<dyn Reducer>>,
}

impl ReducerRegistry {
    #[must_use]
    pub fn with_builtins() -> Self {
        let mut reducers: FxHashMap<ChannelName, Arc<dyn Reducer>> = FxHashMap::default();
        reducers.insert(ChannelName::Messages, Arc::new(AppendMessages));
        reducers.insert(ChannelName::Todos, Arc::new(MergeTodosById));
        reducers.insert(ChannelName::MemoryRefs, Arc::new(DedupeMemoryRefs));
        reducers.insert(ChannelName::Metadata, Arc::new(ReplaceMetadata));
        reducers.insert(ChannelName::Scalars, Arc::new(LastWinsScalars));
        Self { reducers }
    }

    /// Applies `delta` to every registered channel, bumping the version of
    /// any channel whose content changed, and returns the names of the
    /// channels that changed (for event-stream/log summaries, §6.4).
    pub fn apply_all(&self, state: &mut WorkflowState, delta: &NodeDelta) -> Vec<ChannelName> {
        let mut updated = Vec::new();
        for (&name, reducer) in &self.reducers {
            if !channel_guard(name, delta) {
                continue;
            }
            if reducer.apply(state, delta) {
                bump(state, name);
                updated.push(name);
            }
        }
        updated
    }
}

impl Default for ReducerRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

fn bump(state: &mut WorkflowState, channel: ChannelName) {
    let version = match channel {
        ChannelName::Messages => &mut state.versions.messages,
        ChannelName::Todos => &mut state.versions.todos,
        ChannelName::MemoryRefs => &mut state.versions.memory_refs,
        ChannelName::Metadata => &mut state.versions.metadata,
        ChannelName::Scalars => &mut state.versions.scalars,
    };
    *version = version.saturating_add(1);
}
