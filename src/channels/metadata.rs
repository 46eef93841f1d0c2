use crate::reducers::Reducer;
use crate::state::{NodeDelta, WorkflowState};

/// `metadata`: last-wins on the *whole map* (§3.1) — unlike the other
/// extension points in the teacher crate, a delta replaces the entire map
/// rather than shallow-merging keys into it.
pub struct ReplaceMetadata;

impl Reducer for ReplaceMetadata {
    fn apply(&self, state: &mut WorkflowState, delta: &NodeDelta) -> bool {
        let Some(incoming) = delta.metadata.as_ref() else {
            return false;
        };
        if *incoming == state.metadata {
            return false;
        }
        state.metadata = incoming.clone();
        true
    }
}
