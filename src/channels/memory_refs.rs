use crate::reducers::Reducer;
use crate::state::{NodeDelta, WorkflowState};

/// `memoryRefs`: deduplicate by filename (§3.1). A ref with a filename
/// already present is dropped, not merged — first write wins.
pub struct DedupeMemoryRefs;

impl Reducer for DedupeMemoryRefs {
    fn apply(&self, state: &mut WorkflowState, delta: &NodeDelta) -> bool {
        let Some(incoming) = delta.memory_refs.as_ref().filter(|r| !r.is_empty()) else {
            return false;
        };
        let mut changed = false;
        for candidate in incoming {
            if state.memory_refs.iter().any(|r| r.filename == candidate.filename) {
                continue;
            }
            state.memory_refs.push(candidate.clone());
            changed = true;
        }
        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::MemoryRef;

    fn make_ref(filename: &str) -> MemoryRef {
        MemoryRef {
            filename: filename.to_string(),
            source: "notes".into(),
            char_count: 100,
            injected_at_turn: 1,
        }
    }

    #[test]
    fn duplicates_by_filename_are_dropped() {
        let mut state = WorkflowState::new_with_input("hi", 10);
        state.memory_refs.push(make_ref("a.md"));
        let delta = NodeDelta::new().with_memory_refs(vec![make_ref("a.md"), make_ref("b.md")]);
        assert!(DedupeMemoryRefs.apply(&mut state, &delta));
        assert_eq!(state.memory_refs.len(), 2);
        assert!(state.memory_refs.iter().filter(|r| r.filename == "a.md").count() == 1);
    }

    #[test]
    fn all_duplicates_reports_no_change() {
        let mut state = WorkflowState::new_with_input("hi", 10);
        state.memory_refs.push(make_ref("a.md"));
        let delta = NodeDelta::new().with_memory_refs(vec![make_ref("a.md")]);
        assert!(!DedupeMemoryRefs.apply(&mut state, &delta));
    }
}
