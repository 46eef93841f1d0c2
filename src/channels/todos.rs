use crate::reducers::Reducer;
use crate::state::{NodeDelta, WorkflowState};

/// `todos`: merge-by-id (§3.1). Existing ids are updated in place; new ids
/// are appended. Never drops an id (invariant 5, §8).
pub struct MergeTodosById;

impl Reducer for MergeTodosById {
    fn apply(&self, state: &mut WorkflowState, delta: &NodeDelta) -> bool {
        let Some(incoming) = delta.todos.as_ref().filter(|t| !t.is_empty()) else {
            return false;
        };
        let mut changed = false;
        for item in incoming {
            if let Some(existing) = state.todos.iter_mut().find(|t| t.id == item.id) {
                if *existing != *item {
                    *existing = item.clone();
                    changed = true;
                }
            } else {
                state.todos.push(item.clone());
                changed = true;
            }
        }
        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::TodoItem;

    #[test]
    fn new_ids_are_appended_existing_ids_updated() {
        let mut state = WorkflowState::new_with_input("hi", 10);
        state.todos.push(TodoItem::new_pending("1", "a", "desc a"));

        let mut updated = TodoItem::new_pending("1", "a", "desc a");
        updated.status = crate::types::TodoStatus::Completed;
        let delta = NodeDelta::new().with_todos(vec![updated.clone(), TodoItem::new_pending("2", "b", "desc b")]);

        assert!(MergeTodosById.apply(&mut state, &delta));
        assert_eq!(state.todos.len(), 2);
        assert_eq!(state.todos[0].status, crate::types::TodoStatus::Completed);
        assert_eq!(state.todos[1].id, "2");
    }

    #[test]
    fn identical_update_does_not_report_change() {
        let mut state = WorkflowState::new_with_input("hi", 10);
        let item = TodoItem::new_pending("1", "a", "desc a");
        state.todos.push(item.clone());
        let delta = NodeDelta::new().with_todos(vec![item]);
        assert!(!MergeTodosById.apply(&mut state, &delta));
    }
}
