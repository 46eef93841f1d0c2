use crate::reducers::Reducer;
use crate::state::{NodeDelta, WorkflowState};

/// `messages`: append-only (§3.1).
pub struct AppendMessages;

impl Reducer for AppendMessages {
    fn apply(&self, state: &mut WorkflowState, delta: &NodeDelta) -> bool {
        let Some(new_messages) = delta.messages.as_ref().filter(|m| !m.is_empty()) else {
            return false;
        };
        state.messages.extend(new_messages.iter().cloned());
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::ChatMessage;

    #[test]
    fn appends_without_replacing() {
        let mut state = WorkflowState::new_with_input("hi", 10);
        let delta = NodeDelta::new().with_message(ChatMessage::assistant("hello"));
        assert!(AppendMessages.apply(&mut state, &delta));
        assert_eq!(state.messages.len(), 2);
    }

    #[test]
    fn empty_delta_is_noop() {
        let mut state = WorkflowState::new_with_input("hi", 10);
        assert!(!AppendMessages.apply(&mut state, &NodeDelta::new()));
        assert_eq!(state.messages.len(), 1);
    }
}
