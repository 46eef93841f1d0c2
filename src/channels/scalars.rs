use crate::reducers::Reducer;
use crate::state::{NodeDelta, WorkflowState};

/// The `scalars` channel: every field in §3.1 not covered by another
/// channel, applied last-wins *per field* — a delta that sets only one
/// field must leave the rest untouched. `isComplete` is monotonic
/// (invariant ii): a delta can set it to `true` but never clears it back.
pub struct LastWinsScalars;

impl Reducer for LastWinsScalars {
    fn apply(&self, state: &mut WorkflowState, delta: &NodeDelta) -> bool {
        let Some(d) = delta.scalars.as_ref() else {
            return false;
        };
        let s = &mut state.scalars;
        let mut changed = false;

        macro_rules! apply_field {
            ($field:ident) => {
                if let Some(value) = d.$field.clone() {
                    if s.$field.as_ref() != Some(&value) {
                        s.$field = Some(value);
                        changed = true;
                    }
                }
            };
        }

        apply_field!(current_step);
        apply_field!(last_output);
        apply_field!(difficulty);
        apply_field!(answer);
        apply_field!(review_result);
        apply_field!(review_feedback);
        apply_field!(final_answer);
        apply_field!(completion_signal);
        apply_field!(completion_detail);
        apply_field!(error);
        apply_field!(context_budget);
        apply_field!(fallback);

        if let Some(iteration) = d.iteration {
            if s.iteration != iteration {
                s.iteration = iteration;
                changed = true;
            }
        }
        if let Some(review_count) = d.review_count {
            if s.review_count != review_count {
                s.review_count = review_count;
                changed = true;
            }
        }
        if let Some(idx) = d.current_todo_index {
            if s.current_todo_index != idx {
                s.current_todo_index = idx;
                changed = true;
            }
        }
        if let Some(is_complete) = d.is_complete {
            // Monotonic: only ever transitions false -> true.
            if is_complete && !s.is_complete {
                s.is_complete = true;
                changed = true;
            }
        }

        changed
    }
}
