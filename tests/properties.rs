//! Property tests for the §8 invariants that cut across modules: reducer
//! idempotence, merge-by-id never dropping ids, memory-ref dedupe, the
//! iteration-gate liveness bound, and compile/validate correspondence.
//! Per-module example-based tests already cover the individual reducers in
//! isolation (`src/channels/*.rs`); these generalize them over arbitrary
//! generated inputs with `proptest`.

use std::sync::Arc;

use proptest::prelude::*;

use flowgraph::adapter::mock::ScriptedAdapter;
use flowgraph::compiler::compile;
use flowgraph::event_bus::{EventBus, MemorySink};
use flowgraph::executor::{CancellationToken, Executor};
use flowgraph::memory::mock::InMemoryMemoryManager;
use flowgraph::node::{Node, NodeContext};
use flowgraph::reducers::ReducerRegistry;
use flowgraph::registry::NodeRegistry;
use flowgraph::state::{MemoryRef, NodeDelta, ScalarsDelta, TodoItem, WorkflowState};
use flowgraph::types::TodoStatus;
use flowgraph::workflow::model::{Edge, NodeInstance, WorkflowDefinition};
use flowgraph::workflow::templates::{autonomous_template, simple_template};
use flowgraph::workflow::validate;

fn arb_answer() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9 ]{0,20}"
}

proptest! {
    /// Invariant 3 (§8): merging a last-wins delta twice equals merging it
    /// once. `answer` is a representative last-wins scalar field.
    #[test]
    fn last_wins_scalar_merge_is_idempotent(answer in arb_answer()) {
        let registry = ReducerRegistry::with_builtins();
        let mut once = WorkflowState::new_with_input("hi", 10);
        let delta = NodeDelta::new().with_scalars(ScalarsDelta {
            answer: Some(answer.clone()),
            ..Default::default()
        });
        registry.apply_all(&mut once, &delta);

        let mut twice = WorkflowState::new_with_input("hi", 10);
        registry.apply_all(&mut twice, &delta);
        registry.apply_all(&mut twice, &delta);

        prop_assert_eq!(once.scalars.answer, twice.scalars.answer);
        prop_assert_eq!(once.versions.scalars, twice.versions.scalars);
    }

    /// Invariant 5 (§8): `todos` after merge-by-id contains the same ids as
    /// before plus any newly introduced ids; an id already present is never
    /// dropped by a later merge.
    #[test]
    fn merge_by_id_never_drops_an_id(
        existing_ids in prop::collection::hash_set("[a-z]{1,4}", 0..6),
        incoming_ids in prop::collection::hash_set("[a-z]{1,4}", 0..6),
    ) {
        let registry = ReducerRegistry::with_builtins();
        let mut state = WorkflowState::new_with_input("hi", 10);
        for id in &existing_ids {
            state.todos.push(TodoItem::new_pending(id.clone(), "t", "d"));
        }
        let before: std::collections::HashSet<_> = state.todos.iter().map(|t| t.id.clone()).collect();

        let incoming: Vec<_> = incoming_ids.iter().map(|id| TodoItem::new_pending(id.clone(), "t", "d")).collect();
        let delta = NodeDelta::new().with_todos(incoming);
        registry.apply_all(&mut state, &delta);

        let after: std::collections::HashSet<_> = state.todos.iter().map(|t| t.id.clone()).collect();
        for id in &before {
            prop_assert!(after.contains(id));
        }
        for id in &incoming_ids {
            prop_assert!(after.contains(id));
        }
        prop_assert_eq!(after.len(), before.union(&incoming_ids).count());
    }

    /// Invariant 6 (§8): `memoryRefs` never contains duplicate `filename`
    /// entries, regardless of how many overlapping batches are merged.
    #[test]
    fn memory_refs_never_duplicate_filenames(
        batch1 in prop::collection::vec("[a-z]{1,4}\\.md", 0..6),
        batch2 in prop::collection::vec("[a-z]{1,4}\\.md", 0..6),
    ) {
        let registry = ReducerRegistry::with_builtins();
        let mut state = WorkflowState::new_with_input("hi", 10);

        let to_refs = |names: &[String]| -> Vec<MemoryRef> {
            names
                .iter()
                .map(|n| MemoryRef { filename: n.clone(), source: "s".into(), char_count: 1, injected_at_turn: 0 })
                .collect()
        };

        registry.apply_all(&mut state, &NodeDelta::new().with_memory_refs(to_refs(&batch1)));
        registry.apply_all(&mut state, &NodeDelta::new().with_memory_refs(to_refs(&batch2)));

        let mut seen = std::collections::HashSet::new();
        for r in &state.memory_refs {
            prop_assert!(seen.insert(r.filename.clone()), "duplicate filename {}", r.filename);
        }
    }

    /// Invariant (ii), §3.1: `isComplete = true` is monotonic under any
    /// sequence of true/false-setting deltas.
    #[test]
    fn is_complete_is_monotonic_under_any_sequence(flags in prop::collection::vec(any::<bool>(), 0..10)) {
        let registry = ReducerRegistry::with_builtins();
        let mut state = WorkflowState::new_with_input("hi", 10);
        let mut expected = false;
        for flag in flags {
            let delta = NodeDelta::new().with_scalars(ScalarsDelta { is_complete: Some(flag), ..Default::default() });
            registry.apply_all(&mut state, &delta);
            expected = expected || flag;
            prop_assert_eq!(state.scalars.is_complete, expected);
        }
    }
}

/// Invariant 1 (§8): a well-formed definition always compiles; a
/// definition that drops the sole `start` node always fails validation and
/// therefore never reaches the compiler.
#[test]
fn valid_templates_compile_and_invalid_ones_fail_validation() {
    let registry = NodeRegistry::with_builtins();
    for def in [simple_template(), autonomous_template()] {
        assert!(validate(&def).is_ok());
        assert!(compile(&def, &registry).is_ok());
    }

    let mut broken = simple_template();
    broken.nodes.retain(|n| n.node_type != "start");
    broken.edges.retain(|e| e.source != "start");
    let errors = validate(&broken).unwrap_err();
    assert!(!errors.is_empty());
}

/// Invariant 2 (§8): any compiled graph halts in at most `maxIterations`
/// node executions, with the iteration gate as "the sole termination
/// authority" (Design Notes §9). Builds an `llm_call` -> `post_model` ->
/// `iteration_gate` cycle (the gate routes back into `llm_call` on
/// `continue`) and confirms the gate trips exactly at the configured cap
/// for any cap in a small range.
fn gated_loop_definition() -> WorkflowDefinition {
    WorkflowDefinition::new("loop")
        .with_node(NodeInstance::new("start", "start", "Start"))
        .with_node(NodeInstance::new("call", "llm_call", "Call"))
        .with_node(NodeInstance::new("post", "post_model", "Post"))
        .with_node(NodeInstance::new("gate", "iteration_gate", "Gate"))
        .with_node(NodeInstance::new("end", "end", "End"))
        .with_edge(Edge::new("e1", "start", "call"))
        .with_edge(Edge::new("e2", "call", "post"))
        .with_edge(Edge::new("e3", "post", "gate"))
        .with_edge(Edge::new("e4", "gate", "call").with_port("continue"))
        .with_edge(Edge::new("e5", "gate", "end").with_port("stop"))
}

proptest! {
    #[test]
    fn iteration_gate_halts_exactly_at_the_configured_cap(max_iterations in 1u32..6) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        let (iteration, is_complete) = rt.block_on(async {
            let registry = NodeRegistry::with_builtins();
            let graph = Arc::new(compile(&gated_loop_definition(), &registry).expect("gated loop compiles"));
            let bus = EventBus::with_sink(MemorySink::default());
            let executor = Executor::new(graph, bus.get_emitter());

            let responses: Vec<String> = (0..max_iterations + 2).map(|_| "keep going".to_string()).collect();
            let ctx = NodeContext::new(
                "s1",
                Arc::new(ScriptedAdapter::new(responses)),
                Arc::new(InMemoryMemoryManager::new(vec![])),
                1,
                "mock-model",
            );

            let state = executor
                .invoke_full("go", &ctx, max_iterations, CancellationToken::new())
                .await
                .expect("gated loop halts");

            (state.scalars.iteration, state.scalars.is_complete)
        });

        prop_assert_eq!(iteration, max_iterations);
        prop_assert!(is_complete);
    }
}

/// Invariant 4 (§8): `messages` after an invocation is an append-only
/// extension of the initial `[userInput]` — the seeded user message is
/// always message zero and is never rewritten.
#[tokio::test]
async fn messages_are_append_only_from_the_seeded_input() {
    let registry = NodeRegistry::with_builtins();
    let graph = Arc::new(compile(&simple_template(), &registry).expect("template compiles"));
    let bus = EventBus::with_sink(MemorySink::default());
    let executor = Executor::new(graph, bus.get_emitter());
    let ctx = NodeContext::new(
        "s1",
        Arc::new(ScriptedAdapter::new(vec!["pong"])),
        Arc::new(InMemoryMemoryManager::new(vec![])),
        1,
        "mock-model",
    );

    let state = executor.invoke_full("ping", &ctx, 10, CancellationToken::new()).await.unwrap();

    assert!(!state.messages.is_empty());
    assert_eq!(state.messages[0].content, "ping");
    for pair in state.messages.windows(2) {
        assert_ne!(pair[0].content, "", "append-only history should not contain rewritten blanks");
    }
}

/// Boundary behavior (§8): an empty `todos` list routes Check Progress to
/// `complete` immediately.
#[tokio::test]
async fn check_progress_routes_complete_on_empty_todos() {
    let registry = NodeRegistry::with_builtins();
    let spec = registry.get("check_progress").expect("check_progress is a built-in node type");
    let ctx = NodeContext::new(
        "s1",
        Arc::new(ScriptedAdapter::new(Vec::<&str>::new())),
        Arc::new(InMemoryMemoryManager::new(vec![])),
        1,
        "mock-model",
    );
    let state = WorkflowState::new_with_input("hi", 10);
    let config = serde_json::json!({});
    let _delta = spec.capability.execute(&state, &ctx, &config).await.unwrap();
    let route = spec.capability.routing_function(&config).unwrap()(&state);
    assert_eq!(route, "complete");
}

/// Boundary behavior (§8): a `TodoStatus` merge that updates only the
/// status field leaves the rest of the item untouched.
#[test]
fn todo_status_transition_preserves_other_fields() {
    let registry = ReducerRegistry::with_builtins();
    let mut state = WorkflowState::new_with_input("hi", 10);
    state.todos.push(TodoItem::new_pending("1", "title", "desc"));

    let mut updated = state.todos[0].clone();
    updated.status = TodoStatus::Completed;
    updated.result = Some("done".into());
    registry.apply_all(&mut state, &NodeDelta::new().with_todos(vec![updated]));

    assert_eq!(state.todos[0].title, "title");
    assert_eq!(state.todos[0].description, "desc");
    assert_eq!(state.todos[0].status, TodoStatus::Completed);
    assert_eq!(state.todos[0].result.as_deref(), Some("done"));
}
