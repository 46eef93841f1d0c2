//! The executor (§4.7): drives a [`CompiledGraph`] for one invocation.
//! Single cooperative worker — strictly sequential node execution, no
//! internal parallelism (§5). This is a deliberate simplification of the
//! teacher's concurrent superstep/frontier scheduler
//! (`schedulers`/`runtimes::runner`): the barrier-merge *reducer* machinery
//! is kept (it's exactly what §3.1's reducer table needs), the *concurrent
//! frontier* machinery is not, because this spec's graph has exactly one
//! active node at a time.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use miette::Diagnostic;
use thiserror::Error;
use tracing::instrument;

use crate::compiler::{CompiledGraph, NextHop, Target};
use crate::event_bus::{Event, EventEmitter, EventKind};
use crate::node::{NodeContext, NodeError};
use crate::reducers::ReducerRegistry;
use crate::state::WorkflowState;
use crate::types::Role;

/// A cooperative cancellation signal, checked between nodes and raced
/// against the in-flight node's `execute` future (§5: "Cancellation during
/// a node aborts that node's I/O"). Deliberately not `tokio_util`'s
/// `CancellationToken` — this crate doesn't otherwise depend on
/// `tokio-util`, and an `AtomicBool` plus a `Notify` covers the one thing
/// the executor needs: "has anyone asked me to stop".
#[derive(Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
    notify: Arc<tokio::sync::Notify>,
}

impl CancellationToken {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
        self.notify.notify_waiters();
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Resolves once [`cancel`](Self::cancel) has been called. Resolves
    /// immediately if it already was.
    pub async fn cancelled(&self) {
        if self.is_cancelled() {
            return;
        }
        self.notify.notified().await;
    }
}

/// A hard backstop against malformed cyclic graphs that never reach a gate
/// node (§9 Design Notes: "the gate is the sole termination authority" —
/// but if a graph omits one, the executor must still not spin forever).
/// Distinct from `maxIterations`, which only bounds the semantic iteration
/// counter a Post Model node chooses to increment.
const MAX_STEPS: u64 = 100_000;

#[derive(Debug, Error, Diagnostic)]
pub enum RunnerError {
    #[error("node {node_id} ({node_type}) failed: {source}")]
    #[diagnostic(code(flowgraph::executor::node_failed))]
    Node {
        node_id: String,
        node_type: String,
        #[source]
        source: NodeError,
    },

    #[error("execution canceled")]
    #[diagnostic(code(flowgraph::executor::canceled))]
    Canceled,

    #[error("routing produced port {port} for node {node_id}, which has no matching edge")]
    #[diagnostic(
        code(flowgraph::executor::unknown_port),
        help("Add an edge from this node's {port} port, or fix the node's routing logic.")
    )]
    UnknownPort { node_id: String, port: String },

    #[error("exceeded {0} node executions without reaching an end node; the graph is missing a terminating gate")]
    #[diagnostic(code(flowgraph::executor::step_limit_exceeded))]
    StepLimitExceeded(u64),
}

/// Drives one [`CompiledGraph`] for repeated invocations (§4.7). Cheap to
/// clone — every field is an `Arc` — so `stream` can hand a clone to a
/// spawned task while the caller keeps its own handle.
#[derive(Clone)]
pub struct Executor {
    graph: Arc<CompiledGraph>,
    reducers: Arc<ReducerRegistry>,
    emitter: Arc<dyn EventEmitter>,
}

impl Executor {
    #[must_use]
    pub fn new(graph: Arc<CompiledGraph>, emitter: Arc<dyn EventEmitter>) -> Self {
        Self {
            graph,
            reducers: Arc::new(ReducerRegistry::with_builtins()),
            emitter,
        }
    }

    fn emit(&self, event: Event) {
        if let Err(err) = self.emitter.emit(event) {
            tracing::debug!(error = %err, "event emission failed (non-fatal)");
        }
    }

    /// Runs the graph to completion and returns the final state alongside
    /// the resolved output text (§4.7: first non-empty of `finalAnswer`,
    /// `answer`, `lastOutput`).
    #[instrument(skip(self, ctx, cancellation))]
    async fn run(
        &self,
        input: String,
        ctx: &NodeContext,
        max_iterations: u32,
        cancellation: CancellationToken,
    ) -> Result<(WorkflowState, String), RunnerError> {
        let mut state = WorkflowState::new_with_input(input, max_iterations);

        if let Some(text) = state.scalars.input.clone() {
            if let Err(err) = ctx.memory.record_message(Role::User, &text).await {
                tracing::debug!(error = %err, "memory record_message failed (non-fatal)");
            }
        }

        let mut event_number = 0u64;
        let mut current = self.graph.entry.clone();
        let started = Instant::now();
        let mut step = 0u64;

        loop {
            if let Target::End = current {
                event_number += 1;
                self.emit(
                    Event::new(EventKind::End, "end", "End", "end", state.scalars.iteration, elapsed_ms(started), event_number)
                        .with_stop_reason("completed"),
                );
                let output = state.resolved_output().unwrap_or_default().to_string();
                return Ok((state, output));
            }

            step += 1;
            if step > MAX_STEPS {
                return Err(RunnerError::StepLimitExceeded(MAX_STEPS));
            }

            let Target::Node(node_id) = current.clone() else {
                unreachable!("End is handled above");
            };
            let node = self.graph.nodes.get(&node_id).expect("compiler only wires known node ids");

            if cancellation.is_cancelled() {
                return self.finish_canceled(&mut state, &node_id, &node.label, &node.node_type, started, &mut event_number);
            }

            event_number += 1;
            self.emit(
                Event::new(
                    EventKind::Enter,
                    &node.id,
                    &node.label,
                    &node.node_type,
                    state.scalars.iteration,
                    elapsed_ms(started),
                    event_number,
                )
                .with_state_summary(state_summary(&state)),
            );

            let executed = tokio::select! {
                biased;
                () = cancellation.cancelled() => None,
                result = node.capability.execute(&state, ctx, &node.config) => Some(result),
            };

            let Some(result) = executed else {
                return self.finish_canceled(&mut state, &node_id, &node.label, &node.node_type, started, &mut event_number);
            };

            let delta = match result {
                Ok(delta) => delta,
                Err(node_error) => {
                    state.scalars.error = Some(node_error.to_string());
                    state.scalars.is_complete = true;
                    event_number += 1;
                    self.emit(
                        Event::new(
                            EventKind::Error,
                            &node.id,
                            &node.label,
                            &node.node_type,
                            state.scalars.iteration,
                            elapsed_ms(started),
                            event_number,
                        )
                        .with_error(node_error_type(&node_error), node_error.to_string()),
                    );
                    event_number += 1;
                    self.emit(
                        Event::new(
                            EventKind::End,
                            &node.id,
                            &node.label,
                            &node.node_type,
                            state.scalars.iteration,
                            elapsed_ms(started),
                            event_number,
                        )
                        .with_stop_reason(node_error.to_string()),
                    );
                    return Err(RunnerError::Node {
                        node_id: node_id.clone(),
                        node_type: node.node_type.clone(),
                        source: node_error,
                    });
                }
            };

            let delta_preview = delta_summary(&delta);
            let preview = delta
                .scalars
                .as_ref()
                .and_then(|s| s.last_output.clone().or_else(|| s.answer.clone()).or_else(|| s.final_answer.clone()));
            self.reducers.apply_all(&mut state, &delta);

            event_number += 1;
            let mut exit_event = Event::new(
                EventKind::Exit,
                &node.id,
                &node.label,
                &node.node_type,
                state.scalars.iteration,
                elapsed_ms(started),
                event_number,
            )
            .with_delta(delta_preview);
            if let Some(preview) = preview {
                exit_event = exit_event.with_preview(crate::resilience::truncate(&preview, 200));
            }
            self.emit(exit_event);

            let hop = self.graph.routing.get(&node_id);
            let (port, next) = match hop {
                None => (crate::workflow::model::DEFAULT_PORT.to_string(), Target::End),
                Some(NextHop::Direct { target, port_label }) => (port_label.clone(), target.clone()),
                Some(NextHop::Conditional { routing, targets, .. }) => {
                    let port = routing(&state);
                    let target = targets.get(&port).cloned().ok_or_else(|| RunnerError::UnknownPort {
                        node_id: node_id.clone(),
                        port: port.clone(),
                    })?;
                    (port, target)
                }
            };

            event_number += 1;
            self.emit(
                Event::new(
                    EventKind::Edge,
                    &node.id,
                    &node.label,
                    &node.node_type,
                    state.scalars.iteration,
                    elapsed_ms(started),
                    event_number,
                )
                .with_preview(port),
            );

            current = next;
        }
    }

    fn finish_canceled(
        &self,
        state: &mut WorkflowState,
        node_id: &str,
        node_label: &str,
        node_type: &str,
        started: Instant,
        event_number: &mut u64,
    ) -> Result<(WorkflowState, String), RunnerError> {
        state.scalars.error = Some("canceled".to_string());
        state.scalars.is_complete = true;
        *event_number += 1;
        self.emit(
            Event::new(EventKind::End, node_id, node_label, node_type, state.scalars.iteration, elapsed_ms(started), *event_number)
                .with_stop_reason("canceled"),
        );
        Err(RunnerError::Canceled)
    }

    /// `invoke(input)` → the final state's resolved output text (§4.7).
    pub async fn invoke(
        &self,
        input: impl Into<String>,
        ctx: &NodeContext,
        max_iterations: u32,
        cancellation: CancellationToken,
    ) -> Result<String, RunnerError> {
        self.run(input.into(), ctx, max_iterations, cancellation).await.map(|(_, output)| output)
    }

    /// `invoke`, but returning the full final state too — used by the
    /// session façade, which needs `isComplete`/`error` beyond the
    /// resolved output text.
    pub async fn invoke_full(
        &self,
        input: impl Into<String>,
        ctx: &NodeContext,
        max_iterations: u32,
        cancellation: CancellationToken,
    ) -> Result<WorkflowState, RunnerError> {
        self.run(input.into(), ctx, max_iterations, cancellation).await.map(|(state, _)| state)
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis() as u64
}

fn node_error_type(err: &NodeError) -> &'static str {
    match err {
        NodeError::MissingInput { .. } => "missing_input",
        NodeError::Provider(_) => "provider",
        NodeError::StructuredOutput(_) => "structured_output",
        NodeError::Serde(_) => "serde_json",
        NodeError::ValidationFailed(_) => "validation",
        NodeError::Canceled => "canceled",
    }
}

fn state_summary(state: &WorkflowState) -> serde_json::Value {
    serde_json::json!({
        "iteration": state.scalars.iteration,
        "isComplete": state.scalars.is_complete,
        "difficulty": state.scalars.difficulty,
        "reviewCount": state.scalars.review_count,
        "currentTodoIndex": state.scalars.current_todo_index,
        "todoCount": state.todos.len(),
    })
}

fn delta_summary(delta: &crate::state::NodeDelta) -> serde_json::Value {
    serde_json::json!({
        "messages": delta.messages.as_ref().map(Vec::len).unwrap_or(0),
        "todos": delta.todos.as_ref().map(Vec::len).unwrap_or(0),
        "memoryRefs": delta.memory_refs.as_ref().map(Vec::len).unwrap_or(0),
        "hasScalars": delta.scalars.is_some(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::mock::ScriptedAdapter;
    use crate::compiler::compile;
    use crate::event_bus::sink::MemorySink;
    use crate::event_bus::EventBus;
    use crate::memory::mock::InMemoryMemoryManager;
    use crate::registry::NodeRegistry;
    use crate::workflow::templates::{autonomous_template, simple_template};

    fn ctx(responses: Vec<&str>) -> NodeContext {
        NodeContext::new(
            "s1",
            Arc::new(ScriptedAdapter::new(responses)),
            Arc::new(InMemoryMemoryManager::new(vec![])),
            1,
            "primary",
        )
    }

    #[tokio::test]
    async fn simple_template_runs_one_llm_call_and_completes() {
        let registry = NodeRegistry::with_builtins();
        let graph = Arc::new(compile(&simple_template(), &registry).unwrap());
        let bus = EventBus::with_sink(MemorySink::default());
        let executor = Executor::new(graph, bus.get_emitter());

        let output = executor.invoke("ping", &ctx(vec!["pong"]), 10, CancellationToken::new()).await.unwrap();
        assert_eq!(output, "pong");
    }

    #[tokio::test]
    async fn simple_template_sets_is_complete_and_one_iteration() {
        let registry = NodeRegistry::with_builtins();
        let graph = Arc::new(compile(&simple_template(), &registry).unwrap());
        let bus = EventBus::with_sink(MemorySink::default());
        let executor = Executor::new(graph, bus.get_emitter());

        let state = executor.invoke_full("ping", &ctx(vec!["pong"]), 10, CancellationToken::new()).await.unwrap();
        assert!(state.scalars.is_complete);
        assert_eq!(state.scalars.iteration, 1);
    }

    #[tokio::test]
    async fn autonomous_template_routes_easy_classification_to_direct_answer() {
        let registry = NodeRegistry::with_builtins();
        let graph = Arc::new(compile(&autonomous_template(), &registry).unwrap());
        let bus = EventBus::with_sink(MemorySink::default());
        let executor = Executor::new(graph, bus.get_emitter());

        // memory_inject doesn't call the model; classify then direct_answer do.
        let state = executor
            .invoke_full("what is 2+2", &ctx(vec!["easy", "4"]), 10, CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(state.scalars.difficulty, Some(crate::types::Difficulty::Easy));
        assert_eq!(state.scalars.final_answer.as_deref(), Some("4"));
        assert!(state.scalars.is_complete);
    }

    #[tokio::test]
    async fn unhandled_node_error_sets_error_and_propagates() {
        let registry = NodeRegistry::with_builtins();
        let graph = Arc::new(compile(&simple_template(), &registry).unwrap());
        let bus = EventBus::with_sink(MemorySink::default());
        let executor = Executor::new(graph, bus.get_emitter());

        let ctx = NodeContext::new(
            "s1",
            Arc::new(crate::adapter::mock::FailingAdapter),
            Arc::new(InMemoryMemoryManager::new(vec![])),
            0,
            "primary",
        );
        let err = executor.invoke("ping", &ctx, 10, CancellationToken::new()).await.unwrap_err();
        assert!(matches!(err, RunnerError::Node { .. }));
    }

    #[tokio::test]
    async fn cancellation_before_a_node_runs_stops_immediately() {
        let registry = NodeRegistry::with_builtins();
        let graph = Arc::new(compile(&simple_template(), &registry).unwrap());
        let bus = EventBus::with_sink(MemorySink::default());
        let executor = Executor::new(graph, bus.get_emitter());

        let token = CancellationToken::new();
        token.cancel();
        let err = executor.invoke("ping", &ctx(vec!["pong"]), 10, token).await.unwrap_err();
        assert!(matches!(err, RunnerError::Canceled));
    }
}
