//! # flowgraph: workflow compilation and execution for LLM agents
//!
//! `flowgraph` is the core of a visual workflow engine: it takes a
//! `WorkflowDefinition` (the serializable graph a visual editor produces),
//! validates it, compiles it into an executable [`compiler::CompiledGraph`],
//! and drives that graph to completion for a given input, merging each
//! node's delta into a versioned, channel-based state under the reducers in
//! [`reducers`].
//!
//! The LLM subprocess, chat ingress, HTTP controllers, and long-term memory
//! internals are out of scope here — this crate only consumes them, through
//! the [`adapter::ModelAdapter`] and [`memory::MemoryManager`] capability
//! traits.
//!
//! ## Core concepts
//!
//! - **State**: [`state::WorkflowState`], a struct of channels (`messages`,
//!   `todos`, `memory_refs`, `metadata`, `scalars`), each with its own merge
//!   reducer and a version counter bumped only when it actually changes.
//! - **Nodes**: [`node::Node`], an async capability every built-in node type
//!   in [`nodes`] implements; optionally contributes a routing function.
//! - **Workflow**: [`workflow::WorkflowDefinition`], validated by
//!   [`workflow::validate`] and persisted by [`workflow::WorkflowStore`].
//! - **Compiler**: [`compiler::compile`] turns a definition into a
//!   [`compiler::CompiledGraph`]; [`compiler::explain`] reports the same
//!   wiring decisions without executing anything.
//! - **Executor**: [`executor::Executor`] drives one compiled graph per
//!   invocation, sequentially, emitting lifecycle events over [`event_bus`].
//! - **Session**: [`session::SessionFacade`] owns one session's adapter,
//!   memory manager, and compiled graph, and serializes its invocations.
//!
//! ## Quick start
//!
//! ```
//! use flowgraph::message::ChatMessage;
//! use flowgraph::types::Role;
//!
//! let user_msg = ChatMessage::user("What's the weather like?");
//! let assistant_msg = ChatMessage::assistant("It's sunny and 75°F!");
//! assert!(user_msg.has_role(Role::User));
//! ```
//!
//! ### Building and compiling a workflow
//!
//! ```
//! use flowgraph::registry::NodeRegistry;
//! use flowgraph::workflow::templates::simple_template;
//! use flowgraph::compiler;
//!
//! let registry = NodeRegistry::with_builtins();
//! let definition = simple_template();
//! let graph = compiler::compile(&definition, &registry).expect("template compiles");
//! assert!(graph.nodes.contains_key("llm_call"));
//! ```
//!
//! ### Running a graph end to end (test-only capability mocks)
//!
//! ```
//! # #[cfg(any(test, feature = "test-util"))]
//! # async fn example() {
//! use std::sync::Arc;
//! use flowgraph::adapter::mock::ScriptedAdapter;
//! use flowgraph::memory::mock::InMemoryMemoryManager;
//! use flowgraph::compiler;
//! use flowgraph::event_bus::EventBus;
//! use flowgraph::executor::{CancellationToken, Executor};
//! use flowgraph::node::NodeContext;
//! use flowgraph::registry::NodeRegistry;
//! use flowgraph::workflow::templates::simple_template;
//!
//! let registry = NodeRegistry::with_builtins();
//! let graph = Arc::new(compiler::compile(&simple_template(), &registry).unwrap());
//! let bus = EventBus::with_sink(flowgraph::event_bus::MemorySink::default());
//! let executor = Executor::new(graph, bus.get_emitter());
//! let ctx = NodeContext::new(
//!     "s1",
//!     Arc::new(ScriptedAdapter::new(vec!["pong"])),
//!     Arc::new(InMemoryMemoryManager::new(vec![])),
//!     1,
//!     "mock-model",
//! );
//! let output = executor.invoke("ping", &ctx, 10, CancellationToken::new()).await.unwrap();
//! assert_eq!(output, "pong");
//! # }
//! ```
//!
//! ## Error handling
//!
//! Every public error type is a `thiserror` enum that also implements
//! `miette::Diagnostic`, carrying an error code and, where useful, a `help`
//! string: [`workflow::StoreError`], [`compiler::CompileError`],
//! [`node::NodeError`], [`executor::RunnerError`], [`session::SessionError`],
//! [`structured_output::StructuredOutputError`].
//!
//! ## Module guide
//!
//! - [`message`] — chat messages and roles
//! - [`types`] — small shared domain enums (`Difficulty`, `ReviewResult`, …)
//! - [`state`] — the versioned, channel-based workflow state and node deltas
//! - [`channels`] — per-channel reducer implementations
//! - [`reducers`] — the registry that dispatches a delta to its channel reducers
//! - [`node`] — the `Node` capability and its execution context
//! - [`nodes`] — the built-in node set, grouped by category
//! - [`registry`] — the node type registry
//! - [`structured_output`] — JSON extraction from model output
//! - [`resilience`] — retry/fallback middleware and completion-signal parsing
//! - [`workflow`] — the workflow model, validator, store, and built-in templates
//! - [`compiler`] — workflow → executable graph
//! - [`executor`] — drives a compiled graph for one invocation
//! - [`session`] — the per-session façade tying adapter, memory, and graph together
//! - [`adapter`] — the model adapter capability (consumed, not implemented, here)
//! - [`memory`] — the memory manager capability (consumed, not implemented, here)
//! - [`event_bus`] — the node-lifecycle event stream
//! - [`telemetry`] — `tracing` formatting helpers
//! - [`utils`] — small shared helpers

pub mod adapter;
pub mod channels;
pub mod compiler;
pub mod event_bus;
pub mod executor;
pub mod memory;
pub mod message;
pub mod node;
pub mod nodes;
pub mod reducers;
pub mod registry;
pub mod resilience;
pub mod session;
pub mod state;
pub mod structured_output;
pub mod telemetry;
pub mod types;
pub mod utils;
pub mod workflow;
