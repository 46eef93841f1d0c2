//! Memory-manager-backed nodes (§4.3): bridges the graph to the
//! [`crate::memory::MemoryManager`] capability. Failures here are
//! non-fatal (§7) — both nodes log and continue rather than propagate.

mod memory_inject;
mod transcript_record;

use std::sync::Arc;

use crate::registry::{NodeCategory, NodeRegistry, NodeSpec, ParamDescriptor, ParamKind};

pub fn register(registry: &mut NodeRegistry) {
    registry.register(NodeSpec {
        node_type: "memory_inject",
        label: "Memory Inject",
        category: NodeCategory::Memory,
        params: vec![
            ParamDescriptor::new("searchChars", ParamKind::Number, "Characters of `input` used as the search query.")
                .with_default(serde_json::json!(200)),
            ParamDescriptor::new("maxResults", ParamKind::Number, "Maximum memory entries injected.")
                .with_default(serde_json::json!(5)),
        ],
        output_ports: vec!["default"],
        capability: Arc::new(memory_inject::MemoryInject),
    });

    registry.register(NodeSpec {
        node_type: "transcript_record",
        label: "Transcript Record",
        category: NodeCategory::Memory,
        params: vec![ParamDescriptor::new("maxLength", ParamKind::Number, "Characters of `lastOutput` recorded.")
            .with_default(serde_json::json!(5000))],
        output_ports: vec!["default"],
        capability: Arc::new(transcript_record::TranscriptRecord),
    });
}
