//! Operator-facing rendering of the node-lifecycle event stream (§6.4),
//! distinct from `tracing` output: this is what `StdOutSink` writes, not
//! what `tracing-subscriber` formats.

use crate::event_bus::Event;

pub const CONTEXT_COLOR: &str = "\x1b[32m"; // green
pub const LINE_COLOR: &str = "\x1b[35m"; // magenta / dark pink
pub const ERROR_COLOR: &str = "\x1b[31m"; // red
pub const RESET_COLOR: &str = "\x1b[0m";

/// Rendered output for one event, ready for a sink to write out.
#[derive(Clone, Debug, Default)]
pub struct EventRender {
    pub context: Option<String>,
    pub lines: Vec<String>,
}

impl EventRender {
    #[must_use]
    pub fn join_lines(&self) -> String {
        self.lines.join("")
    }
}

pub trait TelemetryFormatter: Send + Sync {
    fn render_event(&self, event: &Event) -> EventRender;
}

#[derive(Default)]
pub struct PlainFormatter;

impl PlainFormatter {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl TelemetryFormatter for PlainFormatter {
    fn render_event(&self, event: &Event) -> EventRender {
        let color = if event.error_message.is_some() { ERROR_COLOR } else { LINE_COLOR };
        let mut line = format!("{color}{event}{RESET_COLOR}");
        if let Some(msg) = &event.error_message {
            line.push_str(&format!(" | {ERROR_COLOR}{msg}{RESET_COLOR}"));
        }
        if let Some(reason) = &event.stop_reason {
            line.push_str(&format!(" | stop: {CONTEXT_COLOR}{reason}{RESET_COLOR}"));
        }
        line.push('\n');
        EventRender {
            context: Some(event.node_id.clone()),
            lines: vec![line],
        }
    }
}
