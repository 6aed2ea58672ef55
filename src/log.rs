// Logging port — every component takes an explicit sink instead of reaching
// for a process-wide singleton, so components stay testable in isolation.

use std::sync::Arc;

use parking_lot::Mutex;

/// Destination for human-readable connector messages (the GUI log pane in the
/// full application). Structured diagnostics additionally go through `tracing`.
pub trait LogSink: Send + Sync {
    fn log(&self, message: &str);
}

/// Shared handle to a sink.
pub type SharedSink = Arc<dyn LogSink>;

/// Sink that forwards everything to `tracing` at info level.
pub struct TracingSink;

impl LogSink for TracingSink {
    fn log(&self, message: &str) {
        tracing::info!(target: "connector", "{message}");
    }
}

/// In-memory sink for tests and headless runs.
#[derive(Default)]
pub struct MemorySink {
    lines: Mutex<Vec<String>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything logged so far, in arrival order.
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().clone()
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.lines.lock().iter().any(|l| l.contains(needle))
    }
}

impl LogSink for MemorySink {
    fn log(&self, message: &str) {
        self.lines.lock().push(message.to_string());
    }
}
