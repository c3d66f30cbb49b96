use std::sync::{Arc, Mutex};

/// Sink for human-readable protocol lines emitted by sequence controllers.
///
/// Purely observational: nothing the engine decides depends on what a sink
/// does with a line.
pub trait ProtocolSink {
    fn line(&mut self, line: &str);
}

/// Discards every line.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl ProtocolSink for NullSink {
    #[inline]
    fn line(&mut self, _line: &str) {}
}

/// In-memory sink whose buffer can be shared with the code that inspects it.
///
/// Clones share the same buffer, so a clone can be handed to a controller
/// while the original is kept for assertions.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    lines: Arc<Mutex<Vec<String>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all lines received so far.
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().map(|g| g.clone()).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.lines.lock().map(|g| g.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ProtocolSink for MemorySink {
    fn line(&mut self, line: &str) {
        if let Ok(mut lines) = self.lines.lock() {
            lines.push(line.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_sink_clones_share_buffer() {
        let sink = MemorySink::new();
        let mut writer = sink.clone();
        writer.line("seq 1 trial 1");
        writer.line("seq 1 trial 2");
        assert_eq!(sink.len(), 2);
        assert_eq!(sink.lines()[1], "seq 1 trial 2");
    }

    #[test]
    fn null_sink_accepts_anything() {
        let mut sink = NullSink;
        sink.line("ignored");
    }
}
