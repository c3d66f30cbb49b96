//! Protocol sinks that leave the process: tracing events and a plain file.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;

use staircase_traits::ProtocolSink;

/// Emits each protocol line as an `info!` event on target `staircase::protocol`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl ProtocolSink for TracingSink {
    fn line(&mut self, line: &str) {
        tracing::info!(target: "staircase::protocol", "{line}");
    }
}

/// Appends each protocol line to a file; write failures are logged and dropped.
#[derive(Debug, Clone)]
pub struct FileProtocol {
    path: PathBuf,
}

impl FileProtocol {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ProtocolSink for FileProtocol {
    fn line(&mut self, line: &str) {
        let written = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .and_then(|mut file| writeln!(file, "{line}"));
        if let Err(e) = written {
            tracing::warn!(path = %self.path.display(), error = %e, "protocol line not written");
        }
    }
}
