#![allow(dead_code)]

use std::sync::Arc;

use jobgraph::exec::{CommandExecutor, OutputSink, SharedBuffer, Shell};

pub use jobgraph_test_utils::builders::{ConfigFileBuilder, JobConfigBuilder};
pub use jobgraph_test_utils::fake_executor::RecordingExecutor;
pub use jobgraph_test_utils::{init_tracing, with_timeout};

pub fn sh() -> Arc<dyn CommandExecutor> {
    Arc::new(Shell::new("sh", "-c"))
}

/// An in-memory sink plus the handle to read it back.
pub fn capture() -> (SharedBuffer, Option<OutputSink>) {
    let buf = SharedBuffer::new();
    let sink = OutputSink::new(buf.clone());
    (buf, Some(sink))
}

/// Position of the first line equal to `needle`.
pub fn line_index(output: &str, needle: &str) -> usize {
    output
        .lines()
        .position(|l| l == needle)
        .unwrap_or_else(|| panic!("line {needle:?} not found in:\n{output}"))
}
