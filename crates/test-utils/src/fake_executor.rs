use std::sync::{Arc, Mutex};

use jobgraph::errors::Result;
use jobgraph::exec::{CommandExecutor, Shell};
use tokio::process::Command;
use tokio_util::sync::CancellationToken;

/// A command executor that:
/// - records every `run` string it is asked to prepare, in call order
/// - delegates the actual process to `sh -c`.
///
/// Refused commands (cancelled scope) are not recorded.
#[derive(Debug, Clone)]
pub struct RecordingExecutor {
    shell: Shell,
    started: Arc<Mutex<Vec<String>>>,
}

impl RecordingExecutor {
    pub fn new() -> Self {
        Self {
            shell: Shell::new("sh", "-c"),
            started: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Snapshot of the commands prepared so far.
    pub fn started(&self) -> Vec<String> {
        self.started.lock().unwrap().clone()
    }
}

impl Default for RecordingExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandExecutor for RecordingExecutor {
    fn command(&self, cancel: &CancellationToken, run: &str) -> Result<Command> {
        let cmd = self.shell.command(cancel, run)?;
        self.started.lock().unwrap().push(run.to_string());
        Ok(cmd)
    }
}
