// src/exec/shell.rs

//! Shell resolution and the command-construction seam.
//!
//! The shell is resolved once in `main` and handed down explicitly; nothing
//! in the crate reads `$SHELL` after startup.

use std::ffi::{OsStr, OsString};
use std::fmt::Debug;
use std::path::{Path, PathBuf};

use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::errors::{JobgraphError, Result};

/// Shells probed on the search path when `$SHELL` is not set.
const SUPPORTED_SHELLS: &[&str] = &["bash", "sh", "zsh"];

/// Builds the process for one step's `run` string.
///
/// Production code uses [`Shell`]; tests can provide an implementation that
/// wraps or rewrites commands.
pub trait CommandExecutor: Send + Sync + Debug {
    /// Prepare (but do not start) the process for `run`.
    ///
    /// Once `cancel` has fired no new process may be prepared and
    /// [`JobgraphError::Cancelled`] is returned. Processes already started
    /// are never touched.
    fn command(&self, cancel: &CancellationToken, run: &str) -> Result<Command>;
}

/// A shell binary plus the flag that makes it run one command string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Shell {
    program: PathBuf,
    flag: &'static str,
}

impl Shell {
    pub fn new(program: impl Into<PathBuf>, flag: &'static str) -> Self {
        Self {
            program: program.into(),
            flag,
        }
    }

    /// Resolve the shell for this host.
    ///
    /// Windows always uses `cmd /C`. Elsewhere `$SHELL` wins, then the first
    /// of `bash`, `sh`, `zsh` found on `$PATH`.
    pub fn resolve() -> Result<Self> {
        if cfg!(windows) {
            return Ok(Self::new("cmd", "/C"));
        }
        Self::resolve_from(std::env::var_os("SHELL"), std::env::var_os("PATH"))
    }

    /// Unix resolution against explicit `$SHELL` and `$PATH` values.
    pub fn resolve_from(shell: Option<OsString>, path: Option<OsString>) -> Result<Self> {
        if let Some(shell) = shell.filter(|s| !s.is_empty()) {
            debug!(shell = ?shell, "using shell from $SHELL");
            return Ok(Self::new(shell, "-c"));
        }

        let path = path.ok_or(JobgraphError::NoShell)?;
        SUPPORTED_SHELLS
            .iter()
            .find_map(|name| lookup_path(name, &path))
            .map(|found| {
                debug!(shell = %found.display(), "using shell found on $PATH");
                Self::new(found, "-c")
            })
            .ok_or(JobgraphError::NoShell)
    }

    pub fn program(&self) -> &Path {
        &self.program
    }
}

impl CommandExecutor for Shell {
    fn command(&self, cancel: &CancellationToken, run: &str) -> Result<Command> {
        if cancel.is_cancelled() {
            return Err(JobgraphError::Cancelled);
        }
        let mut cmd = Command::new(&self.program);
        cmd.arg(self.flag).arg(run);
        Ok(cmd)
    }
}

fn lookup_path(name: &str, path: &OsStr) -> Option<PathBuf> {
    std::env::split_paths(path)
        .map(|dir| dir.join(name))
        .find(|candidate| is_executable(candidate))
}

fn is_executable(path: &Path) -> bool {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        match std::fs::metadata(path) {
            Ok(meta) => meta.is_file() && meta.permissions().mode() & 0o111 != 0,
            Err(_) => false,
        }
    }

    #[cfg(not(unix))]
    {
        path.is_file()
    }
}
