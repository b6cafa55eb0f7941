// src/exec/mod.rs

//! Process execution layer.
//!
//! - [`env`] composes the environment of a step process.
//! - [`shell`] resolves the host shell and defines the [`CommandExecutor`]
//!   seam that turns a `run` string into a `tokio::process::Command`.
//! - [`output`] holds the write-serializing sinks and line forwarding.
//! - [`executor`] runs one job's steps in order.

pub mod env;
pub mod executor;
pub mod output;
pub mod shell;

pub use env::{Env, ENV_BUILTIN_PREFIX};
pub use executor::Executor;
pub use output::{LinePrefix, OutputMode, OutputSink, SharedBuffer};
pub use shell::{CommandExecutor, Shell};
