// src/exec/executor.rs

//! Per-job execution: run a node's steps one after another.

use std::process::Stdio;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::config::model::StepConfig;
use crate::dag::Node;
use crate::engine::pool::Worker;
use crate::errors::{JobgraphError, Result};
use crate::exec::env::Env;
use crate::exec::output::{copy_lines, LinePrefix, OutputMode, OutputSink};
use crate::exec::shell::CommandExecutor;

/// Runs the steps of a job against a [`CommandExecutor`].
///
/// Builtin variables exposed to every step:
/// - `JOBGRAPH_JOB_ID`
/// - `JOBGRAPH_JOB_NAME`
/// - `JOBGRAPH_WORKER_ID`
/// - `JOBGRAPH_STEP_NAME`
///
/// Step `env` entries are applied last and win over both the builtins and the
/// inherited environment.
#[derive(Debug, Clone)]
pub struct Executor {
    commands: Arc<dyn CommandExecutor>,
    /// Receives step stdout. Required.
    stdout: Option<OutputSink>,
    /// Receives step stderr. Falls back to `stdout` when unset.
    stderr: Option<OutputSink>,
    mode: OutputMode,
}

struct Sinks<'a> {
    stdout: &'a OutputSink,
    stderr: &'a OutputSink,
    prefix: Option<LinePrefix>,
}

impl Executor {
    pub fn new(
        commands: Arc<dyn CommandExecutor>,
        stdout: Option<OutputSink>,
        stderr: Option<OutputSink>,
        mode: OutputMode,
    ) -> Self {
        Self {
            commands,
            stdout,
            stderr,
            mode,
        }
    }

    /// Execute every step of `node` in order on behalf of `worker`.
    ///
    /// Returns at the first step that fails to spawn or exits non-zero; later
    /// steps are not started.
    pub async fn execute(&self, worker: &Worker, node: &Node) -> Result<()> {
        let stdout = self.stdout.as_ref().ok_or(JobgraphError::MissingStdout)?;
        let stderr = self.stderr.as_ref().unwrap_or(stdout);

        let prefix = match self.mode {
            OutputMode::Raw => None,
            OutputMode::Prefixed => Some(LinePrefix::with_fields(&[
                ("worker", worker.id.to_string()),
                ("job", node.id.clone()),
            ])),
        };
        let sinks = Sinks {
            stdout,
            stderr,
            prefix,
        };

        let mut job_env = Env::new();
        job_env.set_builtin("JOB_ID", &node.id);
        job_env.set_builtin("JOB_NAME", &node.job.name);
        job_env.set_builtin("WORKER_ID", worker.id);

        info!(
            job = %node.id,
            worker = worker.id,
            steps = node.job.steps.len(),
            "starting job"
        );

        for step in node.job.steps.iter() {
            let mut env = job_env.clone();
            env.set_builtin("STEP_NAME", &step.name);
            env.merge(&step_env(step));

            self.run_step(worker, node, step, &env, &sinks).await?;
        }

        info!(job = %node.id, worker = worker.id, "job finished");
        Ok(())
    }

    async fn run_step(
        &self,
        worker: &Worker,
        node: &Node,
        step: &StepConfig,
        env: &Env,
        sinks: &Sinks<'_>,
    ) -> Result<()> {
        let mut cmd = self.commands.command(&worker.cancel, &step.run)?;
        env.apply(&mut cmd);
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        debug!(job = %node.id, step = %step.name, run = %step.run, "spawning step");

        let mut child = cmd.spawn().map_err(|source| JobgraphError::Spawn {
            job: node.id.clone(),
            step: step.name.clone(),
            source,
        })?;

        let out_pipe = child.stdout.take();
        let err_pipe = child.stderr.take();
        let prefix = sinks.prefix.as_ref();

        let forward_out = async {
            match out_pipe {
                Some(pipe) => copy_lines(pipe, sinks.stdout, prefix).await,
                None => Ok(()),
            }
        };
        let forward_err = async {
            match err_pipe {
                Some(pipe) => copy_lines(pipe, sinks.stderr, prefix).await,
                None => Ok(()),
            }
        };

        // The next step may only start once the process has exited and both
        // pipes are drained.
        let (status, out_res, err_res) = tokio::join!(child.wait(), forward_out, forward_err);

        let status = status.map_err(|source| JobgraphError::Wait {
            job: node.id.clone(),
            step: step.name.clone(),
            source,
        })?;

        if !status.success() {
            let code = status.code().unwrap_or(-1);
            warn!(job = %node.id, step = %step.name, exit_code = code, "step failed");
            return Err(JobgraphError::StepFailed {
                job: node.id.clone(),
                step: step.name.clone(),
                code,
            });
        }

        out_res?;
        err_res?;
        debug!(job = %node.id, step = %step.name, "step succeeded");
        Ok(())
    }
}

/// The user-declared `env` of a step, rendered as text.
pub fn step_env(step: &StepConfig) -> Env {
    step.env.iter().map(|(key, value)| (key.as_str(), value)).collect()
}
