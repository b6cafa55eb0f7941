// src/lib.rs

pub mod cli;
pub mod config;
pub mod dag;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod logging;

use std::io::{self, Write};
use std::sync::Arc;

use tracing::{debug, info};

use crate::cli::CliArgs;
use crate::config::{load_config, ConfigFile};
use crate::dag::Graph;
use crate::engine::{RunOptions, Scheduler};
use crate::errors::Result;
use crate::exec::executor::step_env;
use crate::exec::{OutputMode, OutputSink, Shell};

/// High-level entry point used by `main.rs`.
///
/// Every source is loaded before anything runs, so a typo in the last file
/// fails fast. The configs then run one after another; the first failure
/// stops the whole invocation.
pub async fn run(args: CliArgs, shell: Shell) -> Result<()> {
    let mut configs = Vec::with_capacity(args.sources.len());
    for source in args.sources.iter() {
        debug!(source = %source, "loading config");
        configs.push((source.as_str(), load_config(source).await?));
    }

    if args.dry_run {
        let stdout = io::stdout();
        let mut out = stdout.lock();
        for (source, cfg) in configs.iter() {
            let graph = Graph::build(cfg)?;
            write_plan(&mut out, source, cfg, &graph)?;
        }
        debug!("dry-run complete (no execution)");
        return Ok(());
    }

    let options = RunOptions {
        max_workers: args.max_workers,
        output_mode: if args.prefix_output {
            OutputMode::Prefixed
        } else {
            OutputMode::Raw
        },
    };
    let scheduler = Scheduler::new(Arc::new(shell), options);

    for (source, cfg) in configs.iter() {
        info!(source = %source, "running config");
        scheduler
            .run(cfg, Some(OutputSink::stdout()), Some(OutputSink::stderr()))
            .await?;
    }
    Ok(())
}

/// Dry-run output: the waves a run would go through, with each job's steps.
fn write_plan(out: &mut impl Write, source: &str, cfg: &ConfigFile, graph: &Graph) -> io::Result<()> {
    writeln!(out, "jobgraph dry-run: {source}")?;
    if let Some(version) = cfg.version.as_deref() {
        writeln!(out, "  version = {version}")?;
    }
    writeln!(out, "  jobs = {}", graph.len())?;

    for (wave, layer) in graph.layers().iter().enumerate() {
        writeln!(out)?;
        writeln!(out, "wave {wave}:")?;
        for idx in layer {
            let node = graph.node(*idx);
            if node.job.name.is_empty() {
                writeln!(out, "  - {}", node.id)?;
            } else {
                writeln!(out, "  - {} ({})", node.id, node.job.name)?;
            }
            if !node.job.needs.is_empty() {
                writeln!(out, "      needs: {}", node.job.needs.join(", "))?;
            }
            for step in node.job.steps.iter() {
                writeln!(out, "      step {}: {}", step.name, step.run)?;
                let env = step_env(step);
                if !env.is_empty() {
                    writeln!(out, "        env: {}", env.encode().join(" "))?;
                }
            }
        }
    }
    Ok(())
}
