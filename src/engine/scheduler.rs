// src/engine/scheduler.rs

use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::config::model::ConfigFile;
use crate::dag::{Graph, NodeIndex};
use crate::engine::pool::{work_item, WorkerPool};
use crate::errors::{JobgraphError, Result};
use crate::exec::executor::Executor;
use crate::exec::output::{OutputMode, OutputSink};
use crate::exec::shell::CommandExecutor;

/// Minimum capacity of the queue carrying finished nodes back to the
/// scheduler. Larger graphs get one slot per node.
pub const RESULT_QUEUE_SIZE: usize = 1024;

/// Knobs for a single run.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    /// Upper bound on concurrently running jobs; `0` means unbounded.
    pub max_workers: usize,
    pub output_mode: OutputMode,
}

/// A finished node and how its job went.
#[derive(Debug)]
pub struct ResultNode {
    pub node: NodeIndex,
    pub result: Result<()>,
}

/// Drives one configuration from graph construction to the last job.
///
/// The scheduler owns the `done`/`waiting` bookkeeping for a run; workers
/// only ever talk back through the result queue.
#[derive(Debug, Clone)]
pub struct Scheduler {
    commands: Arc<dyn CommandExecutor>,
    options: RunOptions,
}

/// Shared pieces every submitted node needs.
struct Dispatch {
    graph: Arc<Graph>,
    executor: Arc<Executor>,
    done_tx: mpsc::Sender<ResultNode>,
}

impl Scheduler {
    pub fn new(commands: Arc<dyn CommandExecutor>, options: RunOptions) -> Self {
        Self { commands, options }
    }

    /// Build the graph for `cfg` and run it to completion.
    ///
    /// - Build errors are returned before anything executes.
    /// - The first job error aborts the run and is returned as-is. Jobs that
    ///   are still running are not waited on; the run's cancellation scope
    ///   fires so idle workers exit and no further steps start.
    pub async fn run(
        &self,
        cfg: &ConfigFile,
        stdout: Option<OutputSink>,
        stderr: Option<OutputSink>,
    ) -> Result<()> {
        let graph = Arc::new(Graph::build(cfg)?);

        let cancel = CancellationToken::new();
        let _cancel_on_exit = cancel.clone().drop_guard();

        let executor = Arc::new(Executor::new(
            Arc::clone(&self.commands),
            stdout,
            stderr,
            self.options.output_mode,
        ));
        let mut pool = WorkerPool::start(cancel.clone(), self.options.max_workers);
        // Each node reports exactly once. With a slot per node a worker never
        // blocks on its result, so it always gets back to the idle queue that
        // a blocked `submit` is waiting on.
        let (done_tx, mut done_rx) =
            mpsc::channel::<ResultNode>(RESULT_QUEUE_SIZE.max(graph.len()));
        let dispatch = Dispatch {
            graph: Arc::clone(&graph),
            executor,
            done_tx,
        };

        let total = graph.len();
        info!(
            jobs = total,
            max_workers = self.options.max_workers,
            "starting run"
        );

        let mut done: HashSet<NodeIndex> = HashSet::with_capacity(total);
        let mut waiting: BTreeSet<NodeIndex> = BTreeSet::new();

        for &idx in graph.root().dependents.iter() {
            dispatch.submit(&mut pool, idx).await?;
        }

        while done.len() < total {
            // `dispatch` keeps a sender alive, so the queue cannot close here.
            let Some(finished) = done_rx.recv().await else {
                return Err(JobgraphError::Cancelled);
            };
            let node = graph.node(finished.node);

            if let Err(err) = finished.result {
                error!(job = %node.id, error = %err, "job failed; aborting run");
                return Err(err);
            }

            debug!(job = %node.id, done = done.len() + 1, total, "job completed");
            done.insert(finished.node);
            for dependent in node.dependents.iter() {
                if !done.contains(dependent) {
                    waiting.insert(*dependent);
                }
            }

            for idx in next_runnable(&graph, &waiting, &done) {
                waiting.remove(&idx);
                dispatch.submit(&mut pool, idx).await?;
            }
        }

        info!(jobs = total, workers = pool.spawned_workers(), "run finished");
        Ok(())
    }
}

impl Dispatch {
    async fn submit(&self, pool: &mut WorkerPool, idx: NodeIndex) -> Result<()> {
        let graph = Arc::clone(&self.graph);
        let executor = Arc::clone(&self.executor);
        let done_tx = self.done_tx.clone();

        debug!(job = %graph.node(idx).id, "submitting job");
        pool.submit(work_item(move |worker| async move {
            let node = graph.node(idx);
            let result = executor.execute(&worker, node).await;
            if done_tx.send(ResultNode { node: idx, result }).await.is_err() {
                debug!(job = %node.id, "run already finished; dropping job result");
            }
        }))
        .await
    }
}

/// Nodes in `waiting` whose every dependency is in `done`, in index order.
pub fn next_runnable(
    graph: &Graph,
    waiting: &BTreeSet<NodeIndex>,
    done: &HashSet<NodeIndex>,
) -> Vec<NodeIndex> {
    waiting
        .iter()
        .copied()
        .filter(|idx| {
            graph
                .node(*idx)
                .dependencies
                .iter()
                .all(|dep| done.contains(dep))
        })
        .collect()
}
