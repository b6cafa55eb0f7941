// src/engine/pool.rs

//! Lazily growing pool of persistent workers.
//!
//! Hand-off works through an idle queue: a worker with nothing to do pushes
//! a one-shot slot onto it and waits. `submit` is the single arbiter:
//!
//! 1. take an idle slot without waiting, if one is there;
//! 2. otherwise spawn a new worker (under the cap) that starts on the item;
//! 3. otherwise wait for the next slot.
//!
//! Workers live until the pool's cancellation token fires. An item that is
//! already running is never interrupted.

use std::fmt;
use std::future::Future;
use std::pin::Pin;

use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::errors::{JobgraphError, Result};

/// Identity and cancellation scope handed to every work item.
#[derive(Debug, Clone)]
pub struct Worker {
    /// Sequential id, starting at 0 in spawn order.
    pub id: u64,
    pub cancel: CancellationToken,
}

pub type BoxFuture = Pin<Box<dyn Future<Output = ()> + Send>>;

/// Unit of work accepted by [`WorkerPool::submit`].
pub type WorkItem = Box<dyn FnOnce(Worker) -> BoxFuture + Send>;

type IdleSlot = oneshot::Sender<WorkItem>;

/// Wrap an async closure as a [`WorkItem`].
pub fn work_item<F, Fut>(f: F) -> WorkItem
where
    F: FnOnce(Worker) -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    Box::new(move |worker: Worker| -> BoxFuture { Box::pin(f(worker)) })
}

pub struct WorkerPool {
    cancel: CancellationToken,
    /// `None` means the pool may grow without bound.
    max_workers: Option<u64>,
    spawned: u64,
    idle_tx: mpsc::UnboundedSender<IdleSlot>,
    idle_rx: mpsc::UnboundedReceiver<IdleSlot>,
}

impl fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkerPool")
            .field("max_workers", &self.max_workers)
            .field("spawned", &self.spawned)
            .finish_non_exhaustive()
    }
}

impl WorkerPool {
    /// Create an empty pool. `max_workers == 0` means unbounded.
    ///
    /// No worker exists until the first [`WorkerPool::submit`].
    pub fn start(cancel: CancellationToken, max_workers: usize) -> Self {
        let (idle_tx, idle_rx) = mpsc::unbounded_channel();
        Self {
            cancel,
            max_workers: (max_workers > 0).then_some(max_workers as u64),
            spawned: 0,
            idle_tx,
            idle_rx,
        }
    }

    /// Number of workers spawned so far. Never decreases.
    pub fn spawned_workers(&self) -> u64 {
        self.spawned
    }

    /// Hand `item` to a worker, growing the pool if needed.
    ///
    /// Blocks only when every worker is busy and the pool is at its cap.
    /// Fails with [`JobgraphError::Cancelled`] if the pool is cancelled while
    /// waiting.
    pub async fn submit(&mut self, mut item: WorkItem) -> Result<()> {
        // Slots from workers that have since exited hand the item back.
        while let Ok(slot) = self.idle_rx.try_recv() {
            match slot.send(item) {
                Ok(()) => {
                    trace!("handed work to an idle worker");
                    return Ok(());
                }
                Err(returned) => item = returned,
            }
        }

        if self.can_grow() {
            self.spawn_worker(item);
            return Ok(());
        }

        loop {
            let slot = tokio::select! {
                _ = self.cancel.cancelled() => return Err(JobgraphError::Cancelled),
                slot = self.idle_rx.recv() => slot,
            };

            // The pool holds a sender itself, so the queue never closes.
            let Some(slot) = slot else {
                return Err(JobgraphError::Cancelled);
            };

            match slot.send(item) {
                Ok(()) => return Ok(()),
                Err(returned) => item = returned,
            }
        }
    }

    fn can_grow(&self) -> bool {
        match self.max_workers {
            Some(max) => self.spawned < max,
            None => true,
        }
    }

    fn spawn_worker(&mut self, first: WorkItem) {
        let worker = Worker {
            id: self.spawned,
            cancel: self.cancel.clone(),
        };
        self.spawned += 1;
        debug!(worker = worker.id, spawned = self.spawned, "spawning worker");

        let idle_tx = self.idle_tx.clone();
        tokio::spawn(worker_loop(worker, first, idle_tx));
    }
}

async fn worker_loop(worker: Worker, first: WorkItem, idle_tx: mpsc::UnboundedSender<IdleSlot>) {
    let mut next = Some(first);

    while let Some(item) = next.take() {
        item(worker.clone()).await;

        if worker.cancel.is_cancelled() {
            break;
        }

        let (slot_tx, slot_rx) = oneshot::channel();
        if idle_tx.send(slot_tx).is_err() {
            break;
        }

        next = tokio::select! {
            _ = worker.cancel.cancelled() => None,
            item = slot_rx => item.ok(),
        };
    }

    debug!(worker = worker.id, "worker exiting");
}
