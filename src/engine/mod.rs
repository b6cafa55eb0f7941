// src/engine/mod.rs

//! Orchestration engine for jobgraph.
//!
//! - [`pool`] owns the lazily growing set of persistent workers.
//! - [`scheduler`] walks the dependency graph, feeding ready jobs to the pool
//!   and unlocking dependents as results come back.

pub mod pool;
pub mod scheduler;

pub use pool::{Worker, WorkerPool, WorkItem, work_item};
pub use scheduler::{ResultNode, RunOptions, Scheduler, next_runnable};
