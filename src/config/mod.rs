// src/config/mod.rs

//! Configuration loading for jobgraph.
//!
//! Responsibilities:
//! - Define the YAML/TOML-backed data model (`model.rs`).
//! - Load a config document from disk or over HTTP (`loader.rs`).
//!
//! Structural validation (missing `needs` targets, cycles) is not done here;
//! it belongs to graph construction in [`crate::dag`].

pub mod loader;
pub mod model;

pub use loader::{load_config, parse_config, ConfigFormat};
pub use model::{ConfigFile, EnvValue, JobConfig, JobId, StepConfig};
