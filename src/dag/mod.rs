// src/dag/mod.rs

//! Dependency graph construction.
//!
//! - [`graph`] turns a config's job map into an arena of nodes with mirrored
//!   dependency/dependent edges and a synthetic root.
//! - [`cycle`] holds the depth-first cycle detector used during construction.

pub mod cycle;
pub mod graph;

pub use graph::{Graph, Node, NodeIndex, ROOT_ID};
