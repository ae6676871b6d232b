// src/dag/mod.rs

//! Task-level DAG representation.
//!
//! - [`task_graph`] holds the ancestor-indexed task view consumed by the
//!   chain merger: task placement, `(area, stream)` keys, typed edges and
//!   per-node ancestor sets.
//! - [`topo`] provides the deterministic topological sort shared by the task
//!   graph and the chain graph.

pub mod task_graph;
pub mod topo;

pub use task_graph::{TaskEdge, TaskGraph, TaskGraphBuilder, TaskId, TaskNode};
pub use topo::stable_toposort;
