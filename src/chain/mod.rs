// src/chain/mod.rs

//! Compression of the task graph into a chain graph.
//!
//! - [`merger`] merges one machine's tasks into chains using the
//!   ancestor-bitset subset test ([`bits`]).
//! - [`partition`] groups tasks by machine and runs the mergers on a
//!   bounded worker pool.
//! - [`graph`] wraps merged chains in chain nodes and rebuilds chain edges.
//! - [`finalize`] orders the chain graph, allocates chain ids
//!   ([`id_alloc`]) and flattens the task order.
//! - [`plan`] is the serializable result handed to downstream consumers.

pub mod bits;
pub mod finalize;
pub mod graph;
pub mod id_alloc;
pub mod merger;
pub mod partition;
pub mod plan;

pub use bits::AncestorBits;
pub use graph::{ChainGraph, ChainNode, ChainNodeId};
pub use id_alloc::{ChainIdAllocator, StreamChainIdAllocator};
pub use merger::{Chain, ChainMerger};
pub use partition::{MergeOptions, group_by_machine, merge_machines, worker_pool_size};
pub use plan::{ChainPlan, PlannedChain};
