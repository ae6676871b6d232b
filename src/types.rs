// src/types.rs

//! Small identifier types shared by the task graph and the chain graph.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Machine a task is placed on. Chains never span machines.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct MachineId(pub u32);

/// Logical area a task belongs to.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct AreaId(pub u32);

/// Globally unique work stream id (device stream on a given machine).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct StreamId(pub u64);

impl fmt::Display for MachineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for AreaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for StreamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The `(area, stream)` pair every member of a chain shares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct StreamAreaKey {
    pub area: AreaId,
    pub stream: StreamId,
}

impl StreamAreaKey {
    pub fn new(area: AreaId, stream: StreamId) -> Self {
        Self { area, stream }
    }
}

impl fmt::Display for StreamAreaKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "area {} / stream {}", self.area, self.stream)
    }
}

/// Identifier handed out by a [`crate::chain::ChainIdAllocator`].
///
/// Ordering is by stream first, then by the per-stream index, so ids issued
/// for one stream compare strictly increasing in allocation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ChainId {
    pub stream: StreamId,
    pub index: u64,
}

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.stream, self.index)
    }
}

/// Kind of a task-level edge.
///
/// - `Dependency`: the destination consumes something the source produces.
///   These edges define the ancestor relation.
/// - `Ordering`: an auxiliary edge that only constrains execution order
///   (e.g. a model-update task that must run after forward/backward). It
///   never contributes ancestors and never becomes a chain edge on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum EdgeKind {
    Dependency,
    Ordering,
}
