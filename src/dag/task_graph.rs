// src/dag/task_graph.rs

use std::collections::{BTreeSet, HashMap};
use std::fmt;

use petgraph::Direction;
use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use tracing::debug;

use crate::config::model::ConfigFile;
use crate::dag::topo::stable_toposort;
use crate::errors::{Result, TaskChainError};
use crate::types::{AreaId, EdgeKind, MachineId, StreamAreaKey, StreamId};

/// Handle of a task node inside the [`TaskGraph`] that created it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(NodeIndex);

impl TaskId {
    /// Dense index in `[0, graph.len())`, stable for the graph's lifetime.
    pub fn index(self) -> usize {
        self.0.index()
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "t{}", self.0.index())
    }
}

/// A unit of computation or communication bound to one device stream.
#[derive(Debug, Clone)]
pub struct TaskNode {
    id: TaskId,
    name: String,
    machine: MachineId,
    key: StreamAreaKey,
    /// Transitive predecessors under dependency edges only.
    ancestors: BTreeSet<TaskId>,
}

impl TaskNode {
    pub fn id(&self) -> TaskId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn machine_id(&self) -> MachineId {
        self.machine
    }

    pub fn area_id(&self) -> AreaId {
        self.key.area
    }

    pub fn stream_id(&self) -> StreamId {
        self.key.stream
    }

    pub fn stream_area_key(&self) -> StreamAreaKey {
        self.key
    }

    pub fn ancestors(&self) -> &BTreeSet<TaskId> {
        &self.ancestors
    }

    pub fn has_ancestor(&self, task: TaskId) -> bool {
        self.ancestors.contains(&task)
    }
}

/// A task-level edge as seen from either endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskEdge {
    pub src: TaskId,
    pub dst: TaskId,
    pub kind: EdgeKind,
}

/// Ancestor-indexed view of a job's task graph.
///
/// Nodes live in an arena addressed by [`TaskId`]. Construction (through
/// [`TaskGraphBuilder`]) guarantees:
/// - the graph is acyclic over both edge kinds
/// - `topological_order` respects every edge
/// - every node's ancestor set is the transitive closure of its incoming
///   dependency edges
#[derive(Debug, Clone)]
pub struct TaskGraph {
    graph: DiGraph<TaskNode, EdgeKind>,
    by_name: HashMap<String, TaskId>,
    topo_order: Vec<TaskId>,
    topo_position: Vec<usize>,
}

impl TaskGraph {
    pub fn builder() -> TaskGraphBuilder {
        TaskGraphBuilder::new()
    }

    /// Build a task graph from a validated [`ConfigFile`].
    pub fn from_config(cfg: &ConfigFile) -> Result<Self> {
        let mut builder = TaskGraphBuilder::new();

        for task in cfg.task.iter() {
            builder.add_task(task.name.clone(), task.machine, task.area, task.stream)?;
        }

        for task in cfg.task.iter() {
            for dep in task.after.iter() {
                builder.add_edge_by_name(dep, &task.name, EdgeKind::Dependency)?;
            }
            for dep in task.ordered_after.iter() {
                builder.add_edge_by_name(dep, &task.name, EdgeKind::Ordering)?;
            }
        }

        builder.build()
    }

    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// The node behind `id`. Panics if `id` was issued by another graph;
    /// use [`Self::get`] or [`Self::require`] for ids of unknown origin.
    pub fn node(&self, id: TaskId) -> &TaskNode {
        &self.graph[id.0]
    }

    pub fn get(&self, id: TaskId) -> Option<&TaskNode> {
        self.graph.node_weight(id.0)
    }

    pub fn contains(&self, id: TaskId) -> bool {
        id.index() < self.graph.node_count()
    }

    /// Like [`Self::get`], but a foreign id is an invariant violation.
    pub fn require(&self, id: TaskId) -> Result<&TaskNode> {
        self.get(id).ok_or_else(|| {
            TaskChainError::invariant(format!("task {id} does not belong to this task graph"))
        })
    }

    pub fn task_id(&self, name: &str) -> Option<TaskId> {
        self.by_name.get(name).copied()
    }

    pub fn task_by_name(&self, name: &str) -> Result<&TaskNode> {
        self.task_id(name)
            .map(|id| self.node(id))
            .ok_or_else(|| TaskChainError::TaskNotFound(name.to_string()))
    }

    /// Nodes in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = &TaskNode> {
        self.graph.node_weights()
    }

    pub fn topological_order(&self) -> &[TaskId] {
        &self.topo_order
    }

    /// Position of `id` within [`Self::topological_order`].
    pub fn topo_position(&self, id: TaskId) -> usize {
        self.topo_position[id.index()]
    }

    pub fn in_edges(&self, id: TaskId) -> impl Iterator<Item = TaskEdge> + '_ {
        self.graph
            .edges_directed(id.0, Direction::Incoming)
            .map(|e| TaskEdge {
                src: TaskId(e.source()),
                dst: TaskId(e.target()),
                kind: *e.weight(),
            })
    }

    pub fn edges(&self) -> impl Iterator<Item = TaskEdge> + '_ {
        self.graph.edge_references().map(|e| TaskEdge {
            src: TaskId(e.source()),
            dst: TaskId(e.target()),
            kind: *e.weight(),
        })
    }
}

/// Incremental constructor for [`TaskGraph`].
#[derive(Debug, Default)]
pub struct TaskGraphBuilder {
    graph: DiGraph<TaskNode, EdgeKind>,
    by_name: HashMap<String, TaskId>,
}

impl TaskGraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a task node. Names must be unique within the graph.
    pub fn add_task(
        &mut self,
        name: impl Into<String>,
        machine: MachineId,
        area: AreaId,
        stream: StreamId,
    ) -> Result<TaskId> {
        let name = name.into();
        if self.by_name.contains_key(&name) {
            return Err(TaskChainError::ConfigError(format!(
                "duplicate task name '{}'",
                name
            )));
        }

        let index = self.graph.add_node(TaskNode {
            id: TaskId(NodeIndex::new(self.graph.node_count())),
            name: name.clone(),
            machine,
            key: StreamAreaKey::new(area, stream),
            ancestors: BTreeSet::new(),
        });
        let id = TaskId(index);
        self.by_name.insert(name, id);
        Ok(id)
    }

    pub fn add_edge(&mut self, src: TaskId, dst: TaskId, kind: EdgeKind) -> Result<()> {
        for id in [src, dst] {
            if id.index() >= self.graph.node_count() {
                return Err(TaskChainError::TaskNotFound(id.to_string()));
            }
        }
        if src == dst {
            return Err(TaskChainError::ConfigError(format!(
                "task '{}' cannot depend on itself",
                self.graph[src.0].name
            )));
        }
        self.graph.add_edge(src.0, dst.0, kind);
        Ok(())
    }

    pub fn add_edge_by_name(&mut self, src: &str, dst: &str, kind: EdgeKind) -> Result<()> {
        let lookup = |name: &str| {
            self.by_name
                .get(name)
                .copied()
                .ok_or_else(|| TaskChainError::TaskNotFound(name.to_string()))
        };
        let (src, dst) = (lookup(src)?, lookup(dst)?);
        self.add_edge(src, dst, kind)
    }

    /// Validate acyclicity, fix the topological order and derive ancestors.
    pub fn build(self) -> Result<TaskGraph> {
        let mut graph = self.graph;

        if let Err(cycle) = toposort(&graph, None) {
            return Err(TaskChainError::DagCycle(format!(
                "cycle detected in task graph involving task '{}'",
                graph[cycle.node_id()].name
            )));
        }

        let order = stable_toposort(&graph)?;

        // Predecessors come first in `order`, so their sets are complete by
        // the time a node reads them.
        let mut ancestors: Vec<BTreeSet<TaskId>> = vec![BTreeSet::new(); graph.node_count()];
        for &node in order.iter() {
            let mut acc = BTreeSet::new();
            for edge in graph.edges_directed(node, Direction::Incoming) {
                if *edge.weight() != EdgeKind::Dependency {
                    continue;
                }
                let src = edge.source();
                acc.insert(TaskId(src));
                acc.extend(ancestors[src.index()].iter().copied());
            }
            ancestors[node.index()] = acc;
        }

        for (index, set) in ancestors.into_iter().enumerate() {
            graph[NodeIndex::new(index)].ancestors = set;
        }

        let mut topo_position = vec![0; graph.node_count()];
        for (pos, node) in order.iter().enumerate() {
            topo_position[node.index()] = pos;
        }

        debug!(
            tasks = graph.node_count(),
            edges = graph.edge_count(),
            "built ancestor-indexed task graph"
        );

        Ok(TaskGraph {
            graph,
            by_name: self.by_name,
            topo_order: order.into_iter().map(TaskId).collect(),
            topo_position,
        })
    }
}
