// src/chain/graph.rs

use std::fmt;

use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use tracing::{debug, info};

use crate::chain::id_alloc::ChainIdAllocator;
use crate::chain::partition::{MergeOptions, group_by_machine, merge_machines};
use crate::dag::{TaskGraph, TaskId};
use crate::errors::{Result, TaskChainError};
use crate::types::{ChainId, MachineId, StreamAreaKey, StreamId};

/// Handle of a chain node inside its [`ChainGraph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChainNodeId(pub(super) NodeIndex);

impl ChainNodeId {
    pub fn index(self) -> usize {
        self.0.index()
    }
}

impl fmt::Display for ChainNodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "c{}", self.0.index())
    }
}

/// One finished chain: its member tasks in execution order plus the chain
/// id allocated during finalization.
#[derive(Debug, Clone)]
pub struct ChainNode {
    id: ChainNodeId,
    tasks: Vec<TaskId>,
    machine: MachineId,
    key: StreamAreaKey,
    pub(super) chain_id: Option<ChainId>,
}

impl ChainNode {
    pub fn id(&self) -> ChainNodeId {
        self.id
    }

    pub fn task_ids(&self) -> &[TaskId] {
        &self.tasks
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn machine_id(&self) -> MachineId {
        self.machine
    }

    pub fn stream_area_key(&self) -> StreamAreaKey {
        self.key
    }

    pub fn stream_id(&self) -> StreamId {
        self.key.stream
    }

    /// `None` until the graph is finalized.
    pub fn chain_id(&self) -> Option<ChainId> {
        self.chain_id
    }
}

/// Chain-level DAG.
///
/// Every task of the source [`TaskGraph`] belongs to exactly one chain node.
/// There is at most one edge per ordered pair of chain nodes, and an edge
/// exists iff some dependency edge of the task graph crosses from the source
/// chain into the destination chain.
#[derive(Debug)]
pub struct ChainGraph {
    pub(super) graph: DiGraph<ChainNode, ()>,
    task_to_chain: Vec<Option<ChainNodeId>>,
    pub(super) ordered_chains: Vec<ChainNodeId>,
    pub(super) ordered_tasks: Vec<TaskId>,
}

impl ChainGraph {
    /// Partition `task_graph` by machine, merge every machine in parallel,
    /// rebuild the chain edges and finalize.
    pub fn build(
        task_graph: &TaskGraph,
        allocator: &mut dyn ChainIdAllocator,
        options: &MergeOptions,
    ) -> Result<Self> {
        let machines = group_by_machine(task_graph);
        let chains = merge_machines(task_graph, &machines, options)?;

        let mut chain_graph = Self::from_chains(task_graph, chains)?;
        chain_graph.finalize(allocator)?;

        info!(
            tasks = task_graph.len(),
            chains = chain_graph.len(),
            chain_edges = chain_graph.edge_count(),
            "chain graph ready"
        );
        Ok(chain_graph)
    }

    /// Wrap merged chains in chain nodes and derive the chain-level edges.
    ///
    /// `chains` may come in any order; nodes are created sorted by the
    /// topological position of each chain's first task so that handles do
    /// not depend on how merge workers were scheduled.
    pub fn from_chains(task_graph: &TaskGraph, mut chains: Vec<Vec<TaskId>>) -> Result<Self> {
        for &task in chains.iter().flatten() {
            task_graph.require(task)?;
        }
        chains.sort_by_key(|members| members.first().map(|&t| task_graph.topo_position(t)));

        let mut graph: DiGraph<ChainNode, ()> = DiGraph::with_capacity(chains.len(), 0);
        let mut task_to_chain: Vec<Option<ChainNodeId>> = vec![None; task_graph.len()];

        for tasks in chains {
            let head = match tasks.first() {
                Some(&task) => task_graph.node(task),
                None => return Err(TaskChainError::invariant("merge produced an empty chain")),
            };
            let id = ChainNodeId(NodeIndex::new(graph.node_count()));

            for &task in tasks.iter() {
                let node = task_graph.node(task);
                if node.stream_area_key() != head.stream_area_key()
                    || node.machine_id() != head.machine_id()
                {
                    return Err(TaskChainError::invariant(format!(
                        "chain {} mixes task '{}' (machine {}, {}) with task '{}' (machine {}, {})",
                        id,
                        head.name(),
                        head.machine_id(),
                        head.stream_area_key(),
                        node.name(),
                        node.machine_id(),
                        node.stream_area_key()
                    )));
                }

                let slot = &mut task_to_chain[task.index()];
                if let Some(owner) = *slot {
                    return Err(TaskChainError::invariant(format!(
                        "task '{}' is a member of both chain {} and chain {}",
                        node.name(),
                        owner,
                        id
                    )));
                }
                *slot = Some(id);
            }

            graph.add_node(ChainNode {
                id,
                machine: head.machine_id(),
                key: head.stream_area_key(),
                tasks,
                chain_id: None,
            });
        }

        if let Some(missing) = task_to_chain.iter().position(Option::is_none) {
            let name = task_graph
                .nodes()
                .nth(missing)
                .map(|n| n.name().to_string())
                .unwrap_or_default();
            return Err(TaskChainError::invariant(format!(
                "task '{}' is not a member of any chain",
                name
            )));
        }

        let mut chain_graph = Self {
            graph,
            task_to_chain,
            ordered_chains: Vec::new(),
            ordered_tasks: Vec::new(),
        };
        chain_graph.connect_dependencies(task_graph)?;

        debug!(
            chains = chain_graph.len(),
            chain_edges = chain_graph.edge_count(),
            "rebuilt chain edges from task dependencies"
        );
        Ok(chain_graph)
    }

    /// Add one chain edge per crossing dependency, skipping duplicates.
    ///
    /// An incoming task edge counts only if its source is an ancestor of its
    /// destination; ordering-only edges are dropped here.
    fn connect_dependencies(&mut self, task_graph: &TaskGraph) -> Result<()> {
        for &dst_task in task_graph.topological_order() {
            let dst_node = task_graph.node(dst_task);
            let dst_chain = self.owner_of(dst_task)?;

            for edge in task_graph.in_edges(dst_task) {
                if !dst_node.has_ancestor(edge.src) {
                    continue;
                }
                let src_chain = self.owner_of(edge.src)?;
                if src_chain == dst_chain || self.has_chain_edge(src_chain, dst_chain) {
                    continue;
                }
                self.graph.add_edge(src_chain.0, dst_chain.0, ());
            }
        }
        Ok(())
    }

    fn owner_of(&self, task: TaskId) -> Result<ChainNodeId> {
        self.task_to_chain
            .get(task.index())
            .copied()
            .flatten()
            .ok_or_else(|| TaskChainError::invariant(format!("task {task} has no chain node")))
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

    pub fn node(&self, id: ChainNodeId) -> &ChainNode {
        &self.graph[id.0]
    }

    /// Chain nodes in creation order.
    pub fn nodes(&self) -> impl Iterator<Item = &ChainNode> {
        self.graph.node_weights()
    }

    /// The chain node owning `task`.
    pub fn chain_of(&self, task: TaskId) -> Option<&ChainNode> {
        self.owner_of(task).ok().map(|id| self.node(id))
    }

    pub fn has_chain_edge(&self, src: ChainNodeId, dst: ChainNodeId) -> bool {
        self.graph.contains_edge(src.0, dst.0)
    }

    pub fn edges(&self) -> impl Iterator<Item = (ChainNodeId, ChainNodeId)> + '_ {
        self.graph
            .edge_references()
            .map(|e| (ChainNodeId(e.source()), ChainNodeId(e.target())))
    }

    pub fn successors(&self, id: ChainNodeId) -> impl Iterator<Item = ChainNodeId> + '_ {
        self.graph
            .neighbors_directed(id.0, Direction::Outgoing)
            .map(ChainNodeId)
    }

    pub fn is_finalized(&self) -> bool {
        self.ordered_chains.len() == self.graph.node_count()
            && self.graph.node_weights().all(|n| n.chain_id.is_some())
    }

    /// Chain nodes in topological order. Empty before finalization.
    pub fn ordered_chains(&self) -> impl Iterator<Item = &ChainNode> {
        self.ordered_chains.iter().map(|&id| self.node(id))
    }

    /// All tasks, chain by chain in topological chain order. Empty before
    /// finalization.
    pub fn ordered_task_ids(&self) -> &[TaskId] {
        &self.ordered_tasks
    }
}
