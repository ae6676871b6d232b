// src/chain/plan.rs

//! Serializable snapshot of a finalized chain graph.

use serde::Serialize;

use crate::chain::graph::{ChainGraph, ChainNodeId};
use crate::dag::TaskGraph;
use crate::errors::{Result, TaskChainError};
use crate::types::{AreaId, ChainId, MachineId, StreamId};

/// What downstream consumers need from a finalized [`ChainGraph`]: chains in
/// topological order with their ids and members, plus the flattened task
/// execution order.
#[derive(Debug, Clone, Serialize)]
pub struct ChainPlan {
    pub chains: Vec<PlannedChain>,
    pub task_order: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlannedChain {
    pub chain_id: ChainId,
    pub machine: MachineId,
    pub area: AreaId,
    pub stream: StreamId,
    pub tasks: Vec<String>,
    pub successors: Vec<ChainId>,
}

impl ChainPlan {
    pub fn from_graphs(task_graph: &TaskGraph, chain_graph: &ChainGraph) -> Result<Self> {
        if !chain_graph.is_finalized() {
            return Err(TaskChainError::invariant(
                "chain plan requested before the chain graph was finalized",
            ));
        }

        let name_of = |task| task_graph.node(task).name().to_string();

        let mut chains = Vec::with_capacity(chain_graph.len());
        for node in chain_graph.ordered_chains() {
            let chain_id = require_chain_id(node.chain_id(), node.id())?;

            let mut successors = chain_graph
                .successors(node.id())
                .map(|succ| require_chain_id(chain_graph.node(succ).chain_id(), succ))
                .collect::<Result<Vec<_>>>()?;
            successors.sort();

            chains.push(PlannedChain {
                chain_id,
                machine: node.machine_id(),
                area: node.stream_area_key().area,
                stream: node.stream_id(),
                tasks: node.task_ids().iter().copied().map(name_of).collect(),
                successors,
            });
        }

        let task_order = chain_graph
            .ordered_task_ids()
            .iter()
            .copied()
            .map(name_of)
            .collect();

        Ok(Self { chains, task_order })
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

fn require_chain_id(chain_id: Option<ChainId>, node: ChainNodeId) -> Result<ChainId> {
    chain_id.ok_or_else(|| TaskChainError::invariant(format!("chain {node} has no chain id")))
}
