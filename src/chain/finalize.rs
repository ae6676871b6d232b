// src/chain/finalize.rs

//! Topological finalization of a [`ChainGraph`].

use tracing::{debug, warn};

use crate::chain::graph::{ChainGraph, ChainNodeId};
use crate::chain::id_alloc::ChainIdAllocator;
use crate::dag::stable_toposort;
use crate::errors::Result;

impl ChainGraph {
    /// Order chain nodes topologically, allocate one chain id per node in
    /// that order, and flatten member tasks into the execution order.
    ///
    /// Ties between independent chains go to the earlier-created node.
    /// Calling this on an already finalized graph is a no-op; ids are never
    /// requested twice for the same chain.
    pub fn finalize(&mut self, allocator: &mut dyn ChainIdAllocator) -> Result<()> {
        if self.is_finalized() {
            if !self.is_empty() {
                warn!("chain graph already finalized; keeping existing chain ids");
            }
            return Ok(());
        }

        let order = stable_toposort(&self.graph)?;

        let mut ordered_tasks = Vec::with_capacity(order.iter().map(|&i| self.graph[i].len()).sum());
        for &index in order.iter() {
            let node = &mut self.graph[index];
            let chain_id = allocator.allocate_chain_id(node.stream_id());
            node.chain_id = Some(chain_id);
            ordered_tasks.extend(node.task_ids().iter().copied());

            debug!(
                chain = %node.id(),
                chain_id = %chain_id,
                machine = %node.machine_id(),
                key = %node.stream_area_key(),
                tasks = node.len(),
                "allocated chain id"
            );
        }

        self.ordered_chains = order.into_iter().map(ChainNodeId).collect();
        self.ordered_tasks = ordered_tasks;
        Ok(())
    }
}
