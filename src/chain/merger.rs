// src/chain/merger.rs

//! Per-machine greedy chain merging.

use std::collections::HashMap;

use tracing::trace;

use crate::chain::bits::AncestorBits;
use crate::dag::{TaskGraph, TaskId};
use crate::errors::{Result, TaskChainError};
use crate::types::StreamAreaKey;

/// Machine-local numbering of every task a merge job touches.
///
/// Ids are handed out on first encounter and only index bitsets of the same
/// job.
#[derive(Debug, Default)]
struct DenseIds {
    ids: HashMap<TaskId, usize>,
}

impl DenseIds {
    fn assign(&mut self, task: TaskId) {
        let next = self.ids.len();
        self.ids.entry(task).or_insert(next);
    }

    fn get(&self, task: TaskId) -> Result<usize> {
        self.ids.get(&task).copied().ok_or_else(|| {
            TaskChainError::invariant(format!("task {task} has no dense id in this merge job"))
        })
    }

    fn len(&self) -> usize {
        self.ids.len()
    }
}

/// A group of same-stream tasks whose dependency closures nest.
#[derive(Debug, Clone)]
pub struct Chain {
    /// In absorption order; never empty.
    members: Vec<TaskId>,
    key: StreamAreaKey,
    /// Ancestors of the originating task. Not updated on absorption.
    ancestor_bits: AncestorBits,
    /// Ancestors of the originating task plus every member so far.
    ancestor_or_self_bits: AncestorBits,
}

impl Chain {
    pub fn members(&self) -> &[TaskId] {
        &self.members
    }

    pub fn stream_area_key(&self) -> StreamAreaKey {
        self.key
    }

    pub fn ancestor_or_self_bits(&self) -> &AncestorBits {
        &self.ancestor_or_self_bits
    }

    pub fn into_members(self) -> Vec<TaskId> {
        self.members
    }

    /// Everything `rhs` depends on already lies inside this chain's closure.
    fn accepts(&self, rhs: &Chain) -> bool {
        rhs.ancestor_bits.is_subset_of(&self.ancestor_or_self_bits)
    }

    fn absorb(&mut self, rhs: Chain, dense: &DenseIds) -> Result<()> {
        if self.key != rhs.key {
            return Err(TaskChainError::invariant(format!(
                "cannot merge a chain on {} into a chain on {}",
                rhs.key, self.key
            )));
        }
        for task in rhs.members {
            self.ancestor_or_self_bits.insert(dense.get(task)?)?;
            self.members.push(task);
        }
        Ok(())
    }
}

/// Merges the tasks of one machine into chains.
///
/// Everything happens in [`ChainMerger::new`]:
/// 1. number every task and every ancestor it references, in input order
/// 2. wrap each task in a singleton chain carrying its ancestor bitsets
/// 3. sweep those chains once in creation order; each one is appended to the
///    most recently registered chain with the same `(area, stream)` whose
///    ancestor-or-self set covers its ancestors, or registered itself when
///    no such chain exists
///
/// The sweep is greedy: it takes the most recent fit, not the best one, and
/// an absorbed chain is never revisited. A task without ancestors fits any
/// chain on its key.
///
/// `tasks` must follow the task graph's topological order.
#[derive(Debug)]
pub struct ChainMerger {
    dense: DenseIds,
    chains: Vec<Chain>,
    absorbed: usize,
}

impl ChainMerger {
    pub fn new(graph: &TaskGraph, tasks: &[TaskId]) -> Result<Self> {
        let dense = Self::number_tasks(graph, tasks)?;
        let singletons = Self::init_chains(graph, tasks, &dense)?;

        let mut merger = Self {
            dense,
            chains: Vec::with_capacity(singletons.len()),
            absorbed: 0,
        };
        merger.merge_chains(singletons)?;
        Ok(merger)
    }

    /// Surviving chains in registration order.
    pub fn chains(&self) -> &[Chain] {
        &self.chains
    }

    pub fn into_chains(self) -> Vec<Chain> {
        self.chains
    }

    /// Dense id given to `task` by this job, if it was encountered.
    pub fn dense_id(&self, task: TaskId) -> Option<usize> {
        self.dense.ids.get(&task).copied()
    }

    /// Width of the dense id space (tasks plus referenced ancestors).
    pub fn dense_len(&self) -> usize {
        self.dense.len()
    }

    /// Number of singleton chains folded into an earlier chain.
    pub fn absorbed(&self) -> usize {
        self.absorbed
    }

    fn number_tasks(graph: &TaskGraph, tasks: &[TaskId]) -> Result<DenseIds> {
        let mut dense = DenseIds::default();
        for &task in tasks {
            let node = graph.require(task)?;
            dense.assign(task);
            for &ancestor in node.ancestors() {
                dense.assign(ancestor);
            }
        }
        Ok(dense)
    }

    fn init_chains(graph: &TaskGraph, tasks: &[TaskId], dense: &DenseIds) -> Result<Vec<Chain>> {
        let width = dense.len();

        tasks
            .iter()
            .map(|&task| {
                let node = graph.require(task)?;

                let mut ancestor_bits = AncestorBits::with_len(width);
                for &ancestor in node.ancestors() {
                    ancestor_bits.insert(dense.get(ancestor)?)?;
                }

                let mut ancestor_or_self_bits = ancestor_bits.clone();
                ancestor_or_self_bits.insert(dense.get(task)?)?;

                Ok(Chain {
                    members: vec![task],
                    key: node.stream_area_key(),
                    ancestor_bits,
                    ancestor_or_self_bits,
                })
            })
            .collect()
    }

    fn merge_chains(&mut self, candidates: Vec<Chain>) -> Result<()> {
        let mut buckets: HashMap<StreamAreaKey, Vec<usize>> = HashMap::new();

        for rhs in candidates {
            let bucket = buckets.entry(rhs.key).or_default();

            let chains = &self.chains;
            let target = bucket
                .iter()
                .rev()
                .copied()
                .find(|&i| chains.get(i).is_some_and(|lhs| lhs.accepts(&rhs)));

            match target {
                Some(i) => {
                    let lhs = self.chains.get_mut(i).ok_or_else(|| {
                        TaskChainError::invariant(format!(
                            "bucket for {} points at missing chain {}",
                            rhs.key, i
                        ))
                    })?;
                    trace!(
                        task = %rhs.members[0],
                        into = %lhs.members[0],
                        key = %rhs.key,
                        "absorbing chain"
                    );
                    lhs.absorb(rhs, &self.dense)?;
                    self.absorbed += 1;
                }
                None => {
                    bucket.push(self.chains.len());
                    self.chains.push(rhs);
                }
            }
        }

        Ok(())
    }
}
