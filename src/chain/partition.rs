// src/chain/partition.rs

//! Per-machine partitioning and the parallel merge pass.

use std::collections::BTreeMap;
use std::sync::{Mutex, PoisonError};
use std::thread;

use tracing::{debug, error, info};

use crate::chain::merger::{Chain, ChainMerger};
use crate::dag::{TaskGraph, TaskId};
use crate::errors::{Result, TaskChainError};
use crate::types::MachineId;

/// Knobs for the parallel merge pass.
#[derive(Debug, Clone, Copy, Default)]
pub struct MergeOptions {
    /// Cap on merge workers. `None` uses the hardware parallelism.
    pub worker_threads: Option<usize>,
}

/// Group tasks by machine, keeping the graph's topological order within
/// each group.
pub fn group_by_machine(graph: &TaskGraph) -> BTreeMap<MachineId, Vec<TaskId>> {
    let mut machines: BTreeMap<MachineId, Vec<TaskId>> = BTreeMap::new();
    for &task in graph.topological_order() {
        machines
            .entry(graph.node(task).machine_id())
            .or_default()
            .push(task);
    }
    machines
}

/// `min(machine_count, parallelism)`, and at least one.
pub fn worker_pool_size(machine_count: usize, worker_threads: Option<usize>) -> usize {
    let parallelism = worker_threads.unwrap_or_else(|| {
        thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
    });
    machine_count.min(parallelism).max(1)
}

/// Run one [`ChainMerger`] per machine on a bounded pool and collect the
/// member lists of every resulting chain.
///
/// Returns only after every machine's job has finished. Jobs share nothing
/// but the output list, which they append to under a mutex once their merge
/// is done. The order of the returned list depends on worker scheduling.
///
/// If any job fails, the whole pass fails with the error of the lowest
/// machine id that failed.
pub fn merge_machines(
    graph: &TaskGraph,
    machines: &BTreeMap<MachineId, Vec<TaskId>>,
    options: &MergeOptions,
) -> Result<Vec<Vec<TaskId>>> {
    if machines.is_empty() {
        return Ok(Vec::new());
    }

    let pool_size = worker_pool_size(machines.len(), options.worker_threads);
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(pool_size)
        .thread_name(|i| format!("chain-merge-{i}"))
        .build()?;

    info!(
        machines = machines.len(),
        pool_size,
        tasks = graph.len(),
        "merging tasks into chains per machine"
    );

    let collected: Mutex<Vec<Vec<TaskId>>> = Mutex::new(Vec::new());
    let failures: Mutex<Vec<(MachineId, TaskChainError)>> = Mutex::new(Vec::new());

    // `scope` doubles as the completion barrier.
    pool.scope(|s| {
        for (&machine, tasks) in machines.iter() {
            let collected = &collected;
            let failures = &failures;

            s.spawn(move |_| match ChainMerger::new(graph, tasks) {
                Ok(merger) => {
                    debug!(
                        machine = %machine,
                        tasks = tasks.len(),
                        dense_ids = merger.dense_len(),
                        chains = merger.chains().len(),
                        absorbed = merger.absorbed(),
                        "machine merge finished"
                    );
                    let chains: Vec<Vec<TaskId>> = merger
                        .into_chains()
                        .into_iter()
                        .map(Chain::into_members)
                        .collect();
                    collected
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner)
                        .extend(chains);
                }
                Err(err) => {
                    error!(machine = %machine, error = %err, "machine merge failed");
                    failures
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner)
                        .push((machine, err));
                }
            });
        }
    });

    let mut failures = failures
        .into_inner()
        .unwrap_or_else(PoisonError::into_inner);
    failures.sort_by_key(|(machine, _)| *machine);
    if let Some((_, err)) = failures.into_iter().next() {
        return Err(err);
    }

    Ok(collected.into_inner().unwrap_or_else(PoisonError::into_inner))
}
