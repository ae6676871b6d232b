// tests/merge_pool.rs

use std::collections::{BTreeMap, HashSet};

use taskchain::chain::{MergeOptions, group_by_machine, merge_machines, worker_pool_size};
use taskchain::dag::TaskId;
use taskchain::errors::TaskChainError;
use taskchain::types::MachineId;
use taskchain_test_utils::builders::{ConfigFileBuilder, task};
use taskchain_test_utils::init_tracing;

#[test]
fn pool_is_bounded_by_machines_and_threads() {
    assert_eq!(worker_pool_size(3, Some(8)), 3);
    assert_eq!(worker_pool_size(8, Some(3)), 3);
    assert_eq!(worker_pool_size(0, None), 1);
    assert_eq!(worker_pool_size(1, None), 1);
    assert!(worker_pool_size(64, None) >= 1);
}

#[test]
fn more_machines_than_threads_still_merges_every_task_once() {
    init_tracing();

    // Six machines, two streams each, a dependency chain per machine.
    let mut builder = ConfigFileBuilder::new();
    for m in 0..6u32 {
        builder = builder
            .with_task(task(&format!("m{m}_a"), 1).machine(m).build())
            .with_task(task(&format!("m{m}_b"), 1).machine(m).after(&format!("m{m}_a")).build())
            .with_task(task(&format!("m{m}_c"), 2).machine(m).after(&format!("m{m}_b")).build());
    }
    let graph = builder.build_graph();
    let machines = group_by_machine(&graph);
    assert_eq!(machines.len(), 6);

    let options = MergeOptions {
        worker_threads: Some(2),
    };
    let chains = merge_machines(&graph, &machines, &options).unwrap();

    let mut seen = HashSet::new();
    for chain in chains.iter() {
        for &member in chain {
            assert!(seen.insert(member), "task {member} returned twice");
        }
    }
    assert_eq!(seen.len(), graph.len());

    // [a, b] and [c] per machine.
    assert_eq!(chains.len(), 12);
    assert!(chains.iter().filter(|c| c.len() == 2).count() == 6);
}

#[test]
fn empty_machine_map_yields_no_chains() {
    let graph = ConfigFileBuilder::new()
        .with_task(task("A", 1).build())
        .build_graph();

    let chains = merge_machines(&graph, &BTreeMap::new(), &MergeOptions::default()).unwrap();
    assert!(chains.is_empty());
}

#[test]
fn failing_machines_report_the_lowest_machine_id() {
    let small = ConfigFileBuilder::new()
        .with_task(task("A", 1).build())
        .build_graph();
    let mut large = ConfigFileBuilder::new();
    for i in 0..4 {
        large = large.with_task(task(&format!("T{i}"), 1).build());
    }
    let large = large.build_graph();
    let foreign = |name: &str| large.task_id(name).unwrap();

    let mut machines: BTreeMap<MachineId, Vec<TaskId>> = group_by_machine(&small);
    machines.insert(MachineId(3), vec![foreign("T2")]);
    machines.insert(MachineId(1), vec![foreign("T3")]);

    let options = MergeOptions {
        worker_threads: Some(3),
    };
    match merge_machines(&small, &machines, &options) {
        Err(TaskChainError::Invariant(msg)) => assert!(msg.contains("task t3 "), "{msg}"),
        other => panic!("expected invariant error, got {:?}", other),
    }
}
