// tests/chain_graph.rs

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use taskchain::chain::{ChainGraph, ChainPlan, MergeOptions, StreamChainIdAllocator};
use taskchain::dag::TaskGraph;
use taskchain::errors::TaskChainError;
use taskchain::types::{ChainId, EdgeKind, StreamId};
use taskchain_test_utils::builders::{ConfigFileBuilder, task};
use taskchain_test_utils::recording_allocator::RecordingAllocator;
use taskchain_test_utils::{chain_members, chain_sets, init_tracing};

fn build(graph: &TaskGraph) -> ChainGraph {
    let mut allocator = StreamChainIdAllocator::new();
    ChainGraph::build(graph, &mut allocator, &MergeOptions::default()).expect("chain graph build")
}

fn ordered_names(graph: &TaskGraph, chain_graph: &ChainGraph) -> Vec<String> {
    chain_graph
        .ordered_task_ids()
        .iter()
        .map(|&t| graph.node(t).name().to_string())
        .collect()
}

#[test]
fn scenario_linear_chain_and_lone_task() {
    init_tracing();

    let graph = ConfigFileBuilder::new()
        .with_task(task("A", 1).build())
        .with_task(task("B", 1).after("A").build())
        .with_task(task("C", 1).after("B").build())
        .with_task(task("D", 2).build())
        .build_graph();

    let chain_graph = build(&graph);

    assert_eq!(chain_graph.len(), 2);
    assert_eq!(chain_graph.edge_count(), 0);
    assert_eq!(chain_members(&graph, &chain_graph, "B"), ["A", "B", "C"]);
    assert_eq!(chain_members(&graph, &chain_graph, "D"), ["D"]);

    let ids: Vec<ChainId> = chain_graph
        .ordered_chains()
        .map(|c| c.chain_id().unwrap())
        .collect();
    assert_eq!(
        ids,
        vec![
            ChainId { stream: StreamId(1), index: 0 },
            ChainId { stream: StreamId(2), index: 0 },
        ]
    );
    assert_eq!(ordered_names(&graph, &chain_graph), ["A", "B", "C", "D"]);
}

#[test]
fn parallel_task_edges_collapse_into_one_chain_edge() {
    // Machine 0: A -> B on stream 1.
    // Machine 1: C after A and B, D after C and A, all on stream 1.
    // Three task edges cross from [A, B] into [C, D].
    let graph = ConfigFileBuilder::new()
        .with_task(task("A", 1).build())
        .with_task(task("B", 1).after("A").build())
        .with_task(task("C", 1).machine(1).after("A").after("B").build())
        .with_task(task("D", 1).machine(1).after("C").after("A").build())
        .build_graph();

    let chain_graph = build(&graph);

    assert_eq!(chain_graph.len(), 2);
    assert_eq!(chain_members(&graph, &chain_graph, "A"), ["A", "B"]);
    assert_eq!(chain_members(&graph, &chain_graph, "C"), ["C", "D"]);

    let upstream = chain_graph.chain_of(graph.task_id("A").unwrap()).unwrap().id();
    let downstream = chain_graph.chain_of(graph.task_id("D").unwrap()).unwrap().id();
    assert_eq!(chain_graph.edge_count(), 1);
    assert!(chain_graph.has_chain_edge(upstream, downstream));
    assert!(!chain_graph.has_chain_edge(downstream, upstream));
}

#[test]
fn ordering_only_edges_do_not_link_chains() {
    // U must run after A, but does not depend on it.
    let graph = ConfigFileBuilder::new()
        .with_task(task("A", 1).build())
        .with_task(task("U", 2).ordered_after("A").build())
        .build_graph();

    let u = graph.task_by_name("U").unwrap();
    assert!(u.ancestors().is_empty());
    assert_eq!(graph.in_edges(u.id()).next().unwrap().kind, EdgeKind::Ordering);

    let chain_graph = build(&graph);
    assert_eq!(chain_graph.len(), 2);
    assert_eq!(chain_graph.edge_count(), 0);
}

#[test]
fn ordering_edge_from_a_true_ancestor_still_links_chains() {
    // A -> B -> C by dependency, plus an ordering edge A -> C. A is an
    // ancestor of C through B, so the ordering edge counts.
    let graph = ConfigFileBuilder::new()
        .with_task(task("A", 1).build())
        .with_task(task("B", 2).after("A").build())
        .with_task(task("C", 3).after("B").ordered_after("A").build())
        .build_graph();

    let chain_graph = build(&graph);
    let chain = |name: &str| chain_graph.chain_of(graph.task_id(name).unwrap()).unwrap().id();

    assert_eq!(chain_graph.edge_count(), 3);
    assert!(chain_graph.has_chain_edge(chain("A"), chain("B")));
    assert!(chain_graph.has_chain_edge(chain("B"), chain("C")));
    assert!(chain_graph.has_chain_edge(chain("A"), chain("C")));
}

#[test]
fn chain_ids_follow_topological_chain_order_per_stream() {
    init_tracing();

    // A diamond across two machines and two streams.
    let graph = ConfigFileBuilder::new()
        .with_task(task("src", 1).build())
        .with_task(task("left", 2).after("src").build())
        .with_task(task("right", 1).machine(1).after("src").build())
        .with_task(task("right2", 2).machine(1).after("right").build())
        .with_task(task("sink", 1).after("left").after("right2").build())
        .build_graph();

    let requests = Arc::new(Mutex::new(Vec::new()));
    let mut allocator = RecordingAllocator::new(Arc::clone(&requests));
    let chain_graph = ChainGraph::build(&graph, &mut allocator, &MergeOptions::default()).unwrap();

    let ordered: Vec<_> = chain_graph.ordered_chains().collect();
    let requests = requests.lock().unwrap().clone();

    // One request per chain, issued in topological order.
    assert_eq!(requests.len(), chain_graph.len());
    for (chain, (stream, issued)) in ordered.iter().zip(requests.iter()) {
        assert_eq!(chain.stream_id(), *stream);
        assert_eq!(chain.chain_id(), Some(*issued));
    }

    // Per stream, ids strictly increase along the order.
    let mut last: HashMap<StreamId, ChainId> = HashMap::new();
    for (stream, issued) in requests.iter() {
        if let Some(prev) = last.insert(*stream, *issued) {
            assert!(prev < *issued);
        }
    }

    // Every edge points forward.
    let position: HashMap<_, _> = ordered.iter().enumerate().map(|(i, c)| (c.id(), i)).collect();
    for (src, dst) in chain_graph.edges() {
        assert!(position[&src] < position[&dst], "edge {src} -> {dst} points backwards");
    }
}

#[test]
fn flattened_task_order_respects_dependencies() {
    let graph = ConfigFileBuilder::new()
        .with_task(task("a", 1).build())
        .with_task(task("b", 2).after("a").build())
        .with_task(task("c", 1).after("a").build())
        .with_task(task("d", 2).after("b").after("c").build())
        .with_task(task("e", 1).machine(1).after("d").build())
        .with_task(task("f", 1).machine(1).build())
        .build_graph();

    let chain_graph = build(&graph);
    let order = chain_graph.ordered_task_ids();
    assert_eq!(order.len(), graph.len());

    let position: HashMap<_, _> = order.iter().enumerate().map(|(i, &t)| (t, i)).collect();
    assert_eq!(position.len(), graph.len());

    for edge in graph.edges().filter(|e| e.kind == EdgeKind::Dependency) {
        assert!(position[&edge.src] < position[&edge.dst]);
    }

    // Chain members stay contiguous in the flattened order.
    let mut offset = 0;
    for chain in chain_graph.ordered_chains() {
        assert_eq!(&order[offset..offset + chain.len()], chain.task_ids());
        offset += chain.len();
    }
}

#[test]
fn results_do_not_depend_on_worker_count() {
    let mut builder = ConfigFileBuilder::new();
    for machine in 0..6u32 {
        for step in 0..5u32 {
            let name = format!("m{machine}_s{step}");
            let mut t = task(&name, u64::from(step % 2)).machine(machine);
            if step > 0 {
                t = t.after(&format!("m{machine}_s{}", step - 1));
            }
            if machine > 0 && step == 2 {
                t = t.after(&format!("m{}_s4", machine - 1));
            }
            builder = builder.with_task(t.build());
        }
    }
    let graph = builder.build_graph();

    let plans: Vec<String> = [1, 2, 8]
        .into_iter()
        .map(|threads| {
            let mut allocator = StreamChainIdAllocator::new();
            let options = MergeOptions { worker_threads: Some(threads) };
            let chain_graph = ChainGraph::build(&graph, &mut allocator, &options).unwrap();
            ChainPlan::from_graphs(&graph, &chain_graph).unwrap().to_json().unwrap()
        })
        .collect();

    assert_eq!(plans[0], plans[1]);
    assert_eq!(plans[0], plans[2]);

    let single = build(&graph);
    assert_eq!(chain_sets(&graph, &single).iter().map(Vec::len).sum::<usize>(), 30);
}

#[test]
fn finalizing_twice_requests_no_new_ids() {
    let graph = ConfigFileBuilder::new()
        .with_task(task("A", 1).build())
        .with_task(task("B", 2).after("A").build())
        .build_graph();

    let mut chain_graph = build(&graph);
    let before: Vec<_> = chain_graph.ordered_chains().map(|c| c.chain_id()).collect();

    let requests = Arc::new(Mutex::new(Vec::new()));
    let mut allocator = RecordingAllocator::new(Arc::clone(&requests));
    chain_graph.finalize(&mut allocator).unwrap();

    assert!(requests.lock().unwrap().is_empty());
    let after: Vec<_> = chain_graph.ordered_chains().map(|c| c.chain_id()).collect();
    assert_eq!(before, after);
}

#[test]
fn plan_lists_chains_successors_and_task_order() {
    let graph = ConfigFileBuilder::new()
        .with_task(task("load", 1).build())
        .with_task(task("fwd", 3).area(1).after("load").build())
        .with_task(task("bwd", 3).area(1).after("fwd").build())
        .build_graph();

    let chain_graph = build(&graph);
    let plan = ChainPlan::from_graphs(&graph, &chain_graph).unwrap();

    assert_eq!(plan.chains.len(), 2);
    assert_eq!(plan.chains[0].tasks, ["load"]);
    assert_eq!(plan.chains[0].successors, vec![plan.chains[1].chain_id]);
    assert_eq!(plan.chains[1].tasks, ["fwd", "bwd"]);
    assert_eq!(plan.chains[1].stream, StreamId(3));
    assert!(plan.chains[1].successors.is_empty());
    assert_eq!(plan.task_order, ["load", "fwd", "bwd"]);

    let json = plan.to_json().unwrap();
    assert!(json.contains("\"task_order\""));
    assert!(json.contains("\"bwd\""));
}

#[test]
fn plan_requires_a_finalized_graph() {
    let graph = ConfigFileBuilder::new()
        .with_task(task("A", 1).build())
        .build_graph();
    let a = graph.task_id("A").unwrap();

    let chain_graph = ChainGraph::from_chains(&graph, vec![vec![a]]).unwrap();
    assert!(!chain_graph.is_finalized());
    assert!(chain_graph.ordered_task_ids().is_empty());

    match ChainPlan::from_graphs(&graph, &chain_graph) {
        Err(TaskChainError::Invariant(msg)) => assert!(msg.contains("finalized")),
        other => panic!("expected invariant error, got {:?}", other),
    }
}

#[test]
fn malformed_chain_lists_are_rejected() {
    let graph = ConfigFileBuilder::new()
        .with_task(task("A", 1).build())
        .with_task(task("B", 1).after("A").build())
        .with_task(task("C", 2).build())
        .build_graph();
    let [a, b, c] = ["A", "B", "C"].map(|n| graph.task_id(n).unwrap());

    let larger = ConfigFileBuilder::new()
        .with_task(task("A", 1).build())
        .with_task(task("B", 1).build())
        .with_task(task("C", 2).build())
        .with_task(task("D", 2).build())
        .build_graph();
    let foreign = larger.task_id("D").unwrap();
    assert!(!graph.contains(foreign));

    let cases: Vec<(Vec<Vec<_>>, &str)> = vec![
        (vec![vec![a, b], vec![c], vec![foreign]], "does not belong to this task graph"),
        (vec![vec![a, b]], "not a member of any chain"),
        (vec![vec![a, b], vec![b], vec![c]], "member of both"),
        (vec![vec![a, b, c]], "mixes"),
        (vec![vec![a, b], vec![], vec![c]], "empty chain"),
    ];

    for (chains, expected) in cases {
        match ChainGraph::from_chains(&graph, chains) {
            Err(TaskChainError::Invariant(msg)) => {
                assert!(msg.contains(expected), "'{msg}' does not mention '{expected}'")
            }
            other => panic!("expected invariant error mentioning '{expected}', got {:?}", other),
        }
    }
}
