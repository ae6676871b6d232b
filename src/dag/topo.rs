// src/dag/topo.rs

//! Deterministic topological ordering over petgraph graphs.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex};

use crate::errors::{Result, TaskChainError};

/// Kahn's algorithm with ties broken by node index.
///
/// Among all nodes whose predecessors were already emitted, the one inserted
/// into `graph` first comes next. A graph whose insertion order is already
/// topological is therefore returned in insertion order.
///
/// Parallel edges are fine. A cycle is reported as an invariant violation
/// since every caller validates acyclicity (or guarantees it by construction)
/// before asking for an order.
pub fn stable_toposort<N, E>(graph: &DiGraph<N, E>) -> Result<Vec<NodeIndex>> {
    let mut in_degree: Vec<usize> = graph
        .node_indices()
        .map(|n| graph.neighbors_directed(n, Direction::Incoming).count())
        .collect();

    let mut ready: BinaryHeap<Reverse<NodeIndex>> = graph
        .node_indices()
        .filter(|n| in_degree[n.index()] == 0)
        .map(Reverse)
        .collect();

    let mut order = Vec::with_capacity(graph.node_count());

    while let Some(Reverse(node)) = ready.pop() {
        order.push(node);
        for succ in graph.neighbors_directed(node, Direction::Outgoing) {
            let degree = &mut in_degree[succ.index()];
            *degree -= 1;
            if *degree == 0 {
                ready.push(Reverse(succ));
            }
        }
    }

    if order.len() != graph.node_count() {
        return Err(TaskChainError::invariant(format!(
            "graph is not acyclic: only {} of {} nodes could be ordered",
            order.len(),
            graph.node_count()
        )));
    }

    Ok(order)
}
