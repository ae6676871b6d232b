pub mod builders;
pub mod recording_allocator;

use std::sync::Once;

use taskchain::chain::ChainGraph;
use taskchain::dag::TaskGraph;
use tracing_subscriber::{EnvFilter, fmt};

static INIT: Once = Once::new();

/// Initialise tracing for tests.
///
/// - Uses `with_test_writer()`, so logs are captured per-test.
/// - The Rust test harness only prints captured output for **failing** tests
///   (unless you run with `-- --nocapture`).
///
/// Enable levels with e.g.:
/// `RUST_LOG=debug cargo test`
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        fmt()
            .with_env_filter(filter)
            .with_test_writer() // print only for failing tests unless --nocapture
            .with_target(true)
            .init();
    });
}

/// Member task names of the chain owning `task`.
pub fn chain_members(task_graph: &TaskGraph, chain_graph: &ChainGraph, task: &str) -> Vec<String> {
    let id = task_graph.task_id(task).expect("unknown task name");
    chain_graph
        .chain_of(id)
        .expect("task has no chain")
        .task_ids()
        .iter()
        .map(|&t| task_graph.node(t).name().to_string())
        .collect()
}

/// Every chain as a list of member names, sorted for order-insensitive
/// comparisons.
pub fn chain_sets(task_graph: &TaskGraph, chain_graph: &ChainGraph) -> Vec<Vec<String>> {
    let mut sets: Vec<Vec<String>> = chain_graph
        .nodes()
        .map(|node| {
            node.task_ids()
                .iter()
                .map(|&t| task_graph.node(t).name().to_string())
                .collect()
        })
        .collect();
    sets.sort();
    sets
}
