// src/lib.rs

pub mod chain;
pub mod cli;
pub mod config;
pub mod dag;
pub mod errors;
pub mod logging;
pub mod types;

use std::collections::BTreeMap;

use anyhow::Result;
use tracing::{debug, info};

use crate::chain::{ChainGraph, ChainPlan, MergeOptions, StreamChainIdAllocator};
use crate::cli::{CliArgs, OutputFormat};
use crate::config::{ConfigFile, default_config_path, load_and_validate};
use crate::dag::TaskGraph;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - task graph loading and validation
/// - ancestor indexing
/// - the parallel per-machine merge
/// - chain graph finalization with an in-process chain id allocator
/// - printing the resulting plan
pub fn run(args: CliArgs) -> Result<()> {
    let graph_path = args.graph.clone().unwrap_or_else(default_config_path);
    let cfg = load_and_validate(&graph_path)?;
    info!(path = %graph_path.display(), tasks = cfg.task.len(), "loaded task graph");

    if args.dry_run {
        print_dry_run(&cfg)?;
        return Ok(());
    }

    let options = MergeOptions {
        worker_threads: args
            .threads
            .map(|n| n.get())
            .or(cfg.config.worker_threads),
    };

    let (task_graph, chain_graph) = build_chain_graph(&cfg, &options)?;
    let plan = ChainPlan::from_graphs(&task_graph, &chain_graph)?;

    match args.format {
        OutputFormat::Text => print_plan(&plan),
        OutputFormat::Json => println!("{}", plan.to_json()?),
    }

    Ok(())
}

/// Build the task graph described by `cfg` and compress it into a
/// finalized chain graph.
pub fn build_chain_graph(
    cfg: &ConfigFile,
    options: &MergeOptions,
) -> errors::Result<(TaskGraph, ChainGraph)> {
    let task_graph = TaskGraph::from_config(cfg)?;
    let mut allocator = StreamChainIdAllocator::new();
    let chain_graph = ChainGraph::build(&task_graph, &mut allocator, options)?;
    Ok((task_graph, chain_graph))
}

/// Simple dry-run output: tasks per machine with their streams and edges.
fn print_dry_run(cfg: &ConfigFile) -> Result<()> {
    let task_graph = TaskGraph::from_config(cfg)?;

    let mut per_machine: BTreeMap<_, Vec<_>> = BTreeMap::new();
    for &task in task_graph.topological_order() {
        let node = task_graph.node(task);
        per_machine.entry(node.machine_id()).or_insert_with(Vec::new).push(node);
    }

    println!("taskchain dry-run");
    println!("  config.worker_threads = {:?}", cfg.config.worker_threads);
    println!();

    println!(
        "tasks ({}), edges ({}), machines ({}):",
        task_graph.len(),
        task_graph.edge_count(),
        per_machine.len()
    );
    for (machine, nodes) in per_machine.iter() {
        println!("  machine {machine}:");
        for node in nodes {
            println!("    - {} [{}]", node.name(), node.stream_area_key());
            let ancestors = node.ancestors().len();
            if ancestors > 0 {
                println!("        ancestors: {ancestors}");
            }
        }
    }

    debug!("dry-run complete (no merging)");
    Ok(())
}

fn print_plan(plan: &ChainPlan) {
    println!("chains ({}):", plan.chains.len());
    for chain in plan.chains.iter() {
        println!(
            "  - chain {} (machine {}, area {}, stream {})",
            chain.chain_id, chain.machine, chain.area, chain.stream
        );
        println!("      tasks: {}", chain.tasks.join(", "));
        if !chain.successors.is_empty() {
            let succ: Vec<String> = chain.successors.iter().map(|c| c.to_string()).collect();
            println!("      successors: {}", succ.join(", "));
        }
    }
    println!();
    println!("task order: {}", plan.task_order.join(" -> "));
}
