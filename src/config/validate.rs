// src/config/validate.rs

use std::collections::HashSet;

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{Result, TaskChainError};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = crate::errors::TaskChainError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw.config, raw.task))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    ensure_has_tasks(cfg)?;
    validate_global_config(cfg)?;
    validate_task_names(cfg)?;
    validate_task_dependencies(cfg)?;
    validate_dag(cfg)?;
    Ok(())
}

fn ensure_has_tasks(cfg: &RawConfigFile) -> Result<()> {
    if cfg.task.is_empty() {
        return Err(TaskChainError::ConfigError(
            "task graph must contain at least one [[task]] entry".to_string(),
        ));
    }
    Ok(())
}

fn validate_global_config(cfg: &RawConfigFile) -> Result<()> {
    if cfg.config.worker_threads == Some(0) {
        return Err(TaskChainError::ConfigError(
            "[config].worker_threads must be >= 1 (got 0)".to_string(),
        ));
    }
    Ok(())
}

fn validate_task_names(cfg: &RawConfigFile) -> Result<()> {
    let mut seen = HashSet::new();
    for task in cfg.task.iter() {
        if task.name.trim().is_empty() {
            return Err(TaskChainError::ConfigError(
                "task name must not be empty".to_string(),
            ));
        }
        if !seen.insert(task.name.as_str()) {
            return Err(TaskChainError::ConfigError(format!(
                "duplicate task name '{}'",
                task.name
            )));
        }
    }
    Ok(())
}

fn validate_task_dependencies(cfg: &RawConfigFile) -> Result<()> {
    let names: HashSet<&str> = cfg.task.iter().map(|t| t.name.as_str()).collect();

    for task in cfg.task.iter() {
        for (field, deps) in [("after", &task.after), ("ordered_after", &task.ordered_after)] {
            for dep in deps.iter() {
                if !names.contains(dep.as_str()) {
                    return Err(TaskChainError::ConfigError(format!(
                        "task '{}' has unknown dependency '{}' in `{}`",
                        task.name, dep, field
                    )));
                }
                if dep == &task.name {
                    return Err(TaskChainError::ConfigError(format!(
                        "task '{}' cannot depend on itself in `{}`",
                        task.name, field
                    )));
                }
            }
        }
    }
    Ok(())
}

fn validate_dag(cfg: &RawConfigFile) -> Result<()> {
    // Edge direction: upstream -> task, for both edge kinds. Ordering edges
    // must not close a cycle either, or no execution order exists.
    let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();

    for task in cfg.task.iter() {
        graph.add_node(task.name.as_str());
    }

    for task in cfg.task.iter() {
        for dep in task.upstream() {
            graph.add_edge(dep.as_str(), task.name.as_str(), ());
        }
    }

    match toposort(&graph, None) {
        Ok(_order) => Ok(()),
        Err(cycle) => {
            let node = cycle.node_id();
            Err(TaskChainError::DagCycle(format!(
                "cycle detected in task graph involving task '{}'",
                node
            )))
        }
    }
}
