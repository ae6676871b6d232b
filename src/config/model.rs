// src/config/model.rs

use serde::Deserialize;

use crate::types::{AreaId, MachineId, StreamId};

/// Task graph description as read from a TOML file.
///
/// ```toml
/// [config]
/// worker_threads = 4
///
/// [[task]]
/// name = "load"
/// machine = 0
/// stream = 1
///
/// [[task]]
/// name = "fwd"
/// machine = 0
/// area = 1
/// stream = 3
/// after = ["load"]
/// ordered_after = ["updt"]
/// ```
///
/// Tasks are an array of tables so the order in the file is the order the
/// graph is built in.
#[derive(Debug, Clone, Deserialize)]
pub struct RawConfigFile {
    #[serde(default)]
    pub config: ConfigSection,

    #[serde(default)]
    pub task: Vec<TaskConfig>,
}

/// A [`RawConfigFile`] that passed validation.
///
/// Only obtainable through `TryFrom<RawConfigFile>` (see `validate.rs`), so
/// holders can rely on unique names, known references and an acyclic graph.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub config: ConfigSection,
    pub task: Vec<TaskConfig>,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(config: ConfigSection, task: Vec<TaskConfig>) -> Self {
        Self { config, task }
    }
}

/// `[config]` section.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigSection {
    /// Upper bound on merge worker threads.
    ///
    /// `None` means "use the hardware parallelism". The pool never grows past
    /// the number of machines in the graph.
    #[serde(default)]
    pub worker_threads: Option<usize>,
}

/// `[[task]]` entry.
#[derive(Debug, Clone, Deserialize)]
pub struct TaskConfig {
    /// Unique task name.
    pub name: String,

    #[serde(default)]
    pub machine: MachineId,

    #[serde(default)]
    pub area: AreaId,

    pub stream: StreamId,

    /// Dependency edges: this task consumes the output of every task listed.
    #[serde(default)]
    pub after: Vec<String>,

    /// Ordering-only edges: this task runs after every task listed but does
    /// not depend on them.
    #[serde(default)]
    pub ordered_after: Vec<String>,
}

impl TaskConfig {
    /// All upstream task names, dependency edges first.
    pub fn upstream(&self) -> impl Iterator<Item = &String> {
        self.after.iter().chain(self.ordered_after.iter())
    }
}
