#![allow(dead_code)]

use taskchain::config::{ConfigFile, ConfigSection, RawConfigFile, TaskConfig};
use taskchain::dag::TaskGraph;
use taskchain::types::{AreaId, MachineId, StreamId};

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile {
                config: ConfigSection::default(),
                task: Vec::new(),
            },
        }
    }

    pub fn with_task(mut self, task: TaskConfig) -> Self {
        self.config.task.push(task);
        self
    }

    pub fn with_worker_threads(mut self, threads: usize) -> Self {
        self.config.config.worker_threads = Some(threads);
        self
    }

    /// The raw, unvalidated config (for exercising validation errors).
    pub fn raw(self) -> RawConfigFile {
        self.config
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }

    pub fn build_graph(self) -> TaskGraph {
        TaskGraph::from_config(&self.build()).expect("Failed to build task graph from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `TaskConfig`. Defaults to machine 0, area 0.
pub struct TaskConfigBuilder {
    task: TaskConfig,
}

impl TaskConfigBuilder {
    pub fn new(name: &str, stream: u64) -> Self {
        Self {
            task: TaskConfig {
                name: name.to_string(),
                machine: MachineId(0),
                area: AreaId(0),
                stream: StreamId(stream),
                after: vec![],
                ordered_after: vec![],
            },
        }
    }

    pub fn machine(mut self, machine: u32) -> Self {
        self.task.machine = MachineId(machine);
        self
    }

    pub fn area(mut self, area: u32) -> Self {
        self.task.area = AreaId(area);
        self
    }

    pub fn after(mut self, dep: &str) -> Self {
        self.task.after.push(dep.to_string());
        self
    }

    pub fn ordered_after(mut self, dep: &str) -> Self {
        self.task.ordered_after.push(dep.to_string());
        self
    }

    pub fn build(self) -> TaskConfig {
        self.task
    }
}

/// Shorthand for the common "name on stream, machine 0" task.
pub fn task(name: &str, stream: u64) -> TaskConfigBuilder {
    TaskConfigBuilder::new(name, stream)
}
