// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::Result;

/// Read `[config]` and the `[[task]]` array from a TOML file.
///
/// Task references are kept as names and are not resolved yet, so the
/// result may describe a graph that cannot be built.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawConfigFile> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;

    let config: RawConfigFile = toml::from_str(&contents)?;
    debug!(path = %path.display(), tasks = config.task.len(), "loaded task graph file");

    Ok(config)
}

/// Read a task graph file and reject anything [`TaskGraph::from_config`]
/// could not turn into a DAG: an empty task list, `worker_threads = 0`,
/// blank or repeated names, references to unknown tasks or to the task
/// itself, and cycles through `after` or `ordered_after`.
///
/// [`TaskGraph::from_config`]: crate::dag::TaskGraph::from_config
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<ConfigFile> {
    let raw_config = load_from_path(&path)?;
    let config = ConfigFile::try_from(raw_config)?;
    Ok(config)
}

/// Parse and validate a task graph from an in-memory TOML string.
pub fn parse_and_validate(contents: &str) -> Result<ConfigFile> {
    let raw_config: RawConfigFile = toml::from_str(contents)?;
    ConfigFile::try_from(raw_config)
}

/// Default task graph path: `TaskGraph.toml` in the current working directory.
pub fn default_config_path() -> PathBuf {
    PathBuf::from("TaskGraph.toml")
}
