// src/config/mod.rs

//! The `TaskGraph.toml` description: `model` holds the serde types, `loader`
//! reads files or strings, and `validate` turns a `RawConfigFile` into a
//! `ConfigFile` that is guaranteed to build into a DAG.

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{default_config_path, load_and_validate, load_from_path, parse_and_validate};
pub use model::{ConfigFile, ConfigSection, RawConfigFile, TaskConfig};
