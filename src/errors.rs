// src/errors.rs

//! Crate-wide error aliases and helpers.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TaskChainError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Task not found: {0}")]
    TaskNotFound(String),

    #[error("Cycle detected in task graph: {0}")]
    DagCycle(String),

    /// A structural invariant of the task or chain graph does not hold.
    ///
    /// The input graph is defective; the build cannot produce any output.
    #[error("Invariant violated: {0}")]
    Invariant(String),

    #[error("Worker pool error: {0}")]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("JSON encoding error: {0}")]
    Json(#[from] serde_json::Error),
}

impl TaskChainError {
    pub(crate) fn invariant(msg: impl Into<String>) -> Self {
        TaskChainError::Invariant(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, TaskChainError>;
