//! Configuration for building a [`Factory`](crate::Factory).

use crate::executor::{ExecutionContext, InlineExecutor, ThreadExecutor, TokioExecutor};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// Which execution context a factory schedules work on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutorKind {
    /// A dedicated tokio runtime
    Tokio,
    /// One OS thread per task
    Thread,
    /// The calling thread
    Inline,
}

/// Configuration for a factory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactoryConfig {
    /// Execution context kind
    pub executor: ExecutorKind,
    /// Worker threads of the tokio runtime; the runtime decides when unset
    #[serde(default)]
    pub worker_threads: Option<usize>,
    /// Name given to worker threads
    pub thread_name: String,
    /// Upper bound on the blocking wait of `Factory::seqN`, in milliseconds
    #[serde(default)]
    pub wait_timeout_ms: Option<u64>,
}

impl Default for FactoryConfig {
    fn default() -> Self {
        Self {
            executor: ExecutorKind::Tokio,
            worker_threads: None,
            thread_name: "tuple-or-error-worker".to_string(),
            wait_timeout_ms: None,
        }
    }
}

impl FactoryConfig {
    /// Loads configuration from a file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let mut file = File::open(path)
            .with_context(|| format!("Failed to open config file {}", path.display()))?;
        let mut contents = String::new();
        file.read_to_string(&mut contents)?;

        let config = serde_json::from_str(&contents)
            .with_context(|| format!("Invalid factory config in {}", path.display()))?;
        Ok(config)
    }

    /// Saves configuration to a file.
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    pub fn wait_timeout(&self) -> Option<Duration> {
        self.wait_timeout_ms.map(Duration::from_millis)
    }

    /// Builds the configured execution context.
    pub fn build_executor(&self) -> Result<ExecutionContext> {
        let executor: ExecutionContext = match self.executor {
            ExecutorKind::Tokio => Arc::new(
                TokioExecutor::new(self.worker_threads, &self.thread_name)
                    .context("Failed to build tokio runtime")?,
            ),
            ExecutorKind::Thread => Arc::new(ThreadExecutor::new(self.thread_name.clone())),
            ExecutorKind::Inline => Arc::new(InlineExecutor),
        };
        Ok(executor)
    }
}
