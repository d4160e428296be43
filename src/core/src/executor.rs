//! Execution contexts that scheduled work and continuations run on.

use futures::future::BoxFuture;
use std::fmt;
use std::io;
use std::sync::Arc;
use tokio::runtime::{Builder, Handle, Runtime};
use tracing::warn;

/// A unit of blocking work.
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// Runs work on behalf of the framework.
///
/// This is the only place concurrency policy is configured. There is no
/// global executor; every [`Factory`](crate::Factory) owns one.
pub trait Executor: Send + Sync + fmt::Debug {
    /// Runs blocking work.
    fn execute(&self, task: Task);

    /// Runs a future to completion.
    fn spawn(&self, future: BoxFuture<'static, ()>) {
        self.execute(Box::new(move || futures::executor::block_on(future)));
    }
}

/// A shared execution context.
pub type ExecutionContext = Arc<dyn Executor>;

/// Runs work on a tokio runtime. Blocking work goes to the blocking pool.
#[derive(Clone)]
pub struct TokioExecutor {
    handle: Handle,
    // Keeps an owned runtime alive for as long as any clone exists.
    _runtime: Option<Arc<OwnedRuntime>>,
}

/// Shuts an owned runtime down without blocking, so the last handle may be
/// released from inside one of its own tasks.
struct OwnedRuntime(Option<Runtime>);

impl Drop for OwnedRuntime {
    fn drop(&mut self) {
        if let Some(runtime) = self.0.take() {
            runtime.shutdown_background();
        }
    }
}

impl TokioExecutor {
    /// Builds a dedicated multi-threaded runtime.
    pub fn new(worker_threads: Option<usize>, thread_name: &str) -> io::Result<Self> {
        let mut builder = Builder::new_multi_thread();
        builder.enable_all().thread_name(thread_name);
        if let Some(workers) = worker_threads {
            builder.worker_threads(workers.max(1));
        }
        let runtime = builder.build()?;
        Ok(Self {
            handle: runtime.handle().clone(),
            _runtime: Some(Arc::new(OwnedRuntime(Some(runtime)))),
        })
    }

    /// Uses an existing runtime.
    pub fn from_handle(handle: Handle) -> Self {
        Self {
            handle,
            _runtime: None,
        }
    }

    /// Uses the runtime the caller is running in, if any.
    pub fn current() -> Option<Self> {
        Handle::try_current().ok().map(Self::from_handle)
    }

    pub fn handle(&self) -> &Handle {
        &self.handle
    }
}

impl Executor for TokioExecutor {
    fn execute(&self, task: Task) {
        // The join handle is dropped; completion is reported through the future.
        drop(self.handle.spawn_blocking(task));
    }

    fn spawn(&self, future: BoxFuture<'static, ()>) {
        drop(self.handle.spawn(future));
    }
}

impl fmt::Debug for TokioExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokioExecutor")
            .field("owned", &self._runtime.is_some())
            .finish()
    }
}

/// Runs every task on its own named OS thread.
#[derive(Debug, Clone)]
pub struct ThreadExecutor {
    thread_name: String,
}

impl ThreadExecutor {
    pub fn new(thread_name: impl Into<String>) -> Self {
        Self {
            thread_name: thread_name.into(),
        }
    }
}

impl Default for ThreadExecutor {
    fn default() -> Self {
        Self::new("tuple-or-error-worker")
    }
}

impl Executor for ThreadExecutor {
    fn execute(&self, task: Task) {
        // `Builder::spawn` drops the closure when it fails, so the task is
        // parked in a shared slot to keep it runnable on the fallback path.
        let slot = Arc::new(std::sync::Mutex::new(Some(task)));
        let remote = Arc::clone(&slot);
        let spawned = std::thread::Builder::new()
            .name(self.thread_name.clone())
            .spawn(move || {
                let task = remote
                    .lock()
                    .unwrap_or_else(std::sync::PoisonError::into_inner)
                    .take();
                if let Some(task) = task {
                    task();
                }
            });
        if let Err(e) = spawned {
            warn!("Failed to spawn worker thread, running inline: {}", e);
            let task = slot
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner)
                .take();
            if let Some(task) = task {
                task();
            }
        }
    }
}

/// Runs work immediately on the calling thread.
///
/// Deterministic: a supplied future is already complete when `supply` returns.
#[derive(Debug, Clone, Copy, Default)]
pub struct InlineExecutor;

impl Executor for InlineExecutor {
    fn execute(&self, task: Task) {
        task();
    }
}
