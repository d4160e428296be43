//! Construction of [`AsyncResult`] instances from synchronous and
//! asynchronous work.

use crate::config::FactoryConfig;
use crate::errors::{ErrorKind, InternalFailure, ResultError};
use crate::executor::{ExecutionContext, InlineExecutor};
use crate::future::{AsyncResult, CancelToken};
use crate::result::{guarded, Payload, ResultValue};
use crate::sequencer::{seqf2, seqf3, seqf4};
use crate::tuple::{TupleResult2, TupleResult3, TupleResult4};
use futures::FutureExt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, trace, warn};

/// Schedules work and hands back futures for its outcome.
///
/// The factory owns the execution context; nothing is scheduled on an
/// implicit global pool. Clones share the same context.
#[derive(Debug, Clone)]
pub struct Factory {
    executor: ExecutionContext,
    wait_timeout: Option<Duration>,
}

impl Factory {
    pub fn new(executor: ExecutionContext) -> Self {
        Self {
            executor,
            wait_timeout: None,
        }
    }

    /// A factory running everything on the calling thread.
    pub fn inline() -> Self {
        Self::new(Arc::new(InlineExecutor))
    }

    /// Builds the configured execution context.
    pub fn from_config(config: &FactoryConfig) -> anyhow::Result<Self> {
        let executor = config.build_executor()?;
        debug!(executor = ?config.executor, "Built factory from configuration");
        Ok(Self {
            executor,
            wait_timeout: config.wait_timeout(),
        })
    }

    /// Bounds the blocking wait of the `seqN` helpers.
    pub fn with_wait_timeout(mut self, timeout: Duration) -> Self {
        self.wait_timeout = Some(timeout);
        self
    }

    pub fn executor(&self) -> &ExecutionContext {
        &self.executor
    }

    /// Schedules `supplier` on this factory's execution context.
    ///
    /// A panic inside the supplier completes the future with an internal
    /// failure.
    pub fn supply<T, E, F>(&self, supplier: F) -> AsyncResult<T, E>
    where
        T: Payload,
        E: Payload,
        F: FnOnce() -> ResultValue<T, E> + Send + 'static,
    {
        self.supply_on(supplier, &self.executor)
    }

    /// Schedules `supplier` on an explicitly chosen execution context.
    pub fn supply_on<T, E, F>(&self, supplier: F, executor: &ExecutionContext) -> AsyncResult<T, E>
    where
        T: Payload,
        E: Payload,
        F: FnOnce() -> ResultValue<T, E> + Send + 'static,
    {
        let future = AsyncResult::pending(Arc::clone(executor));
        let target = future.clone();
        executor.execute(Box::new(move || {
            if target.is_done() {
                trace!("Skipping work of a future that is already terminal");
                return;
            }
            target.complete(run_supplier(supplier));
        }));
        future
    }

    /// Schedules `supplier`, handing it a token that observes cancellation of
    /// the returned future.
    pub fn supply_cancellable<T, E, F>(&self, supplier: F) -> AsyncResult<T, E>
    where
        T: Payload,
        E: Payload,
        F: FnOnce(CancelToken) -> ResultValue<T, E> + Send + 'static,
    {
        let future = AsyncResult::pending(Arc::clone(&self.executor));
        let target = future.clone();
        let token = future.cancel_token();
        self.executor.execute(Box::new(move || {
            if token.is_cancelled() {
                trace!("Skipping cancelled work");
                return;
            }
            target.complete(run_supplier(move || supplier(token)));
        }));
        future
    }

    /// Schedules an asynchronous operation, such as an RPC call.
    pub fn supply_async<T, E, Fut>(&self, operation: Fut) -> AsyncResult<T, E>
    where
        T: Payload,
        E: Payload,
        Fut: Future<Output = ResultValue<T, E>> + Send + 'static,
    {
        let future = AsyncResult::pending(Arc::clone(&self.executor));
        let target = future.clone();
        self.executor.spawn(Box::pin(async move {
            if target.is_done() {
                return;
            }
            let value = match AssertUnwindSafe(operation).catch_unwind().await {
                Ok(value) => value,
                Err(payload) => {
                    let failure = InternalFailure::from_panic(payload);
                    warn!("Asynchronous supplier panicked: {}", failure);
                    ResultValue::fail(ResultError::Internal(failure))
                }
            };
            target.complete(value);
        }));
        future
    }

    /// A pending future bound to no work, for callers that complete it
    /// themselves (for example from a callback-based API).
    pub fn supply_empty_future<T, E>(&self) -> AsyncResult<T, E>
    where
        T: Payload,
        E: Payload,
    {
        AsyncResult::pending(Arc::clone(&self.executor))
    }

    /// A future that is already complete.
    pub fn completed<T, E>(&self, value: ResultValue<T, E>) -> AsyncResult<T, E>
    where
        T: Payload,
        E: Payload,
    {
        let future = self.supply_empty_future();
        future.complete(value);
        future
    }
}

fn run_supplier<T, E, F>(supplier: F) -> ResultValue<T, E>
where
    F: FnOnce() -> ResultValue<T, E>,
{
    match guarded(supplier) {
        Ok(value) => value,
        Err(failure) => {
            warn!("Supplier panicked: {}", failure);
            ResultValue::fail(ResultError::Internal(failure))
        }
    }
}

macro_rules! blocking_seq {
    (
        $(#[$meta:meta])*
        $name:ident => $seqf:ident, $tuple:ident { $( $f:ident : $F:ident -> $T:ident ),+ }
    ) => {
        $(#[$meta])*
        pub fn $name<$($T,)+ E, $($F,)+>(&self, $($f: $F),+) -> $tuple<$($T,)+ E>
        where
            $( $T: Payload, $F: FnOnce() -> ResultValue<$T, E> + Send + 'static, )+
            E: Payload,
        {
            $( let $f = self.supply($f); )+
            let joined = $seqf($(move || $f),+);
            match self.wait_timeout {
                None => joined.get(),
                Some(timeout) => {
                    let value = joined.get_timeout(timeout);
                    if value.kind() == Some(ErrorKind::Timeout) {
                        debug!(?timeout, "Join timed out, cancelling members");
                        joined.cancel();
                    }
                    value
                }
            }
        }
    };
}

impl Factory {
    blocking_seq! {
        /// Runs two blocking operations concurrently and waits for the joint
        /// outcome.
        seq2 => seqf2, TupleResult2 { f1: F1 -> T1, f2: F2 -> T2 }
    }

    blocking_seq! {
        /// Runs three blocking operations concurrently and waits for the joint
        /// outcome.
        seq3 => seqf3, TupleResult3 { f1: F1 -> T1, f2: F2 -> T2, f3: F3 -> T3 }
    }

    blocking_seq! {
        /// Runs four blocking operations concurrently and waits for the joint
        /// outcome.
        seq4 => seqf4, TupleResult4 { f1: F1 -> T1, f2: F2 -> T2, f3: F3 -> T3, f4: F4 -> T4 }
    }
}
