//! Single-assignment future holding an eventual [`ResultValue`].

use crate::errors::ResultError;
use crate::executor::ExecutionContext;
use crate::result::{guarded, Payload, ResultValue};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::task::{Context, Poll, Waker};
use std::time::{Duration, Instant};
use tracing::warn;

type Callback<T, E> = Box<dyn FnOnce(&ResultValue<T, E>) + Send + 'static>;

enum State<T, E> {
    Pending,
    Completed(ResultValue<T, E>),
    Cancelled,
}

impl<T: Clone, E: Clone> State<T, E> {
    fn terminal(&self) -> Option<ResultValue<T, E>> {
        match self {
            State::Pending => None,
            State::Completed(value) => Some(value.clone()),
            State::Cancelled => Some(ResultValue::fail(ResultError::Cancelled)),
        }
    }
}

struct Inner<T, E> {
    state: State<T, E>,
    callbacks: Vec<Callback<T, E>>,
    wakers: Vec<Waker>,
}

struct Shared<T, E> {
    inner: Mutex<Inner<T, E>>,
    done: Condvar,
    cancel_requested: Arc<AtomicBool>,
}

/// Cooperative cancellation flag handed to scheduled work.
///
/// Remote calls cannot be interrupted once sent; long-running work should
/// poll [`is_cancelled`](Self::is_cancelled) between steps instead.
#[derive(Debug, Clone)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }
}

/// A future that eventually holds a [`ResultValue`].
///
/// States are `Pending`, `Completed` and `Cancelled`; the last two are
/// terminal. The first successful [`complete`](Self::complete) or
/// [`cancel`](Self::cancel) wins and every later call is a no-op. Blocking
/// accessors never panic on business errors: they return the terminal value.
///
/// Cloning yields another handle to the same future.
pub struct AsyncResult<T, E> {
    shared: Arc<Shared<T, E>>,
    executor: ExecutionContext,
}

impl<T, E> Clone for AsyncResult<T, E> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
            executor: Arc::clone(&self.executor),
        }
    }
}

impl<T, E> AsyncResult<T, E>
where
    T: Payload,
    E: Payload,
{
    /// Creates a pending future whose continuations run on `executor`.
    pub(crate) fn pending(executor: ExecutionContext) -> Self {
        Self {
            shared: Arc::new(Shared {
                inner: Mutex::new(Inner {
                    state: State::Pending,
                    callbacks: Vec::new(),
                    wakers: Vec::new(),
                }),
                done: Condvar::new(),
                cancel_requested: Arc::new(AtomicBool::new(false)),
            }),
            executor,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner<T, E>> {
        self.shared.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Moves out of `Pending`. Returns false if another transition won.
    fn transition(&self, next: State<T, E>) -> bool {
        let (value, callbacks, wakers) = {
            let mut inner = self.lock();
            if !matches!(inner.state, State::Pending) {
                return false;
            }
            inner.state = next;
            let value = match inner.state.terminal() {
                Some(value) => value,
                None => return false,
            };
            (
                value,
                std::mem::take(&mut inner.callbacks),
                std::mem::take(&mut inner.wakers),
            )
        };

        self.shared.done.notify_all();
        for waker in wakers {
            waker.wake();
        }
        for callback in callbacks {
            if let Err(failure) = guarded(|| callback(&value)) {
                warn!("Completion callback panicked: {}", failure);
            }
        }
        true
    }

    /// Completes the future. Only the call that performs the transition
    /// returns `true`.
    pub fn complete(&self, value: ResultValue<T, E>) -> bool {
        self.transition(State::Completed(value))
    }

    /// Requests cancellation of the scheduled work and, if still pending,
    /// moves to `Cancelled`. Returns whether the transition happened.
    pub fn cancel(&self) -> bool {
        self.shared.cancel_requested.store(true, Ordering::Release);
        self.transition(State::Cancelled)
    }

    pub fn is_done(&self) -> bool {
        !matches!(self.lock().state, State::Pending)
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self.lock().state, State::Cancelled)
    }

    /// Token observing cancellation requests on this future.
    pub fn cancel_token(&self) -> CancelToken {
        CancelToken {
            flag: Arc::clone(&self.shared.cancel_requested),
        }
    }

    /// Execution context continuations of this future run on.
    pub fn executor(&self) -> &ExecutionContext {
        &self.executor
    }

    /// Blocks until the future is terminal.
    ///
    /// A cancelled future yields `fail(Cancelled)`.
    pub fn get(&self) -> ResultValue<T, E> {
        let mut inner = self.lock();
        loop {
            if let Some(value) = inner.state.terminal() {
                return value;
            }
            inner = self
                .shared
                .done
                .wait(inner)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Blocks for at most `timeout`.
    ///
    /// Yields `fail(Timeout)` when the deadline passes first; the future
    /// itself is left untouched. A timeout too large to represent as a
    /// deadline waits without bound, like [`get`](Self::get).
    pub fn get_timeout(&self, timeout: Duration) -> ResultValue<T, E> {
        let mut inner = self.lock();
        if let Some(value) = inner.state.terminal() {
            return value;
        }
        let deadline = match Instant::now().checked_add(timeout) {
            Some(deadline) => deadline,
            None => {
                drop(inner);
                return self.get();
            }
        };
        loop {
            if let Some(value) = inner.state.terminal() {
                return value;
            }
            let now = Instant::now();
            if now >= deadline {
                return ResultValue::fail(ResultError::Timeout(timeout));
            }
            inner = self
                .shared
                .done
                .wait_timeout(inner, deadline - now)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
    }

    /// Registers `callback` to run with the terminal value.
    ///
    /// Runs on the completing thread, or immediately on the caller's thread
    /// when the future is already terminal. Keep it short; heavier work
    /// belongs on the executor.
    pub fn on_complete<F>(&self, callback: F)
    where
        F: FnOnce(&ResultValue<T, E>) + Send + 'static,
    {
        let value = {
            let mut inner = self.lock();
            match inner.state.terminal() {
                Some(value) => value,
                None => {
                    inner.callbacks.push(Box::new(callback));
                    return;
                }
            }
        };
        callback(&value);
    }

    /// Runs `step` on the executor once this future is terminal and
    /// completes the returned future with its outcome.
    fn then<R, S>(&self, step: S) -> AsyncResult<R, E>
    where
        R: Payload,
        S: FnOnce(ResultValue<T, E>) -> ResultValue<R, E> + Send + 'static,
    {
        let next = AsyncResult::pending(Arc::clone(&self.executor));
        let target = next.clone();
        let executor = Arc::clone(&self.executor);
        self.on_complete(move |value| {
            let value = value.clone();
            executor.execute(Box::new(move || {
                target.complete(step(value));
            }));
        });
        next
    }

    /// Transforms the eventual value. Errors are sticky and panics in `f`
    /// become internal failures.
    pub fn map<R, F>(&self, f: F) -> AsyncResult<R, E>
    where
        R: Payload,
        F: FnOnce(T) -> R + Send + 'static,
    {
        self.then(move |value| value.map(f))
    }

    /// Chains a dependent asynchronous step.
    pub fn flat_map<R, F>(&self, f: F) -> AsyncResult<R, E>
    where
        R: Payload,
        F: FnOnce(T) -> AsyncResult<R, E> + Send + 'static,
    {
        let next = AsyncResult::pending(Arc::clone(&self.executor));
        let target = next.clone();
        let executor = Arc::clone(&self.executor);
        self.on_complete(move |value| match value.clone().into_result() {
            Err(error) => {
                target.complete(ResultValue::fail(error));
            }
            Ok(value) => executor.execute(Box::new(move || match guarded(move || f(value)) {
                Ok(inner) => {
                    inner.on_complete(move |value| {
                        target.complete(value.clone());
                    });
                }
                Err(failure) => {
                    target.complete(ResultValue::fail(ResultError::Internal(failure)));
                }
            })),
        });
        next
    }

    /// Runs `consumer` only on success. The returned future holds `true`
    /// once it ran, the source error, or the consumer's panic.
    pub fn if_present<F>(&self, consumer: F) -> AsyncResult<bool, E>
    where
        F: FnOnce(&T) + Send + 'static,
    {
        self.then(move |value| value.map(|v| {
            consumer(&v);
            true
        }))
    }

    /// Keeps the eventual value only if `predicate` accepts it.
    pub fn filter<P>(&self, predicate: P) -> AsyncResult<T, E>
    where
        P: FnOnce(&T) -> bool + Send + 'static,
    {
        self.then(move |value| value.filter(predicate))
    }
}

impl<T, E> Future for AsyncResult<T, E>
where
    T: Payload,
    E: Payload,
{
    type Output = ResultValue<T, E>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let mut inner = self.lock();
        match inner.state.terminal() {
            Some(value) => Poll::Ready(value),
            None => {
                if !inner.wakers.iter().any(|w| w.will_wake(cx.waker())) {
                    inner.wakers.push(cx.waker().clone());
                }
                Poll::Pending
            }
        }
    }
}

impl<T, E> fmt::Debug for AsyncResult<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match self.shared.inner.lock() {
            Ok(inner) => match inner.state {
                State::Pending => "Pending",
                State::Completed(_) => "Completed",
                State::Cancelled => "Cancelled",
            },
            Err(_) => "Poisoned",
        };
        f.debug_struct("AsyncResult").field("state", &state).finish()
    }
}

/// Type-erased view used to cancel join members of differing types.
pub(crate) trait Cancel: Send + Sync {
    fn cancel(&self) -> bool;
    fn is_done(&self) -> bool;
    fn context(&self) -> ExecutionContext;
}

impl<T, E> Cancel for AsyncResult<T, E>
where
    T: Payload,
    E: Payload,
{
    fn cancel(&self) -> bool {
        AsyncResult::cancel(self)
    }

    fn is_done(&self) -> bool {
        AsyncResult::is_done(self)
    }

    fn context(&self) -> ExecutionContext {
        Arc::clone(&self.executor)
    }
}
