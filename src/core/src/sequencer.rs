//! Join combinators: run several independent operations concurrently and
//! merge their outcomes deterministically.
//!
//! Given `N` suppliers of [`AsyncResult`], `seqfN`:
//!
//! 1. invokes every supplier immediately, in argument order, so the
//!    underlying operations start together;
//! 2. waits until every member is terminal (completed or cancelled);
//! 3. reports the error of the *lowest-index* failing member, whatever the
//!    order members finished in;
//! 4. once member `i` fails, cancels every still-pending member with an index
//!    above `i`. Members below `i` are awaited, since one of them may still
//!    hold the error that has to be reported;
//! 5. otherwise yields every value, in argument order;
//! 6. reports internal failures by their root cause.
//!
//! Cancelling the combined future cancels every member.

use crate::errors::{InternalFailure, ResultError};
use crate::executor::{ExecutionContext, InlineExecutor};
use crate::future::{AsyncResult, Cancel};
use crate::result::{guarded, Payload, ResultValue};
use crate::tuple_future::{TupleAsyncResult2, TupleAsyncResult3, TupleAsyncResult4};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, warn};

/// Bookkeeping shared by the members of one join.
struct Join<S, O, E> {
    slots: Mutex<S>,
    remaining: AtomicUsize,
    members: Vec<Box<dyn Cancel>>,
    output: AsyncResult<O, E>,
    finish: fn(&mut S) -> ResultValue<O, E>,
}

impl<S, O, E> Join<S, O, E>
where
    O: Payload,
    E: Payload,
{
    fn lock_slots(&self) -> MutexGuard<'_, S> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Stores the terminal value of member `index` and finishes the join once
    /// it was the last one outstanding.
    fn record<F>(&self, index: usize, failed: bool, store: F)
    where
        F: FnOnce(&mut S),
    {
        store(&mut self.lock_slots());
        if failed {
            self.cancel_after(index);
        }
        if self.remaining.fetch_sub(1, Ordering::AcqRel) == 1 {
            let value = (self.finish)(&mut self.lock_slots());
            self.output.complete(value);
        }
    }

    fn cancel_after(&self, index: usize) {
        for (sibling, member) in self.members.iter().enumerate().skip(index + 1) {
            if !member.is_done() && member.cancel() {
                debug!(failed = index, cancelled = sibling, "Cancelled join member");
            }
        }
    }

    fn cancel_all(&self) {
        for member in &self.members {
            member.cancel();
        }
    }
}

/// Cancels the members started before supplier `index` panicked and yields
/// a join that already failed with that panic.
fn abandon<O, E>(
    started: Vec<Box<dyn Cancel>>,
    index: usize,
    failure: InternalFailure,
) -> AsyncResult<O, E>
where
    O: Payload,
    E: Payload,
{
    warn!(member = index, "Join supplier panicked: {}", failure);
    for member in &started {
        member.cancel();
    }
    let executor: ExecutionContext = match started.first() {
        Some(member) => member.context(),
        None => Arc::new(InlineExecutor),
    };
    let output = AsyncResult::pending(executor);
    output.complete(ResultValue::fail(ResultError::Internal(failure)));
    output
}

/// Takes member `slot` for the final scan, or stops the scan with its error.
macro_rules! take_member {
    ($slot:expr, $index:expr) => {
        match $slot.take().map(ResultValue::into_result) {
            Some(Ok(value)) => value,
            Some(Err(error)) => {
                debug!(member = $index, kind = %error.kind(), "Join failed");
                return ResultValue::fail(error.into_rooted());
            }
            None => {
                return ResultValue::fail(ResultError::Internal(InternalFailure::msg(format!(
                    "join member {} finished without a value",
                    $index
                ))));
            }
        }
    };
}

macro_rules! seqf {
    (
        $(#[$meta:meta])*
        $name:ident => $future:ident { $( $idx:tt => $f:ident : $F:ident -> $T:ident ),+ }
    ) => {
        $(#[$meta])*
        pub fn $name<$($T,)+ E, $($F,)+>($($f: $F),+) -> $future<$($T,)+ E>
        where
            $( $F: FnOnce() -> AsyncResult<$T, E>, $T: Payload, )+
            E: Payload,
        {
            let count = [$($idx),+].len();
            let mut started: Vec<Box<dyn Cancel>> = Vec::with_capacity(count);
            let members = ($(
                match guarded($f) {
                    Ok(member) => {
                        started.push(Box::new(member.clone()));
                        member
                    }
                    Err(failure) => return $future::new(abandon(started, $idx, failure)),
                },
            )+);
            debug!(members = count, "Fanned out join");

            let output = AsyncResult::pending(Arc::clone(members.0.executor()));
            let finish: fn(&mut ($(Option<ResultValue<$T, E>>,)+)) -> ResultValue<($($T,)+), E> =
                |slots| {
                    let values = ($(take_member!(slots.$idx, $idx),)+);
                    ResultValue::success(values)
                };
            let join = Arc::new(Join {
                slots: Mutex::new(($(None::<ResultValue<$T, E>>,)+)),
                remaining: AtomicUsize::new(count),
                members: started,
                output: output.clone(),
                finish,
            });

            {
                let join = Arc::clone(&join);
                output.on_complete(move |_| {
                    if join.output.is_cancelled() {
                        debug!("Join cancelled, cancelling members");
                        join.cancel_all();
                    }
                });
            }
            $(
                {
                    let join = Arc::clone(&join);
                    members.$idx.on_complete(move |value: &ResultValue<$T, E>| {
                        let value = value.clone();
                        join.record($idx, value.has_error(), move |slots| slots.$idx = Some(value));
                    });
                }
            )+

            $future::new(output)
        }
    };
}

seqf! {
    /// Joins two asynchronous operations.
    seqf2 => TupleAsyncResult2 { 0 => f1: F1 -> T1, 1 => f2: F2 -> T2 }
}

seqf! {
    /// Joins three asynchronous operations.
    seqf3 => TupleAsyncResult3 { 0 => f1: F1 -> T1, 1 => f2: F2 -> T2, 2 => f3: F3 -> T3 }
}

seqf! {
    /// Joins four asynchronous operations.
    seqf4 => TupleAsyncResult4 {
        0 => f1: F1 -> T1, 1 => f2: F2 -> T2, 2 => f3: F3 -> T3, 3 => f4: F4 -> T4
    }
}
