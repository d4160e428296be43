//! Futures over several joint outcomes, produced by the sequencer.

use crate::future::AsyncResult;
use crate::result::Payload;
use crate::tuple::{TupleResult2, TupleResult3, TupleResult4};
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

macro_rules! tuple_future {
    (
        $(#[$meta:meta])*
        $name:ident => $tuple:ident { $( $T:ident, $v:ident );+ }
    ) => {
        $(#[$meta])*
        pub struct $name<$($T,)+ E> {
            inner: AsyncResult<($($T,)+), E>,
        }

        impl<$($T,)+ E> Clone for $name<$($T,)+ E> {
            fn clone(&self) -> Self {
                Self { inner: self.inner.clone() }
            }
        }

        impl<$($T,)+ E> std::fmt::Debug for $name<$($T,)+ E> {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.debug_tuple(stringify!($name)).field(&self.inner).finish()
            }
        }

        impl<$($T,)+ E> $name<$($T,)+ E>
        where
            $($T: Payload,)+
            E: Payload,
        {
            pub(crate) fn new(inner: AsyncResult<($($T,)+), E>) -> Self {
                Self { inner }
            }

            pub fn complete(&self, value: $tuple<$($T,)+ E>) -> bool {
                self.inner.complete(value.into())
            }

            /// Cancels the join and, through it, every member still pending.
            pub fn cancel(&self) -> bool {
                self.inner.cancel()
            }

            pub fn is_done(&self) -> bool {
                self.inner.is_done()
            }

            pub fn is_cancelled(&self) -> bool {
                self.inner.is_cancelled()
            }

            pub fn get(&self) -> $tuple<$($T,)+ E> {
                self.inner.get().into()
            }

            pub fn get_timeout(&self, timeout: Duration) -> $tuple<$($T,)+ E> {
                self.inner.get_timeout(timeout).into()
            }

            pub fn map<R, F>(&self, f: F) -> AsyncResult<R, E>
            where
                R: Payload,
                F: FnOnce($($T),+) -> R + Send + 'static,
            {
                self.inner.map(move |($($v,)+)| f($($v),+))
            }

            pub fn flat_map<R, F>(&self, f: F) -> AsyncResult<R, E>
            where
                R: Payload,
                F: FnOnce($($T),+) -> AsyncResult<R, E> + Send + 'static,
            {
                self.inner.flat_map(move |($($v,)+)| f($($v),+))
            }

            pub fn if_present<F>(&self, consumer: F) -> AsyncResult<bool, E>
            where
                F: FnOnce($(&$T),+) + Send + 'static,
            {
                self.inner.if_present(move |($($v,)+)| consumer($($v),+))
            }

            pub fn filter<P>(&self, predicate: P) -> Self
            where
                P: FnOnce($(&$T),+) -> bool + Send + 'static,
            {
                Self::new(self.inner.filter(move |($($v,)+)| predicate($($v),+)))
            }

            /// Registers `callback` to run with the joint outcome.
            pub fn on_complete<F>(&self, callback: F)
            where
                F: FnOnce(&$tuple<$($T,)+ E>) + Send + 'static,
            {
                self.inner.on_complete(move |value| callback(&value.clone().into()))
            }
        }

        impl<$($T,)+ E> Future for $name<$($T,)+ E>
        where
            $($T: Payload,)+
            E: Payload,
        {
            type Output = $tuple<$($T,)+ E>;

            fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
                Pin::new(&mut self.inner).poll(cx).map(Into::into)
            }
        }
    };
}

tuple_future! {
    /// Eventual joint outcome of two operations.
    TupleAsyncResult2 => TupleResult2 { T1, v1; T2, v2 }
}

tuple_future! {
    /// Eventual joint outcome of three operations.
    TupleAsyncResult3 => TupleResult3 { T1, v1; T2, v2; T3, v3 }
}

tuple_future! {
    /// Eventual joint outcome of four operations.
    TupleAsyncResult4 => TupleResult4 { T1, v1; T2, v2; T3, v3; T4, v4 }
}
