//! Fixed-arity aggregates of several outcomes treated as one.

use crate::errors::{ErrorKind, ResultError};
use crate::result::ResultValue;
use std::fmt;

macro_rules! tuple_result {
    (
        $(#[$meta:meta])*
        $name:ident { $( $idx:tt => $T:ident, $v:ident, $get:ident );+ }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq)]
        pub struct $name<$($T,)+ E> {
            inner: ResultValue<($($T,)+), E>,
        }

        impl<$($T,)+ E> $name<$($T,)+ E> {
            pub fn success($($v: $T),+) -> Self {
                Self { inner: ResultValue::success(($($v,)+)) }
            }

            pub fn fail(error: ResultError<E>) -> Self {
                Self { inner: ResultValue::fail(error) }
            }

            pub fn has_result(&self) -> bool {
                self.inner.has_result()
            }

            pub fn has_error(&self) -> bool {
                self.inner.has_error()
            }

            pub fn error(&self) -> Option<&ResultError<E>> {
                self.inner.error()
            }

            pub fn kind(&self) -> Option<ErrorKind> {
                self.inner.kind()
            }

            $(
                /// # Panics
                ///
                /// Panics with "no value present" when an error is held.
                pub fn $get(&self) -> &$T {
                    match self.inner.result() {
                        Some(values) => &values.$idx,
                        None => panic!("no value present"),
                    }
                }
            )+

            /// Invokes `consumer` with every value if no error is held.
            pub fn if_present<F>(&self, consumer: F)
            where
                F: FnOnce($(&$T),+),
            {
                if let Some(values) = self.inner.result() {
                    consumer($(&values.$idx),+);
                }
            }

            /// Replaces the values with [`ResultError::FilterRejected`] unless
            /// `predicate` accepts them.
            pub fn filter<P>(self, predicate: P) -> Self
            where
                P: FnOnce($(&$T),+) -> bool,
            {
                Self {
                    inner: self.inner.filter(|values| predicate($(&values.$idx),+)),
                }
            }

            /// Combines every value through `f`, or propagates the held error.
            pub fn map<R, F>(self, f: F) -> ResultValue<R, E>
            where
                F: FnOnce($($T),+) -> R,
            {
                self.inner.map(|($($v,)+)| f($($v),+))
            }

            pub fn into_values(self) -> Result<($($T,)+), ResultError<E>> {
                self.inner.into_result()
            }
        }

        impl<$($T,)+ E> From<ResultValue<($($T,)+), E>> for $name<$($T,)+ E> {
            fn from(inner: ResultValue<($($T,)+), E>) -> Self {
                Self { inner }
            }
        }

        impl<$($T,)+ E> From<$name<$($T,)+ E>> for ResultValue<($($T,)+), E> {
            fn from(tuple: $name<$($T,)+ E>) -> Self {
                tuple.inner
            }
        }

        impl<$($T,)+ E> fmt::Display for $name<$($T,)+ E>
        where
            $($T: fmt::Display,)+
            E: fmt::Display,
        {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                match self.inner.result() {
                    Some(values) => {
                        let parts: Vec<String> = vec![$(values.$idx.to_string()),+];
                        write!(f, "Tuple[{}]", parts.join(", "))
                    }
                    None => match self.inner.error() {
                        Some(error) => write!(f, "Error[{}]", error),
                        None => Ok(()),
                    },
                }
            }
        }
    };
}

tuple_result! {
    /// Two outcomes bundled into one.
    TupleResult2 { 0 => T1, v1, get1; 1 => T2, v2, get2 }
}

tuple_result! {
    /// Three outcomes bundled into one.
    TupleResult3 { 0 => T1, v1, get1; 1 => T2, v2, get2; 2 => T3, v3, get3 }
}

tuple_result! {
    /// Four outcomes bundled into one.
    TupleResult4 { 0 => T1, v1, get1; 1 => T2, v2, get2; 2 => T3, v3, get3; 3 => T4, v4, get4 }
}
