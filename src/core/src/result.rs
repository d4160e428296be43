//! The single success-or-error value.

use crate::errors::{ErrorKind, InternalFailure, ResultError};
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};

/// Marker for types that can travel through the framework.
///
/// A completed future may be read by any number of continuations and blocking
/// readers on any thread, so values and collaborator errors must be cloneable
/// and sendable.
pub trait Payload: Clone + Send + 'static {}

impl<T: Clone + Send + 'static> Payload for T {}

/// Holds exactly one of a success value or an error. Never both.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultValue<T, E> {
    inner: Result<T, ResultError<E>>,
}

/// Creates a successful [`ResultValue`].
pub fn success<T, E>(value: T) -> ResultValue<T, E> {
    ResultValue::success(value)
}

/// Creates a failed [`ResultValue`].
pub fn fail<T, E>(error: ResultError<E>) -> ResultValue<T, E> {
    ResultValue::fail(error)
}

/// Runs `f`, turning a panic into an internal failure.
pub(crate) fn guarded<R>(f: impl FnOnce() -> R) -> Result<R, InternalFailure> {
    catch_unwind(AssertUnwindSafe(f)).map_err(InternalFailure::from_panic)
}

impl<T, E> ResultValue<T, E> {
    pub fn success(value: T) -> Self {
        Self { inner: Ok(value) }
    }

    pub fn fail(error: ResultError<E>) -> Self {
        Self { inner: Err(error) }
    }

    /// Fails with a collaborator error.
    pub fn fail_value(error: E) -> Self {
        Self::fail(ResultError::Value(error))
    }

    /// Runs `supplier`; a panic becomes an internal failure.
    pub fn catching<F>(supplier: F) -> Self
    where
        F: FnOnce() -> T,
    {
        match guarded(supplier) {
            Ok(value) => Self::success(value),
            Err(failure) => Self::fail(ResultError::Internal(failure)),
        }
    }

    /// Runs a fallible `supplier`; its error becomes a collaborator error and
    /// a panic becomes an internal failure.
    pub fn of<F>(supplier: F) -> Self
    where
        F: FnOnce() -> Result<T, E>,
    {
        match guarded(supplier) {
            Ok(result) => result.into(),
            Err(failure) => Self::fail(ResultError::Internal(failure)),
        }
    }

    pub fn has_result(&self) -> bool {
        self.inner.is_ok()
    }

    pub fn has_error(&self) -> bool {
        self.inner.is_err()
    }

    pub fn result(&self) -> Option<&T> {
        self.inner.as_ref().ok()
    }

    pub fn error(&self) -> Option<&ResultError<E>> {
        self.inner.as_ref().err()
    }

    /// Returns the kind of the held error, if any.
    pub fn kind(&self) -> Option<ErrorKind> {
        self.error().map(ResultError::kind)
    }

    pub fn into_result(self) -> Result<T, ResultError<E>> {
        self.inner
    }

    /// Applies `f` to a success value.
    ///
    /// A held error is passed through unchanged and `f` is not invoked. A
    /// panic inside `f` becomes [`ResultError::Internal`].
    pub fn map<R, F>(self, f: F) -> ResultValue<R, E>
    where
        F: FnOnce(T) -> R,
    {
        match self.inner {
            Ok(value) => ResultValue::catching(move || f(value)),
            Err(error) => ResultValue::fail(error),
        }
    }

    /// Chains a dependent fallible step. Errors are sticky, as for [`map`](Self::map).
    pub fn flat_map<R, F>(self, f: F) -> ResultValue<R, E>
    where
        F: FnOnce(T) -> ResultValue<R, E>,
    {
        match self.inner {
            Ok(value) => match guarded(move || f(value)) {
                Ok(next) => next,
                Err(failure) => ResultValue::fail(ResultError::Internal(failure)),
            },
            Err(error) => ResultValue::fail(error),
        }
    }

    /// Invokes `consumer` with the value if there is one.
    pub fn if_present<F>(&self, consumer: F)
    where
        F: FnOnce(&T),
    {
        if let Ok(value) = &self.inner {
            consumer(value);
        }
    }

    /// Keeps the value only if `predicate` accepts it.
    pub fn filter<P>(self, predicate: P) -> Self
    where
        P: FnOnce(&T) -> bool,
    {
        match self.inner {
            Ok(value) => match guarded(|| predicate(&value)) {
                Ok(true) => Self::success(value),
                Ok(false) => Self::fail(ResultError::FilterRejected),
                Err(failure) => Self::fail(ResultError::Internal(failure)),
            },
            Err(error) => Self::fail(error),
        }
    }

    pub fn or_else(self, other: T) -> T {
        self.inner.unwrap_or(other)
    }

    pub fn or_else_get<F>(self, other: F) -> T
    where
        F: FnOnce() -> T,
    {
        self.inner.unwrap_or_else(|_| other())
    }

    /// Returns the value, or the error built by `error_supplier` when an error
    /// is held. The supplier is not invoked on success.
    pub fn get_or_throws<X, F>(self, error_supplier: F) -> Result<T, X>
    where
        F: FnOnce() -> X,
    {
        self.inner.map_err(|_| error_supplier())
    }
}

impl<T, E> From<Result<T, E>> for ResultValue<T, E> {
    fn from(result: Result<T, E>) -> Self {
        match result {
            Ok(value) => Self::success(value),
            Err(error) => Self::fail_value(error),
        }
    }
}

impl<T, E> From<ResultValue<T, E>> for Result<T, ResultError<E>> {
    fn from(value: ResultValue<T, E>) -> Self {
        value.inner
    }
}

impl<T, E> fmt::Display for ResultValue<T, E>
where
    T: fmt::Display,
    E: fmt::Display,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.inner {
            Ok(value) => write!(f, "Result[{}]", value),
            Err(error) => write!(f, "Error[{}]", error),
        }
    }
}
