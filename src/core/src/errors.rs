//! Error types for the result-or-error framework.

use std::any::Any;
use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Errors carried by a [`ResultValue`](crate::ResultValue) or one of its tuple
/// and future relatives.
///
/// `Value` wraps the opaque error produced by a collaborator (transport,
/// signing, model conversion). The remaining variants are introduced by the
/// framework itself.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ResultError<E> {
    /// Business error supplied by a collaborator.
    #[error("{0}")]
    Value(E),

    /// A filter predicate rejected the value.
    #[error("No such element matching predicate")]
    FilterRejected,

    /// A bounded wait elapsed before the future completed.
    #[error("Timed out after {0:?}")]
    Timeout(Duration),

    /// The future was cancelled before it completed.
    #[error("Cancelled before completion")]
    Cancelled,

    /// Unexpected failure inside a supplier or continuation.
    #[error("Internal failure: {0}")]
    Internal(InternalFailure),
}

/// Discriminant of a [`ResultError`], without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Value,
    FilterRejected,
    Timeout,
    Cancelled,
    Internal,
}

impl<E> ResultError<E> {
    /// Returns the kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ResultError::Value(_) => ErrorKind::Value,
            ResultError::FilterRejected => ErrorKind::FilterRejected,
            ResultError::Timeout(_) => ErrorKind::Timeout,
            ResultError::Cancelled => ErrorKind::Cancelled,
            ResultError::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Returns the collaborator error, if this is one.
    pub fn value(&self) -> Option<&E> {
        match self {
            ResultError::Value(e) => Some(e),
            _ => None,
        }
    }

    /// Replaces an internal failure with one that reports its root cause.
    pub(crate) fn into_rooted(self) -> Self {
        match self {
            ResultError::Internal(failure) => ResultError::Internal(failure.rooted()),
            other => other,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::Value => "value",
            ErrorKind::FilterRejected => "filter-rejected",
            ErrorKind::Timeout => "timeout",
            ErrorKind::Cancelled => "cancelled",
            ErrorKind::Internal => "internal",
        };
        f.write_str(name)
    }
}

/// An unexpected failure captured while running user code.
///
/// Cloning is cheap: the underlying error is shared.
#[derive(Clone)]
pub struct InternalFailure {
    cause: Arc<anyhow::Error>,
}

impl InternalFailure {
    /// Wraps an arbitrary error.
    pub fn new<C>(cause: C) -> Self
    where
        C: StdError + Send + Sync + 'static,
    {
        Self::from_anyhow(anyhow::Error::new(cause))
    }

    /// Wraps an `anyhow` error, keeping its context chain.
    pub fn from_anyhow(cause: anyhow::Error) -> Self {
        Self {
            cause: Arc::new(cause),
        }
    }

    /// Builds a failure from a plain message.
    pub fn msg(message: impl fmt::Display + fmt::Debug + Send + Sync + 'static) -> Self {
        Self::from_anyhow(anyhow::Error::msg(message))
    }

    /// Builds a failure from the payload of a caught panic.
    pub fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&'static str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "unknown panic payload".to_string()
        };
        Self::msg(format!("panicked: {}", message))
    }

    /// Returns the innermost error of the cause chain.
    pub fn root_cause(&self) -> &(dyn StdError + 'static) {
        self.cause.root_cause()
    }

    /// Returns the number of layers in the cause chain, the outermost included.
    pub fn depth(&self) -> usize {
        self.cause.chain().count()
    }

    /// Returns a failure whose single layer is the root cause of this one.
    pub fn rooted(&self) -> Self {
        if self.depth() <= 1 {
            return self.clone();
        }
        Self::msg(self.root_cause().to_string())
    }
}

impl fmt::Display for InternalFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.cause)
    }
}

impl fmt::Debug for InternalFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InternalFailure")
            .field("cause", &self.cause.to_string())
            .field("root", &self.root_cause().to_string())
            .finish()
    }
}

impl PartialEq for InternalFailure {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.cause, &other.cause) || self.to_string() == other.to_string()
    }
}

impl From<anyhow::Error> for InternalFailure {
    fn from(error: anyhow::Error) -> Self {
        Self::from_anyhow(error)
    }
}
