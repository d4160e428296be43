//! Result-or-error values and the combinators that join them.
//!
//! Every operation yields either a success value or an error, never both.
//! This crate provides that container in a synchronous form
//! ([`ResultValue`], [`TupleResult2`]..[`TupleResult4`]) and an asynchronous
//! one ([`AsyncResult`], [`TupleAsyncResult2`]..[`TupleAsyncResult4`]), a
//! [`Factory`] that schedules work on an explicit execution context, and the
//! `seqf` join combinators that run independent operations concurrently and
//! merge their outcomes with a deterministic, index-ordered choice of error.

pub mod config;
pub mod errors;
pub mod executor;
pub mod factory;
pub mod function;
pub mod future;
pub mod result;
pub mod sequencer;
pub mod tuple;
pub mod tuple_future;

// Re-export commonly used types
pub use config::{ExecutorKind, FactoryConfig};
pub use errors::{ErrorKind, InternalFailure, ResultError};
pub use executor::{ExecutionContext, Executor, InlineExecutor, ThreadExecutor, TokioExecutor};
pub use factory::Factory;
pub use function::{
    from_fn, identify, Decorated, Decorator, DecoratorChain, Identified, Next, TracingDecorator,
};
pub use future::{AsyncResult, CancelToken};
pub use result::{fail, success, Payload, ResultValue};
pub use sequencer::{seqf2, seqf3, seqf4};
pub use tuple::{TupleResult2, TupleResult3, TupleResult4};
pub use tuple_future::{TupleAsyncResult2, TupleAsyncResult3, TupleAsyncResult4};
