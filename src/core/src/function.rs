//! Named functions and decorator chains around them.
//!
//! A [`DecoratorChain`] layers cross-cutting wrappers (tracing, retry,
//! short-circuiting) around a function returning a [`ResultValue`]. Each
//! decorator receives the rest of the chain as a [`Next`] and decides
//! whether, when and how often to proceed.

use crate::errors::ResultError;
use crate::result::{guarded, Payload, ResultValue};
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, debug_span, trace};

/// A function carrying a diagnostic name.
#[derive(Clone)]
pub struct Identified<F> {
    identity: Arc<str>,
    f: F,
}

/// Attaches `name` to `f`.
pub fn identify<F>(f: F, name: impl Into<String>) -> Identified<F> {
    Identified {
        identity: Arc::from(name.into()),
        f,
    }
}

impl<F> Identified<F> {
    pub fn identity(&self) -> &str {
        &self.identity
    }

    pub fn inner(&self) -> &F {
        &self.f
    }

    pub fn into_inner(self) -> F {
        self.f
    }
}

impl<F> fmt::Debug for Identified<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Identified")
            .field("identity", &self.identity)
            .finish()
    }
}

impl<F> fmt::Display for Identified<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.identity)
    }
}

macro_rules! identified_calls {
    ($( $call:ident ( $( $a:ident : $A:ident ),* ); )+) => {
        impl<F> Identified<F> {
            $(
                pub fn $call<$($A,)* R>(&self, $($a: $A),*) -> R
                where
                    F: Fn($($A),*) -> R,
                {
                    (self.f)($($a),*)
                }
            )+
        }
    };
}

identified_calls! {
    call0();
    call1(a: A);
    call2(a: A, b: B);
    call3(a: A, b: B, c: C);
    call4(a: A, b: B, c: C, d: D);
}

/// A cross-cutting wrapper around an invocation.
pub trait Decorator<T, E>: Send + Sync {
    /// Lower priorities wrap higher ones. Equal priorities keep insertion
    /// order.
    fn priority(&self) -> i32 {
        0
    }

    fn around(&self, next: Next<'_, T, E>) -> ResultValue<T, E>;
}

/// The remainder of a decorator chain, ending in the wrapped function.
pub struct Next<'a, T, E> {
    identity: Option<&'a str>,
    rest: &'a [Arc<dyn Decorator<T, E>>],
    target: &'a (dyn Fn() -> ResultValue<T, E> + 'a),
}

impl<T, E> Clone for Next<'_, T, E> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T, E> Copy for Next<'_, T, E> {}

impl<'a, T, E> Next<'a, T, E> {
    /// Name of the decorated function, if it was identified.
    pub fn identity(&self) -> Option<&'a str> {
        self.identity
    }

    /// Runs the rest of the chain. May be called more than once.
    pub fn proceed(&self) -> ResultValue<T, E> {
        match self.rest.split_first() {
            Some((decorator, rest)) => decorator.around(Next {
                identity: self.identity,
                rest,
                target: self.target,
            }),
            None => guarded(self.target).unwrap_or_else(|failure| {
                debug!(function = ?self.identity, "Decorated function panicked: {}", failure);
                ResultValue::fail(ResultError::Internal(failure))
            }),
        }
    }
}

/// An ordered set of decorators.
pub struct DecoratorChain<T, E> {
    decorators: Vec<Arc<dyn Decorator<T, E>>>,
}

impl<T, E> Clone for DecoratorChain<T, E> {
    fn clone(&self) -> Self {
        Self {
            decorators: self.decorators.clone(),
        }
    }
}

impl<T, E> Default for DecoratorChain<T, E> {
    fn default() -> Self {
        Self {
            decorators: Vec::new(),
        }
    }
}

impl<T, E> fmt::Debug for DecoratorChain<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let priorities: Vec<i32> = self.decorators.iter().map(|d| d.priority()).collect();
        f.debug_struct("DecoratorChain")
            .field("priorities", &priorities)
            .finish()
    }
}

impl<T, E> DecoratorChain<T, E>
where
    T: Payload,
    E: Payload,
{
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with<D>(mut self, decorator: D) -> Self
    where
        D: Decorator<T, E> + 'static,
    {
        let priority = decorator.priority();
        self.decorators.push(Arc::new(decorator));
        // `sort_by_key` is stable, so equal priorities keep insertion order.
        self.decorators.sort_by_key(|d| d.priority());
        debug!(priority, decorators = self.decorators.len(), "Added decorator");
        self
    }

    pub fn len(&self) -> usize {
        self.decorators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.decorators.is_empty()
    }

    /// Runs `target` through every decorator.
    pub fn invoke<F>(&self, identity: Option<&str>, target: F) -> ResultValue<T, E>
    where
        F: Fn() -> ResultValue<T, E>,
    {
        trace!(
            function = ?identity,
            decorators = self.decorators.len(),
            "Invoking through decorators"
        );
        let next = Next {
            identity,
            rest: &self.decorators,
            target: &target,
        };
        guarded(|| next.proceed()).unwrap_or_else(|failure| {
            debug!(function = ?identity, "Decorator panicked: {}", failure);
            ResultValue::fail(ResultError::Internal(failure))
        })
    }

    pub fn decorate<F>(&self, f: F) -> Decorated<F, T, E> {
        Decorated {
            chain: self.clone(),
            identity: None,
            f,
        }
    }

    pub fn decorate_identified<F>(&self, f: Identified<F>) -> Decorated<F, T, E> {
        Decorated {
            chain: self.clone(),
            identity: Some(f.identity),
            f: f.f,
        }
    }
}

/// A function bound to a decorator chain.
pub struct Decorated<F, T, E> {
    chain: DecoratorChain<T, E>,
    identity: Option<Arc<str>>,
    f: F,
}

impl<F, T, E> fmt::Debug for Decorated<F, T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Decorated")
            .field("identity", &self.identity)
            .field("chain", &self.chain)
            .finish()
    }
}

macro_rules! decorated_calls {
    ($( $call:ident ( $( $a:ident : $A:ident ),* ); )+) => {
        impl<F, T, E> Decorated<F, T, E>
        where
            T: Payload,
            E: Payload,
        {
            pub fn identity(&self) -> Option<&str> {
                self.identity.as_deref()
            }

            $(
                /// Arguments are cloned for every attempt a decorator makes.
                pub fn $call<$($A),*>(&self, $($a: $A),*) -> ResultValue<T, E>
                where
                    F: Fn($($A),*) -> ResultValue<T, E>,
                    $($A: Clone,)*
                {
                    self.chain
                        .invoke(self.identity(), || (self.f)($($a.clone()),*))
                }
            )+
        }
    };
}

decorated_calls! {
    call0();
    call1(a: A);
    call2(a: A, b: B);
    call3(a: A, b: B, c: C);
    call4(a: A, b: B, c: C, d: D);
}

/// Adapts a closure into a [`Decorator`].
pub struct FnDecorator<F, T, E> {
    priority: i32,
    f: F,
    _marker: PhantomData<fn() -> (T, E)>,
}

pub fn from_fn<F, T, E>(priority: i32, f: F) -> FnDecorator<F, T, E>
where
    F: Fn(Next<'_, T, E>) -> ResultValue<T, E> + Send + Sync,
{
    FnDecorator {
        priority,
        f,
        _marker: PhantomData,
    }
}

impl<F, T, E> Decorator<T, E> for FnDecorator<F, T, E>
where
    F: Fn(Next<'_, T, E>) -> ResultValue<T, E> + Send + Sync,
{
    fn priority(&self) -> i32 {
        self.priority
    }

    fn around(&self, next: Next<'_, T, E>) -> ResultValue<T, E> {
        (self.f)(next)
    }
}

/// Wraps every invocation in a `debug` span named after the function and
/// logs its duration and outcome.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingDecorator {
    priority: i32,
}

impl TracingDecorator {
    pub fn with_priority(priority: i32) -> Self {
        Self { priority }
    }
}

impl<T, E> Decorator<T, E> for TracingDecorator
where
    T: Payload,
    E: Payload,
{
    fn priority(&self) -> i32 {
        self.priority
    }

    fn around(&self, next: Next<'_, T, E>) -> ResultValue<T, E> {
        let span = debug_span!("invoke", function = next.identity().unwrap_or("anonymous"));
        let _enter = span.enter();
        let started = Instant::now();
        let value = next.proceed();
        match value.kind() {
            None => debug!(elapsed = ?started.elapsed(), "Invocation succeeded"),
            Some(kind) => debug!(elapsed = ?started.elapsed(), %kind, "Invocation failed"),
        }
        value
    }
}
