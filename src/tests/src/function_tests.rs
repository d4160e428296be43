//! Tests for decorated functions driving asynchronous work.

use crate::init_tracing;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tuple_or_error::{
    from_fn, identify, seqf2, success, DecoratorChain, Factory, Next, ResultValue, ThreadExecutor,
    TracingDecorator,
};

/// Tests a traced, retried call joined with another operation.
#[test]
fn test_decorated_calls_inside_join() {
    init_tracing();
    let factory = Factory::new(Arc::new(ThreadExecutor::new("decorated")));
    let attempts = Arc::new(AtomicUsize::new(0));

    let chain = DecoratorChain::new()
        .with(from_fn(10, |next: Next<'_, u64, String>| {
            let mut value = next.proceed();
            for _ in 0..2 {
                if value.has_result() {
                    break;
                }
                value = next.proceed();
            }
            value
        }))
        .with(TracingDecorator::default());

    let counter = Arc::clone(&attempts);
    let get_nonce = Arc::new(chain.decorate_identified(identify(
        move |account: String| -> ResultValue<u64, String> {
            if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                ResultValue::fail_value(format!("{} unavailable", account))
            } else {
                success(7)
            }
        },
        "get_nonce",
    )));

    let joined = seqf2(
        || {
            let get_nonce = Arc::clone(&get_nonce);
            factory.supply(move || get_nonce.call1("alice".to_string()))
        },
        || factory.supply(|| success::<u64, String>(21_000)),
    );

    let tuple = joined.get();
    assert_eq!(*tuple.get1(), 7);
    assert_eq!(*tuple.get2(), 21_000);
    assert_eq!(attempts.load(Ordering::SeqCst), 3);
}

/// Tests that identified functions keep their name through decoration.
#[test]
fn test_identity_survives_decoration() {
    let chain: DecoratorChain<String, String> = DecoratorChain::new();
    let greet = identify(|name: &'static str| success(format!("hello {}", name)), "greet");
    assert_eq!(greet.identity(), "greet");

    let decorated = chain.decorate_identified(greet);
    assert_eq!(decorated.identity(), Some("greet"));
    assert_eq!(decorated.call1("bob").into_result(), Ok("hello bob".to_string()));
}
