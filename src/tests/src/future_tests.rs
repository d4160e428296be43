//! Tests for asynchronous results shared across threads.

use futures::executor::block_on;
use serial_test::serial;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::{Duration, Instant};
use tuple_or_error::{
    success, ErrorKind, Factory, ResultError, ResultValue, ThreadExecutor, TokioExecutor,
};

/// Tests that exactly one of many racing completions wins and every reader
/// sees the same value.
#[test]
fn test_concurrent_completion_single_winner() {
    let factory = Factory::inline();
    for _ in 0..20 {
        let future = factory.supply_empty_future::<usize, String>();
        let barrier = Arc::new(Barrier::new(8));

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let future = future.clone();
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    let won = future.complete(success(i));
                    (i, won, future.get().into_result().unwrap())
                })
            })
            .collect();

        let outcomes: Vec<(usize, bool, usize)> =
            handles.into_iter().map(|h| h.join().unwrap()).collect();
        let winners: Vec<usize> = outcomes.iter().filter(|o| o.1).map(|o| o.0).collect();
        assert_eq!(winners.len(), 1);
        assert!(outcomes.iter().all(|o| o.2 == winners[0]));
    }
}

/// Tests that a timed-out wait leaves the future to complete normally.
#[test]
#[serial]
fn test_get_timeout_leaves_state_untouched() {
    let factory = Factory::new(Arc::new(ThreadExecutor::new("timeout-test")));
    let future = factory.supply(|| {
        thread::sleep(Duration::from_millis(100));
        success::<&'static str, String>("late")
    });

    let started = Instant::now();
    let early = future.get_timeout(Duration::from_millis(10));
    assert_eq!(early.kind(), Some(ErrorKind::Timeout));
    assert!(started.elapsed() < Duration::from_millis(100));
    assert!(!future.is_cancelled());

    assert_eq!(future.get().into_result(), Ok("late"));
}

/// Tests continuation chains scheduled on a tokio runtime.
#[test]
fn test_continuations_on_tokio() {
    let executor = TokioExecutor::new(Some(2), "chain-test").unwrap();
    let factory = Factory::new(Arc::new(executor));

    let balance = factory
        .supply(|| success::<u64, String>(1_000))
        .map(|wei| wei / 10)
        .filter(|value| *value > 50)
        .flat_map({
            let factory = factory.clone();
            move |value| factory.supply(move || success(value + 1))
        });
    assert_eq!(balance.get().result(), Some(&101));

    let rejected = factory
        .supply(|| success::<u64, String>(3))
        .filter(|value| *value > 50);
    assert_eq!(rejected.get().error(), Some(&ResultError::FilterRejected));
}

/// Tests that a sticky error skips every continuation.
#[test]
fn test_sticky_error_skips_continuations() {
    let calls = Arc::new(AtomicUsize::new(0));
    let factory = Factory::inline();

    let counter = Arc::clone(&calls);
    let future = factory
        .supply(|| ResultValue::<u64, String>::fail_value("nonce too low".to_string()))
        .map(move |v| {
            counter.fetch_add(1, Ordering::SeqCst);
            v + 1
        });
    let present = future.if_present(|_| {});

    assert_eq!(present.get().error(), Some(&ResultError::Value("nonce too low".to_string())));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

/// Tests completing an empty future from a callback-driven API.
#[test]
fn test_bridge_callback_api() {
    let factory = Factory::inline();
    let future = factory.supply_empty_future::<String, String>();

    let producer = future.clone();
    thread::spawn(move || {
        thread::sleep(Duration::from_millis(10));
        producer.complete(success("0xabc".to_string()));
    });

    assert_eq!(block_on(future).into_result(), Ok("0xabc".to_string()));
}

/// Tests awaiting a result inside async code.
#[test]
fn test_await_inside_runtime() {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let factory = Factory::new(Arc::new(TokioExecutor::from_handle(rt.handle().clone())));

    let value = rt.block_on(async {
        let height = factory.supply_async(async {
            tokio::time::sleep(Duration::from_millis(5)).await;
            success::<u64, String>(7)
        });
        height.map(|h| h * 2).await
    });
    assert_eq!(value.result(), Some(&14));
}
