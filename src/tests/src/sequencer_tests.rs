//! Tests for the join combinators under real concurrency.

use crate::init_tracing;
use anyhow::{anyhow, Context};
use rand::Rng;
use serial_test::serial;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tuple_or_error::{
    seqf2, seqf3, success, ErrorKind, Factory, InternalFailure, ResultError, ResultValue,
    ThreadExecutor, TokioExecutor,
};

fn threaded() -> Factory {
    Factory::new(Arc::new(ThreadExecutor::new("seq-test")))
}

fn failing_after(
    delay: Duration,
    error: &'static str,
) -> impl FnOnce() -> ResultValue<u64, &'static str> {
    move || {
        thread::sleep(delay);
        ResultValue::fail_value(error)
    }
}

/// Tests that the lowest-index error is reported whichever member fails
/// first in wall-clock time.
#[test]
#[serial]
fn test_error_selection_is_deterministic() {
    init_tracing();
    let factory = threaded();
    let mut rng = rand::thread_rng();

    for round in 0..10 {
        let short = Duration::from_millis(rng.gen_range(0..5));
        let long = short + Duration::from_millis(rng.gen_range(20..40));

        // Delay the first member, so the second fails first
        let joined = seqf2(
            || factory.supply(failing_after(long, "E1")),
            || factory.supply(failing_after(short, "E2")),
        );
        assert_eq!(
            joined.get().error(),
            Some(&ResultError::Value("E1")),
            "round {} with the first member delayed",
            round
        );

        // Delay the second member
        let joined = seqf2(
            || factory.supply(failing_after(short, "E1")),
            || factory.supply(failing_after(long, "E2")),
        );
        assert_eq!(
            joined.get().error(),
            Some(&ResultError::Value("E1")),
            "round {} with the second member delayed",
            round
        );
    }
}

/// Tests that a failure cancels slower siblings instead of waiting for them.
#[test]
#[serial]
fn test_failure_cancels_slow_sibling() {
    init_tracing();
    let factory = threaded();
    let observed = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&observed);

    let started = Instant::now();
    let joined = seqf2(
        || factory.supply(failing_after(Duration::from_millis(5), "rejected")),
        || {
            factory.supply_cancellable(move |token| -> ResultValue<u64, &'static str> {
                let deadline = Instant::now() + Duration::from_secs(10);
                while !token.is_cancelled() && Instant::now() < deadline {
                    thread::sleep(Duration::from_millis(1));
                }
                flag.store(token.is_cancelled(), Ordering::SeqCst);
                success(0)
            })
        },
    );

    let tuple = joined.get();
    assert_eq!(tuple.error(), Some(&ResultError::Value("rejected")));
    assert!(started.elapsed() < Duration::from_secs(5));

    // The sibling's work observes the cancellation
    let deadline = Instant::now() + Duration::from_secs(5);
    while !observed.load(Ordering::SeqCst) && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(1));
    }
    assert!(observed.load(Ordering::SeqCst));
}

/// Tests that successful values come back in argument order.
#[test]
fn test_values_follow_argument_order() {
    let factory = threaded();
    let joined = seqf3(
        || {
            factory.supply(|| {
                thread::sleep(Duration::from_millis(30));
                success::<u64, String>(1)
            })
        },
        || factory.supply(|| success("balance".to_string())),
        || {
            factory.supply(|| {
                thread::sleep(Duration::from_millis(10));
                success(vec![1u8, 2, 3])
            })
        },
    );

    let (count, name, bytes) = joined.get().into_values().unwrap();
    assert_eq!(count, 1);
    assert_eq!(name, "balance");
    assert_eq!(bytes, vec![1, 2, 3]);
}

/// Tests the blocking `seqN` helpers on a tokio runtime.
#[test]
fn test_seq_on_tokio_executor() {
    init_tracing();
    let executor = TokioExecutor::new(Some(2), "seq-tokio").unwrap();
    let factory = Factory::new(Arc::new(executor));

    let tuple = factory.seq4(
        || success::<u64, String>(1),
        || success(2u32),
        || success("three"),
        || success(4.0f32),
    );
    assert!(tuple.has_result());
    assert_eq!(tuple.to_string(), "Tuple[1, 2, three, 4]");

    let tuple = factory.seq2(
        || success::<u64, String>(1),
        || -> ResultValue<u64, String> { panic!("decoder crashed") },
    );
    assert_eq!(tuple.kind(), Some(ErrorKind::Internal));
}

/// Tests that the wait timeout bounds the blocking helpers.
#[test]
#[serial]
fn test_seq_wait_timeout_bounds_wait() {
    let factory = threaded().with_wait_timeout(Duration::from_millis(20));
    let started = Instant::now();
    let tuple = factory.seq3(
        || success::<u64, String>(1),
        || {
            thread::sleep(Duration::from_millis(300));
            success(2u64)
        },
        || success(3u64),
    );
    assert_eq!(tuple.kind(), Some(ErrorKind::Timeout));
    assert!(started.elapsed() < Duration::from_millis(300));
}

/// Tests that cancelling a timed-out join reaches the work of its members.
#[test]
#[serial]
fn test_timed_out_join_cancels_members() {
    let factory = threaded();
    let observed = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&observed);

    let fast = factory.supply(|| success::<u64, String>(1));
    let slow = factory.supply_cancellable(move |token| -> ResultValue<u64, String> {
        let deadline = Instant::now() + Duration::from_secs(10);
        while !token.is_cancelled() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(1));
        }
        flag.store(token.is_cancelled(), Ordering::SeqCst);
        success(2)
    });
    let joined = seqf2(|| fast.clone(), || slow.clone());

    let tuple = joined.get_timeout(Duration::from_millis(20));
    assert_eq!(tuple.kind(), Some(ErrorKind::Timeout));
    assert!(joined.cancel());
    assert!(slow.is_cancelled());

    // The member's work observes the cancellation
    let deadline = Instant::now() + Duration::from_secs(5);
    while !observed.load(Ordering::SeqCst) && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(1));
    }
    assert!(observed.load(Ordering::SeqCst));
    assert_eq!(joined.get().kind(), Some(ErrorKind::Cancelled));
}

/// Tests that a failure nested in context layers reaches the caller of a
/// join as its root cause.
#[test]
fn test_join_reports_root_cause_of_nested_failure() {
    let factory = threaded();
    let joined = seqf2(
        || factory.supply(|| success::<u64, String>(1)),
        || {
            factory.supply(|| {
                let header: anyhow::Result<u64> = Err(anyhow!("connection reset by peer"))
                    .context("reading block header")
                    .context("rpc worker");
                match header {
                    Ok(height) => success(height),
                    Err(e) => ResultValue::fail(ResultError::Internal(InternalFailure::from(e))),
                }
            })
        },
    );

    match joined.get().error() {
        Some(ResultError::Internal(failure)) => {
            assert_eq!(failure.to_string(), "connection reset by peer");
            assert_eq!(failure.depth(), 1);
        }
        other => panic!("unexpected outcome: {:?}", other),
    }
}

/// Tests that the joint future can be awaited.
#[test]
fn test_await_join() {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let factory = Factory::new(Arc::new(TokioExecutor::from_handle(rt.handle().clone())));

    let sum = rt.block_on(async {
        let joined = seqf2(
            || factory.supply_async(async { success::<u64, String>(20) }),
            || factory.supply_async(async { success::<u64, String>(22) }),
        );
        joined.await.map(|a, b| a + b)
    });
    assert_eq!(sum.result(), Some(&42));
}
