//! Tests for the request queue

use super::*;
use crate::error::Error;
use crate::rate_limit::{EnhancedRateLimiter, RateLimit, RateLimitConfig};
use pretty_assertions::assert_eq;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;

fn config() -> RequestQueueConfig {
    RequestQueueConfig::default()
        .with_max_concurrency(2)
        .with_retry_delay_ms(100)
        .with_max_queue_size(10)
}

/// Work that fails with `fail` for the first `failures` attempts, then
/// returns the attempt number
fn flaky(
    attempts: &Arc<AtomicU32>,
    failures: u32,
    fail: fn() -> Error,
) -> impl Fn() -> futures::future::BoxFuture<'static, crate::error::Result<u32>> + Send + Sync {
    let attempts = Arc::clone(attempts);
    move || {
        let attempts = Arc::clone(&attempts);
        Box::pin(async move {
            let n = attempts.fetch_add(1, Ordering::SeqCst) + 1;
            if n <= failures {
                Err(fail())
            } else {
                Ok(n)
            }
        })
    }
}

#[test]
fn test_config_validation() {
    assert!(RequestQueueConfig::default().validate().is_ok());
    assert!(matches!(
        RequestQueueConfig::default().with_max_concurrency(0).validate(),
        Err(Error::InvalidConfigValue { .. })
    ));
    assert!(matches!(
        RequestQueueConfig::default().with_max_queue_size(0).validate(),
        Err(Error::InvalidConfigValue { .. })
    ));
}

#[test]
fn test_new_outside_runtime_fails() {
    let err = RequestQueue::new(RequestQueueConfig::default(), None).unwrap_err();
    assert!(matches!(err, Error::Config { .. }));
}

#[tokio::test]
async fn test_enqueue_resolves_value() {
    let queue = RequestQueue::new(config(), None).unwrap();
    let ticket = queue
        .enqueue(|| async { Ok("done") }, EnqueueOptions::new().with_id("job-1"))
        .unwrap();

    assert_eq!(ticket.id(), "job-1");
    assert_eq!(ticket.await.unwrap(), "done");
}

#[tokio::test]
async fn test_generated_ids_are_unique() {
    let queue = RequestQueue::new(config(), None).unwrap();
    let a = queue.enqueue(|| async { Ok(()) }, EnqueueOptions::new()).unwrap();
    let b = queue.enqueue(|| async { Ok(()) }, EnqueueOptions::new()).unwrap();

    assert!(a.id().starts_with("req_"));
    assert_ne!(a.id(), b.id());
    a.await.unwrap();
    b.await.unwrap();
}

// ============================================================================
// Capacity and concurrency
// ============================================================================

#[tokio::test]
async fn test_queue_full_rejects_synchronously() {
    let queue = RequestQueue::new(config().with_max_queue_size(2), None).unwrap();
    queue.pause();

    let first = queue.enqueue(|| async { Ok(1) }, EnqueueOptions::new()).unwrap();
    let second = queue.enqueue(|| async { Ok(2) }, EnqueueOptions::new()).unwrap();
    let err = queue
        .enqueue(|| async { Ok(3) }, EnqueueOptions::new())
        .unwrap_err();

    assert!(matches!(err, Error::QueueFull { max_queue_size: 2 }));
    assert_eq!(queue.status().queue_length, 2);

    queue.resume();
    assert_eq!(first.await.unwrap(), 1);
    assert_eq!(second.await.unwrap(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_concurrency_cap() {
    let queue = RequestQueue::new(config(), None).unwrap();
    let running = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));

    let tickets: Vec<_> = (0..5)
        .map(|i| {
            let running = Arc::clone(&running);
            let peak = Arc::clone(&peak);
            queue
                .enqueue(
                    move || {
                        let running = Arc::clone(&running);
                        let peak = Arc::clone(&peak);
                        async move {
                            let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                            peak.fetch_max(now, Ordering::SeqCst);
                            tokio::time::sleep(Duration::from_millis(200)).await;
                            running.fetch_sub(1, Ordering::SeqCst);
                            Ok(i)
                        }
                    },
                    EnqueueOptions::new(),
                )
                .unwrap()
        })
        .collect();

    let results = futures::future::join_all(tickets).await;

    assert!(peak.load(Ordering::SeqCst) <= 2);
    assert_eq!(peak.load(Ordering::SeqCst), 2);
    let values: Vec<i32> = results.into_iter().map(|r| r.unwrap()).collect();
    assert_eq!(values, vec![0, 1, 2, 3, 4]);
    assert_eq!(queue.status().active_requests, 0);
}

#[tokio::test]
async fn test_priority_start_order() {
    let queue = RequestQueue::new(config().with_max_concurrency(1), None).unwrap();
    let started = Arc::new(Mutex::new(Vec::new()));

    let tickets: Vec<_> = [1, 5, 3]
        .into_iter()
        .map(|priority| {
            let started = Arc::clone(&started);
            queue
                .enqueue(
                    move || {
                        started.lock().unwrap().push(priority);
                        async { Ok(()) }
                    },
                    EnqueueOptions::new().with_priority(priority),
                )
                .unwrap()
        })
        .collect();

    futures::future::join_all(tickets).await;
    assert_eq!(*started.lock().unwrap(), vec![5, 3, 1]);
}

#[tokio::test]
async fn test_fifo_when_priority_disabled() {
    let queue = RequestQueue::new(config().with_max_concurrency(1).with_priority(false), None).unwrap();
    let started = Arc::new(Mutex::new(Vec::new()));

    let tickets: Vec<_> = [1, 5, 3]
        .into_iter()
        .map(|priority| {
            let started = Arc::clone(&started);
            queue
                .enqueue(
                    move || {
                        started.lock().unwrap().push(priority);
                        async { Ok(()) }
                    },
                    EnqueueOptions::new().with_priority(priority),
                )
                .unwrap()
        })
        .collect();

    futures::future::join_all(tickets).await;
    assert_eq!(*started.lock().unwrap(), vec![1, 5, 3]);
}

// ============================================================================
// Retries
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_rate_limited_retry_waits_retry_after() {
    let queue = RequestQueue::new(config(), None).unwrap();
    let attempts = Arc::new(AtomicU32::new(0));
    let start = Instant::now();

    let ticket = queue
        .enqueue(
            flaky(&attempts, 1, || Error::rate_limited("slow down", Some(1))),
            EnqueueOptions::new(),
        )
        .unwrap();

    assert_eq!(ticket.await.unwrap(), 2);
    assert!(start.elapsed() >= Duration::from_millis(1000));
}

#[tokio::test(start_paused = true)]
async fn test_rate_limited_without_hint_uses_retry_delay() {
    let queue = RequestQueue::new(config(), None).unwrap();
    let attempts = Arc::new(AtomicU32::new(0));
    let start = Instant::now();

    let ticket = queue
        .enqueue(
            flaky(&attempts, 1, || Error::rate_limited("slow down", None)),
            EnqueueOptions::new(),
        )
        .unwrap();

    assert_eq!(ticket.await.unwrap(), 2);
    let elapsed = start.elapsed();
    assert!(elapsed >= Duration::from_millis(100));
    assert!(elapsed < Duration::from_millis(1000));
}

#[tokio::test(start_paused = true)]
async fn test_exponential_backoff() {
    let queue = RequestQueue::new(config(), None).unwrap();
    let attempts = Arc::new(AtomicU32::new(0));
    let start = Instant::now();

    let ticket = queue
        .enqueue(
            flaky(&attempts, 2, || Error::transport("connection reset")),
            EnqueueOptions::new(),
        )
        .unwrap();

    assert_eq!(ticket.await.unwrap(), 3);
    // 100 * 2 + 100 * 4
    assert!(start.elapsed() >= Duration::from_millis(600));
}

#[tokio::test(start_paused = true)]
async fn test_retries_exhausted() {
    let queue = RequestQueue::new(config(), None).unwrap();
    let attempts = Arc::new(AtomicU32::new(0));

    let ticket = queue
        .enqueue(
            flaky(&attempts, u32::MAX, || Error::http_status(503, "unavailable", None)),
            EnqueueOptions::new().with_max_retries(2),
        )
        .unwrap();

    let err = ticket.await.unwrap_err();
    assert_eq!(err.status_code(), Some(503));
    assert_eq!(attempts.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_non_retryable_fails_once() {
    let queue = RequestQueue::new(config(), None).unwrap();
    let attempts = Arc::new(AtomicU32::new(0));

    let ticket = queue
        .enqueue(
            flaky(&attempts, u32::MAX, || Error::http_status(404, "not found", None)),
            EnqueueOptions::new(),
        )
        .unwrap();

    assert!(!ticket.await.unwrap_err().is_retryable());
    assert_eq!(attempts.load(Ordering::SeqCst), 1);

    let ticket = queue
        .enqueue(
            flaky(&attempts, u32::MAX, || Error::auth("bad credentials")),
            EnqueueOptions::new(),
        )
        .unwrap();
    assert!(matches!(ticket.await.unwrap_err(), Error::Auth { .. }));
    assert_eq!(attempts.load(Ordering::SeqCst), 2);
}

#[tokio::test(start_paused = true)]
async fn test_zero_max_retries_disables_retry() {
    let queue = RequestQueue::new(config(), None).unwrap();
    let attempts = Arc::new(AtomicU32::new(0));

    let ticket = queue
        .enqueue(
            flaky(&attempts, u32::MAX, || Error::transport("timeout")),
            EnqueueOptions::new().with_max_retries(0),
        )
        .unwrap();

    assert!(ticket.await.is_err());
    assert_eq!(attempts.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn test_limiter_denial_is_retried() {
    let limiter: Arc<dyn RateLimit> =
        Arc::new(EnhancedRateLimiter::new(RateLimitConfig::sliding(1, 1000)).unwrap());
    let queue = RequestQueue::new(config(), Some(Arc::clone(&limiter))).unwrap();
    let start = Instant::now();

    let first = queue.enqueue(|| async { Ok(1) }, EnqueueOptions::new()).unwrap();
    let second = queue.enqueue(|| async { Ok(2) }, EnqueueOptions::new()).unwrap();

    assert_eq!(first.await.unwrap(), 1);
    assert_eq!(second.await.unwrap(), 2);
    assert!(start.elapsed() >= Duration::from_millis(1000));

    let status = queue.status();
    assert_eq!(status.rate_limit_status.unwrap().window_ms, 1000);
}

// ============================================================================
// Lifecycle
// ============================================================================

#[tokio::test]
async fn test_clear_rejects_waiting_requests() {
    let queue = RequestQueue::new(config(), None).unwrap();
    queue.pause();

    let tickets: Vec<_> = (0..3)
        .map(|i| queue.enqueue(move || async move { Ok(i) }, EnqueueOptions::new()).unwrap())
        .collect();

    assert_eq!(queue.clear(), 3);
    assert_eq!(queue.status().queue_length, 0);
    for ticket in tickets {
        assert!(matches!(ticket.await, Err(Error::QueueCleared)));
    }

    // queue stays usable
    queue.resume();
    let ticket = queue.enqueue(|| async { Ok(7) }, EnqueueOptions::new()).unwrap();
    assert_eq!(ticket.await.unwrap(), 7);
}

#[tokio::test(start_paused = true)]
async fn test_pause_and_resume() {
    let queue = RequestQueue::new(config(), None).unwrap();
    let attempts = Arc::new(AtomicU32::new(0));
    queue.pause();

    let mut ticket = tokio_test::task::spawn(
        queue
            .enqueue(flaky(&attempts, 0, || Error::QueueClosed), EnqueueOptions::new())
            .unwrap(),
    );

    tokio::time::sleep(Duration::from_millis(500)).await;
    tokio_test::assert_pending!(ticket.poll());
    let status = queue.status();
    assert!(status.paused);
    assert_eq!(status.queue_length, 1);
    assert_eq!(attempts.load(Ordering::SeqCst), 0);

    queue.resume();
    assert_eq!(ticket.await.unwrap(), 1);
    assert!(!queue.status().paused);
}

#[tokio::test]
async fn test_drop_rejects_waiting_requests() {
    let queue = RequestQueue::new(config(), None).unwrap();
    queue.pause();
    let ticket = queue.enqueue(|| async { Ok(()) }, EnqueueOptions::new()).unwrap();

    drop(queue);
    assert!(matches!(ticket.await, Err(Error::QueueClosed)));
}

#[tokio::test(start_paused = true)]
async fn test_duplicate_ids_share_no_slot() {
    let queue = RequestQueue::new(config(), None).unwrap();
    let running = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));

    let tickets: Vec<_> = ["dup", "dup", "other"]
        .into_iter()
        .map(|id| {
            let running = Arc::clone(&running);
            let peak = Arc::clone(&peak);
            queue
                .enqueue(
                    move || {
                        let running = Arc::clone(&running);
                        let peak = Arc::clone(&peak);
                        async move {
                            let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                            peak.fetch_max(now, Ordering::SeqCst);
                            tokio::time::sleep(Duration::from_millis(200)).await;
                            running.fetch_sub(1, Ordering::SeqCst);
                            Ok(())
                        }
                    },
                    EnqueueOptions::new().with_id(id),
                )
                .unwrap()
        })
        .collect();

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(queue.status().active_requests, 2);
    assert_eq!(queue.status().queue_length, 1);

    for result in futures::future::join_all(tickets).await {
        result.unwrap();
    }
    assert_eq!(peak.load(Ordering::SeqCst), 2);
    assert_eq!(queue.status().active_requests, 0);
}

#[tokio::test]
async fn test_panicking_work_frees_its_slot() {
    let queue = RequestQueue::new(config().with_max_concurrency(1), None).unwrap();

    let exploding = queue
        .enqueue(
            || async {
                let fail = true;
                if fail {
                    panic!("work exploded");
                }
                Ok(0u32)
            },
            EnqueueOptions::new(),
        )
        .unwrap();
    let next = queue.enqueue(|| async { Ok(7u32) }, EnqueueOptions::new()).unwrap();

    let err = exploding.await.unwrap_err();
    assert!(matches!(err, Error::Other(ref msg) if msg.contains("panicked")));

    let value = tokio::time::timeout(Duration::from_secs(5), next)
        .await
        .expect("queue stalled after a panic")
        .unwrap();
    assert_eq!(value, 7);
    assert_eq!(queue.status().active_requests, 0);
}

#[tokio::test]
async fn test_failed_work_frees_its_slot() {
    let queue = RequestQueue::new(config().with_max_concurrency(1), None).unwrap();

    let failing = queue
        .enqueue(
            || async { Err::<u32, _>(Error::http_status(400, "bad request", None)) },
            EnqueueOptions::new(),
        )
        .unwrap();
    let next = queue.enqueue(|| async { Ok(1u32) }, EnqueueOptions::new()).unwrap();

    assert_eq!(failing.await.unwrap_err().status_code(), Some(400));
    assert_eq!(next.await.unwrap(), 1);
}
