//! Priority request queue with bounded concurrency and retries
//!
//! A single dispatcher task owns admission. It sleeps on a [`Notify`] and
//! is woken whenever a request is added, a slot is freed, a retry comes
//! back, or the queue is resumed. Each admitted request runs on its own
//! task and reports back through the same signal.

use super::types::{EnqueueOptions, QueueStatus, RequestQueueConfig};
use crate::error::{Error, Result};
use crate::rate_limit::RateLimit;
use futures::future::BoxFuture;
use futures::FutureExt;
use parking_lot::Mutex;
use pin_project_lite::pin_project;
use std::collections::{HashSet, VecDeque};
use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::sync::{oneshot, Notify};
use tokio::time::Instant;
use tracing::{debug, warn};

// ============================================================================
// Type-erased work
// ============================================================================

/// One caller's work plus the channel its final result goes out on
trait Attempt: Send + Sync {
    /// Run the work once; on success the value is delivered to the caller
    fn run(self: Arc<Self>) -> BoxFuture<'static, Result<()>>;

    /// Deliver a terminal error to the caller
    fn reject(&self, err: Error);
}

struct Work<T, F> {
    work: F,
    reply: Mutex<Option<oneshot::Sender<Result<T>>>>,
}

impl<T, F> Work<T, F> {
    fn resolve(&self, result: Result<T>) {
        if let Some(tx) = self.reply.lock().take() {
            // receiver may have been dropped by an uninterested caller
            let _ = tx.send(result);
        }
    }
}

impl<T, F, Fut> Attempt for Work<T, F>
where
    T: Send + 'static,
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T>> + Send + 'static,
{
    fn run(self: Arc<Self>) -> BoxFuture<'static, Result<()>> {
        Box::pin(async move {
            let value = (self.work)().await?;
            self.resolve(Ok(value));
            Ok(())
        })
    }

    fn reject(&self, err: Error) {
        self.resolve(Err(err));
    }
}

struct QueuedRequest {
    id: String,
    priority: i64,
    created_at: Instant,
    max_retries: u32,
    retry_count: u32,
    attempt: Arc<dyn Attempt>,
}

impl fmt::Debug for QueuedRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueuedRequest")
            .field("id", &self.id)
            .field("priority", &self.priority)
            .field("retry_count", &self.retry_count)
            .field("max_retries", &self.max_retries)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Ticket
// ============================================================================

pin_project! {
    /// Future resolving to the final outcome of an enqueued request
    #[must_use = "a ticket does nothing unless awaited"]
    pub struct QueueTicket<T> {
        id: String,
        #[pin]
        rx: oneshot::Receiver<Result<T>>,
    }
}

impl<T> QueueTicket<T> {
    /// Id the request was enqueued under
    pub fn id(&self) -> &str {
        &self.id
    }
}

impl<T> Future for QueueTicket<T> {
    type Output = Result<T>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.project();
        match this.rx.poll(cx) {
            Poll::Ready(Ok(result)) => Poll::Ready(result),
            Poll::Ready(Err(_)) => Poll::Ready(Err(Error::QueueClosed)),
            Poll::Pending => Poll::Pending,
        }
    }
}

impl<T> fmt::Debug for QueueTicket<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueueTicket").field("id", &self.id).finish()
    }
}

// ============================================================================
// Queue
// ============================================================================

#[derive(Debug, Default)]
struct QueueState {
    pending: VecDeque<QueuedRequest>,
    /// Slots of running requests; caller ids need not be unique
    active: HashSet<u64>,
    next_slot: u64,
    paused: bool,
    closed: bool,
}

struct Shared {
    config: RequestQueueConfig,
    limiter: Option<Arc<dyn RateLimit>>,
    state: Mutex<QueueState>,
    wake: Notify,
}

impl Shared {
    /// Promote waiting requests up to the concurrency cap. Returns false
    /// once the queue is closed.
    fn drain(self: &Arc<Self>) -> bool {
        let mut state = self.state.lock();
        if state.closed {
            return false;
        }

        while !state.paused && state.active.len() < self.config.max_concurrency {
            let Some(request) = state.pending.pop_front() else {
                break;
            };
            let slot = state.next_slot;
            state.next_slot += 1;
            state.active.insert(slot);
            debug!(
                "Starting request {} (priority {}, waited {:?})",
                request.id,
                request.priority,
                request.created_at.elapsed()
            );
            tokio::spawn(Arc::clone(self).execute(request, slot));
        }
        true
    }

    async fn execute(self: Arc<Self>, mut request: QueuedRequest, slot: u64) {
        let id = request.id.clone();
        let outcome = match self.limiter.as_ref().map(|limiter| limiter.check_limit()) {
            Some(Err(e)) => Err(e),
            _ => AssertUnwindSafe(Arc::clone(&request.attempt).run())
                .catch_unwind()
                .await
                .unwrap_or_else(|_| {
                    warn!("Request {} panicked", id);
                    Err(Error::Other(format!("Request {id} panicked")))
                }),
        };

        match outcome {
            Ok(()) => debug!("Request {} completed", id),
            Err(err) => match self.retry_delay(&request, &err) {
                Some(delay) => {
                    request.retry_count += 1;
                    debug!(
                        "Request {} failed ({}), retry {}/{} in {:?}",
                        id, err, request.retry_count, request.max_retries, delay
                    );
                    tokio::spawn(Arc::clone(&self).requeue_after(request, delay));
                }
                None => {
                    debug!("Request {} failed: {}", id, err);
                    request.attempt.reject(err);
                }
            },
        }

        self.state.lock().active.remove(&slot);
        self.wake.notify_one();
    }

    fn retry_delay(&self, request: &QueuedRequest, err: &Error) -> Option<Duration> {
        if request.retry_count >= request.max_retries {
            return None;
        }
        match err {
            Error::RateLimited {
                retry_after_seconds: Some(secs),
                ..
            } if *secs > 0 => Some(Duration::from_secs(*secs)),
            Error::RateLimited { .. } => Some(Duration::from_millis(self.config.retry_delay_ms)),
            e if e.is_retryable() => {
                let factor = 2u64.saturating_pow(request.retry_count + 1);
                Some(Duration::from_millis(
                    self.config.retry_delay_ms.saturating_mul(factor),
                ))
            }
            _ => None,
        }
    }

    async fn requeue_after(self: Arc<Self>, request: QueuedRequest, delay: Duration) {
        tokio::time::sleep(delay).await;

        let mut state = self.state.lock();
        if state.closed {
            drop(state);
            request.attempt.reject(Error::QueueClosed);
            return;
        }
        state.pending.push_front(request);
        drop(state);
        self.wake.notify_one();
    }
}

async fn dispatch(shared: Arc<Shared>) {
    while shared.drain() {
        shared.wake.notified().await;
    }
    debug!("Request queue dispatcher stopped");
}

/// In-memory priority queue that runs work under a concurrency cap and an
/// optional rate limiter, retrying retryable failures with backoff.
///
/// Dropping the queue rejects everything still waiting with
/// [`Error::QueueClosed`]; requests already executing run to completion.
pub struct RequestQueue {
    shared: Arc<Shared>,
}

impl RequestQueue {
    /// Create a queue and start its dispatcher on the current Tokio runtime
    pub fn new(config: RequestQueueConfig, limiter: Option<Arc<dyn RateLimit>>) -> Result<Self> {
        config.validate()?;
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| Error::config(format!("Request queue needs a Tokio runtime: {e}")))?;

        let shared = Arc::new(Shared {
            config,
            limiter,
            state: Mutex::new(QueueState::default()),
            wake: Notify::new(),
        });
        runtime.spawn(dispatch(Arc::clone(&shared)));

        Ok(Self { shared })
    }

    /// Queue `work` for execution.
    ///
    /// Fails immediately with [`Error::QueueFull`] when the waiting list is
    /// at capacity. Otherwise returns a ticket that resolves with the work's
    /// value, or with its last error once retries are exhausted. `work` is
    /// called again for every retry.
    pub fn enqueue<T, F, Fut>(&self, work: F, options: EnqueueOptions) -> Result<QueueTicket<T>>
    where
        T: Send + 'static,
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        let config = &self.shared.config;
        let mut state = self.shared.state.lock();

        if state.closed {
            return Err(Error::QueueClosed);
        }
        if state.pending.len() >= config.max_queue_size {
            warn!("Request queue full ({} waiting)", state.pending.len());
            return Err(Error::QueueFull {
                max_queue_size: config.max_queue_size,
            });
        }

        let (tx, rx) = oneshot::channel();
        let id = options
            .id
            .unwrap_or_else(|| format!("req_{}", uuid::Uuid::new_v4().simple()));

        state.pending.push_back(QueuedRequest {
            id: id.clone(),
            priority: options.priority,
            created_at: Instant::now(),
            max_retries: options.max_retries.unwrap_or(config.default_max_retries),
            retry_count: 0,
            attempt: Arc::new(Work {
                work,
                reply: Mutex::new(Some(tx)),
            }),
        });
        if config.priority_enabled {
            // stable: equal priorities keep arrival order
            state
                .pending
                .make_contiguous()
                .sort_by(|a, b| b.priority.cmp(&a.priority));
        }
        drop(state);

        self.shared.wake.notify_one();
        Ok(QueueTicket { id, rx })
    }

    /// Reject every waiting request with [`Error::QueueCleared`]. Active
    /// requests and scheduled retries are unaffected. Returns the number of
    /// requests rejected.
    pub fn clear(&self) -> usize {
        let cleared: Vec<QueuedRequest> = self.shared.state.lock().pending.drain(..).collect();
        for request in &cleared {
            request.attempt.reject(Error::QueueCleared);
        }
        if !cleared.is_empty() {
            debug!("Cleared {} queued requests", cleared.len());
        }
        cleared.len()
    }

    /// Stop admitting waiting requests
    pub fn pause(&self) {
        self.shared.state.lock().paused = true;
    }

    /// Resume admission
    pub fn resume(&self) {
        self.shared.state.lock().paused = false;
        self.shared.wake.notify_one();
    }

    /// Current queue length, active count, and limiter status
    pub fn status(&self) -> QueueStatus {
        let state = self.shared.state.lock();
        QueueStatus {
            queue_length: state.pending.len(),
            active_requests: state.active.len(),
            max_concurrency: self.shared.config.max_concurrency,
            paused: state.paused,
            rate_limit_status: self.shared.limiter.as_ref().map(|l| l.status()),
        }
    }

    /// The queue's configuration
    pub fn config(&self) -> &RequestQueueConfig {
        &self.shared.config
    }
}

impl Drop for RequestQueue {
    fn drop(&mut self) {
        let pending: Vec<QueuedRequest> = {
            let mut state = self.shared.state.lock();
            state.closed = true;
            state.pending.drain(..).collect()
        };
        for request in pending {
            request.attempt.reject(Error::QueueClosed);
        }
        self.shared.wake.notify_one();
    }
}

impl fmt::Debug for RequestQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestQueue")
            .field("config", &self.shared.config)
            .field("status", &self.status())
            .finish()
    }
}
