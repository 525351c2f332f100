//! Live snapshot publishing
//!
//! Every subscriber gets its own task and timer: one cycle immediately on
//! subscribe, then one per interval until the subscriber goes away. There is
//! no shared cache between subscribers; each one drives its own inventory reads.
//!
//! Cancellation is cooperative. The task checks its token before each cycle,
//! races it against the in-flight read, and checks it again before emitting,
//! so no inventory read starts after cancellation has been observed.

use crate::models::SnapshotPayload;
use crate::observability::{DashboardMetrics, StructuredLogger};
use crate::source::SnapshotSource;
use futures::{FutureExt, Stream};
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{interval, MissedTickBehavior};
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::{CancellationToken, DropGuard};
use tokio_util::task::TaskTracker;
use tracing::{debug, error};

/// Configuration for the snapshot publisher
#[derive(Debug, Clone)]
pub struct PublisherConfig {
    /// Time between cycles for one subscriber (default: 5 seconds)
    pub interval: Duration,
    /// Snapshots buffered per subscriber before the task waits on the consumer
    pub buffer_size: usize,
}

impl Default for PublisherConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            buffer_size: 1,
        }
    }
}

/// Fans snapshot cycles out to independent subscribers
pub struct SnapshotPublisher {
    source: Arc<SnapshotSource>,
    config: PublisherConfig,
    shutdown: CancellationToken,
    tracker: TaskTracker,
    next_id: AtomicU64,
    metrics: DashboardMetrics,
    logger: StructuredLogger,
}

impl SnapshotPublisher {
    pub fn new(source: Arc<SnapshotSource>, config: PublisherConfig) -> Self {
        Self {
            source,
            config,
            shutdown: CancellationToken::new(),
            tracker: TaskTracker::new(),
            next_id: AtomicU64::new(1),
            metrics: DashboardMetrics::new(),
            logger: StructuredLogger::new("agent-dashboard"),
        }
    }

    pub fn with_logger(mut self, logger: StructuredLogger) -> Self {
        self.logger = logger;
        self
    }

    /// Open a new subscription
    ///
    /// Must be called from within a tokio runtime. The subscription's task
    /// stops when the returned [`Subscription`] is dropped or cancelled.
    pub fn subscribe(&self) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let token = self.shutdown.child_token();
        let (tx, rx) = mpsc::channel(self.config.buffer_size.max(1));

        self.metrics.subscriber_opened();
        self.logger.log_subscriber_opened(id);

        let worker = SubscriberWorker {
            id,
            source: self.source.clone(),
            interval: self.config.interval,
            tx,
            token: token.clone(),
            metrics: self.metrics.clone(),
            logger: self.logger.clone(),
        };
        self.tracker.spawn(worker.run());

        Subscription {
            inner: ReceiverStream::new(rx),
            handle: PublisherHandle {
                id,
                token: token.clone(),
            },
            _guard: token.drop_guard(),
        }
    }

    /// Number of subscriber tasks still running
    pub fn active_subscribers(&self) -> usize {
        self.tracker.len()
    }

    /// Cancel every subscription and wait for their tasks to finish
    pub async fn shutdown(&self) {
        self.shutdown.cancel();
        self.tracker.close();
        self.tracker.wait().await;
        debug!("Snapshot publisher stopped");
    }
}

/// Cancellation handle for one subscription
#[derive(Debug, Clone)]
pub struct PublisherHandle {
    id: u64,
    token: CancellationToken,
}

impl PublisherHandle {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Stop the subscription; calling it again has no effect
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_active(&self) -> bool {
        !self.token.is_cancelled()
    }
}

/// Stream of snapshots for one subscriber
///
/// Dropping the subscription cancels its task.
pub struct Subscription {
    inner: ReceiverStream<SnapshotPayload>,
    handle: PublisherHandle,
    _guard: DropGuard,
}

impl Subscription {
    pub fn handle(&self) -> &PublisherHandle {
        &self.handle
    }

    pub fn cancel(&self) {
        self.handle.cancel();
    }
}

impl Stream for Subscription {
    type Item = SnapshotPayload;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<SnapshotPayload>> {
        if !self.handle.is_active() {
            return Poll::Ready(None);
        }
        Pin::new(&mut self.inner).poll_next(cx)
    }
}

struct SubscriberWorker {
    id: u64,
    source: Arc<SnapshotSource>,
    interval: Duration,
    tx: mpsc::Sender<SnapshotPayload>,
    token: CancellationToken,
    metrics: DashboardMetrics,
    logger: StructuredLogger,
}

impl SubscriberWorker {
    async fn run(self) {
        let mut ticker = interval(self.interval.max(Duration::from_millis(1)));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut delivered = 0u64;

        loop {
            tokio::select! {
                biased;
                _ = self.token.cancelled() => break,
                _ = ticker.tick() => {}
            }

            let snapshot = tokio::select! {
                biased;
                _ = self.token.cancelled() => break,
                snapshot = self.cycle() => snapshot,
            };

            if self.token.is_cancelled() {
                break;
            }

            tokio::select! {
                biased;
                _ = self.token.cancelled() => break,
                sent = self.tx.send(snapshot) => {
                    if sent.is_err() {
                        debug!(subscriber_id = self.id, "Subscriber dropped its receiver");
                        self.token.cancel();
                        break;
                    }
                }
            }
            delivered += 1;
        }

        self.metrics.subscriber_closed();
        self.logger.log_subscriber_closed(self.id, delivered);
    }

    /// One cycle; a panic inside the cycle degrades to the empty snapshot
    async fn cycle(&self) -> SnapshotPayload {
        match AssertUnwindSafe(self.source.snapshot()).catch_unwind().await {
            Ok(snapshot) => snapshot,
            Err(_) => {
                error!(subscriber_id = self.id, "Snapshot cycle panicked");
                SnapshotPayload::empty()
            }
        }
    }
}
