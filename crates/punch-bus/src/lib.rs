//! Domain event publication to the message bus.
//!
//! The ledger append is the durability boundary; publication is a
//! notification sidecar. Each accepted punch produces exactly one
//! [`DomainEvent`], queued to a detached per-user worker so that
//! events for one user publish in append order while distinct users
//! proceed independently. Transient broker failures are retried with
//! bounded backoff; exhaustion is surfaced operationally through
//! `tracing::error!` and never rolls back or fails the originating
//! punch.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::{Notify, mpsc};
use tokio::time::{Instant, sleep, timeout};
use uuid::Uuid;

use punch_core::{PunchEvent, PunchKind};

/// Errors from a single transport attempt.
#[derive(Debug, Error)]
pub enum TransportError {
    /// HTTP request failed.
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    /// Broker answered with a non-success status.
    #[error("broker returned status {code}")]
    Status { code: u16 },
    /// Broker-side failure reported out of band.
    #[error("broker error: {0}")]
    Broker(String),
}

/// A publish primitive with at-least-once semantics on the bus side.
///
/// The real broker client is an external collaborator; this trait is
/// the seam the publisher retries against.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    async fn publish(&self, topic: &str, key: &str, payload: &[u8]) -> Result<(), TransportError>;
}

/// Event published to the bus, produced 1:1 from each accepted punch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainEvent {
    pub event_id: Uuid,
    pub user_id: i64,
    pub kind: PunchKind,
    pub timestamp: DateTime<Utc>,
    pub payload: serde_json::Value,
}

impl DomainEvent {
    /// Derives the bus event for an accepted punch.
    #[must_use]
    pub fn from_punch(event: &PunchEvent) -> Self {
        Self {
            event_id: event.id,
            user_id: event.user_id,
            kind: event.kind,
            timestamp: event.timestamp,
            payload: serde_json::json!({
                "message": format!("user {} registered a {}", event.user_id, event.kind),
            }),
        }
    }

    /// Partition key: events for the same user share a key so the bus
    /// preserves their relative order.
    #[must_use]
    pub fn key(&self) -> String {
        self.user_id.to_string()
    }
}

/// Retry configuration for publish attempts.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Attempt ceiling before the event is abandoned.
    pub max_attempts: u32,
    /// Per-attempt timeout.
    pub attempt_timeout: Duration,
    /// Backoff before the second attempt; doubles per retry.
    pub initial_backoff: Duration,
    /// Upper bound for a single backoff.
    pub max_backoff: Duration,
    /// Total wall-clock budget for one event across all attempts.
    pub total_deadline: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            attempt_timeout: Duration::from_secs(5),
            initial_backoff: Duration::from_millis(200),
            max_backoff: Duration::from_secs(5),
            total_deadline: Duration::from_secs(60),
        }
    }
}

/// Terminal publication failure for one event.
#[derive(Debug, Error)]
enum PublishError {
    #[error("failed to encode event: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("retries exhausted after {attempts} attempts")]
    Exhausted { attempts: u32 },
}

struct Inner {
    transport: Arc<dyn Transport>,
    topic: String,
    policy: RetryPolicy,
    /// Sender per user; the worker task owns the receiving end.
    workers: Mutex<HashMap<i64, mpsc::UnboundedSender<DomainEvent>>>,
    /// Events enqueued but not yet resolved (published or abandoned).
    pending: AtomicUsize,
    drained: Notify,
}

/// Queues domain events for background publication.
///
/// Cheap to clone; clones share the worker set.
#[derive(Clone)]
pub struct Publisher {
    inner: Arc<Inner>,
}

impl fmt::Debug for Publisher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Publisher")
            .field("topic", &self.inner.topic)
            .field("pending", &self.inner.pending.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

impl Publisher {
    /// Creates a publisher over the given transport.
    pub fn new(transport: Arc<dyn Transport>, topic: impl Into<String>, policy: RetryPolicy) -> Self {
        Self {
            inner: Arc::new(Inner {
                transport,
                topic: topic.into(),
                policy,
                workers: Mutex::new(HashMap::new()),
                pending: AtomicUsize::new(0),
                drained: Notify::new(),
            }),
        }
    }

    /// Hands an event to the user's background worker and returns
    /// immediately. Never blocks or fails the caller; must be called
    /// from within a tokio runtime.
    pub fn enqueue(&self, event: DomainEvent) {
        self.inner.pending.fetch_add(1, Ordering::SeqCst);

        let user_id = event.user_id;
        let mut workers = self
            .inner
            .workers
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let sender = workers.entry(user_id).or_insert_with(|| {
            let (tx, rx) = mpsc::unbounded_channel();
            tokio::spawn(run_worker(Arc::clone(&self.inner), user_id, rx));
            tx
        });

        if sender.send(event).is_err() {
            // Worker task was dropped with the runtime shutting down;
            // the event is abandoned with an operational signal.
            tracing::error!(user_id, "publish worker unavailable, event abandoned");
            self.resolve_one();
        }
    }

    /// Waits until every enqueued event has been published or abandoned.
    pub async fn flush(&self) {
        loop {
            let notified = self.inner.drained.notified();
            if self.inner.pending.load(Ordering::SeqCst) == 0 {
                return;
            }
            notified.await;
        }
    }

    fn resolve_one(&self) {
        if self.inner.pending.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.inner.drained.notify_waiters();
        }
    }
}

/// Per-user worker: publishes events in arrival order.
async fn run_worker(
    inner: Arc<Inner>,
    user_id: i64,
    mut rx: mpsc::UnboundedReceiver<DomainEvent>,
) {
    while let Some(event) = rx.recv().await {
        if let Err(err) = publish_with_retry(&inner, &event).await {
            tracing::error!(
                event_id = %event.event_id,
                user_id,
                error = %err,
                "abandoning domain event; ledger remains the source of truth"
            );
        }
        if inner.pending.fetch_sub(1, Ordering::SeqCst) == 1 {
            inner.drained.notify_waiters();
        }
    }
}

async fn publish_with_retry(inner: &Inner, event: &DomainEvent) -> Result<(), PublishError> {
    let payload = serde_json::to_vec(event)?;
    let key = event.key();
    let policy = inner.policy;
    let started = Instant::now();
    let mut backoff = policy.initial_backoff;
    let mut attempts = 0;

    while attempts < policy.max_attempts {
        attempts += 1;
        let attempt = timeout(
            policy.attempt_timeout,
            inner.transport.publish(&inner.topic, &key, &payload),
        )
        .await;

        match attempt {
            Ok(Ok(())) => {
                tracing::debug!(event_id = %event.event_id, attempts, "domain event published");
                return Ok(());
            }
            Ok(Err(err)) => {
                tracing::warn!(
                    event_id = %event.event_id,
                    attempt = attempts,
                    error = %err,
                    "publish attempt failed"
                );
            }
            Err(_) => {
                tracing::warn!(
                    event_id = %event.event_id,
                    attempt = attempts,
                    "publish attempt timed out"
                );
            }
        }

        if attempts == policy.max_attempts
            || started.elapsed() + backoff > policy.total_deadline
        {
            break;
        }
        sleep(backoff).await;
        backoff = (backoff * 2).min(policy.max_backoff);
    }

    Err(PublishError::Exhausted { attempts })
}

/// Transport posting events to a broker REST proxy.
///
/// # Thread Safety
///
/// Safe to clone and share across threads; clones share the underlying
/// HTTP connection pool.
pub struct HttpTransport {
    http: reqwest::Client,
    endpoint: String,
}

impl fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpTransport")
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

impl HttpTransport {
    /// Creates a transport for the given proxy endpoint.
    pub fn new(endpoint: impl Into<String>, attempt_timeout: Duration) -> Result<Self, TransportError> {
        let http = reqwest::Client::builder()
            .timeout(attempt_timeout)
            .build()?;
        Ok(Self {
            http,
            endpoint: endpoint.into(),
        })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn publish(&self, topic: &str, key: &str, payload: &[u8]) -> Result<(), TransportError> {
        let url = format!("{}/topics/{topic}", self.endpoint.trim_end_matches('/'));
        let response = self
            .http
            .post(url)
            .query(&[("key", key)])
            .header("content-type", "application/json")
            .body(payload.to_vec())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status {
                code: status.as_u16(),
            });
        }
        Ok(())
    }
}
