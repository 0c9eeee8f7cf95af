//! # In-process work-queue broker.
//!
//! [`MemoryQueue`] implements the [`QueueClient`] contract with work-queue retention:
//! every published message is delivered to one fetcher at a time, removed on ack, and
//! redelivered (with its delivery counter bumped) once its ack wait expires.
//!
//! ```text
//! publish ──► pending (FIFO) ──fetch──► in_flight{seq → deadline} ──ack──► acked
//!                  ▲                           │
//!                  └──── ack wait expired ─────┘   (delivered += 1)
//! ```
//!
//! Used by the test-suite and the demo binary; it is not meant to be durable.

use std::collections::{BTreeMap, VecDeque};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::{Mutex, Notify};
use tokio::time::{self, Instant};

use super::{Message, QueueClient, Subscription, SubscriptionTarget};
use crate::error::{AckError, FetchError, SubscribeError, UnsubscribeError};

/// Default time a delivered message may stay unacked before redelivery.
pub const DEFAULT_ACK_WAIT: Duration = Duration::from_secs(30);

struct Stored {
    sequence: u64,
    delivered: u64,
    payload: Bytes,
}

struct Lease {
    stored: Stored,
    deadline: Instant,
}

#[derive(Default)]
struct QueueState {
    last_sequence: u64,
    pending: VecDeque<Stored>,
    in_flight: BTreeMap<u64, Lease>,
    acked: Vec<u64>,
}

struct Inner {
    stream: String,
    ack_wait: Duration,
    state: Mutex<QueueState>,
    notify: Notify,
    closed: AtomicBool,
}

impl Inner {
    /// Moves expired leases back to the head of `pending`, in sequence order.
    fn requeue_expired(state: &mut QueueState, now: Instant) {
        let expired: Vec<u64> = state
            .in_flight
            .iter()
            .filter(|(_, lease)| lease.deadline <= now)
            .map(|(seq, _)| *seq)
            .collect();

        for seq in expired.into_iter().rev() {
            if let Some(lease) = state.in_flight.remove(&seq) {
                state.pending.push_front(lease.stored);
            }
        }
    }

    /// Takes up to `max` messages and returns them with the next redelivery instant.
    async fn take(self: &Arc<Self>, max: usize) -> (Vec<MemoryMessage>, Option<Instant>) {
        let now = Instant::now();
        let mut state = self.state.lock().await;
        Self::requeue_expired(&mut state, now);

        let mut batch = Vec::new();
        while batch.len() < max {
            let Some(mut stored) = state.pending.pop_front() else {
                break;
            };
            stored.delivered += 1;
            batch.push(MemoryMessage {
                sequence: stored.sequence,
                delivered: stored.delivered,
                payload: stored.payload.clone(),
                queue: Arc::clone(self),
            });
            state.in_flight.insert(
                stored.sequence,
                Lease {
                    stored,
                    deadline: now + self.ack_wait,
                },
            );
        }

        let next_redelivery = state.in_flight.values().map(|l| l.deadline).min();
        (batch, next_redelivery)
    }
}

/// In-memory work queue. Cheap to clone; clones share the same queue.
#[derive(Clone)]
pub struct MemoryQueue {
    inner: Arc<Inner>,
}

impl MemoryQueue {
    /// Creates an empty queue for `stream` with [`DEFAULT_ACK_WAIT`].
    pub fn new(stream: impl Into<String>) -> Self {
        Self::with_ack_wait(stream, DEFAULT_ACK_WAIT)
    }

    /// Creates an empty queue for `stream` with a custom ack wait.
    pub fn with_ack_wait(stream: impl Into<String>, ack_wait: Duration) -> Self {
        Self {
            inner: Arc::new(Inner {
                stream: stream.into(),
                ack_wait,
                state: Mutex::new(QueueState::default()),
                notify: Notify::new(),
                closed: AtomicBool::new(false),
            }),
        }
    }

    /// Stream name served by this queue.
    pub fn stream(&self) -> &str {
        &self.inner.stream
    }

    /// Appends a message and returns its sequence number (starting at 1).
    pub async fn publish(&self, payload: impl Into<Bytes>) -> u64 {
        let sequence = {
            let mut state = self.inner.state.lock().await;
            state.last_sequence += 1;
            let sequence = state.last_sequence;
            state.pending.push_back(Stored {
                sequence,
                delivered: 0,
                payload: payload.into(),
            });
            sequence
        };
        self.inner.notify.notify_waiters();
        sequence
    }

    /// Shuts the queue down: every subscription becomes inactive.
    pub fn shutdown(&self) {
        self.inner.closed.store(true, Ordering::SeqCst);
        self.inner.notify.notify_waiters();
    }

    /// Sequence numbers acked so far, in ack order.
    pub async fn acked(&self) -> Vec<u64> {
        self.inner.state.lock().await.acked.clone()
    }

    /// Number of messages waiting for delivery.
    pub async fn pending(&self) -> usize {
        self.inner.state.lock().await.pending.len()
    }

    /// Number of delivered but not yet acked messages.
    pub async fn in_flight(&self) -> usize {
        self.inner.state.lock().await.in_flight.len()
    }
}

#[async_trait]
impl QueueClient for MemoryQueue {
    type Subscription = MemorySubscription;

    async fn subscribe(
        &self,
        target: &SubscriptionTarget,
    ) -> Result<MemorySubscription, SubscribeError> {
        if target.stream != self.inner.stream {
            return Err(SubscribeError::StreamNotFound {
                stream: target.stream.clone(),
            });
        }
        if self.inner.closed.load(Ordering::SeqCst) {
            return Err(SubscribeError::Io {
                error: "queue is shut down".into(),
            });
        }
        Ok(MemorySubscription {
            queue: Arc::clone(&self.inner),
            durable: target.durable.clone(),
            active: AtomicBool::new(true),
        })
    }
}

/// Pull subscription on a [`MemoryQueue`].
pub struct MemorySubscription {
    queue: Arc<Inner>,
    durable: String,
    active: AtomicBool,
}

impl MemorySubscription {
    /// Durable consumer name this subscription was created for.
    pub fn durable(&self) -> &str {
        &self.durable
    }
}

#[async_trait]
impl Subscription for MemorySubscription {
    type Message = MemoryMessage;

    async fn fetch(&self, max: usize, timeout: Duration) -> Result<Vec<MemoryMessage>, FetchError> {
        let max = max.max(1);
        let deadline = Instant::now() + timeout;

        loop {
            if !self.is_active() {
                return Err(FetchError::Inactive);
            }

            // Register interest before looking, so a publish in between is not missed.
            let notified = self.queue.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            let (batch, next_redelivery) = self.queue.take(max).await;
            if !batch.is_empty() {
                return Ok(batch);
            }
            if Instant::now() >= deadline {
                return Ok(Vec::new());
            }

            let wake_at = next_redelivery.map_or(deadline, |at| at.min(deadline));
            let _ = time::timeout_at(wake_at, notified.as_mut()).await;
        }
    }

    fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst) && !self.queue.closed.load(Ordering::SeqCst)
    }

    async fn unsubscribe(&self) -> Result<(), UnsubscribeError> {
        if self.active.swap(false, Ordering::SeqCst) {
            self.queue.notify.notify_waiters();
            Ok(())
        } else {
            Err(UnsubscribeError::AlreadyUnsubscribed)
        }
    }
}

/// Message delivered by a [`MemorySubscription`].
pub struct MemoryMessage {
    sequence: u64,
    delivered: u64,
    payload: Bytes,
    queue: Arc<Inner>,
}

impl MemoryMessage {
    /// Message body.
    pub fn payload(&self) -> &Bytes {
        &self.payload
    }
}

impl fmt::Debug for MemoryMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryMessage")
            .field("sequence", &self.sequence)
            .field("delivered", &self.delivered)
            .field("len", &self.payload.len())
            .finish()
    }
}

#[async_trait]
impl Message for MemoryMessage {
    fn sequence(&self) -> u64 {
        self.sequence
    }

    fn delivered(&self) -> u64 {
        self.delivered
    }

    async fn ack(&self) -> Result<(), AckError> {
        let mut state = self.queue.state.lock().await;
        let current = state
            .in_flight
            .get(&self.sequence)
            .is_some_and(|lease| lease.stored.delivered == self.delivered);
        if !current {
            return Err(AckError::new(format!(
                "message {} (delivered={}) is no longer in flight",
                self.sequence, self.delivered
            )));
        }
        state.in_flight.remove(&self.sequence);
        state.acked.push(self.sequence);
        Ok(())
    }
}
