//! # Queue client contract consumed by the pipeline.
//!
//! The broker (stream storage, retention, replication, redelivery tracking) is an
//! external collaborator. The pipeline only needs its client-facing surface:
//!
//! ```text
//! QueueClient::subscribe(target) ──► Subscription
//!                                       ├─ fetch(max, timeout) ──► Vec<Message>   (0..=max)
//!                                       ├─ is_active()
//!                                       └─ unsubscribe()
//! Message
//!   ├─ sequence()   monotonic, unique per queue
//!   ├─ delivered()  delivery attempt (>= 1, grows on redelivery)
//!   └─ ack()        durability boundary
//! ```
//!
//! ## Rules
//! - `fetch` may block up to `timeout` and return an empty batch; that is not an error.
//! - `fetch` returning [`FetchError::Inactive`] is terminal for the subscription.
//! - `fetch`/`ack` must be safe to call concurrently from several tasks.
//! - A message that is never acked is redelivered by the broker.
//!
//! [`memory::MemoryQueue`] is an in-process implementation with work-queue semantics.

pub mod memory;

use std::time::Duration;

use async_trait::async_trait;

use crate::error::{AckError, FetchError, SubscribeError, UnsubscribeError};

/// Identity of the durable consumer the pipeline attaches to.
///
/// Owned by provisioning; the pipeline passes it to [`QueueClient::subscribe`] as-is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionTarget {
    /// Stream (queue) name.
    pub stream: String,
    /// Durable consumer name shared by all fetchers of this consumer.
    pub durable: String,
    /// Subject filter.
    pub subject: String,
}

impl SubscriptionTarget {
    /// Creates a new target.
    pub fn new(
        stream: impl Into<String>,
        durable: impl Into<String>,
        subject: impl Into<String>,
    ) -> Self {
        Self {
            stream: stream.into(),
            durable: durable.into(),
            subject: subject.into(),
        }
    }
}

/// # A delivered message.
///
/// Ownership moves Poller → hand-off buffer → exactly one Worker, which holds it
/// until [`ack`](Message::ack) succeeds or the worker gives up on it.
#[async_trait]
pub trait Message: Send + Sync + 'static {
    /// Queue sequence number (monotonic, unique per queue).
    fn sequence(&self) -> u64;

    /// Delivery attempt, starting at 1.
    fn delivered(&self) -> u64;

    /// Marks the message as done. After success the broker will not redeliver it.
    async fn ack(&self) -> Result<(), AckError>;
}

/// # An established pull subscription.
#[async_trait]
pub trait Subscription: Send + Sync + 'static {
    /// Message type delivered by this subscription.
    type Message: Message;

    /// Fetches up to `max` messages, waiting at most `timeout` for the first one.
    async fn fetch(&self, max: usize, timeout: Duration)
    -> Result<Vec<Self::Message>, FetchError>;

    /// Returns `false` once the subscription can no longer deliver.
    fn is_active(&self) -> bool;

    /// Tears the subscription down.
    async fn unsubscribe(&self) -> Result<(), UnsubscribeError>;
}

/// # Pull-based queue client.
#[async_trait]
pub trait QueueClient: Send + Sync + 'static {
    /// Subscription type produced by this client.
    type Subscription: Subscription;

    /// Establishes a pull subscription for `target`.
    async fn subscribe(
        &self,
        target: &SubscriptionTarget,
    ) -> Result<Self::Subscription, SubscribeError>;
}

/// Message type delivered through client `C`.
pub type MessageOf<C> = <<C as QueueClient>::Subscription as Subscription>::Message;
