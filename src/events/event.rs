//! # Runtime events emitted by the consumer, its poller and workers.
//!
//! The [`EventKind`] enum classifies event types across four categories:
//! - **Lifecycle events**: consumer start/close flow
//! - **Task events**: poller/worker start, stop and failure
//! - **Message events**: fetch, hand-off, processing and ack of a single message
//! - **Subscriber events**: overflow/panic inside the subscriber workers
//!
//! The [`Event`] struct carries additional metadata such as the task name, the
//! message sequence number and delivery attempt, and a reason.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases monotonically.
//! Use `seq` to restore the exact order when events are delivered out of order.
//!
//! ## Example
//! ```rust
//! use pullvisor::{Event, EventKind};
//!
//! let ev = Event::new(EventKind::MessageFetched)
//!     .with_task("poller")
//!     .with_message(42, 2);
//!
//! assert_eq!(ev.kind, EventKind::MessageFetched);
//! assert_eq!(ev.task.as_deref(), Some("poller"));
//! assert_eq!(ev.sequence, Some(42));
//! assert_eq!(ev.delivered, Some(2));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::SystemTime;

use crate::client::Message;

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(1);

/// Classification of runtime events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Lifecycle events ===
    /// `start()` was called.
    ///
    /// Sets: `task` (consumer name)
    ConsumerStarting,

    /// Subscription established.
    ///
    /// Sets: `task` (consumer name), `reason` (stream/durable/subject)
    Subscribed,

    /// Subscription could not be established; the consumer stays closable.
    ///
    /// Sets: `task` (consumer name), `reason` (error)
    SubscribeFailed,

    /// `close()` was called.
    ///
    /// Sets: `task` (consumer name)
    CloseRequested,

    /// Unsubscribe failed with something other than "already unsubscribed".
    ///
    /// Sets: `task` (consumer name), `reason` (error)
    UnsubscribeFailed,

    /// Every pipeline task exited within the grace period.
    ///
    /// Sets: `task` (consumer name)
    AllStoppedWithin,

    /// Grace period exceeded; remaining tasks were aborted.
    ///
    /// Sets: `task` (consumer name), `reason` (stuck task names)
    GraceExceeded,

    /// The consumer reached its terminal state.
    ///
    /// Sets: `task` (consumer name), `reason` (stop cause, if any)
    ConsumerClosed,

    // === Task events ===
    /// A poller or worker task started its loop.
    ///
    /// Sets: `task`
    TaskStarting,

    /// A poller or worker task left its loop without a fatal error.
    ///
    /// Sets: `task`, `reason` (why it stopped)
    TaskStopped,

    /// A poller or worker task hit a fatal error and cancelled the domain.
    ///
    /// Sets: `task`, `reason` (error), `sequence`/`delivered` when a message was involved
    TaskFailed,

    /// A pipeline task panicked and cancelled the domain.
    ///
    /// Sets: `task`, `reason` (panic message)
    TaskPanicked,

    // === Domain events ===
    /// The subscription reported it is permanently inactive.
    ///
    /// Sets: `task`
    SubscriptionInactive,

    /// The cancellation domain moved from Running to Cancelling.
    ///
    /// Sets: `task` (who cancelled), `reason` (stop cause)
    DomainCancelled,

    // === Message events ===
    /// A message was fetched from the subscription.
    ///
    /// Sets: `task`, `sequence`, `delivered`
    MessageFetched,

    /// A fetched message was pushed onto the hand-off buffer.
    ///
    /// Sets: `task`, `sequence`, `delivered`
    MessageHandedOff,

    /// A worker started processing a message.
    ///
    /// Sets: `task`, `sequence`, `delivered`
    MessageProcessing,

    /// A worker acknowledged a processed message.
    ///
    /// Sets: `task`, `sequence`, `delivered`
    MessageAcked,

    // === Subscriber events ===
    /// Subscriber panicked during event processing.
    ///
    /// Sets: `task` (subscriber name), `reason` (panic message)
    SubscriberPanicked,

    /// Subscriber dropped an event (queue full or worker closed).
    ///
    /// Sets: `task` (subscriber name), `reason` ("full" / "closed")
    SubscriberOverflow,
}

impl EventKind {
    /// Whether events of this kind concern a single message.
    #[inline]
    pub fn is_message(self) -> bool {
        matches!(
            self,
            EventKind::MessageFetched
                | EventKind::MessageHandedOff
                | EventKind::MessageProcessing
                | EventKind::MessageAcked
        )
    }
}

/// Runtime event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Debug, Clone)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,
    /// Name of the task (or consumer/subscriber), if applicable.
    pub task: Option<Arc<str>>,
    /// Queue sequence number of the message involved.
    pub sequence: Option<u64>,
    /// Delivery attempt of the message involved.
    pub delivered: Option<u64>,
    /// Human-readable reason (errors, stop causes, overflow details, etc.).
    pub reason: Option<Arc<str>>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            task: None,
            sequence: None,
            delivered: None,
            reason: None,
        }
    }

    /// Creates a message-flow event for `message`, emitted by `task`.
    #[inline]
    pub fn for_message<M: Message>(kind: EventKind, task: &str, message: &M) -> Self {
        Event::new(kind)
            .with_task(task)
            .with_message(message.sequence(), message.delivered())
    }

    /// Attaches a task name.
    #[inline]
    pub fn with_task(mut self, task: impl Into<Arc<str>>) -> Self {
        self.task = Some(task.into());
        self
    }

    /// Attaches a message sequence number and delivery attempt.
    #[inline]
    pub fn with_message(mut self, sequence: u64, delivered: u64) -> Self {
        self.sequence = Some(sequence);
        self.delivered = Some(delivered);
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Creates a subscriber overflow event.
    #[inline]
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        Event::new(EventKind::SubscriberOverflow)
            .with_task(subscriber)
            .with_reason(format!("subscriber={subscriber} reason={reason}"))
    }

    /// Reports events the consumer's listener skipped because it fell behind the bus.
    ///
    /// Skipped events reached neither the subscribers nor the alive tracker.
    pub fn listener_lagged(listener: &str, skipped: u64) -> Self {
        Event::new(EventKind::SubscriberOverflow)
            .with_task(listener)
            .with_reason(format!("lagged={skipped}"))
    }

    /// Creates a subscriber panic event.
    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        Event::new(EventKind::SubscriberPanicked)
            .with_task(subscriber)
            .with_reason(info)
    }

    /// Whether this event concerns a single message.
    #[inline]
    pub fn is_message_event(&self) -> bool {
        self.kind.is_message()
    }
}
