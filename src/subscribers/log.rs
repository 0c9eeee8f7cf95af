//! # LogWriter: renders events through `tracing`
//!
//! Message flow is logged at `info`, clean stops at `info`/`debug`, an inactive
//! subscription and shutdown-path trouble at `warn`, fatal failures at `error`.
//! Installed by default by [`ConsumerBuilder`](crate::ConsumerBuilder).
//!
//! ## Example output (fmt layer)
//! ```text
//! INFO pullvisor: fetched message task="poller" sequence=12 delivered=1
//! INFO pullvisor: processing message task="worker-3" sequence=12 delivered=1
//! INFO pullvisor: acknowledged message task="worker-3" sequence=12 delivered=1
//! WARN pullvisor: subscription became inactive task="poller"
//! ```

use async_trait::async_trait;

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// `tracing` event writer subscriber.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let task = e.task.as_deref().unwrap_or("-");
        let reason = e.reason.as_deref().unwrap_or("");

        match e.kind {
            EventKind::ConsumerStarting => tracing::info!(task, "starting consumer"),
            EventKind::Subscribed => tracing::info!(task, subscription = reason, "subscribed"),
            EventKind::SubscribeFailed => tracing::error!(task, error = reason, "subscribe failed"),
            EventKind::CloseRequested => tracing::info!(task, "closing consumer"),
            EventKind::UnsubscribeFailed => {
                tracing::warn!(task, error = reason, "error unsubscribing, continuing")
            }
            EventKind::AllStoppedWithin => tracing::info!(task, "all pipeline tasks shut down"),
            EventKind::GraceExceeded => {
                tracing::warn!(task, stuck = reason, "grace exceeded, aborting tasks")
            }
            EventKind::ConsumerClosed => tracing::info!(task, cause = reason, "consumer closed"),
            EventKind::TaskStarting => tracing::debug!(task, "task starting"),
            EventKind::TaskStopped => tracing::info!(task, reason, "task stopped"),
            EventKind::TaskFailed => tracing::error!(
                task,
                sequence = e.sequence,
                delivered = e.delivered,
                error = reason,
                "task failed, shutting down consumer"
            ),
            EventKind::TaskPanicked => tracing::error!(task, error = reason, "task panicked"),
            EventKind::SubscriptionInactive => {
                tracing::warn!(task, "subscription became inactive")
            }
            EventKind::DomainCancelled => tracing::info!(task, cause = reason, "cancelling pipeline"),
            EventKind::MessageFetched => tracing::info!(
                task,
                sequence = e.sequence,
                delivered = e.delivered,
                "fetched message"
            ),
            EventKind::MessageHandedOff => tracing::debug!(
                task,
                sequence = e.sequence,
                delivered = e.delivered,
                "handed message to workers"
            ),
            EventKind::MessageProcessing => tracing::info!(
                task,
                sequence = e.sequence,
                delivered = e.delivered,
                "processing message"
            ),
            EventKind::MessageAcked => tracing::info!(
                task,
                sequence = e.sequence,
                delivered = e.delivered,
                "acknowledged message"
            ),
            EventKind::SubscriberOverflow => {
                tracing::warn!(subscriber = task, reason, "subscriber dropped event")
            }
            EventKind::SubscriberPanicked => {
                tracing::error!(subscriber = task, info = reason, "subscriber panicked")
            }
        }
    }

    fn name(&self) -> &'static str {
        "log-writer"
    }
}
