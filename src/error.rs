//! Error types used by the pullvisor pipeline, its queue client contract and handlers.
//!
//! Client-facing errors (returned by [`QueueClient`](crate::QueueClient) implementations):
//! - [`SubscribeError`]: establishing a subscription failed.
//! - [`FetchError`]: a fetch failed; [`FetchError::Inactive`] is terminal-but-clean.
//! - [`AckError`]: acknowledging a message failed.
//! - [`UnsubscribeError`]: tearing down a subscription failed.
//!
//! Pipeline errors:
//! - [`HandlerError`]: the processing step failed.
//! - [`HandoffError`]: a push/pop on the hand-off buffer was interrupted.
//! - [`PipelineError`]: the fatal error that tore a consumer down.
//! - [`ConsumerError`]: lifecycle misuse or startup failure.
//!
//! All enums provide `as_label` (stable snake_case) for logs/metrics.

use thiserror::Error;

/// # Errors produced by [`Subscription::fetch`](crate::Subscription::fetch).
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// The subscription became permanently inactive (unsubscribed, drained, deleted).
    ///
    /// Terminal but clean: the pipeline stops without being treated as a crash.
    #[error("subscription is no longer active")]
    Inactive,

    /// Any other client/transport failure. Fatal for the consumer instance.
    #[error("fetch failed: {error}")]
    Io {
        /// The underlying error message.
        error: String,
    },
}

impl FetchError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use pullvisor::FetchError;
    ///
    /// assert_eq!(FetchError::Inactive.as_label(), "fetch_inactive");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            FetchError::Inactive => "fetch_inactive",
            FetchError::Io { .. } => "fetch_io",
        }
    }

    /// Convenience constructor for [`FetchError::Io`].
    pub fn io(error: impl Into<String>) -> Self {
        FetchError::Io {
            error: error.into(),
        }
    }
}

/// # Error produced by [`Message::ack`](crate::Message::ack).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("ack failed: {error}")]
pub struct AckError {
    /// The underlying error message.
    pub error: String,
}

impl AckError {
    /// Creates a new ack error.
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

/// # Errors produced by [`QueueClient::subscribe`](crate::QueueClient::subscribe).
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SubscribeError {
    /// The target stream does not exist on the broker.
    #[error("stream {stream:?} not found")]
    StreamNotFound {
        /// Requested stream name.
        stream: String,
    },

    /// Any other client/transport failure.
    #[error("subscribe failed: {error}")]
    Io {
        /// The underlying error message.
        error: String,
    },
}

/// # Errors produced by [`Subscription::unsubscribe`](crate::Subscription::unsubscribe).
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UnsubscribeError {
    /// The subscription was already torn down. Treated as success by the consumer.
    #[error("already unsubscribed")]
    AlreadyUnsubscribed,

    /// Any other failure. Logged and swallowed by the consumer.
    #[error("unsubscribe failed: {error}")]
    Io {
        /// The underlying error message.
        error: String,
    },
}

impl UnsubscribeError {
    /// Indicates whether this failure means "already done" and can be ignored.
    pub fn is_benign(&self) -> bool {
        matches!(self, UnsubscribeError::AlreadyUnsubscribed)
    }
}

/// # Error produced by a [`Handler`](crate::Handler).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("processing failed: {error}")]
pub struct HandlerError {
    /// The underlying error message.
    pub error: String,
}

impl HandlerError {
    /// Creates a new handler error.
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

/// # Errors produced by [`HandoffBuffer`](crate::HandoffBuffer) operations.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandoffError {
    /// The cancellation domain fired while the call was suspended.
    #[error("hand-off interrupted by cancellation")]
    Cancelled,

    /// The opposite side of the buffer is gone.
    #[error("hand-off buffer closed")]
    Closed,
}

/// # Fatal pipeline failures.
///
/// The first one raised inside a consumer is recorded as the
/// [`StopCause`](crate::StopCause) of its cancellation domain.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PipelineError {
    /// Fetching from the subscription failed with a non-terminal error.
    #[error("task {task}: {source}")]
    Fetch {
        /// Task that observed the failure.
        task: String,
        /// Underlying fetch error.
        source: FetchError,
    },

    /// The handler failed on a message.
    #[error("task {task}: message {sequence} (delivered={delivered}): {source}")]
    Process {
        /// Task that observed the failure.
        task: String,
        /// Queue sequence number of the message.
        sequence: u64,
        /// Delivery attempt of the message.
        delivered: u64,
        /// Underlying handler error.
        source: HandlerError,
    },

    /// Acknowledging a processed message failed.
    #[error("task {task}: message {sequence} (delivered={delivered}): {source}")]
    Ack {
        /// Task that observed the failure.
        task: String,
        /// Queue sequence number of the message.
        sequence: u64,
        /// Delivery attempt of the message.
        delivered: u64,
        /// Underlying ack error.
        source: AckError,
    },

    /// The hand-off buffer closed underneath a running task.
    #[error("task {task}: hand-off buffer closed")]
    HandoffClosed {
        /// Task that observed the failure.
        task: String,
    },

    /// A task panicked.
    #[error("task {task} panicked: {info}")]
    Panicked {
        /// Task that panicked.
        task: String,
        /// Panic message.
        info: String,
    },
}

impl PipelineError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            PipelineError::Fetch { .. } => "pipeline_fetch",
            PipelineError::Process { .. } => "pipeline_process",
            PipelineError::Ack { .. } => "pipeline_ack",
            PipelineError::HandoffClosed { .. } => "pipeline_handoff_closed",
            PipelineError::Panicked { .. } => "pipeline_panicked",
        }
    }

    /// Name of the task that raised the error.
    pub fn task(&self) -> &str {
        match self {
            PipelineError::Fetch { task, .. }
            | PipelineError::Process { task, .. }
            | PipelineError::Ack { task, .. }
            | PipelineError::HandoffClosed { task }
            | PipelineError::Panicked { task, .. } => task,
        }
    }

    /// Sequence number of the message involved, if any.
    pub fn sequence(&self) -> Option<u64> {
        match self {
            PipelineError::Process { sequence, .. } | PipelineError::Ack { sequence, .. } => {
                Some(*sequence)
            }
            _ => None,
        }
    }
}

/// # Errors produced by the [`Consumer`](crate::Consumer) lifecycle.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConsumerError {
    /// `start()` was called on a consumer that is not in the `Created` state.
    #[error("consumer already started (state: {state})")]
    AlreadyStarted {
        /// State observed when `start()` was called.
        state: &'static str,
    },

    /// Establishing the subscription failed.
    #[error(transparent)]
    Subscribe(#[from] SubscribeError),
}

impl ConsumerError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use pullvisor::{ConsumerError, SubscribeError};
    ///
    /// let err = ConsumerError::from(SubscribeError::StreamNotFound { stream: "orders".into() });
    /// assert_eq!(err.as_label(), "consumer_subscribe");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            ConsumerError::AlreadyStarted { .. } => "consumer_already_started",
            ConsumerError::Subscribe(_) => "consumer_subscribe",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsubscribe_benign_kind() {
        assert!(UnsubscribeError::AlreadyUnsubscribed.is_benign());
        assert!(
            !UnsubscribeError::Io {
                error: "conn reset".into()
            }
            .is_benign()
        );
    }

    #[test]
    fn test_pipeline_error_accessors() {
        let err = PipelineError::Process {
            task: "worker-2".into(),
            sequence: 7,
            delivered: 1,
            source: HandlerError::new("boom"),
        };
        assert_eq!(err.task(), "worker-2");
        assert_eq!(err.sequence(), Some(7));
        assert_eq!(err.as_label(), "pipeline_process");
        assert_eq!(
            err.to_string(),
            "task worker-2: message 7 (delivered=1): processing failed: boom"
        );

        let err = PipelineError::Fetch {
            task: "poller".into(),
            source: FetchError::io("timeout reading frame"),
        };
        assert_eq!(err.sequence(), None);
        assert_eq!(err.to_string(), "task poller: fetch failed: timeout reading frame");
    }
}
