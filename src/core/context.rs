//! # Per-task view of the shared pipeline state.
//!
//! Every poller/worker owns a [`TaskContext`]: its stable name, the shared
//! [`CancellationDomain`] and the event [`Bus`]. Errors never leave a task loop;
//! they are turned into events plus a domain cancellation here.

use std::any::Any;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::client::Message;
use crate::core::domain::{CancellationDomain, StopCause};
use crate::error::PipelineError;
use crate::events::{Bus, Event, EventKind};

/// How a task loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Exit {
    /// The domain was cancelled while the task was between iterations or suspended.
    Cancelled,
    /// The subscription reported it is permanently inactive.
    Inactive,
    /// The task raised a fatal error and cancelled the domain.
    Failed,
}

#[derive(Clone)]
pub(crate) struct TaskContext {
    name: Arc<str>,
    domain: Arc<CancellationDomain>,
    bus: Bus,
}

impl TaskContext {
    pub(crate) fn new(name: impl Into<Arc<str>>, domain: Arc<CancellationDomain>, bus: Bus) -> Self {
        Self {
            name: name.into(),
            domain,
            bus,
        }
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn token(&self) -> &CancellationToken {
        self.domain.token()
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        self.domain.is_cancelled()
    }

    pub(crate) fn publish(&self, kind: EventKind) {
        self.bus
            .publish(Event::new(kind).with_task(Arc::clone(&self.name)));
    }

    pub(crate) fn publish_message<M: Message>(&self, kind: EventKind, message: &M) {
        self.bus.publish(Event::for_message(kind, &self.name, message));
    }

    /// Same as [`publish_message`](Self::publish_message) once the message has been moved away.
    pub(crate) fn publish_message_ids(&self, kind: EventKind, sequence: u64, delivered: u64) {
        self.bus.publish(
            Event::new(kind)
                .with_task(Arc::clone(&self.name))
                .with_message(sequence, delivered),
        );
    }

    /// Reports a terminal-but-clean inactive subscription and cancels the domain.
    pub(crate) fn inactive(&self) -> Exit {
        self.publish(EventKind::SubscriptionInactive);
        self.cancel(StopCause::SubscriptionInactive);
        Exit::Inactive
    }

    /// Reports a fatal error and cancels the domain.
    pub(crate) fn fail(&self, err: PipelineError) -> Exit {
        let mut ev = Event::new(EventKind::TaskFailed)
            .with_task(Arc::clone(&self.name))
            .with_reason(err.to_string());
        if let PipelineError::Process { sequence, delivered, .. }
        | PipelineError::Ack { sequence, delivered, .. } = &err
        {
            ev = ev.with_message(*sequence, *delivered);
        }
        self.bus.publish(ev);
        self.cancel(StopCause::Failed(err));
        Exit::Failed
    }

    /// Reports a panic that escaped the task loop and cancels the domain.
    pub(crate) fn panicked(&self, info: String) {
        self.bus.publish(
            Event::new(EventKind::TaskPanicked)
                .with_task(Arc::clone(&self.name))
                .with_reason(info.as_str()),
        );
        self.cancel(StopCause::Failed(PipelineError::Panicked {
            task: self.name.to_string(),
            info,
        }));
    }

    /// Publishes the task's final event.
    pub(crate) fn finish(&self, exit: Exit) {
        let reason = match exit {
            Exit::Cancelled => "cancelled",
            Exit::Inactive => "subscription inactive",
            // TaskFailed already published.
            Exit::Failed => return,
        };
        self.bus.publish(
            Event::new(EventKind::TaskStopped)
                .with_task(Arc::clone(&self.name))
                .with_reason(reason),
        );
    }

    fn cancel(&self, cause: StopCause) {
        let reason = cause.to_string();
        if self.domain.cancel(cause) {
            self.bus.publish(
                Event::new(EventKind::DomainCancelled)
                    .with_task(Arc::clone(&self.name))
                    .with_reason(reason),
            );
        }
    }
}

/// Extracts a printable message from a panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}
