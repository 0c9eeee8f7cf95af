//! # Worker: process then ack, one message at a time.
//!
//! ```text
//! loop {
//!   ├─► cancelled?                    → exit (no new message is taken)
//!   ├─► next message
//!   │     ├─ Handoff: pop()           (suspends while the buffer is empty)
//!   │     └─ Direct:  fetch(1, fetch_timeout)
//!   ├─► MessageProcessing
//!   ├─► handler.handle(&msg)          (never interrupted by cancellation)
//!   │     └─ Err → TaskFailed, cancel domain, exit (message left unacked)
//!   ├─► msg.ack()
//!   │     └─ Err → TaskFailed, cancel domain, exit
//!   └─► MessageAcked, release hand-off slot
//! }
//! ```
//!
//! A message that was popped is always processed to completion before the
//! cancellation flag is checked again.

use std::sync::Arc;
use std::time::Duration;

use crate::client::{Message, Subscription};
use crate::core::context::{Exit, TaskContext};
use crate::core::handoff::{Handoff, HandoffBuffer};
use crate::core::poller::fetch_next;
use crate::error::{HandoffError, PipelineError};
use crate::events::EventKind;
use crate::handlers::HandlerRef;

/// Where a worker takes its messages from.
pub(crate) enum Source<S: Subscription> {
    /// Shared hand-off buffer filled by the poller.
    Handoff(HandoffBuffer<S::Message>),
    /// The worker fetches from the subscription itself.
    Direct {
        subscription: Arc<S>,
        fetch_timeout: Duration,
    },
}

pub(crate) struct Worker<S: Subscription> {
    source: Source<S>,
    handler: HandlerRef<S::Message>,
    ctx: TaskContext,
}

impl<S: Subscription> Worker<S> {
    pub(crate) fn new(source: Source<S>, handler: HandlerRef<S::Message>, ctx: TaskContext) -> Self {
        Self {
            source,
            handler,
            ctx,
        }
    }

    pub(crate) async fn run(self) {
        self.ctx.publish(EventKind::TaskStarting);
        let exit = match &self.source {
            Source::Handoff(buffer) => self.drain(buffer).await,
            Source::Direct {
                subscription,
                fetch_timeout,
            } => self.pull(subscription, *fetch_timeout).await,
        };
        self.ctx.finish(exit);
    }

    async fn drain(&self, buffer: &HandoffBuffer<S::Message>) -> Exit {
        loop {
            if self.ctx.is_cancelled() {
                return Exit::Cancelled;
            }
            let item: Handoff<S::Message> = match buffer.pop(self.ctx.token()).await {
                Ok(item) => item,
                Err(HandoffError::Cancelled) => return Exit::Cancelled,
                Err(HandoffError::Closed) => {
                    return self.ctx.fail(PipelineError::HandoffClosed {
                        task: self.ctx.name().to_string(),
                    });
                }
            };
            // The slot stays taken until `item` drops after the ack.
            if let Err(exit) = self.process(item.message()).await {
                return exit;
            }
        }
    }

    async fn pull(&self, subscription: &S, fetch_timeout: Duration) -> Exit {
        loop {
            if self.ctx.is_cancelled() {
                return Exit::Cancelled;
            }
            let batch = match fetch_next(&self.ctx, subscription, fetch_timeout).await {
                Ok(batch) => batch,
                Err(exit) => return exit,
            };
            for message in &batch {
                if let Err(exit) = self.process(message).await {
                    return exit;
                }
            }
        }
    }

    async fn process(&self, message: &S::Message) -> Result<(), Exit> {
        let (sequence, delivered) = (message.sequence(), message.delivered());
        self.ctx.publish_message(EventKind::MessageProcessing, message);

        if let Err(source) = self.handler.handle(message).await {
            return Err(self.ctx.fail(PipelineError::Process {
                task: self.ctx.name().to_string(),
                sequence,
                delivered,
                source,
            }));
        }

        if let Err(source) = message.ack().await {
            return Err(self.ctx.fail(PipelineError::Ack {
                task: self.ctx.name().to_string(),
                sequence,
                delivered,
                source,
            }));
        }

        self.ctx.publish_message(EventKind::MessageAcked, message);
        Ok(())
    }
}
