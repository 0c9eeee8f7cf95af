//! # Poller: single fetch path feeding the hand-off buffer.
//!
//! ```text
//! loop {
//!   ├─► cancelled?                         → exit (no further fetch)
//!   ├─► fetch(1, fetch_timeout)  (raced against the domain token)
//!   │     ├─ []                            → loop again
//!   │     ├─ [msg] → MessageFetched
//!   │     │          push(msg)  (suspends while no slot: backpressure)
//!   │     │          MessageHandedOff
//!   │     ├─ Err(Inactive)                 → SubscriptionInactive, cancel domain, exit
//!   │     └─ Err(other)                    → TaskFailed, cancel domain, exit
//! }
//! ```

use std::sync::Arc;
use std::time::Duration;

use tokio::select;

use crate::client::{Message, Subscription};
use crate::core::context::{Exit, TaskContext};
use crate::core::handoff::HandoffBuffer;
use crate::error::{FetchError, HandoffError, PipelineError};
use crate::events::EventKind;

/// Messages requested per fetch.
const FETCH_BATCH: usize = 1;

/// Fetches the next batch for `ctx`, translating failures into an [`Exit`].
///
/// Shared by the poller and by workers running in direct dispatch.
pub(crate) async fn fetch_next<S: Subscription>(
    ctx: &TaskContext,
    subscription: &S,
    timeout: Duration,
) -> Result<Vec<S::Message>, Exit> {
    let fetched = select! {
        biased;
        _ = ctx.token().cancelled() => return Err(Exit::Cancelled),
        res = subscription.fetch(FETCH_BATCH, timeout) => res,
    };

    match fetched {
        Ok(batch) => {
            for message in &batch {
                ctx.publish_message(EventKind::MessageFetched, message);
            }
            Ok(batch)
        }
        Err(FetchError::Inactive) => Err(ctx.inactive()),
        Err(source) => Err(ctx.fail(PipelineError::Fetch {
            task: ctx.name().to_string(),
            source,
        })),
    }
}

pub(crate) struct Poller<S: Subscription> {
    subscription: Arc<S>,
    buffer: HandoffBuffer<S::Message>,
    fetch_timeout: Duration,
    ctx: TaskContext,
}

impl<S: Subscription> Poller<S> {
    pub(crate) fn new(
        subscription: Arc<S>,
        buffer: HandoffBuffer<S::Message>,
        fetch_timeout: Duration,
        ctx: TaskContext,
    ) -> Self {
        Self {
            subscription,
            buffer,
            fetch_timeout,
            ctx,
        }
    }

    pub(crate) async fn run(self) {
        self.ctx.publish(EventKind::TaskStarting);
        let exit = self.poll().await;
        self.ctx.finish(exit);
    }

    async fn poll(&self) -> Exit {
        loop {
            if self.ctx.is_cancelled() {
                return Exit::Cancelled;
            }

            let batch = match fetch_next(&self.ctx, &*self.subscription, self.fetch_timeout).await {
                Ok(batch) => batch,
                Err(exit) => return exit,
            };

            for message in batch {
                let (sequence, delivered) = (message.sequence(), message.delivered());
                match self.buffer.push(message, self.ctx.token()).await {
                    Ok(()) => {
                        self.ctx.publish_message_ids(EventKind::MessageHandedOff, sequence, delivered)
                    }
                    Err(HandoffError::Cancelled) => return Exit::Cancelled,
                    Err(HandoffError::Closed) => {
                        return self.ctx.fail(PipelineError::HandoffClosed {
                            task: self.ctx.name().to_string(),
                        });
                    }
                }
            }
        }
    }
}
