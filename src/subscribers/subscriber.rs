//! # Observer hook for consumer events.
//!
//! A [`Subscribe`] implementation gets its own bounded queue and worker task
//! inside the [`SubscriberSet`](crate::SubscriberSet); it never runs on a
//! pipeline task and can never stall the poller or a worker.
//!
//! Per-message events (`MessageFetched`, `MessageAcked`, ...) dominate the
//! traffic. Subscribers that only care about lifecycle return `false` from
//! [`Subscribe::interested`] for them, which keeps their queue short.
//!
//! ```rust
//! use async_trait::async_trait;
//! use pullvisor::{Event, EventKind, Subscribe};
//!
//! struct CrashAlert;
//!
//! #[async_trait]
//! impl Subscribe for CrashAlert {
//!     async fn on_event(&self, ev: &Event) {
//!         if ev.kind == EventKind::TaskFailed {
//!             // page someone
//!         }
//!     }
//!
//!     fn interested(&self, kind: EventKind) -> bool {
//!         matches!(kind, EventKind::TaskFailed | EventKind::TaskPanicked)
//!     }
//!
//!     fn name(&self) -> &'static str { "crash-alert" }
//! }
//! ```

use async_trait::async_trait;

use crate::events::{Event, EventKind};

/// Receives consumer events on a dedicated task, in publish order.
#[async_trait]
pub trait Subscribe: Send + Sync + 'static {
    /// Handles one event. A panic here is caught and reported as `SubscriberPanicked`.
    async fn on_event(&self, event: &Event);

    /// Whether events of `kind` should be queued for this subscriber at all.
    fn interested(&self, kind: EventKind) -> bool {
        let _ = kind;
        true
    }

    /// Name used in `SubscriberOverflow` / `SubscriberPanicked` events.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Queue length before events are dropped for this subscriber (clamped to at least 1).
    fn queue_capacity(&self) -> usize {
        1024
    }
}
