//! # pullvisor
//!
//! **Pullvisor** is a bounded, at-least-once pull consumer for durable work queues.
//!
//! One poller fetches messages one at a time and hands them to a fixed pool of
//! workers through a bounded buffer; each worker processes a message and only then
//! acknowledges it. Every task shares a single cancellation domain: any fatal error
//! stops the whole consumer, and `close()` always terminates.
//!
//! ## Architecture
//! ```text
//!                 QueueClient::subscribe(target)
//!                              │
//!                              ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  Consumer (lifecycle owner)                                       │
//! │  - CancellationDomain (token + first StopCause)                   │
//! │  - Bus (broadcast events) ─► listener ─► AliveTracker             │
//! │                                      └─► SubscriberSet (LogWriter)│
//! │  - JoinSet of pipeline tasks (optionally on a dedicated runtime)  │
//! └──────┬────────────────────────────────────────────────────────────┘
//!        ▼
//!   ┌──────────┐ push  ┌──────────────────────┐ pop  ┌──────────────┐
//!   │  Poller  │──────►│ HandoffBuffer (N)    │─────►│ Worker 1..N  │
//!   │ fetch(1) │       │ ≤ N+1 in flight      │      │ handle → ack │
//!   └──────────┘       └──────────────────────┘      └──────────────┘
//!        │                                                  │
//!        └── fetch(1, timeout) ◄── Subscription ──► ack() ──┘
//! ```
//!
//! ### Lifecycle
//! ```text
//! Created ──start()──► Starting ──subscribed──► Running
//!                          │                       │ fatal error / inactive subscription
//!                          │                       ▼
//!                          └────────close()────► Closing ──all tasks joined──► Closed
//! ```
//!
//! ## Error policy
//! | Source                       | Effect                                            |
//! |------------------------------|---------------------------------------------------|
//! | fetch: subscription inactive | clean stop, [`StopCause::SubscriptionInactive`]   |
//! | fetch: other error           | [`StopCause::Failed`], whole consumer stops       |
//! | handler error                | message left unacked, [`StopCause::Failed`]       |
//! | ack error                    | [`StopCause::Failed`]                             |
//! | unsubscribe error on close   | reported as an event, swallowed                   |
//!
//! Nothing is retried inside the pipeline; unacked messages are redelivered by the broker.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use std::time::Duration;
//! use pullvisor::memory::{MemoryMessage, MemoryQueue};
//! use pullvisor::{Consumer, ConsumerConfig, Delay, HandlerRef, SubscriptionTarget};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let queue = MemoryQueue::new("orders");
//!     for i in 0..10 {
//!         queue.publish(format!("order-{i}")).await;
//!     }
//!
//!     let handler: HandlerRef<MemoryMessage> = Arc::new(Delay::new(Duration::from_millis(10)));
//!     let cfg = ConsumerConfig {
//!         workers: 2,
//!         fetch_timeout: Duration::from_millis(100),
//!         ..ConsumerConfig::default()
//!     };
//!     let mut consumer = Consumer::builder(
//!         queue.clone(),
//!         SubscriptionTarget::new("orders", "orders-durable", "orders.*"),
//!         handler,
//!     )
//!     .with_config(cfg)
//!     .build();
//!
//!     consumer.start().await?;
//!     tokio::time::sleep(Duration::from_millis(200)).await;
//!     consumer.close().await;
//!
//!     assert_eq!(queue.acked().await.len(), 10);
//!     Ok(())
//! }
//! ```

mod client;
mod core;
mod error;
mod events;
mod handlers;
mod subscribers;

// ---- Public re-exports ----

pub use client::memory;
pub use client::{Message, MessageOf, QueueClient, Subscription, SubscriptionTarget};
pub use core::{
    AliveTask, CancellationDomain, Consumer, ConsumerBuilder, ConsumerConfig, ConsumerState,
    Dispatch, DomainState, Handoff, HandoffBuffer, ShutdownSignal, StopCause,
    wait_for_shutdown_signal,
};
pub use error::{
    AckError, ConsumerError, FetchError, HandlerError, HandoffError, PipelineError,
    SubscribeError, UnsubscribeError,
};
pub use events::{Bus, Event, EventKind};
pub use handlers::{Delay, Handler, HandlerFn, HandlerRef};
pub use subscribers::{LogWriter, Subscribe, SubscriberSet};
