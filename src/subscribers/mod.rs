//! # Event subscribers for the pullvisor runtime.
//!
//! This module provides the [`Subscribe`] trait and built-in implementations
//! for handling runtime events broadcast through the [`Bus`](crate::events::Bus).
//!
//! ## Architecture
//! ```text
//! Event flow:
//!   Poller/Worker ── publish(Event) ──► Bus ──► Consumer listener
//!                                                   │
//!                                                   ├──► AliveTracker (internal state tracking)
//!                                                   │
//!                                                   └──► SubscriberSet::emit(&Event)
//!                                                             │
//!                                                        ┌────┴────┬─────────┐
//!                                                        ▼         ▼         ▼
//!                                                    LogWriter  Metrics   Custom
//! ```
//!
//! ## Implementing custom subscribers
//! ```no_run
//! use pullvisor::{Subscribe, Event, EventKind};
//! use async_trait::async_trait;
//!
//! struct Redeliveries;
//!
//! #[async_trait]
//! impl Subscribe for Redeliveries {
//!     async fn on_event(&self, event: &Event) {
//!         if event.kind == EventKind::MessageFetched && event.delivered > Some(1) {
//!             // count a redelivery
//!         }
//!     }
//!
//!     fn name(&self) -> &'static str { "redeliveries" }
//! }
//! ```

mod log;
mod subscriber;
mod subscriber_set;

pub use log::LogWriter;
pub use subscriber::Subscribe;
pub use subscriber_set::SubscriberSet;
