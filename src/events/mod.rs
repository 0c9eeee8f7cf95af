//! Runtime events: types and broadcast bus.
//!
//! This module groups the event **data model** and the **bus** used to
//! publish/subscribe to events emitted by the consumer, its poller and workers,
//! and the subscriber workers.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] event classification and payload metadata
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast`
//!
//! ## Quick reference
//! - **Publishers**: `Consumer` (lifecycle), `Poller`, `Worker`s, `SubscriberSet`
//!   workers (overflow/panic).
//! - **Consumers**: the consumer's listener task, which updates `AliveTracker`
//!   and fans out to the `SubscriberSet`.

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind};
