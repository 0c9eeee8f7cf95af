//! # Event bus shared by one consumer and its pipeline tasks.
//!
//! ```text
//!   Consumer ──┐
//!   Poller   ──┼── publish ──► [ broadcast ring, bus_capacity ] ──► listener ──► AliveTracker
//!   Worker k ──┤                                               │               └► SubscriberSet
//!   SubscriberSet workers (overflow / panic) ──┘                └──► Consumer::events() receivers
//! ```
//!
//! Publishing never waits: the pipeline must not slow down because nobody listens
//! or a listener is behind. A lagging receiver skips the oldest events
//! (`RecvError::Lagged`); with no receiver at all the event is simply dropped.

use tokio::sync::broadcast;

use super::event::Event;

/// Broadcast handle for [`Event`]s. Clones publish into the same ring.
#[derive(Clone, Debug)]
pub struct Bus {
    tx: broadcast::Sender<Event>,
}

impl Bus {
    /// Creates a bus keeping up to `capacity` undelivered events per receiver (minimum 1).
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Publishes `ev` to every current receiver without waiting.
    pub fn publish(&self, ev: Event) {
        // Err only means there is no receiver right now.
        let _ = self.tx.send(ev);
    }

    /// Opens a receiver that sees events published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }

    /// Number of open receivers.
    pub fn receivers(&self) -> usize {
        self.tx.receiver_count()
    }
}
