//! # Bounded hand-off between the poller and the worker pool.
//!
//! ```text
//!            push (suspends while no slot)            pop (suspends while empty)
//! Poller ───────────────────────────────► [ FIFO, capacity = N ] ──────────────► Worker k
//!            takes a slot permit                        │                       holds Handoff
//!                                                       │                       (slot kept)
//!                                  slot released when the Handoff is dropped ◄──┘
//! ```
//!
//! ## Rules
//! - FIFO, no peeking, no priorities, no re-ordering.
//! - Each item is received by **exactly one** popper.
//! - `workers + 1` slots cap the items that are buffered or being processed.
//!   A slot travels with its [`Handoff`] and is released only when the worker is done.
//! - Every suspended `push`/`pop` returns [`HandoffError::Cancelled`] once the token fires.

use std::sync::Arc;

use tokio::select;
use tokio::sync::{Mutex, OwnedSemaphorePermit, Semaphore, mpsc};
use tokio_util::sync::CancellationToken;

use crate::error::HandoffError;

/// A buffered message together with its in-flight slot.
///
/// Dropping the `Handoff` frees the slot; keep it alive until the message is acked.
pub struct Handoff<M> {
    message: M,
    _slot: OwnedSemaphorePermit,
}

impl<M> Handoff<M> {
    /// The carried message.
    pub fn message(&self) -> &M {
        &self.message
    }
}

/// Bounded FIFO with cancellable suspending push/pop.
///
/// Cloning yields another handle to the same buffer.
pub struct HandoffBuffer<M> {
    tx: mpsc::Sender<Handoff<M>>,
    rx: Arc<Mutex<mpsc::Receiver<Handoff<M>>>>,
    slots: Arc<Semaphore>,
    capacity: usize,
}

impl<M> Clone for HandoffBuffer<M> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
            rx: Arc::clone(&self.rx),
            slots: Arc::clone(&self.slots),
            capacity: self.capacity,
        }
    }
}

impl<M: Send + 'static> HandoffBuffer<M> {
    /// Creates a buffer sized for `workers` workers (minimum 1).
    pub fn new(workers: usize) -> Self {
        let capacity = workers.max(1);
        let (tx, rx) = mpsc::channel(capacity);
        Self {
            tx,
            rx: Arc::new(Mutex::new(rx)),
            slots: Arc::new(Semaphore::new(capacity + 1)),
            capacity,
        }
    }

    /// Channel capacity (equals the worker count).
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Upper bound of items buffered or being processed.
    pub fn max_in_flight(&self) -> usize {
        self.capacity + 1
    }

    /// Items currently buffered or held by workers.
    pub fn in_flight(&self) -> usize {
        self.max_in_flight() - self.slots.available_permits()
    }

    /// Pushes `message`, suspending until a slot and buffer space are free.
    ///
    /// On cancellation the message is dropped unacked; the broker redelivers it.
    pub async fn push(&self, message: M, token: &CancellationToken) -> Result<(), HandoffError> {
        let slot = select! {
            biased;
            _ = token.cancelled() => return Err(HandoffError::Cancelled),
            permit = Arc::clone(&self.slots).acquire_owned() => {
                permit.map_err(|_| HandoffError::Closed)?
            }
        };

        select! {
            biased;
            _ = token.cancelled() => Err(HandoffError::Cancelled),
            sent = self.tx.send(Handoff { message, _slot: slot }) => {
                sent.map_err(|_| HandoffError::Closed)
            }
        }
    }

    /// Pops the oldest item, suspending while the buffer is empty.
    ///
    /// Cancellation is checked first, so a cancelled caller never takes new work.
    pub async fn pop(&self, token: &CancellationToken) -> Result<Handoff<M>, HandoffError> {
        let mut rx = select! {
            biased;
            _ = token.cancelled() => return Err(HandoffError::Cancelled),
            guard = self.rx.lock() => guard,
        };

        select! {
            biased;
            _ = token.cancelled() => Err(HandoffError::Cancelled),
            item = rx.recv() => item.ok_or(HandoffError::Closed),
        }
    }
}
