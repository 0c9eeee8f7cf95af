//! Pipeline core: lifecycle, cancellation and the poller/worker loops.
//!
//! The public surface is [`Consumer`] (built through [`ConsumerBuilder`]) plus the
//! building blocks it exposes: [`HandoffBuffer`], [`CancellationDomain`] and
//! [`ConsumerConfig`].
//!
//! Internal modules:
//! - `poller`: single fetch loop feeding the hand-off buffer;
//! - `worker`: process-then-ack loop, fed by the buffer or by its own fetches;
//! - `context`: per-task naming, event publishing and error → cancellation mapping;
//! - `alive`: event-fed tracker of live tasks, used for the grace report;
//! - `shutdown`: process signal handling for owners that run forever.

mod alive;
mod builder;
mod config;
mod consumer;
mod context;
mod domain;
mod handoff;
mod poller;
mod shutdown;
mod worker;

pub use alive::AliveTask;
pub use builder::ConsumerBuilder;
pub use config::{ConsumerConfig, Dispatch};
pub use consumer::{Consumer, ConsumerState};
pub use domain::{CancellationDomain, DomainState, StopCause};
pub use handoff::{Handoff, HandoffBuffer};
pub use shutdown::{ShutdownSignal, wait_for_shutdown_signal};

pub(crate) use context::panic_message;
