//! # Processing step abstraction.
//!
//! A [`Handler`] receives a borrowed message and returns once processing is done.
//! The worker acks only after `Ok(())`; an `Err` tears the whole consumer down and
//! leaves the message unacked, so the broker redelivers it.
//!
//! Handlers must tolerate redelivery: the pipeline guarantees that one message
//! instance is processed by at most one worker at a time, not that it is processed once.

use async_trait::async_trait;

use crate::error::HandlerError;

/// # Asynchronous processing step.
///
/// # Example
/// ```
/// use async_trait::async_trait;
/// use pullvisor::{Handler, HandlerError, Message};
///
/// struct Audit;
///
/// #[async_trait]
/// impl<M: Message> Handler<M> for Audit {
///     async fn handle(&self, message: &M) -> Result<(), HandlerError> {
///         if message.delivered() > 5 {
///             return Err(HandlerError::new("poison message"));
///         }
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait Handler<M>: Send + Sync + 'static {
    /// Processes one message.
    ///
    /// Cancellation of the consumer does not interrupt a running call.
    async fn handle(&self, message: &M) -> Result<(), HandlerError>;

    /// Returns a short handler name used in logs.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}
