//! # Function-backed handler (`HandlerFn`)
//!
//! [`HandlerFn`] wraps a closure `F: Fn(&M) -> Fut`, producing a fresh future per
//! message. The closure sees a borrowed message, so anything the future needs past
//! its first await point has to be copied out first (sequence, payload clone, ...).
//!
//! ## Example
//! ```rust
//! use pullvisor::{HandlerError, HandlerFn, HandlerRef, Message};
//! use pullvisor::memory::MemoryMessage;
//!
//! let h: HandlerRef<MemoryMessage> = HandlerFn::arc("print", |m: &MemoryMessage| {
//!     let seq = m.sequence();
//!     async move {
//!         println!("got {seq}");
//!         Ok::<_, HandlerError>(())
//!     }
//! });
//! assert_eq!(h.name(), "print");
//! ```

use std::borrow::Cow;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::HandlerError;
use crate::handlers::handler::Handler;

/// Shared handle to a handler.
pub type HandlerRef<M> = Arc<dyn Handler<M>>;

/// Function-backed handler implementation.
pub struct HandlerFn<M, F> {
    name: Cow<'static, str>,
    f: F,
    _message: PhantomData<fn(&M)>,
}

impl<M, F> HandlerFn<M, F> {
    /// Creates a new function-backed handler.
    pub fn new<Fut>(name: impl Into<Cow<'static, str>>, f: F) -> Self
    where
        F: Fn(&M) -> Fut,
    {
        Self {
            name: name.into(),
            f,
            _message: PhantomData,
        }
    }

    /// Creates the handler and returns it as a shared handle.
    pub fn arc<Fut>(name: impl Into<Cow<'static, str>>, f: F) -> Arc<Self>
    where
        F: Fn(&M) -> Fut,
    {
        Arc::new(Self::new(name, f))
    }
}

#[async_trait]
impl<M, F, Fut> Handler<M> for HandlerFn<M, F>
where
    M: Send + Sync + 'static,
    F: Fn(&M) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), HandlerError>> + Send + 'static,
{
    async fn handle(&self, message: &M) -> Result<(), HandlerError> {
        (self.f)(message).await
    }

    fn name(&self) -> &str {
        &self.name
    }
}
