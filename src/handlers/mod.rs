//! # Message handlers.
//!
//! This module provides the processing step run by every worker:
//! - [`Handler`] - trait for the async processing step
//! - [`HandlerFn`] - function-based handler implementation
//! - [`HandlerRef`] - shared reference to a handler (`Arc<dyn Handler<M>>`)
//! - [`Delay`] - placeholder handler that only waits

mod delay;
mod handler;
mod handler_fn;

pub use delay::Delay;
pub use handler::Handler;
pub use handler_fn::{HandlerFn, HandlerRef};
