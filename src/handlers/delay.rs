//! # Placeholder processing step.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::HandlerError;
use crate::handlers::handler::Handler;

/// Simulates processing by waiting a fixed amount of time, then succeeds.
#[derive(Debug, Clone, Copy)]
pub struct Delay {
    /// Time spent "processing" each message.
    pub duration: Duration,
}

impl Delay {
    /// Creates a delay handler.
    #[must_use]
    pub fn new(duration: Duration) -> Self {
        Self { duration }
    }
}

impl Default for Delay {
    /// 1.5 seconds per message.
    fn default() -> Self {
        Self::new(Duration::from_millis(1_500))
    }
}

#[async_trait]
impl<M: Send + Sync + 'static> Handler<M> for Delay {
    async fn handle(&self, _message: &M) -> Result<(), HandlerError> {
        tokio::time::sleep(self.duration).await;
        Ok(())
    }

    fn name(&self) -> &str {
        "delay"
    }
}
