use std::sync::Arc;

use tokio::runtime::Handle;

use crate::client::{MessageOf, QueueClient, SubscriptionTarget};
use crate::core::config::ConsumerConfig;
use crate::core::consumer::Consumer;
use crate::handlers::HandlerRef;
use crate::subscribers::{LogWriter, Subscribe};

/// Builder for constructing a [`Consumer`].
pub struct ConsumerBuilder<C: QueueClient> {
    client: C,
    target: SubscriptionTarget,
    handler: HandlerRef<MessageOf<C>>,
    cfg: ConsumerConfig,
    subscribers: Option<Vec<Arc<dyn Subscribe>>>,
    runtime: Option<Handle>,
}

impl<C: QueueClient> ConsumerBuilder<C> {
    /// Creates a builder with the default configuration.
    pub fn new(client: C, target: SubscriptionTarget, handler: HandlerRef<MessageOf<C>>) -> Self {
        Self {
            client,
            target,
            handler,
            cfg: ConsumerConfig::default(),
            subscribers: None,
            runtime: None,
        }
    }

    /// Replaces the configuration.
    pub fn with_config(mut self, cfg: ConsumerConfig) -> Self {
        self.cfg = cfg;
        self
    }

    /// Sets event subscribers.
    ///
    /// Replaces the default [`LogWriter`]; pass it explicitly to keep logging.
    /// An empty list disables fan-out entirely.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = Some(subscribers);
        self
    }

    /// Runs the poller and workers on `runtime` instead of the caller's runtime.
    ///
    /// `close()` keeps running on the caller's runtime, so it can always join
    /// the pipeline tasks. Size the runtime with [`ConsumerConfig::pool_size`].
    pub fn with_runtime(mut self, runtime: Handle) -> Self {
        self.runtime = Some(runtime);
        self
    }

    /// Builds the consumer in the `Created` state. Nothing runs until `start()`.
    pub fn build(self) -> Consumer<C> {
        let subscribers = self
            .subscribers
            .unwrap_or_else(|| vec![Arc::new(LogWriter::new())]);
        Consumer::new(
            self.client,
            self.target,
            self.cfg,
            self.handler,
            subscribers,
            self.runtime,
        )
    }
}
