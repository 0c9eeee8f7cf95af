//! # Consumer: owns the pipeline lifecycle and its single cancellation domain.
//!
//! ```text
//! start():
//!   listener  ── Bus.subscribe() ─► AliveTracker::update + SubscriberSet::emit
//!   ConsumerStarting
//!   client.subscribe(target) ── Err ─► SubscribeFailed, return Err (still closable)
//!   Subscribed
//!   JoinSet (optionally on a dedicated runtime):
//!     Handoff: Poller ─► HandoffBuffer(N) ─► Worker 1..N
//!     Direct:  Worker 1..N, each fetching for itself
//!
//! close():
//!   CloseRequested
//!   unsubscribe (only if active; "already unsubscribed" ignored, others reported)
//!   domain.cancel(Closed)           (no-op if a task already cancelled it)
//!   join all within grace:
//!     ├─ Ok      → AllStoppedWithin
//!     └─ timeout → GraceExceeded{stuck}, abort remaining tasks
//!   ConsumerClosed{cause}, drain subscribers
//! ```
//!
//! `close()` never fails and may be called any number of times.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use tokio::runtime::Handle;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::{JoinHandle, JoinSet};
use tokio::time;

use crate::client::{MessageOf, QueueClient, Subscription, SubscriptionTarget};
use crate::core::alive::{AliveTask, AliveTracker};
use crate::core::builder::ConsumerBuilder;
use crate::core::config::{ConsumerConfig, Dispatch};
use crate::core::context::{TaskContext, panic_message};
use crate::core::domain::{CancellationDomain, StopCause};
use crate::core::handoff::HandoffBuffer;
use crate::core::poller::Poller;
use crate::core::worker::{Source, Worker};
use crate::error::ConsumerError;
use crate::events::{Bus, Event, EventKind};
use crate::handlers::HandlerRef;
use crate::subscribers::{Subscribe, SubscriberSet};

const POLLER: &str = "poller";

/// How long `close()` waits for subscribers to drain their queues.
const SUBSCRIBER_DRAIN: Duration = Duration::from_secs(5);

/// Lifecycle of a [`Consumer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsumerState {
    /// Built, `start()` not called yet.
    Created,
    /// `start()` is subscribing (or subscribing failed).
    Starting,
    /// Poller and workers are running.
    Running,
    /// The domain was cancelled or `close()` is in progress.
    Closing,
    /// Terminal: every task exited, resources released.
    Closed,
}

impl ConsumerState {
    /// Returns a short stable label.
    pub fn as_str(&self) -> &'static str {
        match self {
            ConsumerState::Created => "created",
            ConsumerState::Starting => "starting",
            ConsumerState::Running => "running",
            ConsumerState::Closing => "closing",
            ConsumerState::Closed => "closed",
        }
    }
}

/// A bounded at-least-once pull consumer.
///
/// Build one with [`Consumer::builder`]; see the crate docs for a full example.
pub struct Consumer<C: QueueClient> {
    name: Arc<str>,
    client: C,
    target: SubscriptionTarget,
    cfg: ConsumerConfig,
    handler: HandlerRef<MessageOf<C>>,
    subscribers: Vec<Arc<dyn Subscribe>>,
    runtime: Option<Handle>,

    bus: Bus,
    alive: Arc<AliveTracker>,
    domain: Arc<CancellationDomain>,
    state: ConsumerState,
    subscription: Option<Arc<C::Subscription>>,
    tasks: JoinSet<()>,
    listener: Option<JoinHandle<()>>,
}

impl<C: QueueClient> Consumer<C> {
    /// Starts building a consumer for `target` that runs `handler` on every message.
    pub fn builder(
        client: C,
        target: SubscriptionTarget,
        handler: HandlerRef<MessageOf<C>>,
    ) -> ConsumerBuilder<C> {
        ConsumerBuilder::new(client, target, handler)
    }

    pub(crate) fn new(
        client: C,
        target: SubscriptionTarget,
        cfg: ConsumerConfig,
        handler: HandlerRef<MessageOf<C>>,
        subscribers: Vec<Arc<dyn Subscribe>>,
        runtime: Option<Handle>,
    ) -> Self {
        Self {
            name: Arc::from(cfg.name.as_str()),
            bus: Bus::new(cfg.bus_capacity),
            client,
            target,
            cfg,
            handler,
            subscribers,
            runtime,
            alive: Arc::new(AliveTracker::new()),
            domain: Arc::new(CancellationDomain::new()),
            state: ConsumerState::Created,
            subscription: None,
            tasks: JoinSet::new(),
            listener: None,
        }
    }

    /// Subscribes and spawns the poller and workers.
    ///
    /// On a subscribe failure the error is returned and the consumer must still
    /// be closed; `close()` then only releases what was set up.
    pub async fn start(&mut self) -> Result<(), ConsumerError> {
        if self.state != ConsumerState::Created {
            return Err(ConsumerError::AlreadyStarted {
                state: self.state().as_str(),
            });
        }
        self.state = ConsumerState::Starting;
        self.spawn_listener();
        self.publish(Event::new(EventKind::ConsumerStarting));

        let subscription = match self.client.subscribe(&self.target).await {
            Ok(subscription) => Arc::new(subscription),
            Err(err) => {
                self.publish(Event::new(EventKind::SubscribeFailed).with_reason(err.to_string()));
                return Err(err.into());
            }
        };
        self.publish(Event::new(EventKind::Subscribed).with_reason(format!(
            "stream={} durable={} subject={} handler={}",
            self.target.stream,
            self.target.durable,
            self.target.subject,
            self.handler.name()
        )));

        self.subscription = Some(Arc::clone(&subscription));
        self.spawn_pipeline(subscription);
        self.state = ConsumerState::Running;
        Ok(())
    }

    /// Unsubscribes, cancels the domain and waits for every task to exit.
    ///
    /// Never fails. Tasks still running after [`ConsumerConfig::grace`] are aborted.
    pub async fn close(&mut self) {
        if self.state == ConsumerState::Closed {
            return;
        }
        self.state = ConsumerState::Closing;
        self.publish(Event::new(EventKind::CloseRequested));

        self.unsubscribe().await;
        if self.domain.cancel(StopCause::Closed) {
            self.publish(Event::new(EventKind::DomainCancelled).with_reason(StopCause::Closed.to_string()));
        }
        self.join_with_grace().await;

        self.domain.mark_stopped();
        let mut closed = Event::new(EventKind::ConsumerClosed);
        if let Some(cause) = self.domain.cause() {
            closed = closed.with_reason(cause.to_string());
        }
        self.publish(closed);
        self.state = ConsumerState::Closed;

        if let Some(mut listener) = self.listener.take() {
            if time::timeout(SUBSCRIBER_DRAIN, &mut listener).await.is_err() {
                listener.abort();
            }
        }
    }

    /// Current lifecycle state.
    ///
    /// Reports `Closing` as soon as the domain is cancelled, even before `close()`.
    pub fn state(&self) -> ConsumerState {
        match self.state {
            ConsumerState::Running if self.domain.is_cancelled() => ConsumerState::Closing,
            state => state,
        }
    }

    /// First reason the pipeline stopped, if it did.
    ///
    /// `close()` unsubscribes before it cancels. With a subscription that wakes
    /// blocked fetchers on unsubscribe, a poller on another thread can observe the
    /// inactive subscription first, so an owner-initiated close may report
    /// [`StopCause::SubscriptionInactive`] instead of [`StopCause::Closed`]. Both
    /// are clean stops; only [`StopCause::Failed`] means the pipeline broke.
    pub fn cause(&self) -> Option<&StopCause> {
        self.domain.cause()
    }

    /// Resolves once the pipeline stops on its own (failure, inactive subscription)
    /// or `close()` begins.
    pub async fn cancelled(&self) {
        self.domain.cancelled().await
    }

    /// A receiver observing every event published from now on.
    pub fn events(&self) -> broadcast::Receiver<Event> {
        self.bus.subscribe()
    }

    /// Effective configuration.
    pub fn config(&self) -> &ConsumerConfig {
        &self.cfg
    }

    /// Pipeline tasks currently alive, as seen by the event listener.
    pub async fn alive_tasks(&self) -> Vec<AliveTask> {
        self.alive.snapshot().await
    }

    fn publish(&self, ev: Event) {
        self.bus.publish(ev.with_task(Arc::clone(&self.name)));
    }

    fn spawn_listener(&mut self) {
        let mut rx = self.bus.subscribe();
        let subs = SubscriberSet::new(std::mem::take(&mut self.subscribers), self.bus.clone());
        let alive = Arc::clone(&self.alive);
        let listener = format!("{}-listener", self.name);

        self.listener = Some(tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(ev) => {
                        alive.update(&ev).await;
                        subs.emit(&ev);
                        if ev.kind == EventKind::ConsumerClosed {
                            break;
                        }
                    }
                    // Not republished: on a full bus that would evict yet another event.
                    Err(RecvError::Lagged(skipped)) => {
                        subs.emit(&Event::listener_lagged(&listener, skipped));
                    }
                    Err(RecvError::Closed) => break,
                }
            }
            subs.shutdown().await;
        }));
    }

    fn spawn_pipeline(&mut self, subscription: Arc<C::Subscription>) {
        let workers = self.cfg.workers_clamped();
        let fetch_timeout = self.cfg.fetch_timeout_clamped();

        match self.cfg.dispatch {
            Dispatch::Handoff => {
                let buffer = HandoffBuffer::new(workers);
                let ctx = self.task_ctx(POLLER);
                let poller = Poller::new(subscription, buffer.clone(), fetch_timeout, ctx.clone());
                self.spawn_task(ctx, poller.run());

                for i in 1..=workers {
                    self.spawn_worker(i, Source::Handoff(buffer.clone()));
                }
            }
            Dispatch::Direct => {
                for i in 1..=workers {
                    let source = Source::Direct {
                        subscription: Arc::clone(&subscription),
                        fetch_timeout,
                    };
                    self.spawn_worker(i, source);
                }
            }
        }
    }

    fn spawn_worker(&mut self, index: usize, source: Source<C::Subscription>) {
        let ctx = self.task_ctx(format!("worker-{index}"));
        let worker = Worker::new(source, Arc::clone(&self.handler), ctx.clone());
        self.spawn_task(ctx, worker.run());
    }

    fn spawn_task<F>(&mut self, ctx: TaskContext, fut: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let guarded = async move {
            if let Err(payload) = AssertUnwindSafe(fut).catch_unwind().await {
                ctx.panicked(panic_message(&*payload));
            }
        };
        match &self.runtime {
            Some(handle) => {
                self.tasks.spawn_on(guarded, handle);
            }
            None => {
                self.tasks.spawn(guarded);
            }
        }
    }

    fn task_ctx(&self, name: impl Into<Arc<str>>) -> TaskContext {
        TaskContext::new(name, Arc::clone(&self.domain), self.bus.clone())
    }

    async fn unsubscribe(&self) {
        let Some(subscription) = &self.subscription else {
            return;
        };
        if !subscription.is_active() {
            return;
        }
        let reason = match time::timeout(self.cfg.grace, subscription.unsubscribe()).await {
            Ok(Ok(())) => return,
            Ok(Err(err)) if err.is_benign() => return,
            Ok(Err(err)) => err.to_string(),
            Err(_) => format!("unsubscribe timed out after {:?}", self.cfg.grace),
        };
        self.publish(Event::new(EventKind::UnsubscribeFailed).with_reason(reason));
    }

    async fn join_with_grace(&mut self) {
        let grace = self.cfg.grace;
        let done = async { while self.tasks.join_next().await.is_some() {} };

        if time::timeout(grace, done).await.is_ok() {
            self.publish(Event::new(EventKind::AllStoppedWithin));
            return;
        }

        let stuck: Vec<String> = self
            .alive
            .snapshot()
            .await
            .iter()
            .map(ToString::to_string)
            .collect();
        self.publish(
            Event::new(EventKind::GraceExceeded)
                .with_reason(format!("grace={grace:?} stuck=[{}]", stuck.join(", "))),
        );
        self.tasks.shutdown().await;
    }
}

impl<C: QueueClient> Drop for Consumer<C> {
    fn drop(&mut self) {
        // Dropping the JoinSet aborts the pipeline tasks.
        self.domain.cancel(StopCause::Closed);
        if let Some(listener) = self.listener.take() {
            listener.abort();
        }
    }
}
