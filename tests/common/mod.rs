#![allow(dead_code)]

use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use pullvisor::{
    AckError, Event, EventKind, FetchError, Message, QueueClient, SubscribeError, Subscribe,
    Subscription, SubscriptionTarget, UnsubscribeError,
};

/// One scripted `fetch` outcome.
#[derive(Debug, Clone)]
pub enum Step {
    /// Deliver a message with this sequence number.
    Message(u64),
    /// Report the subscription as permanently inactive.
    Inactive,
    /// Fail with a transport error.
    Io(&'static str),
}

#[derive(Default)]
struct Shared {
    steps: Mutex<VecDeque<Step>>,
    acks: Mutex<Vec<u64>>,
    reject_acks: Mutex<HashSet<u64>>,
    subscribe_error: Mutex<Option<SubscribeError>>,
    unsubscribe_error: Mutex<Option<UnsubscribeError>>,
    inactive: AtomicBool,
    fetches: AtomicUsize,
    unsubscribes: AtomicUsize,
    outstanding: AtomicUsize,
    max_outstanding: AtomicUsize,
}

/// Queue client replaying a fixed script, then idling until each fetch times out.
#[derive(Clone, Default)]
pub struct ScriptedClient {
    shared: Arc<Shared>,
}

impl ScriptedClient {
    pub fn new(steps: impl IntoIterator<Item = Step>) -> Self {
        let client = Self::default();
        client.shared.steps.lock().unwrap().extend(steps);
        client
    }

    /// Messages `1..=n`.
    pub fn with_messages(n: u64) -> Self {
        Self::new((1..=n).map(Step::Message))
    }

    pub fn reject_ack(self, sequence: u64) -> Self {
        self.shared.reject_acks.lock().unwrap().insert(sequence);
        self
    }

    pub fn fail_subscribe(self, err: SubscribeError) -> Self {
        *self.shared.subscribe_error.lock().unwrap() = Some(err);
        self
    }

    pub fn fail_unsubscribe(self, err: UnsubscribeError) -> Self {
        *self.shared.unsubscribe_error.lock().unwrap() = Some(err);
        self
    }

    pub fn acks(&self) -> Vec<u64> {
        self.shared.acks.lock().unwrap().clone()
    }

    pub fn fetches(&self) -> usize {
        self.shared.fetches.load(Ordering::SeqCst)
    }

    pub fn unsubscribes(&self) -> usize {
        self.shared.unsubscribes.load(Ordering::SeqCst)
    }

    /// Highest number of fetched-but-unacked messages seen at once.
    pub fn max_outstanding(&self) -> usize {
        self.shared.max_outstanding.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl QueueClient for ScriptedClient {
    type Subscription = ScriptedSubscription;

    async fn subscribe(
        &self,
        _target: &SubscriptionTarget,
    ) -> Result<ScriptedSubscription, SubscribeError> {
        if let Some(err) = self.shared.subscribe_error.lock().unwrap().clone() {
            return Err(err);
        }
        Ok(ScriptedSubscription {
            shared: Arc::clone(&self.shared),
        })
    }
}

pub struct ScriptedSubscription {
    shared: Arc<Shared>,
}

#[async_trait]
impl Subscription for ScriptedSubscription {
    type Message = ScriptedMessage;

    async fn fetch(&self, _max: usize, timeout: Duration) -> Result<Vec<ScriptedMessage>, FetchError> {
        self.shared.fetches.fetch_add(1, Ordering::SeqCst);
        if self.shared.inactive.load(Ordering::SeqCst) {
            return Err(FetchError::Inactive);
        }

        let step = self.shared.steps.lock().unwrap().pop_front();
        match step {
            Some(Step::Message(sequence)) => {
                let now = self.shared.outstanding.fetch_add(1, Ordering::SeqCst) + 1;
                self.shared.max_outstanding.fetch_max(now, Ordering::SeqCst);
                Ok(vec![ScriptedMessage {
                    sequence,
                    shared: Arc::clone(&self.shared),
                }])
            }
            Some(Step::Inactive) => {
                self.shared.inactive.store(true, Ordering::SeqCst);
                Err(FetchError::Inactive)
            }
            Some(Step::Io(error)) => Err(FetchError::io(error)),
            None => {
                tokio::time::sleep(timeout).await;
                Ok(Vec::new())
            }
        }
    }

    fn is_active(&self) -> bool {
        !self.shared.inactive.load(Ordering::SeqCst)
    }

    async fn unsubscribe(&self) -> Result<(), UnsubscribeError> {
        self.shared.unsubscribes.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.shared.unsubscribe_error.lock().unwrap().clone() {
            return Err(err);
        }
        if self.shared.inactive.swap(true, Ordering::SeqCst) {
            return Err(UnsubscribeError::AlreadyUnsubscribed);
        }
        Ok(())
    }
}

#[derive(Debug)]
pub struct ScriptedMessage {
    sequence: u64,
    shared: Arc<Shared>,
}

#[async_trait]
impl Message for ScriptedMessage {
    fn sequence(&self) -> u64 {
        self.sequence
    }

    fn delivered(&self) -> u64 {
        1
    }

    async fn ack(&self) -> Result<(), AckError> {
        if self.shared.reject_acks.lock().unwrap().contains(&self.sequence) {
            return Err(AckError::new("ack rejected"));
        }
        self.shared.acks.lock().unwrap().push(self.sequence);
        self.shared.outstanding.fetch_sub(1, Ordering::SeqCst);
        Ok(())
    }
}

impl std::fmt::Debug for Shared {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Shared").finish_non_exhaustive()
    }
}

/// Subscriber recording every event it receives.
#[derive(Default)]
pub struct Recorder {
    events: Mutex<Vec<Event>>,
}

impl Recorder {
    pub fn kinds(&self) -> Vec<EventKind> {
        self.events.lock().unwrap().iter().map(|e| e.kind).collect()
    }

    pub fn count(&self, kind: EventKind) -> usize {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.kind == kind)
            .count()
    }

    pub fn reasons(&self, kind: EventKind) -> Vec<String> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.kind == kind)
            .filter_map(|e| e.reason.as_deref().map(str::to_string))
            .collect()
    }
}

#[async_trait]
impl Subscribe for Recorder {
    async fn on_event(&self, event: &Event) {
        self.events.lock().unwrap().push(event.clone());
    }

    fn name(&self) -> &'static str {
        "recorder"
    }
}

pub fn target() -> SubscriptionTarget {
    SubscriptionTarget::new("TEST-STREAM", "TEST-STREAM-C", "test.stream.foo")
}
