//! # Fan-out of consumer events to subscribers.
//!
//! ```text
//! listener ── emit(&Event) ──┬─ interested? ─► [queue: LogWriter] ─► task ─► on_event
//!                            ├─ interested? ─► [queue: custom]    ─► task ─► on_event
//!                            └─ full / closed ─► Bus: SubscriberOverflow
//! ```
//!
//! `emit` only does `try_send`, so the listener (and through it the bus) never
//! waits on a subscriber. Each subscriber sees its events in publish order;
//! there is no ordering between different subscribers.

use std::sync::Arc;

use futures::FutureExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::core::panic_message;
use crate::events::{Bus, Event, EventKind};
use crate::subscribers::Subscribe;

struct Lane {
    sub: Arc<dyn Subscribe>,
    tx: mpsc::Sender<Arc<Event>>,
}

/// Per-subscriber queues plus the tasks draining them.
pub struct SubscriberSet {
    lanes: Vec<Lane>,
    drains: Vec<JoinHandle<()>>,
    bus: Bus,
}

impl SubscriberSet {
    /// Spawns one draining task per subscriber on the current runtime.
    ///
    /// Panics inside a subscriber are reported on `bus` as `SubscriberPanicked`.
    #[must_use]
    pub fn new(subs: Vec<Arc<dyn Subscribe>>, bus: Bus) -> Self {
        let mut lanes = Vec::with_capacity(subs.len());
        let mut drains = Vec::with_capacity(subs.len());

        for sub in subs {
            let (tx, rx) = mpsc::channel(sub.queue_capacity().max(1));
            drains.push(tokio::spawn(drain(Arc::clone(&sub), rx, bus.clone())));
            lanes.push(Lane { sub, tx });
        }
        Self { lanes, drains, bus }
    }

    /// Queues `event` for every interested subscriber without waiting.
    ///
    /// A full or closed queue drops the event for that subscriber and publishes
    /// `SubscriberOverflow` (except for overflow events themselves).
    pub fn emit(&self, event: &Event) {
        let shared = Arc::new(event.clone());
        for lane in &self.lanes {
            if !lane.sub.interested(event.kind) {
                continue;
            }
            let reason = match lane.tx.try_send(Arc::clone(&shared)) {
                Ok(()) => continue,
                Err(mpsc::error::TrySendError::Full(_)) => "full",
                Err(mpsc::error::TrySendError::Closed(_)) => "closed",
            };
            if event.kind != EventKind::SubscriberOverflow {
                self.bus
                    .publish(Event::subscriber_overflow(lane.sub.name(), reason));
            }
        }
    }

    /// Number of subscribers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lanes.len()
    }

    /// True if there are no subscribers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lanes.is_empty()
    }

    /// Closes every queue and waits until the queued events were handled.
    pub async fn shutdown(self) {
        drop(self.lanes);
        for drain in self.drains {
            let _ = drain.await;
        }
    }
}

async fn drain(sub: Arc<dyn Subscribe>, mut rx: mpsc::Receiver<Arc<Event>>, bus: Bus) {
    while let Some(ev) = rx.recv().await {
        let handled = std::panic::AssertUnwindSafe(sub.on_event(&ev))
            .catch_unwind()
            .await;
        if let Err(payload) = handled {
            bus.publish(Event::subscriber_panicked(sub.name(), panic_message(&*payload)));
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;

    #[derive(Default)]
    struct Recorder {
        kinds: Mutex<Vec<EventKind>>,
        lifecycle_only: bool,
    }

    #[async_trait]
    impl Subscribe for Recorder {
        async fn on_event(&self, event: &Event) {
            self.kinds.lock().unwrap().push(event.kind);
        }

        fn interested(&self, kind: EventKind) -> bool {
            !self.lifecycle_only || !kind.is_message()
        }

        fn name(&self) -> &'static str {
            "recorder"
        }
    }

    struct Panicky;

    #[async_trait]
    impl Subscribe for Panicky {
        async fn on_event(&self, _event: &Event) {
            panic!("subscriber exploded");
        }

        fn name(&self) -> &'static str {
            "panicky"
        }
    }

    #[tokio::test]
    async fn test_fifo_delivery_and_drain_on_shutdown() {
        let bus = Bus::new(16);
        let recorder = Arc::new(Recorder::default());
        let set = SubscriberSet::new(vec![recorder.clone()], bus);

        set.emit(&Event::new(EventKind::MessageFetched));
        set.emit(&Event::new(EventKind::MessageHandedOff));
        set.emit(&Event::new(EventKind::MessageAcked));
        set.shutdown().await;

        assert_eq!(
            *recorder.kinds.lock().unwrap(),
            vec![
                EventKind::MessageFetched,
                EventKind::MessageHandedOff,
                EventKind::MessageAcked
            ]
        );
    }

    #[tokio::test]
    async fn test_uninterested_events_are_not_queued() {
        let bus = Bus::new(16);
        let recorder = Arc::new(Recorder {
            lifecycle_only: true,
            ..Recorder::default()
        });
        let set = SubscriberSet::new(vec![recorder.clone()], bus);

        set.emit(&Event::new(EventKind::TaskStarting));
        set.emit(&Event::new(EventKind::MessageAcked));
        set.emit(&Event::new(EventKind::TaskStopped));
        set.shutdown().await;

        assert_eq!(
            *recorder.kinds.lock().unwrap(),
            vec![EventKind::TaskStarting, EventKind::TaskStopped]
        );
    }

    #[tokio::test]
    async fn test_panic_is_reported_on_bus() {
        let bus = Bus::new(16);
        let mut rx = bus.subscribe();
        let set = SubscriberSet::new(vec![Arc::new(Panicky)], bus);

        set.emit(&Event::new(EventKind::TaskStarting));
        set.shutdown().await;

        let ev = rx.recv().await.unwrap();
        assert_eq!(ev.kind, EventKind::SubscriberPanicked);
        assert_eq!(ev.task.as_deref(), Some("panicky"));
        assert_eq!(ev.reason.as_deref(), Some("subscriber exploded"));
    }
}
