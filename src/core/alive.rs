//! # Pipeline task tracker with sequence-based ordering.
//!
//! Keeps track of which pipeline tasks (poller, workers) are alive and which
//! message each worker is currently holding. Used by `close()` to name the
//! tasks that did not stop within the grace period.
//!
//! ```text
//! Bus ──► listener ──► AliveTracker::update(&Event)
//!                              │
//!                              ▼
//!                HashMap<task, { last_seq, alive, holding }>
//! ```
//!
//! ## Rules
//! - `TaskStarting` marks a task alive; `TaskStopped` / `TaskFailed` / `TaskPanicked` mark it dead.
//! - `MessageProcessing` records the held message; `MessageAcked` clears it.
//! - Events with `seq <= last_seq` for the same task are **rejected** (stale).
//! - Reads are eventually consistent with the bus.

use std::collections::HashMap;
use std::fmt;

use tokio::sync::RwLock;

use crate::events::{Event, EventKind};

#[derive(Debug, Clone, Default)]
struct TaskState {
    last_seq: u64,
    alive: bool,
    holding: Option<u64>,
}

/// A task that was alive at snapshot time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AliveTask {
    /// Task name (`poller`, `worker-3`, ...).
    pub name: String,
    /// Sequence number of the message the task was processing, if any.
    pub holding: Option<u64>,
}

impl fmt::Display for AliveTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.holding {
            Some(seq) => write!(f, "{}(seq={seq})", self.name),
            None => f.write_str(&self.name),
        }
    }
}

/// Thread-safe tracker of alive pipeline tasks.
#[derive(Debug, Default)]
pub(crate) struct AliveTracker {
    state: RwLock<HashMap<String, TaskState>>,
}

impl AliveTracker {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Applies `ev` if it is newer than the last event seen for its task.
    ///
    /// Returns `true` if the alive flag or the held message changed.
    pub(crate) async fn update(&self, ev: &Event) -> bool {
        let Some(name) = ev.task.as_deref() else {
            return false;
        };
        if !Self::tracked(ev.kind) {
            return false;
        }

        let mut state = self.state.write().await;
        let entry = state.entry(name.to_string()).or_default();
        if ev.seq <= entry.last_seq {
            return false;
        }
        entry.last_seq = ev.seq;

        match ev.kind {
            EventKind::TaskStarting => {
                entry.alive = true;
                entry.holding = None;
            }
            EventKind::TaskStopped | EventKind::TaskFailed | EventKind::TaskPanicked => {
                entry.alive = false;
                entry.holding = None;
            }
            EventKind::MessageProcessing => entry.holding = ev.sequence,
            EventKind::MessageAcked => entry.holding = None,
            _ => return false,
        }
        true
    }

    /// Alive tasks, sorted by name.
    pub(crate) async fn snapshot(&self) -> Vec<AliveTask> {
        let state = self.state.read().await;
        let mut alive: Vec<AliveTask> = state
            .iter()
            .filter(|(_, ts)| ts.alive)
            .map(|(name, ts)| AliveTask {
                name: name.clone(),
                holding: ts.holding,
            })
            .collect();
        alive.sort_unstable_by(|a, b| a.name.cmp(&b.name));
        alive
    }

    // Consumer-level and subscriber events share the `task` field but are not pipeline tasks.
    fn tracked(kind: EventKind) -> bool {
        matches!(
            kind,
            EventKind::TaskStarting
                | EventKind::TaskStopped
                | EventKind::TaskFailed
                | EventKind::TaskPanicked
                | EventKind::MessageProcessing
                | EventKind::MessageAcked
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ev(kind: EventKind, task: &str) -> Event {
        Event::new(kind).with_task(task)
    }

    #[tokio::test]
    async fn test_tracks_alive_and_held_message() {
        let alive = AliveTracker::new();
        alive.update(&ev(EventKind::TaskStarting, "poller")).await;
        alive.update(&ev(EventKind::TaskStarting, "worker-1")).await;
        alive
            .update(&ev(EventKind::MessageProcessing, "worker-1").with_message(7, 1))
            .await;

        assert_eq!(
            alive.snapshot().await,
            vec![
                AliveTask {
                    name: "poller".into(),
                    holding: None
                },
                AliveTask {
                    name: "worker-1".into(),
                    holding: Some(7)
                },
            ]
        );

        alive
            .update(&ev(EventKind::MessageAcked, "worker-1").with_message(7, 1))
            .await;
        alive.update(&ev(EventKind::TaskStopped, "poller")).await;
        let snap = alive.snapshot().await;
        assert_eq!(snap.len(), 1);
        assert_eq!(snap[0].to_string(), "worker-1");
    }

    #[tokio::test]
    async fn test_stale_events_rejected() {
        let alive = AliveTracker::new();
        let starting = ev(EventKind::TaskStarting, "worker-2");
        let stopped = ev(EventKind::TaskStopped, "worker-2");

        assert!(alive.update(&stopped).await);
        assert!(!alive.update(&starting).await);
        assert!(alive.snapshot().await.is_empty());
    }

    #[tokio::test]
    async fn test_consumer_events_ignored() {
        let alive = AliveTracker::new();
        assert!(!alive.update(&ev(EventKind::ConsumerStarting, "consumer")).await);
        assert!(!alive.update(&Event::new(EventKind::TaskStarting)).await);
        assert!(alive.snapshot().await.is_empty());
    }
}
