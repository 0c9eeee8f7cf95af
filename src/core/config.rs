//! # Consumer configuration.
//!
//! Provides [`ConsumerConfig`] centralized settings for one consumer instance.
//!
//! ## Sentinel values
//! - `workers = 0` → clamped to 1 (a pipeline without workers never acks)
//! - `fetch_timeout = 0s` → clamped to 1ms (a zero timeout would spin the poller)

use std::time::Duration;

/// How fetched messages reach workers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Dispatch {
    /// One poller fetches and pushes onto a bounded hand-off buffer drained by the workers.
    #[default]
    Handoff,
    /// Every worker fetches for itself; no poller, no hand-off buffer.
    Direct,
}

/// Configuration for a [`Consumer`](crate::Consumer).
///
/// ## Field semantics
/// - `workers`: size of the worker pool (hand-off capacity equals this value)
/// - `fetch_timeout`: upper bound of a single blocking fetch
/// - `grace`: how long `close()` waits for tasks before aborting them
/// - `bus_capacity`: event bus ring buffer size (min 1; clamped by Bus)
/// - `dispatch`: [`Dispatch::Handoff`] or [`Dispatch::Direct`]
#[derive(Clone, Debug)]
pub struct ConsumerConfig {
    /// Name used for the consumer's own events (close, unsubscribe, grace).
    pub name: String,

    /// Number of workers processing messages concurrently.
    pub workers: usize,

    /// Maximum time a single fetch may block waiting for a message.
    ///
    /// This is the only operation in the pipeline that carries a timeout.
    pub fetch_timeout: Duration,

    /// Maximum time `close()` waits for the poller and workers to exit.
    ///
    /// Tasks still running afterwards (a handler that hangs) are aborted and
    /// reported through `GraceExceeded`.
    pub grace: Duration,

    /// Capacity of the event bus broadcast channel ring buffer.
    pub bus_capacity: usize,

    /// Dispatch strategy.
    pub dispatch: Dispatch,
}

impl ConsumerConfig {
    /// Returns the worker count clamped to a minimum of 1.
    #[inline]
    pub fn workers_clamped(&self) -> usize {
        self.workers.max(1)
    }

    /// Number of long-lived pipeline tasks (workers plus the poller, if any).
    ///
    /// Size a dedicated runtime with this many threads.
    #[inline]
    pub fn pool_size(&self) -> usize {
        match self.dispatch {
            Dispatch::Handoff => self.workers_clamped() + 1,
            Dispatch::Direct => self.workers_clamped(),
        }
    }

    /// Returns the fetch timeout clamped to a minimum of 1ms.
    #[inline]
    pub fn fetch_timeout_clamped(&self) -> Duration {
        self.fetch_timeout.max(Duration::from_millis(1))
    }
}

impl Default for ConsumerConfig {
    /// Default configuration:
    ///
    /// - `name = "consumer"`
    /// - `workers = 4`
    /// - `fetch_timeout = 5s`
    /// - `grace = 30s`
    /// - `bus_capacity = 1024`
    /// - `dispatch = Dispatch::Handoff`
    fn default() -> Self {
        Self {
            name: "consumer".to_string(),
            workers: 4,
            fetch_timeout: Duration::from_secs(5),
            grace: Duration::from_secs(30),
            bus_capacity: 1024,
            dispatch: Dispatch::Handoff,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_size_counts_poller() {
        let cfg = ConsumerConfig::default();
        assert_eq!(cfg.pool_size(), 5);

        let direct = ConsumerConfig {
            dispatch: Dispatch::Direct,
            ..ConsumerConfig::default()
        };
        assert_eq!(direct.pool_size(), 4);
    }

    #[test]
    fn test_sentinels_are_clamped() {
        let cfg = ConsumerConfig {
            workers: 0,
            fetch_timeout: Duration::ZERO,
            ..ConsumerConfig::default()
        };
        assert_eq!(cfg.workers_clamped(), 1);
        assert_eq!(cfg.pool_size(), 2);
        assert_eq!(cfg.fetch_timeout_clamped(), Duration::from_millis(1));
    }
}
