//! # Cancellation domain shared by the poller and all workers.
//!
//! ```text
//! Running ──cancel(cause)──► Cancelling ──mark_stopped()──► Stopped
//! ```
//!
//! ## Rules
//! - Transitions only move forward; nothing returns to `Running`.
//! - The **first** [`StopCause`] wins; later `cancel` calls only make sure the token fired.
//! - Every suspension point of the pipeline races against [`CancellationDomain::token`].

use std::fmt;
use std::sync::OnceLock;
use std::sync::atomic::{AtomicU8, Ordering};

use tokio_util::sync::CancellationToken;

use crate::error::PipelineError;

/// Observable state of a [`CancellationDomain`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DomainState {
    /// Tasks are running.
    Running,
    /// Cancellation fired; tasks are winding down.
    Cancelling,
    /// Every task has exited.
    Stopped,
}

const RUNNING: u8 = 0;
const CANCELLING: u8 = 1;
const STOPPED: u8 = 2;

/// Why a domain left `Running`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopCause {
    /// The owner called `close()`.
    Closed,
    /// The subscription reported it is permanently inactive.
    SubscriptionInactive,
    /// A task hit a fatal error.
    Failed(PipelineError),
}

impl StopCause {
    /// Whether the stop counts as a crash.
    pub fn is_failure(&self) -> bool {
        matches!(self, StopCause::Failed(_))
    }
}

impl fmt::Display for StopCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopCause::Closed => f.write_str("closed"),
            StopCause::SubscriptionInactive => f.write_str("subscription inactive"),
            StopCause::Failed(err) => write!(f, "failed: {err}"),
        }
    }
}

/// Shared stop signal plus forward-only state for one consumer instance.
#[derive(Debug)]
pub struct CancellationDomain {
    token: CancellationToken,
    state: AtomicU8,
    cause: OnceLock<StopCause>,
}

impl CancellationDomain {
    /// Creates a domain in the `Running` state.
    pub fn new() -> Self {
        Self {
            token: CancellationToken::new(),
            state: AtomicU8::new(RUNNING),
            cause: OnceLock::new(),
        }
    }

    /// Token observed by every suspension point of the pipeline.
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// Current state.
    pub fn state(&self) -> DomainState {
        match self.state.load(Ordering::Acquire) {
            RUNNING => DomainState::Running,
            CANCELLING => DomainState::Cancelling,
            _ => DomainState::Stopped,
        }
    }

    /// Whether cancellation has fired.
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Resolves once cancellation has fired.
    pub async fn cancelled(&self) {
        self.token.cancelled().await
    }

    /// First recorded stop cause.
    pub fn cause(&self) -> Option<&StopCause> {
        self.cause.get()
    }

    /// Moves the domain to `Cancelling` and fires the token.
    ///
    /// Returns `true` if this call recorded the stop cause.
    pub fn cancel(&self, cause: StopCause) -> bool {
        let recorded = self.cause.set(cause).is_ok();
        let _ = self
            .state
            .compare_exchange(RUNNING, CANCELLING, Ordering::AcqRel, Ordering::Acquire);
        self.token.cancel();
        recorded
    }

    /// Marks every task as exited. Implies cancellation.
    pub fn mark_stopped(&self) {
        self.token.cancel();
        self.state.store(STOPPED, Ordering::Release);
    }
}

impl Default for CancellationDomain {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FetchError;

    #[test]
    fn test_first_cause_wins() {
        let domain = CancellationDomain::new();
        assert_eq!(domain.state(), DomainState::Running);
        assert!(domain.cause().is_none());

        let failure = StopCause::Failed(PipelineError::Fetch {
            task: "poller".into(),
            source: FetchError::io("reset"),
        });
        assert!(domain.cancel(failure.clone()));
        assert!(!domain.cancel(StopCause::Closed));

        assert_eq!(domain.state(), DomainState::Cancelling);
        assert!(domain.is_cancelled());
        assert_eq!(domain.cause(), Some(&failure));
        assert!(domain.cause().is_some_and(StopCause::is_failure));
    }

    #[test]
    fn test_state_only_moves_forward() {
        let domain = CancellationDomain::new();
        domain.mark_stopped();
        assert_eq!(domain.state(), DomainState::Stopped);
        assert!(domain.is_cancelled());

        domain.cancel(StopCause::SubscriptionInactive);
        assert_eq!(domain.state(), DomainState::Stopped);
    }

    #[tokio::test]
    async fn test_cancelled_resolves_for_waiters() {
        let domain = std::sync::Arc::new(CancellationDomain::new());
        let waiter = {
            let domain = domain.clone();
            tokio::spawn(async move { domain.cancelled().await })
        };
        domain.cancel(StopCause::Closed);
        waiter.await.unwrap();
        assert_eq!(domain.cause(), Some(&StopCause::Closed));
    }
}
