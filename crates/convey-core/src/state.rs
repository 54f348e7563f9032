//! Attach/detach state machine.
//!
//! Two phases: `Detached` (initial and post-dispose) and `Attached`, which
//! additionally tracks whether the source is still running. The state is
//! owned exclusively by the console and replaced, never mutated in place, on
//! every transition. Disposing an attached state cancels the forwarding task
//! registered on the source.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio_util::sync::CancellationToken;

use crate::source::OutputSource;

pub(crate) enum ConsoleState {
    Detached,
    Attached {
        source: Arc<dyn OutputSource>,
        /// Flipped to false by the forwarding task when the source reports
        /// termination.
        running: Arc<AtomicBool>,
        /// Stops the forwarding task on detach.
        forwarder: CancellationToken,
        /// Cancelled once the source is gone for any reason (termination,
        /// stream closure, detach); `wait_terminated` awaits it.
        terminated: CancellationToken,
    },
}

impl ConsoleState {
    pub(crate) fn is_attached(&self) -> bool {
        matches!(self, ConsoleState::Attached { .. })
    }

    pub(crate) fn is_running(&self) -> bool {
        match self {
            ConsoleState::Detached => false,
            ConsoleState::Attached { running, .. } => running.load(Ordering::Acquire),
        }
    }

    /// Tears down an attached state; idempotent on `Detached`.
    pub(crate) fn detach(&mut self) {
        if let ConsoleState::Attached {
            forwarder,
            terminated,
            ..
        } = std::mem::replace(self, ConsoleState::Detached)
        {
            forwarder.cancel();
            terminated.cancel();
        }
    }

    /// Token that resolves when the attached source is gone; `None` while
    /// detached (there is nothing to wait for).
    pub(crate) fn terminated(&self) -> Option<CancellationToken> {
        match self {
            ConsoleState::Detached => None,
            ConsoleState::Attached { terminated, .. } => Some(terminated.clone()),
        }
    }

    pub(crate) fn source(&self) -> Option<&Arc<dyn OutputSource>> {
        match self {
            ConsoleState::Detached => None,
            ConsoleState::Attached { source, .. } => Some(source),
        }
    }
}
