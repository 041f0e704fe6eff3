//! Lifecycle states and their legal transitions.

use std::fmt;

use tokio::sync::watch;

/// Where the host is in its run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Booting,
    Discovering,
    Serving,
    ShuttingDown,
    Terminated,
}

impl LifecycleState {
    /// Only the forward step to the next state is legal.
    pub fn can_transition_to(self, next: LifecycleState) -> bool {
        use LifecycleState::*;
        matches!(
            (self, next),
            (Booting, Discovering) | (Discovering, Serving) | (Serving, ShuttingDown) | (ShuttingDown, Terminated)
        )
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LifecycleState::Booting => "booting",
            LifecycleState::Discovering => "discovering",
            LifecycleState::Serving => "serving",
            LifecycleState::ShuttingDown => "shutting-down",
            LifecycleState::Terminated => "terminated",
        };
        f.write_str(name)
    }
}

/// Current state, observable through a watch channel.
#[derive(Debug)]
pub struct StateTracker {
    tx: watch::Sender<LifecycleState>,
}

impl StateTracker {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(LifecycleState::Booting);
        Self { tx }
    }

    pub fn current(&self) -> LifecycleState {
        *self.tx.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<LifecycleState> {
        self.tx.subscribe()
    }

    /// Move to `next`. Illegal transitions are logged and ignored.
    pub fn advance(&self, next: LifecycleState) -> bool {
        let current = self.current();
        if !current.can_transition_to(next) {
            tracing::warn!(from = %current, to = %next, "Ignoring illegal lifecycle transition");
            return false;
        }
        self.tx.send_replace(next);
        tracing::debug!(from = %current, to = %next, "Lifecycle transition");
        true
    }
}

impl Default for StateTracker {
    fn default() -> Self {
        Self::new()
    }
}
