//! Shutdown coordination.
//!
//! # Responsibilities
//! - Broadcast "stop accepting" to every listener task
//! - Run plugin shutdown actions in registration order
//!
//! # Design Decisions
//! - Actions run one at a time; the next starts only after the previous
//!   one has completed (or timed out)
//! - A timed-out action is logged and abandoned, never retried

use std::time::Duration;

use tokio::sync::broadcast;

use crate::plugin::ShutdownAction;

/// Coordinator for graceful shutdown.
///
/// Provides a broadcast channel that all listener tasks subscribe to.
pub struct Shutdown {
    tx: broadcast::Sender<()>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    /// Trigger the shutdown signal.
    pub fn trigger(&self) {
        let _ = self.tx.send(());
    }

    /// Number of tasks still listening.
    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

/// Plugin shutdown actions, in the order their mounts were registered.
#[derive(Default)]
pub struct ShutdownActions {
    actions: Vec<(String, ShutdownAction)>,
}

impl ShutdownActions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, web_path: impl Into<String>, action: ShutdownAction) {
        self.actions.push((web_path.into(), action));
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn web_paths(&self) -> Vec<&str> {
        self.actions.iter().map(|(path, _)| path.as_str()).collect()
    }

    /// Await every action in order. `timeout` bounds each action separately.
    pub async fn run_all(self, timeout: Option<Duration>) {
        for (web_path, action) in self.actions {
            tracing::info!(web_path = %web_path, "Shutting down application");
            let fut = action();
            match timeout {
                Some(limit) => {
                    if tokio::time::timeout(limit, fut).await.is_err() {
                        tracing::warn!(
                            web_path = %web_path,
                            timeout = ?limit,
                            "Shutdown action timed out; moving on"
                        );
                    }
                }
                None => fut.await,
            }
        }
    }
}

impl std::fmt::Debug for ShutdownActions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShutdownActions")
            .field("web_paths", &self.web_paths())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::FutureExt;
    use std::sync::{Arc, Mutex};

    fn recorder(log: &Arc<Mutex<Vec<String>>>, name: &'static str, delay_ms: u64) -> ShutdownAction {
        let log = log.clone();
        Box::new(move || {
            async move {
                log.lock().unwrap().push(format!("{name}:start"));
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                log.lock().unwrap().push(format!("{name}:end"));
            }
            .boxed()
        })
    }

    #[tokio::test]
    async fn test_actions_run_sequentially_in_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut actions = ShutdownActions::new();
        actions.push("/a", recorder(&log, "A", 30));
        actions.push("/b", recorder(&log, "B", 10));
        actions.push("/c", recorder(&log, "C", 0));
        assert_eq!(actions.web_paths(), vec!["/a", "/b", "/c"]);

        actions.run_all(None).await;

        assert_eq!(
            *log.lock().unwrap(),
            vec!["A:start", "A:end", "B:start", "B:end", "C:start", "C:end"]
        );
    }

    #[tokio::test]
    async fn test_timed_out_action_does_not_block_the_rest() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut actions = ShutdownActions::new();
        actions.push("/slow", recorder(&log, "slow", 10_000));
        actions.push("/fast", recorder(&log, "fast", 0));

        actions.run_all(Some(Duration::from_millis(50))).await;

        assert_eq!(*log.lock().unwrap(), vec!["slow:start", "fast:start", "fast:end"]);
    }

    #[tokio::test]
    async fn test_trigger_reaches_subscribers() {
        let shutdown = Shutdown::new();
        let mut rx = shutdown.subscribe();
        assert_eq!(shutdown.receiver_count(), 1);
        shutdown.trigger();
        assert!(rx.recv().await.is_ok());
    }
}
