//! Bridging sequencer state to the external screen router.
//!
//! The router is reached through [`Navigator`]. It may not be mounted when the
//! sequencer first publishes a step, so [`drive_navigation`] waits on a
//! [`ReadinessGate`] and on step changes, and delivers each published step
//! exactly once. A step that is replaced while waiting is dropped.

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::core::types::StepId;
use crate::io::store::KeyValueStore;
use crate::sequencer::Sequencer;

/// External screen router.
pub trait Navigator: Send + Sync {
    /// Show the screen for `step`.
    fn navigate(&self, step: StepId);
}

/// Shared flag raised once the router can accept navigation commands.
#[derive(Debug, Clone)]
pub struct ReadinessGate {
    ready: Arc<watch::Sender<bool>>,
}

impl Default for ReadinessGate {
    fn default() -> Self {
        Self::new()
    }
}

impl ReadinessGate {
    pub fn new() -> Self {
        let (ready, _) = watch::channel(false);
        Self {
            ready: Arc::new(ready),
        }
    }

    pub fn mark_ready(&self) {
        self.ready.send_if_modified(|ready| !std::mem::replace(ready, true));
    }

    pub fn mark_unready(&self) {
        self.ready.send_if_modified(|ready| std::mem::replace(ready, false));
    }

    pub fn is_ready(&self) -> bool {
        *self.ready.borrow()
    }

    /// Resolve once the gate is open. Returns immediately if it already is.
    pub async fn wait_ready(&self) {
        let mut rx = self.ready.subscribe();
        // The sender lives as long as `self`, so this cannot observe a close.
        let _ = rx.wait_for(|ready| *ready).await;
    }
}

/// Deliver every published step to the navigator once the router is ready.
///
/// Runs until the surrounding task is aborted. A published `Finished` is
/// completed here rather than navigated to.
pub async fn drive_navigation<S, N>(sequencer: &Sequencer<S, N>)
where
    S: KeyValueStore,
    N: Navigator,
{
    let mut steps = sequencer.subscribe();
    let readiness = sequencer.readiness().clone();
    loop {
        let pending = *steps.borrow_and_update();
        if let Some(step) = pending {
            let superseded = tokio::select! {
                biased;
                changed = steps.changed() => {
                    if changed.is_err() {
                        return;
                    }
                    true
                }
                () = readiness.wait_ready() => steps.has_changed().unwrap_or(true),
            };
            if superseded {
                debug!(%step, "pending navigation superseded");
                continue;
            }
            sequencer.deliver(step).await;
        }
        if steps.changed().await.is_err() {
            return;
        }
    }
}

/// Handle to a spawned [`drive_navigation`] task. Dropping it cancels the task.
#[derive(Debug)]
pub struct AutoNavigation {
    handle: JoinHandle<()>,
}

impl AutoNavigation {
    pub fn spawn<S, N>(sequencer: Arc<Sequencer<S, N>>) -> Self
    where
        S: KeyValueStore + 'static,
        N: Navigator + 'static,
    {
        let handle = tokio::spawn(async move { drive_navigation(&sequencer).await });
        Self { handle }
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Stop delivering navigation commands, e.g. when the flow unmounts.
    pub fn cancel(self) {
        self.handle.abort();
    }
}

impl Drop for AutoNavigation {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
