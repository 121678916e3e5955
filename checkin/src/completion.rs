//! Finalization of a check-in flow.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::io::session::SessionFlags;
use crate::io::step_slot::StepSlot;
use crate::io::store::{KeyValueStore, StoreError};

/// Callback supplied by the host to leave the check-in screens.
pub type ExitCallback = Arc<dyn Fn() + Send + Sync>;

/// Performs the side effects of finishing a flow.
///
/// The handler itself does not guard against running twice; the sequencer
/// latches completion before calling [`CompletionHandler::record`] and only
/// calls [`CompletionHandler::exit`] once the record is durable.
#[derive(Clone)]
pub struct CompletionHandler {
    on_exit: ExitCallback,
}

impl fmt::Debug for CompletionHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompletionHandler").finish_non_exhaustive()
    }
}

impl CompletionHandler {
    pub fn new(on_exit: ExitCallback) -> Self {
        Self { on_exit }
    }

    /// Clear the resumable step and record completion.
    ///
    /// Safe to repeat after a failure: every write is idempotent.
    pub async fn record<S: KeyValueStore + ?Sized>(
        &self,
        store: &S,
        completed_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        info!(%completed_at, "finishing check-in");
        StepSlot::new(store).clear().await?;

        let flags = SessionFlags::new(store);
        flags.mark_completed(completed_at).await?;
        if let Err(err) = flags.clear_active_plan().await {
            warn!(error = %err, "failed to reset active plan flag");
        }
        Ok(())
    }

    /// Leave the flow.
    pub fn exit(&self) {
        (self.on_exit)();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::io::session::{ACTIVE_PLAN_KEY, COMPLETED_KEY, LAST_COMPLETED_KEY};
    use crate::io::step_slot::STEP_KEY;
    use crate::io::store::MemoryStore;

    #[tokio::test]
    async fn record_clears_progress_and_marks_completion() {
        let exits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&exits);
        let handler = CompletionHandler::new(Arc::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        }));

        let store = MemoryStore::new();
        store.set(STEP_KEY, "ScheduleCheckIn").await.expect("set");
        store.set(ACTIVE_PLAN_KEY, "true").await.expect("set");

        handler.record(&store, Utc::now()).await.expect("record");
        assert_eq!(exits.load(Ordering::SeqCst), 0);
        handler.exit();

        let entries = store.snapshot();
        assert!(!entries.contains_key(STEP_KEY));
        assert!(!entries.contains_key(ACTIVE_PLAN_KEY));
        assert_eq!(entries.get(COMPLETED_KEY).map(String::as_str), Some("true"));
        assert!(entries.contains_key(LAST_COMPLETED_KEY));
        assert_eq!(exits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn record_can_be_repeated() {
        let handler = CompletionHandler::new(Arc::new(|| {}));
        let store = MemoryStore::new();
        let at = Utc::now();

        handler.record(&store, at).await.expect("record");
        let first = store.snapshot();
        handler.record(&store, at).await.expect("record again");
        assert_eq!(store.snapshot(), first);
    }
}
