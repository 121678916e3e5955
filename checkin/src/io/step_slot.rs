//! The single persisted key that records where an interrupted flow resumes.

use tracing::{debug, warn};

use super::store::{KeyValueStore, StoreError};
use crate::core::types::StepId;

/// Storage key holding the resumable step.
pub const STEP_KEY: &str = "checkinProgress";

/// Typed view over the step key of a [`KeyValueStore`].
pub struct StepSlot<'a, S: ?Sized> {
    store: &'a S,
}

impl<'a, S: KeyValueStore + ?Sized> StepSlot<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Load the persisted step. Unknown values read as absent.
    pub async fn load(&self) -> Result<Option<StepId>, StoreError> {
        let Some(raw) = self.store.get(STEP_KEY).await? else {
            debug!("no persisted check-in step");
            return Ok(None);
        };
        match raw.parse::<StepId>() {
            Ok(step) => {
                debug!(%step, "persisted check-in step loaded");
                Ok(Some(step))
            }
            Err(err) => {
                warn!(error = %err, "ignoring persisted check-in step");
                Ok(None)
            }
        }
    }

    pub async fn save(&self, step: StepId) -> Result<(), StoreError> {
        debug!(%step, "persisting check-in step");
        self.store.set(STEP_KEY, step.as_str()).await
    }

    pub async fn clear(&self) -> Result<(), StoreError> {
        debug!("clearing persisted check-in step");
        self.store.remove(STEP_KEY).await
    }
}
