//! Typed side-channel flags shared between the wizard screens and the sequencer.
//!
//! Each flag lives under its own historical key so older builds and other
//! screens keep reading the same storage. A missing or unparseable flag reads
//! as "not set", which always selects the un-skipped path.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use tracing::{debug, warn};

use super::step_slot::StepSlot;
use super::store::{KeyValueStore, StoreError};
use crate::core::transitions::SkipFlags;
use crate::core::types::StepId;

pub const MISSED_WORKOUTS_KEY: &str = "previousPlanHadMissedWorkouts";
pub const NAVIGATING_BACKWARD_KEY: &str = "navigatingBackward";
pub const COMPLETED_KEY: &str = "checkinCompleted";
pub const LAST_COMPLETED_KEY: &str = "lastCheckinCompleted";
pub const ACTIVE_PLAN_KEY: &str = "hasActivePlan";

/// Snapshot of every side-channel flag.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CheckInSession {
    pub previous_plan_had_missed_workouts: Option<bool>,
    pub navigating_backward: bool,
    pub checkin_completed: bool,
    pub last_checkin_completed: Option<DateTime<Utc>>,
    pub has_active_plan: bool,
}

impl CheckInSession {
    pub fn skip_flags(&self) -> SkipFlags {
        SkipFlags {
            previous_plan_had_missed_workouts: self.previous_plan_had_missed_workouts,
        }
    }
}

/// Typed accessors for the flag keys of a [`KeyValueStore`].
pub struct SessionFlags<'a, S: ?Sized> {
    store: &'a S,
}

impl<'a, S: KeyValueStore + ?Sized> SessionFlags<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    pub async fn load(&self) -> Result<CheckInSession, StoreError> {
        Ok(CheckInSession {
            previous_plan_had_missed_workouts: self.read_bool(MISSED_WORKOUTS_KEY).await?,
            navigating_backward: self.read_bool(NAVIGATING_BACKWARD_KEY).await? == Some(true),
            checkin_completed: self.read_bool(COMPLETED_KEY).await? == Some(true),
            last_checkin_completed: self.last_completed().await?,
            has_active_plan: self.read_bool(ACTIVE_PLAN_KEY).await? == Some(true),
        })
    }

    /// Only the flags the transition rules consult.
    pub async fn skip_flags(&self) -> Result<SkipFlags, StoreError> {
        Ok(SkipFlags {
            previous_plan_had_missed_workouts: self.read_bool(MISSED_WORKOUTS_KEY).await?,
        })
    }

    pub async fn record_missed_workouts(&self, had_missed: bool) -> Result<(), StoreError> {
        self.write_bool(MISSED_WORKOUTS_KEY, had_missed).await
    }

    /// Record the outcome of reviewing last week's plan.
    pub async fn record_missed_workout_count(&self, missed: usize) -> Result<(), StoreError> {
        self.record_missed_workouts(missed > 0).await
    }

    pub async fn mark_navigating_backward(&self) -> Result<(), StoreError> {
        self.write_bool(NAVIGATING_BACKWARD_KEY, true).await
    }

    /// Read and clear the backward-navigation marker in one call.
    pub async fn take_navigating_backward(&self) -> Result<bool, StoreError> {
        let marked = self.read_bool(NAVIGATING_BACKWARD_KEY).await? == Some(true);
        if marked {
            self.store.remove(NAVIGATING_BACKWARD_KEY).await?;
        }
        Ok(marked)
    }

    pub async fn mark_completed(&self, at: DateTime<Utc>) -> Result<(), StoreError> {
        self.write_bool(COMPLETED_KEY, true).await?;
        self.store
            .set(
                LAST_COMPLETED_KEY,
                &at.to_rfc3339_opts(SecondsFormat::Millis, true),
            )
            .await
    }

    pub async fn clear_active_plan(&self) -> Result<(), StoreError> {
        self.store.remove(ACTIVE_PLAN_KEY).await
    }

    /// A check-in counts as completed when the completion flag is set or an
    /// older build left `Finished` in the step slot.
    pub async fn is_checkin_completed(&self) -> Result<bool, StoreError> {
        if StepSlot::new(self.store).load().await? == Some(StepId::Finished) {
            return Ok(true);
        }
        Ok(self.read_bool(COMPLETED_KEY).await? == Some(true))
    }

    async fn last_completed(&self) -> Result<Option<DateTime<Utc>>, StoreError> {
        let Some(raw) = self.store.get(LAST_COMPLETED_KEY).await? else {
            return Ok(None);
        };
        match DateTime::parse_from_rfc3339(&raw) {
            Ok(at) => Ok(Some(at.with_timezone(&Utc))),
            Err(err) => {
                warn!(key = LAST_COMPLETED_KEY, error = %err, "ignoring unparseable timestamp");
                Ok(None)
            }
        }
    }

    async fn read_bool(&self, key: &str) -> Result<Option<bool>, StoreError> {
        let raw = self.store.get(key).await?;
        Ok(raw.as_deref().and_then(|value| parse_flag(key, value)))
    }

    async fn write_bool(&self, key: &str, value: bool) -> Result<(), StoreError> {
        debug!(key, value, "writing session flag");
        self.store.set(key, if value { "true" } else { "false" }).await
    }
}

fn parse_flag(key: &str, raw: &str) -> Option<bool> {
    match raw.trim() {
        "true" => Some(true),
        "false" => Some(false),
        other => {
            warn!(key, value = other, "ignoring unparseable session flag");
            None
        }
    }
}
