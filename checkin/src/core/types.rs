//! Shared deterministic types for the check-in core.
//!
//! These types define the stable vocabulary of the wizard. They carry no I/O
//! and their string forms are persisted, so renaming a variant is a storage
//! migration.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// One screen of the weekly check-in wizard.
///
/// The canonical persisted form is the variant name. Earlier app builds wrote
/// a `CheckIn`-prefixed name for some screens; those still parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StepId {
    #[serde(alias = "CheckInWelcome")]
    Welcome,
    #[serde(alias = "CheckInMissedWorkouts")]
    MissedWorkouts,
    #[serde(alias = "CheckInAmbientProgress")]
    AmbientProgress,
    #[serde(alias = "CheckInHealth")]
    Health,
    #[serde(alias = "CheckInCompareGoal")]
    CompareGoal,
    #[serde(alias = "CheckInNewGoal")]
    NewGoal,
    PlanCreation,
    #[serde(alias = "CheckInChat")]
    Chat,
    ScheduleCheckIn,
    RescheduleCheckIn,
    /// Terminal sentinel. Reaching it completes the flow; it is never a
    /// resting state.
    Finished,
}

pub const ALL_STEPS: [StepId; 11] = [
    StepId::Welcome,
    StepId::MissedWorkouts,
    StepId::AmbientProgress,
    StepId::Health,
    StepId::CompareGoal,
    StepId::NewGoal,
    StepId::PlanCreation,
    StepId::Chat,
    StepId::ScheduleCheckIn,
    StepId::RescheduleCheckIn,
    StepId::Finished,
];

impl StepId {
    pub fn as_str(self) -> &'static str {
        match self {
            StepId::Welcome => "Welcome",
            StepId::MissedWorkouts => "MissedWorkouts",
            StepId::AmbientProgress => "AmbientProgress",
            StepId::Health => "Health",
            StepId::CompareGoal => "CompareGoal",
            StepId::NewGoal => "NewGoal",
            StepId::PlanCreation => "PlanCreation",
            StepId::Chat => "Chat",
            StepId::ScheduleCheckIn => "ScheduleCheckIn",
            StepId::RescheduleCheckIn => "RescheduleCheckIn",
            StepId::Finished => "Finished",
        }
    }

    fn from_legacy_name(raw: &str) -> Option<Self> {
        match raw {
            "CheckInWelcome" => Some(StepId::Welcome),
            "CheckInMissedWorkouts" => Some(StepId::MissedWorkouts),
            "CheckInAmbientProgress" => Some(StepId::AmbientProgress),
            "CheckInHealth" => Some(StepId::Health),
            "CheckInCompareGoal" => Some(StepId::CompareGoal),
            "CheckInNewGoal" => Some(StepId::NewGoal),
            "CheckInChat" => Some(StepId::Chat),
            _ => None,
        }
    }
}

impl fmt::Display for StepId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raised when a string names no known step.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown check-in step `{0}`")]
pub struct UnknownStep(pub String);

impl FromStr for StepId {
    type Err = UnknownStep;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let trimmed = raw.trim();
        ALL_STEPS
            .iter()
            .copied()
            .find(|step| step.as_str() == trimmed)
            .or_else(|| StepId::from_legacy_name(trimmed))
            .ok_or_else(|| UnknownStep(raw.to_string()))
    }
}

/// Experiment condition that selects the active flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Arm {
    #[default]
    Control,
    Treatment,
}

impl Arm {
    /// Map the auth provider's `isControl` flag onto an arm.
    pub fn from_is_control(is_control: bool) -> Self {
        if is_control {
            Arm::Control
        } else {
            Arm::Treatment
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Arm::Control => "control",
            Arm::Treatment => "treatment",
        }
    }
}

impl fmt::Display for Arm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Arm {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "control" => Ok(Arm::Control),
            "treatment" => Ok(Arm::Treatment),
            other => Err(format!(
                "invalid arm `{other}`; valid values: control, treatment"
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_names_parse_back_to_the_same_step() {
        for step in ALL_STEPS {
            assert_eq!(step.as_str().parse::<StepId>(), Ok(step));
        }
    }

    #[test]
    fn legacy_prefixed_names_resume_to_current_steps() {
        assert_eq!("CheckInWelcome".parse::<StepId>(), Ok(StepId::Welcome));
        assert_eq!("CheckInChat".parse::<StepId>(), Ok(StepId::Chat));
        assert_eq!(
            "CheckInAmbientProgress".parse::<StepId>(),
            Ok(StepId::AmbientProgress)
        );
    }

    #[test]
    fn retired_progress_token_is_unknown() {
        assert!("CheckInProgress".parse::<StepId>().is_err());
        assert!("Progress".parse::<StepId>().is_err());
    }

    #[test]
    fn serde_uses_canonical_names_and_accepts_legacy_ones() {
        let json = serde_json::to_string(&StepId::MissedWorkouts).expect("serialize");
        assert_eq!(json, "\"MissedWorkouts\"");
        let legacy: StepId = serde_json::from_str("\"CheckInNewGoal\"").expect("deserialize");
        assert_eq!(legacy, StepId::NewGoal);
    }

    #[test]
    fn arm_follows_is_control() {
        assert_eq!(Arm::from_is_control(true), Arm::Control);
        assert_eq!(Arm::from_is_control(false), Arm::Treatment);
        assert_eq!("Treatment".parse::<Arm>(), Ok(Arm::Treatment));
        assert!("placebo".parse::<Arm>().is_err());
    }
}
