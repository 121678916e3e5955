//! Fixed step orderings for each experiment arm.

use super::types::{Arm, StepId};

pub const CONTROL_STEPS: [StepId; 10] = [
    StepId::Welcome,
    StepId::MissedWorkouts,
    StepId::AmbientProgress,
    StepId::Health,
    StepId::CompareGoal,
    StepId::NewGoal,
    StepId::PlanCreation,
    StepId::ScheduleCheckIn,
    StepId::RescheduleCheckIn,
    StepId::Finished,
];

pub const TREATMENT_STEPS: [StepId; 7] = [
    StepId::Welcome,
    StepId::MissedWorkouts,
    StepId::AmbientProgress,
    StepId::Chat,
    StepId::ScheduleCheckIn,
    StepId::RescheduleCheckIn,
    StepId::Finished,
];

/// Ordered steps of the flow active for `arm`.
pub fn steps_for(arm: Arm) -> &'static [StepId] {
    match arm {
        Arm::Control => &CONTROL_STEPS,
        Arm::Treatment => &TREATMENT_STEPS,
    }
}

/// Index of `step` within the flow for `arm`, if the arm uses it.
pub fn position(arm: Arm, step: StepId) -> Option<usize> {
    steps_for(arm).iter().position(|candidate| *candidate == step)
}

/// Screens that wait for an explicit user action before the flow may move on.
pub fn is_interactive(step: StepId) -> bool {
    matches!(
        step,
        StepId::Health
            | StepId::CompareGoal
            | StepId::NewGoal
            | StepId::PlanCreation
            | StepId::Chat
            | StepId::ScheduleCheckIn
    )
}
