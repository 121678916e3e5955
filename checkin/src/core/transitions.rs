//! Forward and backward transition rules for the check-in flow.
//!
//! Both functions are pure: the caller reads the side-channel flags first and
//! hands them in, then persists whatever plan comes back.

use super::flows::{is_interactive, position, steps_for};
use super::types::{Arm, StepId};

/// Side-channel inputs consulted by the skip rules.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SkipFlags {
    /// `None` when the upstream screen has not recorded anything yet.
    pub previous_plan_had_missed_workouts: Option<bool>,
}

impl SkipFlags {
    /// Only an explicit "no missed workouts" skips the missed-workouts screen.
    pub fn skips_missed_workouts(&self) -> bool {
        self.previous_plan_had_missed_workouts == Some(false)
    }
}

/// Raised when a transition starts from a step the active flow does not use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("invalid check-in step `{step}` for the {arm} flow")]
pub struct StepNotInFlow {
    pub step: StepId,
    pub arm: Arm,
}

/// Result of moving forward from a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Forward {
    /// Persist `step` and make it current.
    Land { step: StepId, interactive: bool },
    /// The flow is done; run completion instead of persisting anything.
    Complete,
}

/// Result of moving backward from a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backward {
    /// Leave the flow without completing it.
    Exit,
    /// Persist `step` and make it current.
    Land {
        step: StepId,
        /// Set when the plan-creation screen must keep its next-week context.
        mark_navigating_backward: bool,
    },
}

/// Plan the step that follows `from`.
pub fn forward(arm: Arm, from: StepId, flags: &SkipFlags) -> Result<Forward, StepNotInFlow> {
    let steps = steps_for(arm);
    let index = position(arm, from).ok_or(StepNotInFlow { step: from, arm })?;

    // Scheduling always ends the flow, wherever it sits in the ordering.
    if from == StepId::ScheduleCheckIn {
        return Ok(Forward::Complete);
    }

    let Some(mut next) = steps.get(index + 1).copied() else {
        return Ok(Forward::Complete);
    };

    let enters_missed_workouts = from == StepId::Welcome && next == StepId::MissedWorkouts;
    let leaves_missed_workouts =
        from == StepId::MissedWorkouts && next == StepId::AmbientProgress;
    if (enters_missed_workouts || leaves_missed_workouts) && flags.skips_missed_workouts() {
        next = StepId::AmbientProgress;
    }

    if next == StepId::Finished {
        return Ok(Forward::Complete);
    }
    Ok(Forward::Land {
        step: next,
        interactive: is_interactive(next),
    })
}

/// Plan the step that precedes `from`.
pub fn backward(arm: Arm, from: StepId, flags: &SkipFlags) -> Result<Backward, StepNotInFlow> {
    let steps = steps_for(arm);
    let index = position(arm, from).ok_or(StepNotInFlow { step: from, arm })?;
    if index == 0 {
        return Ok(Backward::Exit);
    }

    let naive = steps[index - 1];
    if from == StepId::ScheduleCheckIn && naive == StepId::PlanCreation {
        return Ok(Backward::Land {
            step: StepId::PlanCreation,
            mark_navigating_backward: true,
        });
    }

    // Mirror the forward skip: if missed workouts were skipped on the way in,
    // they are skipped on the way out too.
    if from == StepId::AmbientProgress && flags.skips_missed_workouts() {
        return Ok(Backward::Land {
            step: StepId::Welcome,
            mark_navigating_backward: false,
        });
    }

    let target = match naive {
        // Rescheduling is only reachable as a forward detour. It never sits
        // first, so `index >= 2` here.
        StepId::RescheduleCheckIn => steps[index - 2],
        StepId::ScheduleCheckIn => StepId::Welcome,
        other => other,
    };
    Ok(Backward::Land {
        step: target,
        mark_navigating_backward: false,
    })
}
