//! Error taxonomy for sequencer operations and the path that reports them.
//!
//! Every mutating operation reports its failure exactly once through
//! [`report`] and then hands the error back as a value. Screens may drop it:
//! a failed transition stalls the wizard, it never takes the screen down.

use tracing::error;

use crate::core::transitions::StepNotInFlow;
use crate::core::types::{Arm, StepId};
use crate::io::store::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum SequencerError {
    /// The step is not part of the active arm's flow. State is unchanged.
    #[error("invalid check-in step `{step}` for the {arm} flow")]
    InvalidStep { step: StepId, arm: Arm },

    /// Navigation was requested before the router signalled readiness.
    #[error("check-in navigation is not ready (requested `{step}`)")]
    NotReady { step: StepId },

    /// The durable store failed; the operation was abandoned.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Another mutating operation is still in flight.
    #[error("check-in operation `{operation}` rejected while another is pending")]
    Busy { operation: &'static str },
}

impl From<StepNotInFlow> for SequencerError {
    fn from(err: StepNotInFlow) -> Self {
        SequencerError::InvalidStep {
            step: err.step,
            arm: err.arm,
        }
    }
}

impl SequencerError {
    /// Short, stable label used as a structured log field.
    pub fn kind(&self) -> &'static str {
        match self {
            SequencerError::InvalidStep { .. } => "invalid_step",
            SequencerError::NotReady { .. } => "not_ready",
            SequencerError::Store(_) => "store_io",
            SequencerError::Busy { .. } => "busy",
        }
    }
}

/// Report a failed operation and pass the result through unchanged.
pub fn report<T>(
    operation: &'static str,
    result: Result<T, SequencerError>,
) -> Result<T, SequencerError> {
    if let Err(err) = &result {
        error!(operation, kind = err.kind(), error = %err, "check-in operation failed");
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transition_errors_map_to_invalid_step() {
        let err = SequencerError::from(StepNotInFlow {
            step: StepId::PlanCreation,
            arm: Arm::Treatment,
        });
        assert_eq!(err.kind(), "invalid_step");
        assert_eq!(
            err.to_string(),
            "invalid check-in step `PlanCreation` for the treatment flow"
        );
    }

    #[test]
    fn report_passes_values_through() {
        assert_eq!(report("advance", Ok::<_, SequencerError>(7)).ok(), Some(7));
        let err = report::<()>("navigate_to_step", Err(SequencerError::NotReady {
            step: StepId::RescheduleCheckIn,
        }))
        .expect_err("error passes through");
        assert_eq!(err.kind(), "not_ready");
    }
}
