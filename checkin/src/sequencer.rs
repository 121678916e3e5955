//! The check-in step sequencer.
//!
//! [`Sequencer`] owns the current step of an in-progress flow and is the only
//! writer of the persisted step slot. Screens move the flow through
//! [`Sequencer::advance`], [`Sequencer::retreat`], [`Sequencer::reset_checkin`]
//! and [`Sequencer::navigate_to_step`]; they observe it through
//! [`Sequencer::subscribe`].
//!
//! Mutating operations are serialized: while one is pending the busy signal
//! is raised and any other mutator is rejected with
//! [`SequencerError::Busy`]. Within an operation, flags are read before the
//! step slot is written.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::Utc;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::completion::{CompletionHandler, ExitCallback};
use crate::core::flows::{is_interactive, position};
use crate::core::transitions::{self, Backward, Forward, StepNotInFlow};
use crate::core::types::{Arm, StepId};
use crate::errors::{SequencerError, report};
use crate::io::session::SessionFlags;
use crate::io::step_slot::StepSlot;
use crate::io::store::KeyValueStore;
use crate::navigation::{Navigator, ReadinessGate};

/// What a mutating operation did to the flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// The flow now rests on `to`.
    Moved {
        from: StepId,
        to: StepId,
        /// `to` waits for an explicit user action before the flow moves on.
        interactive: bool,
    },
    /// The flow reached its end and was finalized.
    Completed,
    /// The user backed out of the first step.
    Exited,
}

pub struct Sequencer<S, N> {
    arm: Arm,
    store: Arc<S>,
    navigator: N,
    readiness: ReadinessGate,
    completion: CompletionHandler,
    current: watch::Sender<Option<StepId>>,
    busy: watch::Sender<bool>,
    finishing: AtomicBool,
}

impl<S, N> fmt::Debug for Sequencer<S, N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sequencer")
            .field("arm", &self.arm)
            .field("current", &*self.current.borrow())
            .field("busy", &*self.busy.borrow())
            .finish_non_exhaustive()
    }
}

/// Clears the busy signal when an operation ends, however it ends.
struct BusyGuard<'a> {
    busy: &'a watch::Sender<bool>,
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.busy.send_replace(false);
    }
}

impl<S, N> Sequencer<S, N>
where
    S: KeyValueStore,
    N: Navigator,
{
    /// Create a sequencer resting on `Welcome`. Call [`Sequencer::resume`] to
    /// pick up persisted progress.
    pub fn new(
        arm: Arm,
        store: Arc<S>,
        navigator: N,
        readiness: ReadinessGate,
        on_exit: ExitCallback,
    ) -> Self {
        let (current, _) = watch::channel(Some(StepId::Welcome));
        let (busy, _) = watch::channel(false);
        Self {
            arm,
            store,
            navigator,
            readiness,
            completion: CompletionHandler::new(on_exit),
            current,
            busy,
            finishing: AtomicBool::new(false),
        }
    }

    pub fn arm(&self) -> Arm {
        self.arm
    }

    /// `None` once the flow has been completed or exited.
    pub fn current_step(&self) -> Option<StepId> {
        *self.current.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<StepId>> {
        self.current.subscribe()
    }

    /// True while a mutating operation is pending; triggering controls should
    /// be disabled.
    pub fn is_busy(&self) -> bool {
        *self.busy.borrow()
    }

    pub fn busy_signal(&self) -> watch::Receiver<bool> {
        self.busy.subscribe()
    }

    pub fn readiness(&self) -> &ReadinessGate {
        &self.readiness
    }

    pub fn navigator(&self) -> &N {
        &self.navigator
    }

    /// Side-channel flags for the screens that own them.
    pub fn flags(&self) -> SessionFlags<'_, S> {
        SessionFlags::new(&*self.store)
    }

    /// Load persisted progress. Absent or unknown progress starts at `Welcome`.
    pub async fn resume(&self) -> Result<StepId, SequencerError> {
        report("resume", self.resume_inner().await)
    }

    /// Move to the step after `step`.
    pub async fn advance(&self, step: StepId) -> Result<Transition, SequencerError> {
        report("advance", self.advance_inner(step).await)
    }

    /// Move to the step before `step`, or leave the flow from its first step.
    pub async fn retreat(&self, step: StepId) -> Result<Transition, SequencerError> {
        report("retreat", self.retreat_inner(step).await)
    }

    /// Forget persisted progress and rest on `Welcome`. Flags are untouched.
    pub async fn reset_checkin(&self) -> Result<(), SequencerError> {
        report("reset_checkin", self.reset_inner().await)
    }

    /// Jump straight to `step`, ignoring adjacency. Requires a ready router.
    pub async fn navigate_to_step(&self, step: StepId) -> Result<(), SequencerError> {
        report("navigate_to_step", self.navigate_inner(step).await)
    }

    /// Persist `step` as the resume point without moving the flow.
    pub async fn set_resume_step(&self, step: StepId) -> Result<(), SequencerError> {
        report("set_resume_step", self.set_resume_inner(step).await)
    }

    async fn resume_inner(&self) -> Result<StepId, SequencerError> {
        let _busy = self.begin("resume")?;
        let step = StepSlot::new(&*self.store)
            .load()
            .await?
            .unwrap_or(StepId::Welcome);
        info!(%step, arm = %self.arm, "resuming check-in");
        self.publish(Some(step));
        Ok(step)
    }

    async fn advance_inner(&self, step: StepId) -> Result<Transition, SequencerError> {
        let _busy = self.begin("advance")?;
        self.ensure_in_flow(step)?;
        let flags = self.flags().skip_flags().await?;

        match transitions::forward(self.arm, step, &flags)? {
            Forward::Complete => {
                debug!(from = %step, "flow complete");
                self.complete().await?;
                Ok(Transition::Completed)
            }
            Forward::Land {
                step: next,
                interactive,
            } => {
                StepSlot::new(&*self.store).save(next).await?;
                self.publish(Some(next));
                debug!(from = %step, to = %next, interactive, "advanced check-in step");
                Ok(Transition::Moved {
                    from: step,
                    to: next,
                    interactive,
                })
            }
        }
    }

    async fn retreat_inner(&self, step: StepId) -> Result<Transition, SequencerError> {
        let _busy = self.begin("retreat")?;
        self.ensure_in_flow(step)?;
        let flags = self.flags().skip_flags().await?;

        match transitions::backward(self.arm, step, &flags)? {
            Backward::Exit => {
                info!(from = %step, "leaving check-in from its first step");
                self.publish(None);
                self.completion.exit();
                Ok(Transition::Exited)
            }
            Backward::Land {
                step: target,
                mark_navigating_backward,
            } => {
                if mark_navigating_backward {
                    self.flags().mark_navigating_backward().await?;
                }
                if let Err(err) = StepSlot::new(&*self.store).save(target).await {
                    if mark_navigating_backward {
                        self.unmark_navigating_backward().await;
                    }
                    return Err(err.into());
                }
                self.publish(Some(target));
                debug!(from = %step, to = %target, "retreated check-in step");
                Ok(Transition::Moved {
                    from: step,
                    to: target,
                    interactive: is_interactive(target),
                })
            }
        }
    }

    async fn reset_inner(&self) -> Result<(), SequencerError> {
        let _busy = self.begin("reset_checkin")?;
        StepSlot::new(&*self.store).clear().await?;
        self.publish(Some(StepId::Welcome));
        info!("check-in reset");
        Ok(())
    }

    async fn navigate_inner(&self, step: StepId) -> Result<(), SequencerError> {
        let _busy = self.begin("navigate_to_step")?;
        if !self.readiness.is_ready() {
            return Err(SequencerError::NotReady { step });
        }
        self.ensure_in_flow(step)?;
        if step == StepId::Finished {
            self.complete().await?;
            return Ok(());
        }
        StepSlot::new(&*self.store).save(step).await?;
        self.publish(Some(step));
        debug!(%step, "jumped to check-in step");
        Ok(())
    }

    async fn set_resume_inner(&self, step: StepId) -> Result<(), SequencerError> {
        let _busy = self.begin("set_resume_step")?;
        StepSlot::new(&*self.store).save(step).await?;
        Ok(())
    }

    /// Finalize the flow once. Returns `false` when it is already finished
    /// or another caller is finishing it.
    ///
    /// The step stays published until the completion record is durable, so a
    /// failed write leaves the flow where it was and the caller can retry.
    pub(crate) async fn complete(&self) -> Result<bool, SequencerError> {
        if self.current_step().is_none() {
            debug!("check-in already finished");
            return Ok(false);
        }
        if self.finishing.swap(true, Ordering::SeqCst) {
            debug!("check-in completion already in progress");
            return Ok(false);
        }

        let recorded = self.completion.record(&*self.store, Utc::now()).await;
        if let Err(err) = recorded {
            self.finishing.store(false, Ordering::SeqCst);
            return Err(err.into());
        }
        self.publish(None);
        self.finishing.store(false, Ordering::SeqCst);
        self.completion.exit();
        info!("check-in completed");
        Ok(true)
    }

    /// Hand a published step to the router, completing on `Finished`.
    pub(crate) async fn deliver(&self, step: StepId) {
        if step == StepId::Finished {
            let _ = report("complete", self.complete().await);
            return;
        }
        debug!(%step, "navigating to check-in step");
        self.navigator.navigate(step);
    }

    async fn unmark_navigating_backward(&self) {
        if let Err(err) = self.flags().take_navigating_backward().await {
            warn!(error = %err, "failed to withdraw backward navigation marker");
        }
    }

    fn ensure_in_flow(&self, step: StepId) -> Result<(), StepNotInFlow> {
        match position(self.arm, step) {
            Some(_) => Ok(()),
            None => Err(StepNotInFlow {
                step,
                arm: self.arm,
            }),
        }
    }

    fn publish(&self, step: Option<StepId>) {
        self.current.send_if_modified(|current| {
            if *current == step {
                return false;
            }
            *current = step;
            true
        });
    }

    fn begin(&self, operation: &'static str) -> Result<BusyGuard<'_>, SequencerError> {
        let acquired = self.busy.send_if_modified(|busy| !std::mem::replace(busy, true));
        if !acquired {
            return Err(SequencerError::Busy { operation });
        }
        Ok(BusyGuard { busy: &self.busy })
    }
}
