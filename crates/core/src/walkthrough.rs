//! Step-by-step navigation through one tutorial.
//!
//! Positions run over `0..=step_count`: `0..step_count` are the real steps and
//! `step_count` is the completion screen. Transitions are applied locally and
//! report a `PendingSave` when the new position should be persisted; writing it
//! to the backend is the caller's job and never gates navigation.

use thiserror::Error;

use crate::model::{Progress, Step, Tutorial, TutorialId};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum WalkthroughError {
    #[error("tutorial is not loaded")]
    NotReady,
    #[error("already at the first step")]
    AtStart,
    #[error("already at the completion screen")]
    AtEnd,
    #[error("position {target} is outside 0..={step_count}")]
    OutOfRange { target: u32, step_count: u32 },
}

/// Externally visible state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalkthroughPhase {
    Loading,
    Active { step: u32 },
    Completed,
    NotFound,
}

/// Progress write produced by a forward transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingSave {
    pub tutorial_id: TutorialId,
    /// The new position, recorded as a completed step number.
    pub step_number: u32,
    pub completed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Ready {
    tutorial: Tutorial,
    step: u32,
    /// Highest position visited or already persisted.
    furthest: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Inner {
    Loading,
    NotFound,
    Ready(Ready),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Walkthrough {
    inner: Inner,
}

impl Default for Walkthrough {
    fn default() -> Self {
        Self::loading()
    }
}

impl Walkthrough {
    #[must_use]
    pub fn loading() -> Self {
        Self {
            inner: Inner::Loading,
        }
    }

    /// Build directly from a fetch result.
    #[must_use]
    pub fn start(tutorial: Option<Tutorial>, prior: Option<&Progress>) -> Self {
        let mut walkthrough = Self::loading();
        walkthrough.resolve(tutorial, prior);
        walkthrough
    }

    /// Leave `Loading`. A missing tutorial is terminal (`NotFound`).
    ///
    /// Prior progress with completed steps resumes at the highest completed
    /// step number, clamped to the completion screen.
    pub fn resolve(&mut self, tutorial: Option<Tutorial>, prior: Option<&Progress>) {
        self.inner = match tutorial {
            None => Inner::NotFound,
            Some(tutorial) => {
                let resume = prior
                    .filter(|p| p.tutorial_id() == Some(&tutorial.id))
                    .and_then(Progress::furthest_step)
                    .map_or(0, |step| step.min(tutorial.step_count()));
                Inner::Ready(Ready {
                    tutorial,
                    step: resume,
                    furthest: resume,
                })
            }
        };
    }

    #[must_use]
    pub fn phase(&self) -> WalkthroughPhase {
        match &self.inner {
            Inner::Loading => WalkthroughPhase::Loading,
            Inner::NotFound => WalkthroughPhase::NotFound,
            Inner::Ready(ready) if ready.step >= ready.tutorial.step_count() => {
                WalkthroughPhase::Completed
            }
            Inner::Ready(ready) => WalkthroughPhase::Active { step: ready.step },
        }
    }

    #[must_use]
    pub fn tutorial(&self) -> Option<&Tutorial> {
        match &self.inner {
            Inner::Ready(ready) => Some(&ready.tutorial),
            _ => None,
        }
    }

    /// Current position, `None` unless loaded.
    #[must_use]
    pub fn position(&self) -> Option<u32> {
        match &self.inner {
            Inner::Ready(ready) => Some(ready.step),
            _ => None,
        }
    }

    #[must_use]
    pub fn step_count(&self) -> u32 {
        self.tutorial().map_or(0, Tutorial::step_count)
    }

    /// The step on screen; `None` on the completion screen.
    #[must_use]
    pub fn current_step(&self) -> Option<&Step> {
        match &self.inner {
            Inner::Ready(ready) => ready.tutorial.step_at(ready.step),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.phase() == WalkthroughPhase::Completed
    }

    /// Display-only progress: `(position + 1) / (step_count + 1) * 100`.
    #[must_use]
    pub fn percent(&self) -> f64 {
        match &self.inner {
            Inner::Ready(ready) => {
                let total = f64::from(ready.tutorial.step_count()) + 1.0;
                (f64::from(ready.step) + 1.0) / total * 100.0
            }
            _ => 0.0,
        }
    }

    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn percent_rounded(&self) -> u8 {
        self.percent().round().clamp(0.0, 100.0) as u8
    }

    /// "Langkah n dari m", counting the completion screen as a position.
    #[must_use]
    pub fn step_label(&self) -> String {
        match &self.inner {
            Inner::Ready(ready) => {
                let total = ready.tutorial.step_count() + 1;
                format!("Langkah {} dari {}", (ready.step + 1).min(total), total)
            }
            _ => String::new(),
        }
    }

    fn ready_mut(&mut self) -> Result<&mut Ready, WalkthroughError> {
        match &mut self.inner {
            Inner::Ready(ready) => Ok(ready),
            _ => Err(WalkthroughError::NotReady),
        }
    }

    /// Move forward one position and persist the new one as completed.
    ///
    /// # Errors
    ///
    /// `AtEnd` on the completion screen, `NotReady` before loading.
    pub fn advance(&mut self) -> Result<PendingSave, WalkthroughError> {
        let ready = self.ready_mut()?;
        if ready.step >= ready.tutorial.step_count() {
            return Err(WalkthroughError::AtEnd);
        }
        ready.step += 1;
        ready.furthest = ready.furthest.max(ready.step);
        Ok(ready.save())
    }

    /// Move back one position. Never touches persisted progress.
    ///
    /// # Errors
    ///
    /// `AtStart` at position 0, `NotReady` before loading.
    pub fn retreat(&mut self) -> Result<(), WalkthroughError> {
        let ready = self.ready_mut()?;
        if ready.step == 0 {
            return Err(WalkthroughError::AtStart);
        }
        ready.step -= 1;
        Ok(())
    }

    /// Jump straight to `target`. Persists only when `target` lies beyond
    /// every position visited so far.
    ///
    /// # Errors
    ///
    /// `OutOfRange` past the completion screen, `NotReady` before loading.
    pub fn jump_to(&mut self, target: u32) -> Result<Option<PendingSave>, WalkthroughError> {
        let ready = self.ready_mut()?;
        let step_count = ready.tutorial.step_count();
        if target > step_count {
            return Err(WalkthroughError::OutOfRange { target, step_count });
        }
        ready.step = target;
        if target > ready.furthest {
            ready.furthest = target;
            return Ok(Some(ready.save()));
        }
        Ok(None)
    }

    /// Back to the first step; persisted history is kept.
    ///
    /// # Errors
    ///
    /// `NotReady` before loading.
    pub fn restart(&mut self) -> Result<(), WalkthroughError> {
        self.ready_mut()?.step = 0;
        Ok(())
    }
}

impl Ready {
    fn save(&self) -> PendingSave {
        PendingSave {
            tutorial_id: self.tutorial.id.clone(),
            step_number: self.step,
            completed: true,
        }
    }
}
