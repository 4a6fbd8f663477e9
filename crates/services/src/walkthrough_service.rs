use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use tutorial_core::model::{AuthToken, Progress, TutorialId};
use tutorial_core::walkthrough::{PendingSave, Walkthrough, WalkthroughError, WalkthroughPhase};

use crate::auth_service::SessionContext;
use crate::backend::Backend;
use crate::error::ApiError;

pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(250);

//
// ─── PROGRESS SAVE ─────────────────────────────────────────────────────────────
//

/// A progress write waiting to be sent.
///
/// The local position has already moved; this only mirrors it to the backend.
/// Transient failures are retried with jittered backoff, anything else is
/// logged and handed back.
pub struct ProgressSave {
    backend: Arc<dyn Backend>,
    token: AuthToken,
    pending: PendingSave,
    retries: u32,
    base_delay: Duration,
}

impl ProgressSave {
    #[must_use]
    pub fn pending(&self) -> &PendingSave {
        &self.pending
    }

    /// # Errors
    ///
    /// The last `ApiError` once retries are used up or the error is permanent.
    pub async fn run(self) -> Result<Progress, ApiError> {
        let PendingSave {
            tutorial_id,
            step_number,
            completed,
        } = &self.pending;
        let mut attempt = 0;
        loop {
            match self
                .backend
                .record_step_progress(&self.token, tutorial_id, *step_number, *completed)
                .await
            {
                Ok(progress) => {
                    debug!(tutorial = %tutorial_id, step = step_number, "progress saved");
                    return Ok(progress);
                }
                Err(err) if err.is_transient() && attempt < self.retries => {
                    let delay = self.backoff(attempt);
                    warn!(
                        tutorial = %tutorial_id,
                        step = step_number,
                        attempt,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        error = %err,
                        "progress save failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => {
                    warn!(
                        tutorial = %tutorial_id,
                        step = step_number,
                        error = %err,
                        "progress not saved"
                    );
                    return Err(err);
                }
            }
        }
    }

    /// Run on the tokio runtime without waiting for the answer.
    #[must_use]
    pub fn spawn(self) -> JoinHandle<Result<Progress, ApiError>> {
        tokio::spawn(self.run())
    }

    fn backoff(&self, attempt: u32) -> Duration {
        let base = self.base_delay.saturating_mul(2u32.saturating_pow(attempt));
        let spread = u64::try_from(base.as_millis() / 2).unwrap_or(u64::MAX);
        let jitter = if spread == 0 {
            0
        } else {
            rand::rng().random_range(0..=spread)
        };
        base + Duration::from_millis(jitter)
    }
}

impl std::fmt::Debug for ProgressSave {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressSave")
            .field("pending", &self.pending)
            .field("retries", &self.retries)
            .finish_non_exhaustive()
    }
}

/// Result of a local step transition.
#[derive(Debug)]
pub struct StepOutcome {
    pub phase: WalkthroughPhase,
    /// Present only for signed-in viewers on a persisting transition.
    pub save: Option<ProgressSave>,
}

//
// ─── SERVICE ───────────────────────────────────────────────────────────────────
//

#[derive(Clone)]
pub struct WalkthroughService {
    backend: Arc<dyn Backend>,
    context: SessionContext,
    retries: u32,
    base_delay: Duration,
}

impl WalkthroughService {
    #[must_use]
    pub fn new(backend: Arc<dyn Backend>, context: SessionContext, retries: u32) -> Self {
        Self {
            backend,
            context,
            retries,
            base_delay: DEFAULT_RETRY_DELAY,
        }
    }

    #[must_use]
    pub fn with_retry_delay(mut self, base_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self
    }

    /// Load a tutorial and, for a signed-in viewer, resume from stored progress.
    ///
    /// Never fails: an unknown id or a failed fetch ends in the not-found
    /// phase, and missing progress starts at the first step.
    pub async fn open(&self, id: &TutorialId) -> Walkthrough {
        let mut walkthrough = Walkthrough::loading();
        let tutorial = match self.backend.get_tutorial(id).await {
            Ok(tutorial) => Some(tutorial),
            Err(ApiError::NotFound) => {
                info!(tutorial = %id, "tutorial not found");
                None
            }
            Err(err) => {
                warn!(tutorial = %id, error = %err, "tutorial fetch failed");
                None
            }
        };
        let prior = match (&tutorial, self.context.token()) {
            (Some(_), Some(token)) => match self.backend.get_progress(&token, id).await {
                Ok(progress) => progress,
                Err(err) => {
                    warn!(tutorial = %id, error = %err, "stored progress unavailable");
                    None
                }
            },
            _ => None,
        };
        walkthrough.resolve(tutorial, prior.as_ref());
        walkthrough
    }

    /// # Errors
    ///
    /// `WalkthroughError::AtEnd` once completed, `NotReady` before loading.
    pub fn advance(&self, walkthrough: &mut Walkthrough) -> Result<StepOutcome, WalkthroughError> {
        let pending = walkthrough.advance()?;
        Ok(self.outcome(walkthrough, Some(pending)))
    }

    /// # Errors
    ///
    /// `WalkthroughError::AtStart` on the first step.
    pub fn retreat(&self, walkthrough: &mut Walkthrough) -> Result<StepOutcome, WalkthroughError> {
        walkthrough.retreat()?;
        Ok(self.outcome(walkthrough, None))
    }

    /// # Errors
    ///
    /// `WalkthroughError::OutOfRange` for a target past the last step.
    pub fn jump_to(
        &self,
        walkthrough: &mut Walkthrough,
        target: u32,
    ) -> Result<StepOutcome, WalkthroughError> {
        let pending = walkthrough.jump_to(target)?;
        Ok(self.outcome(walkthrough, pending))
    }

    /// # Errors
    ///
    /// `WalkthroughError::NotReady` before loading.
    pub fn restart(&self, walkthrough: &mut Walkthrough) -> Result<StepOutcome, WalkthroughError> {
        walkthrough.restart()?;
        Ok(self.outcome(walkthrough, None))
    }

    fn outcome(&self, walkthrough: &Walkthrough, pending: Option<PendingSave>) -> StepOutcome {
        let save = pending.and_then(|pending| {
            self.context.token().map(|token| ProgressSave {
                backend: Arc::clone(&self.backend),
                token,
                pending,
                retries: self.retries,
                base_delay: self.base_delay,
            })
        });
        StepOutcome {
            phase: walkthrough.phase(),
            save,
        }
    }
}
