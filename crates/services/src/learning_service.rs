use std::sync::Arc;

use tracing::debug;

use tutorial_core::learning::LearningOverview;

use crate::auth_service::SessionContext;
use crate::backend::Backend;
use crate::error::SessionError;

/// The signed-in viewer's "my learning" page.
#[derive(Clone)]
pub struct LearningService {
    backend: Arc<dyn Backend>,
    context: SessionContext,
}

impl LearningService {
    #[must_use]
    pub fn new(backend: Arc<dyn Backend>, context: SessionContext) -> Self {
        Self { backend, context }
    }

    /// In-progress and completed tutorials, in the order the backend lists them.
    ///
    /// # Errors
    ///
    /// `SessionError::SignedOut` without a session, otherwise the backend's answer.
    pub async fn overview(&self) -> Result<LearningOverview, SessionError> {
        let token = self.context.token().ok_or(SessionError::SignedOut)?;
        let records = self.backend.list_user_progress(&token).await?;
        let overview = LearningOverview::from_records(&records);
        debug!(
            records = records.len(),
            in_progress = overview.in_progress.len(),
            completed = overview.completed.len(),
            "learning overview built"
        );
        Ok(overview)
    }
}
