use std::sync::Arc;

use tracing::{info, warn};

use tutorial_core::catalog::{SortKey, TutorialFilter};
use tutorial_core::model::{
    AuthToken, RegistrationForm, Tutorial, TutorialDraft, TutorialId, TutorialPatch, User, UserId,
    UserPatch,
};
use tutorial_core::steps::StepList;
use tutorial_core::user_query::UserQuery;

use crate::auth_service::SessionContext;
use crate::backend::Backend;
use crate::error::AdminError;

/// Headline counts on the admin dashboard.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DashboardStats {
    pub total_users: usize,
    pub total_tutorials: usize,
    pub total_progress: usize,
}

/// Tutorial, step and user management for admin sessions.
///
/// Every call checks the session role first; the backend checks it again.
#[derive(Clone)]
pub struct AdminService {
    backend: Arc<dyn Backend>,
    context: SessionContext,
}

impl AdminService {
    #[must_use]
    pub fn new(backend: Arc<dyn Backend>, context: SessionContext) -> Self {
        Self { backend, context }
    }

    fn token(&self) -> Result<AuthToken, AdminError> {
        self.context.admin_token().ok_or(AdminError::Forbidden)
    }

    //
    // ─── DASHBOARD ─────────────────────────────────────────────────────────────
    //

    /// # Errors
    ///
    /// Fails when users or tutorials cannot be listed. The progress count
    /// falls back to 0 instead.
    pub async fn dashboard_stats(&self) -> Result<DashboardStats, AdminError> {
        let token = self.token()?;
        let users = self.backend.list_users(&token).await?;
        let tutorials = self
            .backend
            .list_tutorials(&TutorialFilter::default())
            .await?;
        let total_progress = match self.backend.list_user_progress(&token).await {
            Ok(records) => records.len(),
            Err(err) => {
                warn!(error = %err, "progress count unavailable");
                0
            }
        };
        Ok(DashboardStats {
            total_users: users.len(),
            total_tutorials: tutorials.len(),
            total_progress,
        })
    }

    //
    // ─── TUTORIALS ─────────────────────────────────────────────────────────────
    //

    /// Every tutorial, ordered by `sort`.
    ///
    /// # Errors
    ///
    /// `AdminError::Forbidden` without an admin session, otherwise the backend's answer.
    pub async fn tutorials(&self, sort: SortKey) -> Result<Vec<Tutorial>, AdminError> {
        self.token()?;
        let mut tutorials = self
            .backend
            .list_tutorials(&TutorialFilter::default())
            .await?;
        sort.sort(&mut tutorials);
        Ok(tutorials)
    }

    /// # Errors
    ///
    /// `AdminError::Forbidden` without an admin session, otherwise the backend's answer.
    pub async fn tutorial(&self, id: &TutorialId) -> Result<Tutorial, AdminError> {
        self.token()?;
        Ok(self.backend.get_tutorial(id).await?)
    }

    /// # Errors
    ///
    /// Field errors from the draft, otherwise the backend's answer.
    pub async fn create_tutorial(&self, draft: TutorialDraft) -> Result<Tutorial, AdminError> {
        let token = self.token()?;
        let new = draft.validate()?;
        let created = self.backend.create_tutorial(&token, &new).await?;
        info!(tutorial = %created.id, "tutorial created");
        Ok(created)
    }

    /// Overwrite the editable fields with a validated draft.
    ///
    /// # Errors
    ///
    /// Field errors from the draft, otherwise the backend's answer.
    pub async fn update_tutorial(
        &self,
        id: &TutorialId,
        draft: TutorialDraft,
    ) -> Result<Tutorial, AdminError> {
        let token = self.token()?;
        let patch = TutorialPatch::from_new(draft.validate()?);
        let updated = self.backend.update_tutorial(&token, id, &patch).await?;
        info!(tutorial = %id, "tutorial updated");
        Ok(updated)
    }

    /// # Errors
    ///
    /// `AdminError::Forbidden` without an admin session, otherwise the backend's answer.
    pub async fn delete_tutorial(&self, id: &TutorialId) -> Result<(), AdminError> {
        let token = self.token()?;
        self.backend.delete_tutorial(&token, id).await?;
        info!(tutorial = %id, "tutorial deleted");
        Ok(())
    }

    /// Flip the published flag.
    ///
    /// # Errors
    ///
    /// `AdminError::Forbidden` without an admin session, otherwise the backend's answer.
    pub async fn toggle_active(&self, tutorial: &Tutorial) -> Result<Tutorial, AdminError> {
        let token = self.token()?;
        let patch = TutorialPatch::active(!tutorial.is_active);
        let updated = self
            .backend
            .update_tutorial(&token, &tutorial.id, &patch)
            .await?;
        info!(tutorial = %tutorial.id, active = updated.is_active, "tutorial visibility changed");
        Ok(updated)
    }

    //
    // ─── STEPS ─────────────────────────────────────────────────────────────────
    //

    /// A fresh editing snapshot of the tutorial's steps.
    ///
    /// # Errors
    ///
    /// `AdminError::Forbidden` without an admin session, otherwise the backend's answer.
    pub async fn open_steps(&self, id: &TutorialId) -> Result<StepList, AdminError> {
        self.token()?;
        let tutorial = self.backend.get_tutorial(id).await?;
        Ok(StepList::from_tutorial(&tutorial))
    }

    /// Replace the stored steps with the edited list. On success the list is
    /// rebased onto the saved tutorial; on a conflict it is left untouched so
    /// the caller can reload.
    ///
    /// # Errors
    ///
    /// `ApiError::Conflict` (wrapped) when someone else saved first.
    pub async fn save_steps(&self, steps: &mut StepList) -> Result<Tutorial, AdminError> {
        let token = self.token()?;
        let saved = self
            .backend
            .replace_steps(&token, steps.tutorial_id(), steps.version(), steps.steps())
            .await?;
        steps.rebase(&saved);
        info!(tutorial = %saved.id, steps = saved.steps.len(), version = saved.version, "steps saved");
        Ok(saved)
    }

    //
    // ─── USERS ─────────────────────────────────────────────────────────────────
    //

    /// # Errors
    ///
    /// `AdminError::Forbidden` without an admin session, otherwise the backend's answer.
    pub async fn users(&self, query: &UserQuery) -> Result<Vec<User>, AdminError> {
        let token = self.token()?;
        let users = self.backend.list_users(&token).await?;
        Ok(query.apply(&users).into_iter().cloned().collect())
    }

    /// Accounts are created through the public registration endpoint.
    ///
    /// # Errors
    ///
    /// Field errors from the form, otherwise the backend's answer.
    pub async fn create_user(&self, form: RegistrationForm) -> Result<(), AdminError> {
        self.token()?;
        let registration = form.validate()?;
        self.backend.register(&registration).await?;
        info!(user = %registration.username, "user created by admin");
        Ok(())
    }

    /// # Errors
    ///
    /// `AdminError::Forbidden` without an admin session, otherwise the backend's answer.
    pub async fn update_user(&self, id: &UserId, patch: &UserPatch) -> Result<User, AdminError> {
        let token = self.token()?;
        let updated = self.backend.update_user(&token, id, patch).await?;
        info!(user = %id, "user updated");
        Ok(updated)
    }

    /// # Errors
    ///
    /// `AdminError::Forbidden` without an admin session, otherwise the backend's answer.
    pub async fn delete_user(&self, id: &UserId) -> Result<(), AdminError> {
        let token = self.token()?;
        self.backend.delete_user(&token, id).await?;
        info!(user = %id, "user deleted");
        Ok(())
    }
}
