//! Remote data access: the backend contract and its adapters.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use tutorial_core::catalog::TutorialFilter;
use tutorial_core::media::MediaKind;
use tutorial_core::model::{
    AuthToken, Credentials, NewTutorial, Progress, Registration, Session, Step, Tutorial,
    TutorialId, TutorialPatch, User, UserId, UserPatch,
};

use crate::error::ApiError;

mod http;
mod memory;

pub use http::HttpBackend;
pub use memory::InMemoryBackend;

/// Result of a media upload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadedMedia {
    pub url: String,
    pub public_id: String,
    /// Seconds, videos only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
}

/// Every call the client makes against the tutorial backend.
///
/// Calls taking a token need a signed-in session; admin calls additionally
/// need an admin role on the backend side.
#[async_trait]
pub trait Backend: Send + Sync {
    /// # Errors
    ///
    /// Returns `ApiError` for transport failures or a rejected request.
    async fn list_tutorials(&self, filter: &TutorialFilter) -> Result<Vec<Tutorial>, ApiError>;

    /// # Errors
    ///
    /// Returns `ApiError::NotFound` for an unknown id.
    async fn get_tutorial(&self, id: &TutorialId) -> Result<Tutorial, ApiError>;

    /// # Errors
    ///
    /// Returns `ApiError::Rejected` for bad credentials.
    async fn login(&self, credentials: &Credentials) -> Result<Session, ApiError>;

    /// # Errors
    ///
    /// Returns `ApiError::Validation` for duplicate email/username or
    /// backend-side field errors.
    async fn register(&self, registration: &Registration) -> Result<(), ApiError>;

    /// # Errors
    ///
    /// Returns `ApiError::Unauthorized` for an unknown token.
    async fn current_user(&self, token: &AuthToken) -> Result<User, ApiError>;

    /// Mark (or unmark) one step as completed; returns the updated record.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` when the write is rejected or does not arrive.
    async fn record_step_progress(
        &self,
        token: &AuthToken,
        tutorial_id: &TutorialId,
        step_number: u32,
        completed: bool,
    ) -> Result<Progress, ApiError>;

    /// `None` when the user has no record for the tutorial.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` for transport or auth failures.
    async fn get_progress(
        &self,
        token: &AuthToken,
        tutorial_id: &TutorialId,
    ) -> Result<Option<Progress>, ApiError>;

    /// The signed-in user's records with tutorials embedded.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` for transport or auth failures.
    async fn list_user_progress(&self, token: &AuthToken) -> Result<Vec<Progress>, ApiError>;

    /// # Errors
    ///
    /// Returns `ApiError` for transport, auth or permission failures.
    async fn list_users(&self, token: &AuthToken) -> Result<Vec<User>, ApiError>;

    /// # Errors
    ///
    /// Returns `ApiError` for transport, auth or permission failures.
    async fn update_user(
        &self,
        token: &AuthToken,
        id: &UserId,
        patch: &UserPatch,
    ) -> Result<User, ApiError>;

    /// # Errors
    ///
    /// Returns `ApiError` for transport, auth or permission failures.
    async fn delete_user(&self, token: &AuthToken, id: &UserId) -> Result<(), ApiError>;

    /// # Errors
    ///
    /// Returns `ApiError` for transport, auth or permission failures.
    async fn create_tutorial(
        &self,
        token: &AuthToken,
        tutorial: &NewTutorial,
    ) -> Result<Tutorial, ApiError>;

    /// # Errors
    ///
    /// Returns `ApiError` for transport, auth or permission failures.
    async fn update_tutorial(
        &self,
        token: &AuthToken,
        id: &TutorialId,
        patch: &TutorialPatch,
    ) -> Result<Tutorial, ApiError>;

    /// # Errors
    ///
    /// Returns `ApiError` for transport, auth or permission failures.
    async fn delete_tutorial(&self, token: &AuthToken, id: &TutorialId) -> Result<(), ApiError>;

    /// Replace the whole step list if the tutorial is still at
    /// `expected_version`.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Conflict` when the tutorial changed in between.
    async fn replace_steps(
        &self,
        token: &AuthToken,
        id: &TutorialId,
        expected_version: u64,
        steps: &[Step],
    ) -> Result<Tutorial, ApiError>;

    /// # Errors
    ///
    /// Returns `ApiError` for transport, auth or permission failures.
    async fn upload_media(
        &self,
        token: &AuthToken,
        kind: MediaKind,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> Result<UploadedMedia, ApiError>;

    /// # Errors
    ///
    /// Returns `ApiError` for transport, auth or permission failures.
    async fn delete_media(
        &self,
        token: &AuthToken,
        public_id: &str,
        kind: MediaKind,
    ) -> Result<(), ApiError>;
}
