use std::sync::Arc;

use tracing::info;

use tutorial_core::media::{MediaHost, MediaKind};

use crate::auth_service::SessionContext;
use crate::backend::{Backend, UploadedMedia};
use crate::error::AdminError;

/// Tutorial image and video uploads, plus delivery URLs for stored assets.
#[derive(Clone)]
pub struct MediaService {
    backend: Arc<dyn Backend>,
    context: SessionContext,
    host: Option<MediaHost>,
}

impl MediaService {
    #[must_use]
    pub fn new(backend: Arc<dyn Backend>, context: SessionContext, host: Option<MediaHost>) -> Self {
        Self {
            backend,
            context,
            host,
        }
    }

    #[must_use]
    pub fn host(&self) -> Option<&MediaHost> {
        self.host.as_ref()
    }

    /// Checked locally against size and extension limits before any bytes
    /// leave the client.
    ///
    /// # Errors
    ///
    /// `AdminError::Forbidden` without an admin session, `AdminError::Media`
    /// for a file outside the limits, otherwise the backend's answer.
    pub async fn upload(
        &self,
        kind: MediaKind,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> Result<UploadedMedia, AdminError> {
        let token = self.context.admin_token().ok_or(AdminError::Forbidden)?;
        kind.check_upload(file_name, u64::try_from(bytes.len()).unwrap_or(u64::MAX))?;
        let uploaded = self
            .backend
            .upload_media(&token, kind, file_name, bytes)
            .await?;
        info!(kind = %kind, public_id = %uploaded.public_id, "media uploaded");
        Ok(uploaded)
    }

    /// # Errors
    ///
    /// `AdminError::Forbidden` without an admin session, otherwise the backend's answer.
    pub async fn delete(&self, public_id: &str, kind: MediaKind) -> Result<(), AdminError> {
        let token = self.context.admin_token().ok_or(AdminError::Forbidden)?;
        self.backend.delete_media(&token, public_id, kind).await?;
        info!(kind = %kind, public_id, "media deleted");
        Ok(())
    }

    /// Delivery URL for a stored reference. Full URLs pass through; bare public
    /// ids need a configured media host and are returned unchanged without one.
    #[must_use]
    pub fn url_for(&self, kind: MediaKind, reference: &str) -> String {
        match &self.host {
            Some(host) => host.resolve(kind, reference),
            None => reference.to_owned(),
        }
    }
}
