use std::sync::Arc;

use storage::repository::{SessionStore, Storage};
use tutorial_core::media::MediaHost;

use crate::admin_service::AdminService;
use crate::auth_service::{AuthService, SessionContext};
use crate::backend::{Backend, HttpBackend, InMemoryBackend};
use crate::catalog_service::CatalogService;
use crate::config::ClientConfig;
use crate::error::AppServicesError;
use crate::learning_service::LearningService;
use crate::media_service::MediaService;
use crate::walkthrough_service::WalkthroughService;
use crate::Clock;

/// Assembles app-facing services around one backend, one session store and
/// one shared session context.
#[derive(Clone)]
pub struct AppServices {
    context: SessionContext,
    auth: Arc<AuthService>,
    catalog: Arc<CatalogService>,
    walkthrough: Arc<WalkthroughService>,
    learning: Arc<LearningService>,
    admin: Arc<AdminService>,
    media: Arc<MediaService>,
}

impl AppServices {
    /// Build services talking to the configured REST backend, with the
    /// session kept in `SQLite`.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if storage initialization fails or the
    /// media cloud name is unusable.
    pub async fn new_sqlite(config: &ClientConfig) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(&config.session_db).await?;
        let backend: Arc<dyn Backend> = Arc::new(HttpBackend::new(config.api_root.clone()));
        Self::assemble(config, backend, storage.session)
    }

    /// Build services over the seeded in-memory backend and a throwaway
    /// session store.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if the demo data cannot be seeded.
    pub fn offline_demo(config: &ClientConfig, clock: Clock) -> Result<Self, AppServicesError> {
        let backend = InMemoryBackend::demo(clock)?;
        Self::assemble(config, Arc::new(backend), Storage::in_memory().session)
    }

    /// # Errors
    ///
    /// Returns `AppServicesError::Media` for a blank media cloud name.
    pub fn assemble(
        config: &ClientConfig,
        backend: Arc<dyn Backend>,
        store: Arc<dyn SessionStore>,
    ) -> Result<Self, AppServicesError> {
        let host = config
            .media_cloud_name
            .as_deref()
            .map(MediaHost::new)
            .transpose()?;
        let context = SessionContext::new();

        let auth = Arc::new(AuthService::new(
            Arc::clone(&backend),
            store,
            context.clone(),
        ));
        let catalog = Arc::new(CatalogService::new(Arc::clone(&backend), context.clone()));
        let walkthrough = Arc::new(WalkthroughService::new(
            Arc::clone(&backend),
            context.clone(),
            config.progress_retries,
        ));
        let learning = Arc::new(LearningService::new(Arc::clone(&backend), context.clone()));
        let admin = Arc::new(AdminService::new(Arc::clone(&backend), context.clone()));
        let media = Arc::new(MediaService::new(backend, context.clone(), host));

        Ok(Self {
            context,
            auth,
            catalog,
            walkthrough,
            learning,
            admin,
            media,
        })
    }

    #[must_use]
    pub fn context(&self) -> &SessionContext {
        &self.context
    }

    #[must_use]
    pub fn auth(&self) -> Arc<AuthService> {
        Arc::clone(&self.auth)
    }

    #[must_use]
    pub fn catalog(&self) -> Arc<CatalogService> {
        Arc::clone(&self.catalog)
    }

    #[must_use]
    pub fn walkthrough(&self) -> Arc<WalkthroughService> {
        Arc::clone(&self.walkthrough)
    }

    #[must_use]
    pub fn learning(&self) -> Arc<LearningService> {
        Arc::clone(&self.learning)
    }

    #[must_use]
    pub fn admin(&self) -> Arc<AdminService> {
        Arc::clone(&self.admin)
    }

    #[must_use]
    pub fn media(&self) -> Arc<MediaService> {
        Arc::clone(&self.media)
    }
}
