use std::sync::Arc;

use tracing::warn;

use tutorial_core::catalog::CatalogQuery;
use tutorial_core::model::{ProgressIndex, Tutorial};

use crate::auth_service::SessionContext;
use crate::backend::Backend;
use crate::error::ApiError;

/// One successful catalog fetch after local refinement.
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogPage {
    pub tutorials: Vec<Tutorial>,
    /// Tutorials the backend returned before local refinement.
    pub fetched: usize,
    /// The viewer's progress, when signed in and it could be read.
    pub progress: Option<ProgressIndex>,
}

/// What a catalog screen shows. A failed fetch never looks like an empty
/// catalog.
#[derive(Debug, Clone, PartialEq)]
pub enum CatalogView {
    Loaded(CatalogPage),
    Failed(ApiError),
}

impl CatalogView {
    #[must_use]
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }

    /// Loaded with nothing to show.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Loaded(page) if page.tutorials.is_empty())
    }

    #[must_use]
    pub fn tutorials(&self) -> &[Tutorial] {
        match self {
            Self::Loaded(page) => &page.tutorials,
            Self::Failed(_) => &[],
        }
    }
}

#[derive(Clone)]
pub struct CatalogService {
    backend: Arc<dyn Backend>,
    context: SessionContext,
}

impl CatalogService {
    #[must_use]
    pub fn new(backend: Arc<dyn Backend>, context: SessionContext) -> Self {
        Self { backend, context }
    }

    /// Fetch with the server-side part of `query`, then refine locally.
    ///
    /// # Errors
    ///
    /// Returns the `ApiError` of the tutorial fetch. A failed progress fetch
    /// only disables the status filter.
    pub async fn fetch(&self, query: &CatalogQuery) -> Result<CatalogPage, ApiError> {
        let fetched = self.backend.list_tutorials(&query.server_filter()).await?;
        let progress = match self.context.token() {
            None => None,
            Some(token) => match self.backend.list_user_progress(&token).await {
                Ok(records) => Some(ProgressIndex::from_records(records)),
                Err(err) => {
                    warn!(error = %err, "progress unavailable, status filter ignored");
                    None
                }
            },
        };
        let tutorials = query.apply(&fetched, progress.as_ref());
        Ok(CatalogPage {
            tutorials,
            fetched: fetched.len(),
            progress,
        })
    }

    pub async fn load(&self, query: &CatalogQuery) -> CatalogView {
        match self.fetch(query).await {
            Ok(page) => CatalogView::Loaded(page),
            Err(err) => {
                warn!(error = %err, "catalog fetch failed");
                CatalogView::Failed(err)
            }
        }
    }
}
