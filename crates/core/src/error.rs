use thiserror::Error;

use crate::catalog::CatalogError;
use crate::media::MediaError;
use crate::model::{ParseIdError, ProgressError, TutorialError, UserError, ValidationErrors};
use crate::steps::StepError;
use crate::walkthrough::WalkthroughError;

/// Any domain-level failure, for callers that do not care which rule tripped.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error(transparent)]
    Validation(#[from] ValidationErrors),
    #[error(transparent)]
    Id(#[from] ParseIdError),
    #[error(transparent)]
    Tutorial(#[from] TutorialError),
    #[error(transparent)]
    User(#[from] UserError),
    #[error(transparent)]
    Progress(#[from] ProgressError),
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error(transparent)]
    Walkthrough(#[from] WalkthroughError),
    #[error(transparent)]
    Steps(#[from] StepError),
    #[error(transparent)]
    Media(#[from] MediaError),
}
