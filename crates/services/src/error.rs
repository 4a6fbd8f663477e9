//! Shared error types for the services crate.

use thiserror::Error;

use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;
use tutorial_core::media::MediaError;
use tutorial_core::model::ValidationErrors;
use tutorial_core::steps::StepError;

use crate::config::ConfigError;

/// Failure at the remote boundary, classified so callers can decide how to
/// present it.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ApiError {
    #[error("network error: {0}")]
    Network(String),
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationErrors),
    #[error("request rejected ({status}): {message}")]
    Rejected { status: u16, message: String },
    #[error("not authenticated")]
    Unauthorized,
    #[error("not found")]
    NotFound,
    #[error("conflict: {message}")]
    Conflict { message: String },
    #[error("unexpected response: {0}")]
    Decode(String),
}

/// How an error should reach the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorDisplay {
    /// Next to the offending form fields.
    Inline(ValidationErrors),
    /// A transient notification.
    Toast(String),
}

impl ApiError {
    pub const GENERIC_MESSAGE: &'static str = "Terjadi kesalahan, silakan coba lagi";

    #[must_use]
    pub fn display(&self) -> ErrorDisplay {
        match self {
            Self::Validation(errors) => ErrorDisplay::Inline(errors.clone()),
            Self::Network(_) => ErrorDisplay::Toast("Tidak dapat terhubung ke server".into()),
            Self::Rejected { message, .. } if !message.trim().is_empty() => {
                ErrorDisplay::Toast(message.clone())
            }
            Self::Rejected { .. } => ErrorDisplay::Toast(Self::GENERIC_MESSAGE.into()),
            Self::Unauthorized => {
                ErrorDisplay::Toast("Sesi berakhir, silakan masuk kembali".into())
            }
            Self::NotFound => ErrorDisplay::Toast("Data tidak ditemukan".into()),
            Self::Conflict { message } if !message.trim().is_empty() => {
                ErrorDisplay::Toast(message.clone())
            }
            Self::Conflict { .. } => ErrorDisplay::Toast(
                "Data telah diubah di tempat lain, muat ulang lalu coba lagi".into(),
            ),
            Self::Decode(_) => ErrorDisplay::Toast("Respons server tidak valid".into()),
        }
    }

    /// Transport-level failure worth retrying.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Network(_) => true,
            Self::Rejected { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

/// Errors emitted by `AuthService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SessionError {
    #[error("not signed in")]
    SignedOut,
    #[error("this account has no admin access")]
    NotAdmin,
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl From<ValidationErrors> for SessionError {
    fn from(errors: ValidationErrors) -> Self {
        Self::Api(ApiError::Validation(errors))
    }
}

/// Errors emitted by `AdminService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AdminError {
    #[error("admin access required")]
    Forbidden,
    #[error(transparent)]
    Steps(#[from] StepError),
    #[error(transparent)]
    Media(#[from] MediaError),
    #[error(transparent)]
    Api(#[from] ApiError),
}

impl From<ValidationErrors> for AdminError {
    fn from(errors: ValidationErrors) -> Self {
        Self::Api(ApiError::Validation(errors))
    }
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Media(#[from] MediaError),
    #[error(transparent)]
    Backend(#[from] ApiError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_is_inline_everything_else_toast() {
        let errors = ValidationErrors::single("email", "Email sudah terdaftar");
        assert_eq!(
            ApiError::Validation(errors.clone()).display(),
            ErrorDisplay::Inline(errors)
        );
        assert!(matches!(
            ApiError::Network("reset".into()).display(),
            ErrorDisplay::Toast(_)
        ));
    }

    #[test]
    fn rejected_shows_backend_message_or_generic() {
        let with_message = ApiError::Rejected {
            status: 401,
            message: "Email atau password salah".into(),
        };
        assert_eq!(
            with_message.display(),
            ErrorDisplay::Toast("Email atau password salah".into())
        );
        let blank = ApiError::Rejected {
            status: 500,
            message: String::new(),
        };
        assert_eq!(
            blank.display(),
            ErrorDisplay::Toast(ApiError::GENERIC_MESSAGE.into())
        );
        assert!(blank.is_transient());
        assert!(!with_message.is_transient());
    }
}
