#![forbid(unsafe_code)]

pub mod admin_service;
pub mod app_services;
pub mod auth_service;
pub mod backend;
pub mod catalog_service;
pub mod config;
pub mod error;
pub mod learning_service;
pub mod media_service;
pub mod walkthrough_service;

pub use tutorial_core::Clock;

pub use admin_service::{AdminService, DashboardStats};
pub use app_services::AppServices;
pub use auth_service::{AuthService, SessionContext};
pub use backend::{Backend, HttpBackend, InMemoryBackend, UploadedMedia};
pub use catalog_service::{CatalogPage, CatalogService, CatalogView};
pub use config::ClientConfig;
pub use error::{AdminError, ApiError, AppServicesError, ErrorDisplay, SessionError};
pub use learning_service::LearningService;
pub use media_service::MediaService;
pub use walkthrough_service::{ProgressSave, StepOutcome, WalkthroughService};
