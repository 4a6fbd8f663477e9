//! Client configuration, read from the environment at startup.
//!
//! A `.env` file in the working directory is honoured for local runs.

use std::env;

use url::Url;

pub const DEFAULT_API_ORIGIN: &str = "http://localhost:5000";
pub const DEFAULT_SESSION_DB: &str = "sqlite://session.sqlite3";
pub const DEFAULT_PROGRESS_RETRIES: u32 = 2;
pub const DEFAULT_LOG_FILTER: &str = "info";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// Backend API root, `<origin>/api/`.
    pub api_root: Url,
    pub media_cloud_name: Option<String>,
    pub session_db: String,
    /// Extra attempts after a failed progress write.
    pub progress_retries: u32,
    pub log_filter: String,
}

impl ClientConfig {
    /// Load from environment variables, after `.env` outside of tests.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` for a malformed API origin or retry count.
    pub fn from_env() -> Result<Self, ConfigError> {
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load through an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` for a malformed API origin or retry count.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let origin = var("TUTORIAL_API_URL").unwrap_or_else(|| DEFAULT_API_ORIGIN.to_owned());
        let api_root = api_root_for(&origin)?;

        let media_cloud_name = var("TUTORIAL_MEDIA_CLOUD_NAME").map(|v| v.trim().to_owned());
        let session_db = var("TUTORIAL_SESSION_DB").unwrap_or_else(|| DEFAULT_SESSION_DB.to_owned());

        let progress_retries = match var("TUTORIAL_PROGRESS_RETRIES") {
            None => DEFAULT_PROGRESS_RETRIES,
            Some(raw) => raw.trim().parse::<u32>().map_err(|e| {
                ConfigError::InvalidValue("TUTORIAL_PROGRESS_RETRIES".to_string(), e.to_string())
            })?,
        };

        let log_filter = var("RUST_LOG").unwrap_or_else(|| DEFAULT_LOG_FILTER.to_owned());

        Ok(Self {
            api_root,
            media_cloud_name,
            session_db,
            progress_retries,
            log_filter,
        })
    }

    /// Replace the backend origin (the `--api` flag).
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if `origin` is not an http(s) URL.
    pub fn with_api_origin(mut self, origin: &str) -> Result<Self, ConfigError> {
        self.api_root = api_root_for(origin)?;
        Ok(self)
    }

    #[must_use]
    pub fn with_session_db(mut self, url: impl Into<String>) -> Self {
        self.session_db = url.into();
        self
    }
}

/// `<origin>/api/`, tolerating a trailing slash or an origin that already
/// ends in `/api`.
fn api_root_for(origin: &str) -> Result<Url, ConfigError> {
    let invalid = |msg: String| ConfigError::InvalidValue("TUTORIAL_API_URL".to_string(), msg);
    let mut url = Url::parse(origin.trim()).map_err(|e| invalid(e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid(format!("unsupported scheme '{}'", url.scheme())));
    }
    let path = url.path().trim_end_matches('/').to_owned();
    let path = if path.ends_with("/api") {
        format!("{path}/")
    } else {
        format!("{path}/api/")
    };
    url.set_path(&path);
    url.set_query(None);
    Ok(url)
}
