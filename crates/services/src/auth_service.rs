use std::sync::{Arc, RwLock};

use tracing::{info, warn};

use storage::repository::SessionStore;
use tutorial_core::model::{AuthToken, Credentials, RegistrationForm, Session, User};

use crate::backend::Backend;
use crate::error::{ApiError, SessionError};

/// The signed-in session, shared by every service that needs a token.
///
/// Handed to services explicitly; nothing reads the session store behind the
/// caller's back.
#[derive(Clone, Default)]
pub struct SessionContext {
    inner: Arc<RwLock<Option<Session>>>,
}

impl SessionContext {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn current(&self) -> Option<Session> {
        match self.inner.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    #[must_use]
    pub fn token(&self) -> Option<AuthToken> {
        self.current().map(|s| s.token)
    }

    #[must_use]
    pub fn user(&self) -> Option<User> {
        self.current().map(|s| s.user)
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.current().is_some()
    }

    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.current().is_some_and(|s| s.is_admin())
    }

    /// Token of an admin session, `None` otherwise.
    #[must_use]
    pub fn admin_token(&self) -> Option<AuthToken> {
        self.current().filter(Session::is_admin).map(|s| s.token)
    }

    pub(crate) fn set(&self, session: Option<Session>) {
        match self.inner.write() {
            Ok(mut guard) => *guard = session,
            Err(poisoned) => *poisoned.into_inner() = session,
        }
    }
}

/// Sign-in, sign-up and sign-out against the backend, mirrored into the
/// durable session store.
#[derive(Clone)]
pub struct AuthService {
    backend: Arc<dyn Backend>,
    store: Arc<dyn SessionStore>,
    context: SessionContext,
}

impl AuthService {
    #[must_use]
    pub fn new(
        backend: Arc<dyn Backend>,
        store: Arc<dyn SessionStore>,
        context: SessionContext,
    ) -> Self {
        Self {
            backend,
            store,
            context,
        }
    }

    #[must_use]
    pub fn context(&self) -> &SessionContext {
        &self.context
    }

    /// Read the persisted session once at startup.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Storage` if the store cannot be read.
    pub async fn restore(&self) -> Result<Option<Session>, SessionError> {
        let session = self.store.load().await?;
        self.context.set(session.clone());
        Ok(session)
    }

    /// # Errors
    ///
    /// Field errors for blank input, otherwise the backend's answer.
    pub async fn login(&self, credentials: Credentials) -> Result<Session, SessionError> {
        let credentials = credentials.validate()?;
        let session = self.backend.login(&credentials).await?;
        self.adopt(&session).await;
        info!(user = %session.user.username, "signed in");
        Ok(session)
    }

    /// Like `login`, but only admin and superadmin accounts get in; anything
    /// else is turned away without touching the store.
    ///
    /// # Errors
    ///
    /// `SessionError::NotAdmin` for a member account.
    pub async fn admin_login(&self, credentials: Credentials) -> Result<Session, SessionError> {
        let credentials = credentials.validate()?;
        let session = self.backend.login(&credentials).await?;
        if !session.is_admin() {
            warn!(user = %session.user.username, "non-admin account refused");
            return Err(SessionError::NotAdmin);
        }
        self.adopt(&session).await;
        info!(user = %session.user.username, "admin signed in");
        Ok(session)
    }

    /// # Errors
    ///
    /// Every failing field at once, or the backend's rejection.
    pub async fn register(&self, form: RegistrationForm) -> Result<(), SessionError> {
        let registration = form.validate()?;
        self.backend.register(&registration).await?;
        info!(user = %registration.username, "account registered");
        Ok(())
    }

    /// Register, then sign in with the same credentials.
    ///
    /// # Errors
    ///
    /// See `register` and `login`.
    pub async fn register_and_login(&self, form: RegistrationForm) -> Result<Session, SessionError> {
        let credentials = Credentials::new(form.email.clone(), form.password.clone());
        self.register(form).await?;
        self.login(credentials).await
    }

    /// # Errors
    ///
    /// Returns `SessionError::Storage` if the stored entries cannot be removed;
    /// the in-memory session is cleared regardless.
    pub async fn logout(&self) -> Result<(), SessionError> {
        let user = self.context.user();
        self.context.set(None);
        self.store.clear().await?;
        if let Some(user) = user {
            info!(user = %user.username, "signed out");
        }
        Ok(())
    }

    /// Re-read the profile from `GET /auth/me`. A rejected token ends the
    /// session.
    ///
    /// # Errors
    ///
    /// `SessionError::SignedOut` without a session, otherwise the backend's answer.
    pub async fn refresh_profile(&self) -> Result<User, SessionError> {
        let token = self.context.token().ok_or(SessionError::SignedOut)?;
        match self.backend.current_user(&token).await {
            Ok(user) => {
                self.adopt(&Session::new(user.clone(), token)).await;
                Ok(user)
            }
            Err(ApiError::Unauthorized) => {
                self.logout().await?;
                Err(ApiError::Unauthorized.into())
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Persisting is best effort: the session stays usable for this run even
    /// when the store refuses it.
    async fn adopt(&self, session: &Session) {
        if let Err(err) = self.store.save(session).await {
            warn!(error = %err, "session not persisted");
        }
        self.context.set(Some(session.clone()));
    }
}
