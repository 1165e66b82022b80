//! Auth service - login, registration and the persisted session
//!
//! Holds the current user and token. The token is persisted through a
//! [`SessionStore`] so it survives restarts; any 401 from the backend
//! clears it. There is no refresh-token rotation.

use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{Duration, Utc};

use crate::config::DEFAULT_IDLE_TIMEOUT_MINS;
use crate::domain::result::{Error, Result};
use crate::domain::token::is_token_expired;
use crate::domain::validation::{validate_credentials, validate_registration};
use crate::domain::{Credentials, Registration, Session, User};
use crate::ports::{SessionStore, WalletApi};

/// Auth state container
pub struct AuthService {
    api: Arc<dyn WalletApi>,
    store: Arc<dyn SessionStore>,
    idle_timeout: Duration,
    current: Mutex<Option<Session>>,
}

impl AuthService {
    pub fn new(api: Arc<dyn WalletApi>, store: Arc<dyn SessionStore>) -> Self {
        Self {
            api,
            store,
            idle_timeout: Duration::minutes(DEFAULT_IDLE_TIMEOUT_MINS),
            current: Mutex::new(None),
        }
    }

    pub fn with_idle_timeout(mut self, idle_timeout: Duration) -> Self {
        self.idle_timeout = idle_timeout;
        self
    }

    fn current(&self) -> Result<MutexGuard<'_, Option<Session>>> {
        self.current
            .lock()
            .map_err(|e| Error::Other(format!("Lock poisoned: {}", e)))
    }

    /// Log in and persist the session
    ///
    /// The profile is fetched right after the token is issued; a login
    /// whose profile cannot be loaded leaves no session behind.
    pub async fn login(&self, credentials: &Credentials) -> Result<User> {
        validate_credentials(&credentials.email, &credentials.password)?;

        let auth = self.api.login(credentials).await?;
        if auth.token.trim().is_empty() {
            return Err(Error::api(
                401,
                auth.message.unwrap_or_else(|| "Login failed".to_string()),
            ));
        }

        self.api.set_token(Some(auth.token.clone()));
        let user = match self.api.profile().await {
            Ok(user) => user,
            Err(e) => {
                self.api.set_token(None);
                return Err(e);
            }
        };

        let session = Session::new(auth.token).with_user(user.clone());
        self.store.save(&session)?;
        *self.current()? = Some(session);
        Ok(user)
    }

    /// Register a new account; returns the backend's confirmation message
    ///
    /// Registration does not log in.
    pub async fn register(&self, form: &Registration) -> Result<String> {
        validate_registration(form)?;
        self.api.register(form).await
    }

    /// Clear local state. The backend keeps no session to invalidate.
    pub fn logout(&self) -> Result<()> {
        self.api.set_token(None);
        *self.current()? = None;
        self.store.clear()
    }

    /// Session check on start
    ///
    /// Returns `Ok(None)` when nobody is logged in. An expired token, an
    /// idle session or a 401 from the profile call clears the stored
    /// session and returns [`Error::SessionExpired`].
    pub async fn restore(&self) -> Result<Option<User>> {
        let Some(mut session) = self.store.load()? else {
            return Ok(None);
        };

        let now = Utc::now();
        if is_token_expired(&session.token, now) || session.is_idle(self.idle_timeout, now) {
            self.logout()?;
            return Err(Error::SessionExpired);
        }

        self.api.set_token(Some(session.token.clone()));
        let user = match self.api.profile().await {
            Ok(user) => user,
            Err(e) if e.is_auth_failure() => {
                self.logout()?;
                return Err(Error::SessionExpired);
            }
            Err(e) => return Err(e),
        };

        session.user = Some(user.clone());
        session.last_activity = now;
        self.store.save(&session)?;
        *self.current()? = Some(session);
        Ok(Some(user))
    }

    /// Like [`restore`](Self::restore) but a missing session is an error
    pub async fn require_user(&self) -> Result<User> {
        self.restore().await?.ok_or(Error::NotAuthenticated)
    }

    /// Record activity on the current session
    pub fn touch(&self) -> Result<()> {
        let now = Utc::now();
        if let Some(session) = self.current()?.as_mut() {
            session.last_activity = now;
        }
        self.store.touch(now)
    }

    /// Drop the session when `err` means the token no longer works
    ///
    /// Returns true when the session was cleared.
    pub fn handle_failure(&self, err: &Error) -> Result<bool> {
        if err.is_auth_failure() {
            self.logout()?;
            return Ok(true);
        }
        Ok(false)
    }

    pub fn current_user(&self) -> Option<User> {
        self.current
            .lock()
            .ok()
            .and_then(|s| s.as_ref().and_then(|s| s.user.clone()))
    }

    pub fn is_logged_in(&self) -> bool {
        self.current.lock().map(|s| s.is_some()).unwrap_or(false)
    }
}
