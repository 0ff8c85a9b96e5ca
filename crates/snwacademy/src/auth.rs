//! Admin sessions and the authorization guard.
//!
//! Protected views never look at tokens themselves. They ask [`AuthGuard`]
//! and get back either an [`AdminSession`] capability or a [`Redirect`] to
//! the login route.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::AdminConfig;
use crate::error::{Error, Result};
use crate::site::routes;

/// A persisted login session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Session {
    /// Opaque bearer token.
    pub token: String,
    /// Email the session was opened for.
    pub email: String,
    /// When the session was opened.
    pub created_at: DateTime<Utc>,
    /// When the session stops being accepted.
    pub expires_at: DateTime<Utc>,
}

impl Session {
    /// Whether the session is no longer valid at `now`.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// Proof that the guard accepted a session.
///
/// Only the guard (and in-crate tests) can build one, so holding an
/// `AdminSession` means the check has been done.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminSession {
    session: Session,
}

impl AdminSession {
    pub(crate) fn new(session: Session) -> Self {
        Self { session }
    }

    /// Bearer token, as checked by the store on every mutation.
    #[must_use]
    pub fn token(&self) -> &str {
        &self.session.token
    }

    /// Email of the logged-in admin.
    #[must_use]
    pub fn email(&self) -> &str {
        &self.session.email
    }

    /// Expiry time.
    #[must_use]
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.session.expires_at
    }
}

/// Where to send a caller that may not proceed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Redirect {
    /// Target route.
    pub to: &'static str,
}

impl Redirect {
    /// Redirect to the login route.
    #[must_use]
    pub const fn to_login() -> Self {
        Self { to: routes::LOGIN }
    }
}

/// Outcome of a guard check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Access {
    /// The session is live.
    Granted(AdminSession),
    /// The caller must log in first.
    Redirect(Redirect),
}

/// Persistence for login sessions.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Open a session for `email` lasting `ttl`.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the session cannot be saved, or
    /// [`Error::Internal`] if `ttl` pushes the expiry past the supported
    /// date range.
    async fn create_session(&self, email: &str, ttl: Duration) -> Result<Session>;

    /// Look up a session by token, expired or not.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the lookup fails. An unknown token is
    /// `Ok(None)`, not an error.
    async fn find_session(&self, token: &str) -> Result<Option<Session>>;

    /// Delete a session. Returns `false` if it did not exist.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the delete fails.
    async fn revoke_session(&self, token: &str) -> Result<bool>;
}

/// Hash a password the way `admin.password_hash` expects it.
#[must_use]
pub fn hash_password(password: &str) -> String {
    blake3::hash(password.as_bytes()).to_hex().to_string()
}

/// Session-based authorization guard for the admin route.
#[derive(Clone)]
pub struct AuthGuard {
    sessions: Arc<dyn SessionStore>,
    admin_email: String,
    password_hash: Option<String>,
    ttl: Duration,
}

impl std::fmt::Debug for AuthGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthGuard")
            .field("admin_email", &self.admin_email)
            .field("password_configured", &self.password_hash.is_some())
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl AuthGuard {
    /// Create a guard for the configured admin account.
    #[must_use]
    pub fn new(sessions: Arc<dyn SessionStore>, config: &AdminConfig) -> Self {
        Self {
            sessions,
            admin_email: config.email.clone(),
            password_hash: config.password_hash.clone(),
            ttl: Duration::hours(i64::from(config.session_ttl_hours)),
        }
    }

    /// Check credentials and open a session.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Auth`] if the credentials are wrong or no admin
    /// password is configured, or a storage error if the session cannot be
    /// saved.
    pub async fn login(&self, email: &str, password: &str) -> Result<Session> {
        let Some(expected) = &self.password_hash else {
            warn!("Login attempted but admin.password_hash is not configured");
            return Err(Error::auth("admin password is not configured"));
        };
        let expected =
            blake3::Hash::from_hex(expected).map_err(|_| Error::auth("invalid password hash"))?;

        // blake3::Hash equality is constant-time.
        let password_ok = blake3::hash(password.as_bytes()) == expected;
        let email_ok = email.trim().eq_ignore_ascii_case(&self.admin_email);
        if !(password_ok && email_ok) {
            info!("Rejected login for {}", email.trim());
            return Err(Error::auth("invalid email or password"));
        }

        let session = self
            .sessions
            .create_session(&self.admin_email, self.ttl)
            .await?;
        info!("Admin session opened, expires {}", session.expires_at);
        Ok(session)
    }

    /// Decide whether the bearer of `token` may enter a protected view.
    ///
    /// Missing, unknown and expired tokens all redirect to login. Expired
    /// sessions are removed on the way.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the session lookup fails.
    pub async fn check(&self, token: Option<&str>) -> Result<Access> {
        let Some(token) = token.map(str::trim).filter(|t| !t.is_empty()) else {
            debug!("No session token, redirecting to {}", routes::LOGIN);
            return Ok(Access::Redirect(Redirect::to_login()));
        };

        match self.sessions.find_session(token).await? {
            Some(session) if !session.is_expired(Utc::now()) => {
                Ok(Access::Granted(AdminSession::new(session)))
            }
            Some(session) => {
                debug!("Session expired at {}", session.expires_at);
                self.sessions.revoke_session(token).await?;
                Ok(Access::Redirect(Redirect::to_login()))
            }
            None => {
                debug!("Unknown session token");
                Ok(Access::Redirect(Redirect::to_login()))
            }
        }
    }

    /// End a session.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the session cannot be deleted.
    pub async fn logout(&self, session: AdminSession) -> Result<Redirect> {
        if self.sessions.revoke_session(session.token()).await? {
            info!("Admin session closed for {}", session.email());
        }
        Ok(Redirect::to_login())
    }
}
