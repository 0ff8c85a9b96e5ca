//! Session-gated admin page.
//!
//! [`AdminView::enter`] asks the [`AuthGuard`] first; a view only exists
//! for a live [`AdminSession`]. Every action ends in a [`Notification`]
//! describing what happened.

use maud::{html, Markup};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::LoadState;
use crate::auth::{Access, AdminSession, AuthGuard, Redirect};
use crate::cache::{CacheAttachment, FormationsCache, Snapshot};
use crate::error::{Error, Result};
use crate::formation::{Formation, FormationForm};
use crate::site::routes;

/// Shown after a successful insert.
pub const ADDED_MESSAGE: &str = "Formation added successfully.";

/// Shown after a successful delete.
pub const DELETED_MESSAGE: &str = "Formation deleted successfully.";

/// Shown when there are no formations.
pub const EMPTY_MESSAGE: &str = "No formations added yet.";

/// Severity of a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
    /// The action succeeded.
    Success,
    /// The action failed.
    Error,
}

impl NotificationLevel {
    const fn class(self) -> &'static str {
        match self {
            Self::Success => "notification success",
            Self::Error => "notification error",
        }
    }
}

/// Feedback for the last admin action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    /// Severity.
    pub level: NotificationLevel,
    /// Text shown to the admin.
    pub message: String,
}

impl Notification {
    /// A success notification.
    #[must_use]
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Success,
            message: message.into(),
        }
    }

    /// An error notification carrying the error's message.
    #[must_use]
    pub fn error(err: &Error) -> Self {
        Self {
            level: NotificationLevel::Error,
            message: err.to_string(),
        }
    }

    /// Whether this reports a success.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.level == NotificationLevel::Success
    }
}

/// Result of entering the admin route.
#[derive(Debug)]
pub enum AdminEntry {
    /// The session is live and the view is mounted.
    Ready(AdminView),
    /// No live session.
    Redirect(Redirect),
}

/// Result of an add or remove action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionOutcome {
    /// The action ran; see the notification.
    Notified(Notification),
    /// The session died mid-way; the admin must log in again.
    Redirect(Redirect),
}

impl ActionOutcome {
    /// Whether the action succeeded.
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Notified(n) if n.is_success())
    }
}

/// The admin page: formations table plus add form.
#[derive(Debug)]
pub struct AdminView {
    session: AdminSession,
    cache: FormationsCache,
    _attachment: CacheAttachment,
    catalog: watch::Receiver<Snapshot<Formation>>,
    notification: Option<Notification>,
}

impl AdminView {
    /// Check `token` with `guard` and, if it is live, mount the view.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the session lookup fails.
    pub async fn enter(
        guard: &AuthGuard,
        token: Option<&str>,
        cache: &FormationsCache,
    ) -> Result<AdminEntry> {
        let session = match guard.check(token).await? {
            Access::Granted(session) => session,
            Access::Redirect(redirect) => return Ok(AdminEntry::Redirect(redirect)),
        };

        let attachment = cache.attach();
        let mut catalog = cache.watch_catalog();
        cache.refresh_catalog().await;
        catalog.borrow_and_update();
        debug!("Admin view mounted for {}", session.email());

        Ok(AdminEntry::Ready(Self {
            session,
            cache: cache.clone(),
            _attachment: attachment,
            catalog,
            notification: None,
        }))
    }

    /// The session this view acts with.
    #[must_use]
    pub fn session(&self) -> &AdminSession {
        &self.session
    }

    /// Current load state.
    #[must_use]
    pub fn state(&self) -> LoadState {
        LoadState::from(&*self.catalog.borrow())
    }

    /// Every formation, in creation order.
    #[must_use]
    pub fn formations(&self) -> Vec<Formation> {
        self.catalog.borrow().items().to_vec()
    }

    /// The latest notification, if any action has run.
    #[must_use]
    pub fn notification(&self) -> Option<&Notification> {
        self.notification.as_ref()
    }

    /// Validate `form` and insert it.
    ///
    /// Blank required fields are reported without touching the store.
    pub async fn add(&mut self, form: &FormationForm) -> ActionOutcome {
        let new = match form.validate() {
            Ok(new) => new,
            Err(e) => {
                debug!("Rejected formation form: {}", e);
                return self.notify(Notification::error(&e));
            }
        };

        match self.cache.store().insert(&self.session, new).await {
            Ok(formation) => {
                info!("Admin added formation {}", formation.id);
                self.cache.refresh_catalog().await;
                self.notify(Notification::success(ADDED_MESSAGE))
            }
            Err(e) => self.fail(&e),
        }
    }

    /// Delete the formation with `id`.
    pub async fn remove(&mut self, id: &str) -> ActionOutcome {
        match self.cache.store().delete(&self.session, id).await {
            Ok(()) => {
                info!("Admin deleted formation {}", id);
                self.cache.refresh_catalog().await;
                self.notify(Notification::success(DELETED_MESSAGE))
            }
            Err(e) => self.fail(&e),
        }
    }

    /// Revoke the session and leave the admin route.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the session cannot be deleted.
    pub async fn logout(self, guard: &AuthGuard) -> Result<Redirect> {
        guard.logout(self.session).await
    }

    fn notify(&mut self, notification: Notification) -> ActionOutcome {
        self.notification = Some(notification.clone());
        ActionOutcome::Notified(notification)
    }

    fn fail(&mut self, err: &Error) -> ActionOutcome {
        warn!("Admin action failed: {}", err);
        let outcome = self.notify(Notification::error(err));
        if err.is_auth_error() {
            ActionOutcome::Redirect(Redirect::to_login())
        } else {
            outcome
        }
    }

    /// Render the admin page body.
    #[must_use]
    pub fn render(&self) -> Markup {
        let formations = self.formations();
        html! {
            main class="admin" {
                header {
                    h1 { "Formations Admin" }
                    span class="user" { (self.session.email()) }
                    form method="post" action={ (routes::ADMIN) "/logout" } {
                        button type="submit" { "Logout" }
                    }
                }
                @if let Some(notification) = &self.notification {
                    p class=(notification.level.class()) role="status" { (notification.message) }
                }
                section class="add" {
                    h2 { "Add New Formation" }
                    form method="post" action=(routes::ADMIN) {
                        label for="title" { "Title *" }
                        input id="title" name="title" type="text" required;
                        label for="description" { "Description *" }
                        textarea id="description" name="description" required {}
                        label for="duration" { "Duration (months)" }
                        input id="duration" name="duration" type="text";
                        label for="students" { "Students" }
                        input id="students" name="students" type="text";
                        label for="modules" { "Modules" }
                        input id="modules" name="modules" type="text";
                        button type="submit" { "Add Formation" }
                    }
                }
                section class="existing" {
                    h2 { "Existing Formations (" (formations.len()) ")" }
                    @if self.state() == LoadState::Failed {
                        p class="notification error" { "Error fetching formations." }
                    } @else if formations.is_empty() {
                        p class="empty" { (EMPTY_MESSAGE) }
                    } @else {
                        table {
                            thead {
                                tr {
                                    th { "Title" }
                                    th { "Description" }
                                    th { "Duration" }
                                    th { "Students" }
                                    th { "Modules" }
                                    th {}
                                }
                            }
                            tbody {
                                @for formation in &formations {
                                    tr data-id=(formation.id) {
                                        td { (formation.title) }
                                        td { (formation.description) }
                                        td { (formation.duration.as_deref().unwrap_or("-")) }
                                        td { (formation.students.as_deref().unwrap_or("-")) }
                                        td { (formation.modules.as_deref().unwrap_or("-")) }
                                        td {
                                            form method="post" action={ (routes::ADMIN) "/delete/" (formation.id) } {
                                                button type="submit" class="delete" { "Delete" }
                                            }
                                        }
                                    }
                                }
                            }
                        }
                    }
                }
            }
        }
    }
}
