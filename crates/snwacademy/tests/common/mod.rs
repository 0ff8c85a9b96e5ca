//! Shared fixtures for the view tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use snwacademy::auth::hash_password;
use snwacademy::config::AdminConfig;
use snwacademy::{
    Access, AdminSession, AuthGuard, ChangeFeed, ChangeSubscription, Error, Formation,
    FormationField, FormationForm, FormationStore, FormationsCache, NewFormation,
    PartialFormation, Result, SessionStore, SqliteStore,
};

pub const ADMIN_EMAIL: &str = "admin@snw-academy.ma";
pub const ADMIN_PASSWORD: &str = "correct horse";

/// How long to wait for the cache relay before failing a test.
pub const RELAY_TIMEOUT: Duration = Duration::from_secs(2);

pub fn admin_config() -> AdminConfig {
    AdminConfig {
        email: ADMIN_EMAIL.to_string(),
        password_hash: Some(hash_password(ADMIN_PASSWORD)),
        session_ttl_hours: 1,
    }
}

pub fn guard(sessions: Arc<dyn SessionStore>) -> AuthGuard {
    AuthGuard::new(sessions, &admin_config())
}

/// Log in and return the session token.
pub async fn login(guard: &AuthGuard) -> String {
    guard
        .login(ADMIN_EMAIL, ADMIN_PASSWORD)
        .await
        .expect("login failed")
        .token
}

/// Log in and return the granted capability.
pub async fn admin_session(guard: &AuthGuard) -> AdminSession {
    let token = login(guard).await;
    match guard.check(Some(&token)).await.expect("check failed") {
        Access::Granted(session) => session,
        Access::Redirect(_) => panic!("fresh session was refused"),
    }
}

/// A store, a cache over it and a guard sharing its sessions.
pub struct Harness {
    pub store: Arc<SqliteStore>,
    pub cache: FormationsCache,
    pub guard: AuthGuard,
}

impl Harness {
    pub fn new() -> Self {
        let store = Arc::new(SqliteStore::open_in_memory().expect("failed to open store"));
        Self {
            cache: FormationsCache::new(store.clone()),
            guard: guard(store.clone()),
            store,
        }
    }

    /// Insert formations with the given titles, in order.
    pub async fn seed(&self, titles: &[&str]) -> Vec<Formation> {
        let session = admin_session(&self.guard).await;
        let mut rows = Vec::with_capacity(titles.len());
        for title in titles {
            let new = FormationForm::new(*title, format!("About {title}"))
                .validate()
                .expect("invalid seed");
            rows.push(self.store.insert(&session, new).await.expect("seed insert failed"));
        }
        rows
    }
}

pub fn titles(formations: &[Formation]) -> Vec<String> {
    formations.iter().map(|f| f.title.clone()).collect()
}

/// Delegates to a [`SqliteStore`] and counts mutation calls.
pub struct CountingStore {
    pub inner: Arc<SqliteStore>,
    pub inserts: AtomicUsize,
    pub deletes: AtomicUsize,
}

impl CountingStore {
    pub fn new(inner: Arc<SqliteStore>) -> Self {
        Self {
            inner,
            inserts: AtomicUsize::new(0),
            deletes: AtomicUsize::new(0),
        }
    }

    pub fn insert_calls(&self) -> usize {
        self.inserts.load(Ordering::SeqCst)
    }

    pub fn delete_calls(&self) -> usize {
        self.deletes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FormationStore for CountingStore {
    async fn list_all(&self) -> Result<Vec<Formation>> {
        self.inner.list_all().await
    }

    async fn list_projection(&self, fields: &[FormationField]) -> Result<Vec<PartialFormation>> {
        self.inner.list_projection(fields).await
    }

    async fn insert(&self, session: &AdminSession, new: NewFormation) -> Result<Formation> {
        self.inserts.fetch_add(1, Ordering::SeqCst);
        self.inner.insert(session, new).await
    }

    async fn delete(&self, session: &AdminSession, id: &str) -> Result<()> {
        self.deletes.fetch_add(1, Ordering::SeqCst);
        self.inner.delete(session, id).await
    }

    fn subscribe(&self) -> ChangeSubscription {
        self.inner.subscribe()
    }
}

/// A store whose every call fails, as if the backend were unreachable.
pub struct UnreachableStore {
    feed: ChangeFeed,
}

impl UnreachableStore {
    pub fn new() -> Self {
        Self {
            feed: ChangeFeed::new(8),
        }
    }
}

#[async_trait]
impl FormationStore for UnreachableStore {
    async fn list_all(&self) -> Result<Vec<Formation>> {
        Err(Error::fetch("connection refused"))
    }

    async fn list_projection(&self, _fields: &[FormationField]) -> Result<Vec<PartialFormation>> {
        Err(Error::fetch("connection refused"))
    }

    async fn insert(&self, _session: &AdminSession, _new: NewFormation) -> Result<Formation> {
        Err(Error::mutation("insert", "connection refused"))
    }

    async fn delete(&self, _session: &AdminSession, _id: &str) -> Result<()> {
        Err(Error::mutation("delete", "connection refused"))
    }

    fn subscribe(&self) -> ChangeSubscription {
        self.feed.subscribe()
    }
}
