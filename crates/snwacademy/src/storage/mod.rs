//! Storage layer for snwacademy.
//!
//! [`FormationStore`] is the contract every view is written against;
//! [`SqliteStore`] is the `SQLite`-backed implementation, which also keeps
//! admin sessions.

pub mod migrations;
pub mod schema;
mod sessions;

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use rusqlite::{params, types::Type, Connection, OptionalExtension};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::auth::AdminSession;
use crate::error::{Error, Result};
use crate::feed::{ChangeEvent, ChangeFeed, ChangeKind, ChangeSubscription};
use crate::formation::{Formation, FormationField, FormationLink, NewFormation, PartialFormation};

/// The formations table, as consumed by the views.
#[async_trait]
pub trait FormationStore: Send + Sync {
    /// Every formation, ascending by `created_at`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Fetch`] if the read fails.
    async fn list_all(&self) -> Result<Vec<Formation>>;

    /// Every formation with only `id` and the requested columns filled in,
    /// in the same order as [`list_all`](Self::list_all).
    ///
    /// # Errors
    ///
    /// Returns [`Error::Fetch`] if the read fails.
    async fn list_projection(&self, fields: &[FormationField]) -> Result<Vec<PartialFormation>>;

    /// The `{id, title}` projection used for navigation links.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Fetch`] if the read fails.
    async fn list_links(&self) -> Result<Vec<FormationLink>> {
        let rows = self.list_projection(&[FormationField::Title]).await?;
        Ok(rows
            .into_iter()
            .map(|row| FormationLink {
                id: row.id,
                title: row.title.unwrap_or_default(),
            })
            .collect())
    }

    /// Insert a formation; the store assigns `id` and `created_at`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Auth`] if the session is no longer live, or
    /// [`Error::Mutation`] if the write fails.
    async fn insert(&self, session: &AdminSession, new: NewFormation) -> Result<Formation>;

    /// Delete a formation by id.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if no row matches, [`Error::Auth`] if the
    /// session is no longer live, or [`Error::Mutation`] if the write fails.
    async fn delete(&self, session: &AdminSession, id: &str) -> Result<()>;

    /// Subscribe to change notifications for the table.
    fn subscribe(&self) -> ChangeSubscription;
}

/// `SQLite`-backed formation and session store.
///
/// The connection sits behind a mutex and is only ever locked inside
/// synchronous helpers, never across an await.
#[derive(Debug)]
pub struct SqliteStore {
    /// Path to the database file.
    path: PathBuf,
    /// Database connection.
    conn: Mutex<Connection>,
    /// Change notifications for the formations table.
    feed: ChangeFeed,
}

impl SqliteStore {
    /// Open or create a database at the given path.
    ///
    /// Creates the parent directories and database file if they don't exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or schema initialization fails.
    pub fn open(path: impl AsRef<Path>, feed_capacity: usize) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|source| Error::DirectoryCreate {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }

        debug!("Opening database at {}", path.display());
        let conn = Connection::open(&path).map_err(|source| Error::DatabaseOpen {
            path: path.clone(),
            source,
        })?;

        // WAL lets other processes read while the admin writes.
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;
        migrations::initialize_schema(&conn)?;

        info!("Database opened successfully at {}", path.display());
        Ok(Self {
            path,
            conn: Mutex::new(conn),
            feed: ChangeFeed::new(feed_capacity),
        })
    }

    /// Create an in-memory store for testing.
    ///
    /// # Errors
    ///
    /// Returns an error if the in-memory database cannot be created.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|source| Error::DatabaseOpen {
            path: PathBuf::from(":memory:"),
            source,
        })?;

        migrations::initialize_schema(&conn)?;

        Ok(Self {
            path: PathBuf::from(":memory:"),
            conn: Mutex::new(conn),
            feed: ChangeFeed::new(64),
        })
    }

    /// Get the path to the database file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Get the change feed this store publishes to.
    #[must_use]
    pub fn feed(&self) -> &ChangeFeed {
        &self.feed
    }

    /// Watch for commits made by other connections to the same file.
    ///
    /// Every `interval` the store compares `PRAGMA data_version`; a change
    /// publishes [`ChangeEvent::External`]. The task ends once the store is
    /// dropped.
    #[must_use]
    pub fn spawn_change_poller(self: &Arc<Self>, interval: Duration) -> JoinHandle<()> {
        let weak = Arc::downgrade(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut last_version = None;

            loop {
                ticker.tick().await;
                let Some(store) = weak.upgrade() else {
                    debug!("Store dropped, stopping change poller");
                    break;
                };

                match store.data_version() {
                    Ok(version) => {
                        if last_version.is_some_and(|last| last != version) {
                            debug!("External commit detected (data_version {})", version);
                            store.feed.publish(ChangeEvent::External);
                        }
                        last_version = Some(version);
                    }
                    Err(e) => warn!("Change poll failed: {}", e),
                }
            }
        })
    }

    /// Count stored formations.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn count(&self) -> Result<i64> {
        let conn = self.lock()?;
        let count = conn.query_row("SELECT COUNT(*) FROM formations", [], |row| row.get(0))?;
        Ok(count)
    }

    /// Look up a single formation by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn get(&self, id: &str) -> Result<Option<Formation>> {
        let conn = self.lock()?;
        let formation = conn
            .query_row(
                r"
                SELECT id, title, description, duration, students, modules, created_at
                FROM formations WHERE id = ?1
                ",
                [id],
                row_to_formation,
            )
            .optional()?;
        Ok(formation)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| Error::internal("database connection lock poisoned"))
    }

    fn data_version(&self) -> Result<i64> {
        let conn = self.lock()?;
        let version = conn.query_row("PRAGMA data_version", [], |row| row.get(0))?;
        Ok(version)
    }

    fn query_all(&self) -> Result<Vec<Formation>> {
        let conn = self.lock().map_err(Error::fetch)?;
        let mut stmt = conn
            .prepare(
                r"
                SELECT id, title, description, duration, students, modules, created_at
                FROM formations ORDER BY created_at ASC, rowid ASC
                ",
            )
            .map_err(Error::fetch)?;

        let formations = stmt
            .query_map([], row_to_formation)
            .map_err(Error::fetch)?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::fetch)?;
        Ok(formations)
    }

    fn query_projection(&self, fields: &[FormationField]) -> Result<Vec<PartialFormation>> {
        let mut columns: Vec<FormationField> = Vec::with_capacity(fields.len());
        for field in fields {
            if !columns.contains(field) {
                columns.push(*field);
            }
        }

        let mut sql = String::from("SELECT id");
        for field in &columns {
            sql.push_str(", ");
            sql.push_str(field.column());
        }
        sql.push_str(" FROM formations ORDER BY created_at ASC, rowid ASC");

        let conn = self.lock().map_err(Error::fetch)?;
        let mut stmt = conn.prepare(&sql).map_err(Error::fetch)?;
        let rows = stmt
            .query_map([], |row| {
                let mut partial = PartialFormation {
                    id: row.get(0)?,
                    ..PartialFormation::default()
                };
                for (offset, field) in columns.iter().enumerate() {
                    let idx = offset + 1;
                    match field {
                        FormationField::Title => partial.title = row.get(idx)?,
                        FormationField::Description => partial.description = row.get(idx)?,
                        FormationField::Duration => partial.duration = row.get(idx)?,
                        FormationField::Students => partial.students = row.get(idx)?,
                        FormationField::Modules => partial.modules = row.get(idx)?,
                        FormationField::CreatedAt => {
                            let raw: String = row.get(idx)?;
                            partial.created_at = Some(decode_time(idx, &raw)?);
                        }
                    }
                }
                Ok(partial)
            })
            .map_err(Error::fetch)?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::fetch)?;
        Ok(rows)
    }

    fn insert_formation(&self, session: &AdminSession, new: &NewFormation) -> Result<Formation> {
        let conn = self.lock().map_err(keep_auth("insert"))?;
        sessions::verify(&conn, session.token()).map_err(keep_auth("insert"))?;

        let formation = Formation {
            id: uuid::Uuid::new_v4().to_string(),
            title: new.title().to_string(),
            description: new.description().to_string(),
            duration: new.duration().map(str::to_string),
            students: new.students().map(str::to_string),
            modules: new.modules().map(str::to_string),
            created_at: Utc::now().trunc_subsecs(6),
        };
        insert_row(&conn, &formation).map_err(|e| Error::mutation("insert", e))?;
        drop(conn);

        info!("Inserted formation {} ({})", formation.id, formation.title);
        self.feed.publish(ChangeEvent::Row {
            kind: ChangeKind::Insert,
            id: formation.id.clone(),
        });
        Ok(formation)
    }

    fn delete_formation(&self, session: &AdminSession, id: &str) -> Result<()> {
        let conn = self.lock().map_err(keep_auth("delete"))?;
        sessions::verify(&conn, session.token()).map_err(keep_auth("delete"))?;

        let affected = conn
            .execute("DELETE FROM formations WHERE id = ?1", [id])
            .map_err(|e| Error::mutation("delete", e))?;
        drop(conn);

        if affected == 0 {
            return Err(Error::NotFound { id: id.to_string() });
        }

        info!("Deleted formation {}", id);
        self.feed.publish(ChangeEvent::Row {
            kind: ChangeKind::Delete,
            id: id.to_string(),
        });
        Ok(())
    }
}

#[async_trait]
impl FormationStore for SqliteStore {
    async fn list_all(&self) -> Result<Vec<Formation>> {
        self.query_all()
    }

    async fn list_projection(&self, fields: &[FormationField]) -> Result<Vec<PartialFormation>> {
        self.query_projection(fields)
    }

    async fn insert(&self, session: &AdminSession, new: NewFormation) -> Result<Formation> {
        self.insert_formation(session, &new)
    }

    async fn delete(&self, session: &AdminSession, id: &str) -> Result<()> {
        self.delete_formation(session, id)
    }

    fn subscribe(&self) -> ChangeSubscription {
        self.feed.subscribe()
    }
}

/// Report a failure during a mutation as [`Error::Mutation`], except a dead
/// session, which stays [`Error::Auth`] so callers can redirect.
fn keep_auth(action: &'static str) -> impl FnOnce(Error) -> Error {
    move |e| {
        if e.is_auth_error() {
            e
        } else {
            Error::mutation(action, e)
        }
    }
}

fn insert_row(conn: &Connection, formation: &Formation) -> rusqlite::Result<()> {
    conn.execute(
        r"
        INSERT INTO formations (id, title, description, duration, students, modules, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        ",
        params![
            formation.id,
            formation.title,
            formation.description,
            formation.duration,
            formation.students,
            formation.modules,
            encode_time(formation.created_at),
        ],
    )?;
    Ok(())
}

/// Convert a database row to a Formation struct.
fn row_to_formation(row: &rusqlite::Row) -> rusqlite::Result<Formation> {
    let created_at: String = row.get(6)?;
    Ok(Formation {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        duration: row.get(3)?,
        students: row.get(4)?,
        modules: row.get(5)?,
        created_at: decode_time(6, &created_at)?,
    })
}

/// Timestamps are stored with a fixed-width fraction so text order is time order.
pub(crate) fn encode_time(time: DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn decode_time(idx: usize, raw: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}
