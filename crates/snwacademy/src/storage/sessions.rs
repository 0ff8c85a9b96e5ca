//! Admin session persistence.

use async_trait::async_trait;
use chrono::{Duration, SubsecRound, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use tracing::debug;

use crate::auth::{Session, SessionStore};
use crate::error::{Error, Result};

use super::{decode_time, encode_time, SqliteStore};

/// Reject mutations from sessions that are unknown or expired.
pub(super) fn verify(conn: &Connection, token: &str) -> Result<()> {
    let expires_at: Option<String> = conn
        .query_row(
            "SELECT expires_at FROM sessions WHERE token = ?1",
            [token],
            |row| row.get(0),
        )
        .optional()?;

    let Some(expires_at) = expires_at else {
        return Err(Error::auth("session not found"));
    };
    if decode_time(0, &expires_at)? <= Utc::now() {
        return Err(Error::auth("session expired"));
    }
    Ok(())
}

impl SqliteStore {
    fn insert_session(&self, email: &str, ttl: Duration) -> Result<Session> {
        let now = Utc::now().trunc_subsecs(6);
        let expires_at = now
            .checked_add_signed(ttl)
            .ok_or_else(|| Error::internal(format!("session lifetime out of range: {ttl}")))?;
        let session = Session {
            token: uuid::Uuid::new_v4().to_string(),
            email: email.to_string(),
            created_at: now,
            expires_at,
        };

        let conn = self.lock()?;
        let pruned = conn.execute(
            "DELETE FROM sessions WHERE expires_at <= ?1",
            [encode_time(now)],
        )?;
        if pruned > 0 {
            debug!("Pruned {} expired sessions", pruned);
        }
        conn.execute(
            "INSERT INTO sessions (token, email, created_at, expires_at) VALUES (?1, ?2, ?3, ?4)",
            params![
                session.token,
                session.email,
                encode_time(session.created_at),
                encode_time(session.expires_at),
            ],
        )?;
        Ok(session)
    }

    fn select_session(&self, token: &str) -> Result<Option<Session>> {
        let conn = self.lock()?;
        let session = conn
            .query_row(
                "SELECT token, email, created_at, expires_at FROM sessions WHERE token = ?1",
                [token],
                |row| {
                    let created_at: String = row.get(2)?;
                    let expires_at: String = row.get(3)?;
                    Ok(Session {
                        token: row.get(0)?,
                        email: row.get(1)?,
                        created_at: decode_time(2, &created_at)?,
                        expires_at: decode_time(3, &expires_at)?,
                    })
                },
            )
            .optional()?;
        Ok(session)
    }

    fn delete_session(&self, token: &str) -> Result<bool> {
        let conn = self.lock()?;
        let affected = conn.execute("DELETE FROM sessions WHERE token = ?1", [token])?;
        Ok(affected > 0)
    }
}

#[async_trait]
impl SessionStore for SqliteStore {
    async fn create_session(&self, email: &str, ttl: Duration) -> Result<Session> {
        self.insert_session(email, ttl)
    }

    async fn find_session(&self, token: &str) -> Result<Option<Session>> {
        self.select_session(token)
    }

    async fn revoke_session(&self, token: &str) -> Result<bool> {
        self.delete_session(token)
    }
}
