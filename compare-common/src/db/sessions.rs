//! Browser sessions
//!
//! A session starts anonymous (`user_guid` NULL) and is bound to a user at
//! login. Its anti-forgery token never changes.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::api::auth::generate_token;
use crate::Result;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRecord {
    pub session_id: String,
    pub user_guid: Option<String>,
    pub csrf_token: String,
    pub created_at: DateTime<Utc>,
}

/// Start a new anonymous session
pub async fn create_session(pool: &SqlitePool) -> Result<SessionRecord> {
    let session = SessionRecord {
        session_id: Uuid::new_v4().to_string(),
        user_guid: None,
        csrf_token: generate_token(),
        created_at: Utc::now(),
    };

    sqlx::query(
        "INSERT INTO sessions (session_id, user_guid, csrf_token, created_at) VALUES (?, NULL, ?, ?)",
    )
    .bind(&session.session_id)
    .bind(&session.csrf_token)
    .bind(session.created_at)
    .execute(pool)
    .await?;

    Ok(session)
}

pub async fn load_session(pool: &SqlitePool, session_id: &str) -> Result<Option<SessionRecord>> {
    let row: Option<(String, Option<String>, String, DateTime<Utc>)> = sqlx::query_as(
        "SELECT session_id, user_guid, csrf_token, created_at FROM sessions WHERE session_id = ?",
    )
    .bind(session_id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|(session_id, user_guid, csrf_token, created_at)| SessionRecord {
        session_id,
        user_guid,
        csrf_token,
        created_at,
    }))
}

/// Attach a user to the session (login)
pub async fn bind_user(pool: &SqlitePool, session_id: &str, user_guid: &str) -> Result<()> {
    sqlx::query("UPDATE sessions SET user_guid = ? WHERE session_id = ?")
        .bind(user_guid)
        .bind(session_id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Detach the user from the session (logout)
pub async fn unbind_user(pool: &SqlitePool, session_id: &str) -> Result<()> {
    sqlx::query("UPDATE sessions SET user_guid = NULL WHERE session_id = ?")
        .bind(session_id)
        .execute(pool)
        .await?;
    Ok(())
}
