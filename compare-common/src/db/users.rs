//! Account records consulted at login

use serde::Serialize;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::api::auth::{generate_salt, hash_password, verify_password};
use crate::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserRecord {
    pub guid: String,
    pub username: String,
    pub role: String,
}

/// Create an account; usernames are unique
pub async fn create_user(
    pool: &SqlitePool,
    username: &str,
    password: &str,
    role: &str,
) -> Result<UserRecord> {
    if username.trim().is_empty() {
        return Err(Error::InvalidInput("Username must not be empty".to_string()));
    }

    let guid = Uuid::new_v4().to_string();
    let salt = generate_salt();
    let hash = hash_password(&salt, password);

    let result = sqlx::query(
        "INSERT INTO users (guid, username, password_hash, password_salt, role) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(&guid)
    .bind(username)
    .bind(&hash)
    .bind(&salt)
    .bind(role)
    .execute(pool)
    .await;

    match result {
        Ok(_) => Ok(UserRecord {
            guid,
            username: username.to_string(),
            role: role.to_string(),
        }),
        Err(sqlx::Error::Database(e)) if e.is_unique_violation() => Err(Error::InvalidInput(
            format!("Username already exists: {}", username),
        )),
        Err(e) => Err(e.into()),
    }
}

pub async fn find_user(pool: &SqlitePool, guid: &str) -> Result<Option<UserRecord>> {
    let row: Option<(String, String, String)> =
        sqlx::query_as("SELECT guid, username, role FROM users WHERE guid = ?")
            .bind(guid)
            .fetch_optional(pool)
            .await?;

    Ok(row.map(|(guid, username, role)| UserRecord {
        guid,
        username,
        role,
    }))
}

/// The account matching `username` and `password`, if any
pub async fn verify_credentials(
    pool: &SqlitePool,
    username: &str,
    password: &str,
) -> Result<Option<UserRecord>> {
    let row: Option<(String, String, String, String, String)> = sqlx::query_as(
        "SELECT guid, username, role, password_hash, password_salt FROM users WHERE username = ?",
    )
    .bind(username)
    .fetch_optional(pool)
    .await?;

    Ok(row.and_then(|(guid, username, role, hash, salt)| {
        verify_password(&salt, password, &hash).then_some(UserRecord {
            guid,
            username,
            role,
        })
    }))
}
