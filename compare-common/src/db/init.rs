//! Database initialization
//!
//! Creates the database on first run and brings every table up to the
//! current schema. All statements are idempotent, so opening an existing
//! database runs the same path.

use crate::compare::AttributeSet;
use crate::config::{
    ButtonPosition, TableStyle, SETTING_ATTRIBUTES, SETTING_BUTTON_POSITION, SETTING_TABLE_STYLE,
};
use crate::Result;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::path::Path;
use tracing::info;

/// Initialize database connection and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    // Create parent directory if it doesn't exist
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .connect(&db_url)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    sqlx::query("PRAGMA foreign_keys = ON")
        .execute(&pool)
        .await?;

    // WAL lets readers proceed while a list write is in flight
    sqlx::query("PRAGMA journal_mode = WAL")
        .execute(&pool)
        .await?;

    sqlx::query("PRAGMA busy_timeout = 5000")
        .execute(&pool)
        .await?;

    create_schema(&pool).await?;
    init_default_settings(&pool).await?;

    Ok(pool)
}

/// Create every table used by the service
pub async fn create_schema(pool: &SqlitePool) -> Result<()> {
    create_settings_table(pool).await?;
    create_users_table(pool).await?;
    create_sessions_table(pool).await?;
    create_user_meta_table(pool).await?;
    create_catalog_tables(pool).await?;
    Ok(())
}

/// Create the settings table
///
/// Stores runtime configuration key-value pairs.
pub async fn create_settings_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS settings (
            key TEXT PRIMARY KEY,
            value TEXT,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_users_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            guid TEXT PRIMARY KEY,
            username TEXT NOT NULL UNIQUE,
            password_hash TEXT NOT NULL,
            password_salt TEXT NOT NULL,
            role TEXT NOT NULL DEFAULT 'customer',
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_sessions_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS sessions (
            session_id TEXT PRIMARY KEY,
            user_guid TEXT REFERENCES users(guid) ON DELETE SET NULL,
            csrf_token TEXT NOT NULL,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_user_meta_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS user_meta (
            owner_key TEXT NOT NULL,
            meta_key TEXT NOT NULL,
            meta_value TEXT NOT NULL,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            PRIMARY KEY (owner_key, meta_key)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Catalog tables are filled by the storefront; the service only reads them
async fn create_catalog_tables(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS catalog_items (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            permalink TEXT NOT NULL,
            image_url TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS catalog_attributes (
            item_id INTEGER NOT NULL REFERENCES catalog_items(id) ON DELETE CASCADE,
            attr_key TEXT NOT NULL,
            attr_value TEXT,
            PRIMARY KEY (item_id, attr_key)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Ensure every comparison setting exists
///
/// Existing values are never overwritten; NULL values are reset.
async fn init_default_settings(pool: &SqlitePool) -> Result<()> {
    ensure_setting(pool, SETTING_BUTTON_POSITION, ButtonPosition::default().as_str()).await?;
    ensure_setting(pool, SETTING_ATTRIBUTES, &AttributeSet::default().to_json()?).await?;
    ensure_setting(pool, SETTING_TABLE_STYLE, TableStyle::default().as_str()).await?;

    info!("Default settings initialized");
    Ok(())
}

/// Insert a setting if missing, or reset it if NULL
async fn ensure_setting(pool: &SqlitePool, key: &str, default_value: &str) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO settings (key, value) VALUES (?, ?)
        ON CONFLICT(key) DO UPDATE SET value = excluded.value WHERE settings.value IS NULL
        "#,
    )
    .bind(key)
    .bind(default_value)
    .execute(pool)
    .await?;

    Ok(())
}
