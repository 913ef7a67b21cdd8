//! Key-value owner attribute store
//!
//! Every entry is addressed by `(owner_key, meta_key)` and written with a
//! single upsert, so each list mutation is one atomic write.

use async_trait::async_trait;
use sqlx::SqlitePool;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::info;

use crate::config::{SETTING_ATTRIBUTES, SETTING_BUTTON_POSITION, SETTING_TABLE_STYLE};
use crate::compare::COMPARE_LIST_META_KEY;
use crate::Result;

/// Persistence seam for per-owner values
#[async_trait]
pub trait MetaStore: Send + Sync {
    /// Read a value; `None` when nothing is stored
    async fn get_meta(&self, owner_key: &str, meta_key: &str) -> Result<Option<String>>;

    /// Insert or replace a value
    async fn set_meta(&self, owner_key: &str, meta_key: &str, value: &str) -> Result<()>;

    /// Remove a value; removing an absent value is not an error
    async fn delete_meta(&self, owner_key: &str, meta_key: &str) -> Result<()>;
}

/// `user_meta` table implementation
#[derive(Clone)]
pub struct SqliteMetaStore {
    pool: SqlitePool,
}

impl SqliteMetaStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MetaStore for SqliteMetaStore {
    async fn get_meta(&self, owner_key: &str, meta_key: &str) -> Result<Option<String>> {
        let value = sqlx::query_scalar(
            "SELECT meta_value FROM user_meta WHERE owner_key = ? AND meta_key = ?",
        )
        .bind(owner_key)
        .bind(meta_key)
        .fetch_optional(&self.pool)
        .await?;

        Ok(value)
    }

    async fn set_meta(&self, owner_key: &str, meta_key: &str, value: &str) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO user_meta (owner_key, meta_key, meta_value, updated_at)
            VALUES (?, ?, ?, CURRENT_TIMESTAMP)
            ON CONFLICT(owner_key, meta_key)
            DO UPDATE SET meta_value = excluded.meta_value, updated_at = CURRENT_TIMESTAMP
            "#,
        )
        .bind(owner_key)
        .bind(meta_key)
        .bind(value)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn delete_meta(&self, owner_key: &str, meta_key: &str) -> Result<()> {
        sqlx::query("DELETE FROM user_meta WHERE owner_key = ? AND meta_key = ?")
            .bind(owner_key)
            .bind(meta_key)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}

/// Process-local implementation for embedding and tests
#[derive(Default)]
pub struct MemoryMetaStore {
    entries: RwLock<HashMap<(String, String), String>>,
}

impl MemoryMetaStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every stored entry
    pub async fn snapshot(&self) -> HashMap<(String, String), String> {
        self.entries.read().await.clone()
    }
}

#[async_trait]
impl MetaStore for MemoryMetaStore {
    async fn get_meta(&self, owner_key: &str, meta_key: &str) -> Result<Option<String>> {
        let entries = self.entries.read().await;
        Ok(entries
            .get(&(owner_key.to_string(), meta_key.to_string()))
            .cloned())
    }

    async fn set_meta(&self, owner_key: &str, meta_key: &str, value: &str) -> Result<()> {
        self.entries
            .write()
            .await
            .insert((owner_key.to_string(), meta_key.to_string()), value.to_string());
        Ok(())
    }

    async fn delete_meta(&self, owner_key: &str, meta_key: &str) -> Result<()> {
        self.entries
            .write()
            .await
            .remove(&(owner_key.to_string(), meta_key.to_string()));
        Ok(())
    }
}

/// Counts of rows removed by [`purge_compare_data`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PurgeReport {
    pub lists_removed: u64,
    pub settings_removed: u64,
}

/// Remove every comparison list and the comparison settings
///
/// Runs in one transaction; on error nothing is removed.
pub async fn purge_compare_data(pool: &SqlitePool) -> Result<PurgeReport> {
    let mut tx = pool.begin().await?;

    let lists_removed = sqlx::query("DELETE FROM user_meta WHERE meta_key = ?")
        .bind(COMPARE_LIST_META_KEY)
        .execute(&mut *tx)
        .await?
        .rows_affected();

    let settings_removed = sqlx::query("DELETE FROM settings WHERE key IN (?, ?, ?)")
        .bind(SETTING_BUTTON_POSITION)
        .bind(SETTING_ATTRIBUTES)
        .bind(SETTING_TABLE_STYLE)
        .execute(&mut *tx)
        .await?
        .rows_affected();

    tx.commit().await?;

    info!(
        "Purged comparison data: {} lists, {} settings",
        lists_removed, settings_removed
    );

    Ok(PurgeReport {
        lists_removed,
        settings_removed,
    })
}
