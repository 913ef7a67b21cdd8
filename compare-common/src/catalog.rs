//! Catalog lookup seam
//!
//! The catalog is owned by the storefront; this service only reads it.

use async_trait::async_trait;
use serde::Serialize;
use sqlx::{Row, SqlitePool};
use std::collections::BTreeMap;

use crate::compare::ItemId;
use crate::Result;

/// Display data for one catalog item
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CatalogItem {
    pub id: ItemId,
    pub name: String,
    pub url: String,
    pub image_url: Option<String>,
    /// Comparable attribute values keyed by attribute key
    pub attributes: BTreeMap<String, String>,
}

impl CatalogItem {
    /// Attribute value, treating blank values as absent
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .get(key)
            .map(|v| v.as_str())
            .filter(|v| !v.trim().is_empty())
    }
}

/// Resolves item ids to display data
#[async_trait]
pub trait CatalogLookup: Send + Sync {
    /// `Ok(None)` when the item does not exist
    async fn lookup(&self, id: ItemId) -> Result<Option<CatalogItem>>;
}

/// Catalog backed by the `catalog_items` / `catalog_attributes` tables
#[derive(Clone)]
pub struct SqliteCatalog {
    pool: SqlitePool,
}

impl SqliteCatalog {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CatalogLookup for SqliteCatalog {
    async fn lookup(&self, id: ItemId) -> Result<Option<CatalogItem>> {
        let raw_id = id.get() as i64;

        let row = sqlx::query("SELECT name, permalink, image_url FROM catalog_items WHERE id = ?")
            .bind(raw_id)
            .fetch_optional(&self.pool)
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let attributes: Vec<(String, Option<String>)> = sqlx::query_as(
            "SELECT attr_key, attr_value FROM catalog_attributes WHERE item_id = ? ORDER BY attr_key",
        )
        .bind(raw_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(Some(CatalogItem {
            id,
            name: row.try_get("name")?,
            url: row.try_get("permalink")?,
            image_url: row.try_get("image_url")?,
            attributes: attributes
                .into_iter()
                .filter_map(|(key, value)| value.map(|v| (key, v)))
                .collect(),
        }))
    }
}
