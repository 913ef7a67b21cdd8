//! Comparison matrix projection
//!
//! The matrix is rebuilt on every request and never cached. Columns follow
//! list order; an item the catalog cannot resolve keeps its column with
//! every cell marked missing.

use futures::future::join_all;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, warn};

use super::{AttributeSet, ComparisonStore, ItemId, Owner};
use crate::catalog::{CatalogItem, CatalogLookup};
use crate::Result;

/// Glyph shown for an attribute the item does not define
pub const PLACEHOLDER: &str = "-";

/// One matrix cell
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Cell {
    /// Attribute value as supplied by the catalog
    Value { text: String },
    /// Item exists but has no value for this attribute
    Placeholder,
    /// Catalog lookup for the item failed
    Missing,
}

impl Cell {
    /// Display text for the cell
    pub fn text(&self) -> &str {
        match self {
            Cell::Value { text } => text.as_str(),
            Cell::Placeholder | Cell::Missing => PLACEHOLDER,
        }
    }
}

/// Header row cell: identity, image and link of one item
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnHeader {
    pub item_id: ItemId,
    pub available: bool,
    pub name: Option<String>,
    pub image_url: Option<String>,
    pub url: Option<String>,
}

/// Attribute row
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatrixRow {
    pub key: String,
    pub label: String,
    pub cells: Vec<Cell>,
}

/// Action row cell: remove from comparison and view product
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActionCell {
    pub item_id: ItemId,
    pub view_url: Option<String>,
}

/// Row-oriented comparison table
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComparisonMatrix {
    pub header: Vec<ColumnHeader>,
    pub rows: Vec<MatrixRow>,
    pub actions: Vec<ActionCell>,
}

impl ComparisonMatrix {
    /// Build from list order and per-item lookup results (same length and order)
    pub fn build(
        items: &[ItemId],
        resolved: &[Option<CatalogItem>],
        attributes: &AttributeSet,
    ) -> Self {
        debug_assert_eq!(items.len(), resolved.len());

        let header = items
            .iter()
            .zip(resolved)
            .map(|(id, found)| ColumnHeader {
                item_id: *id,
                available: found.is_some(),
                name: found.as_ref().map(|c| c.name.clone()),
                image_url: found.as_ref().and_then(|c| c.image_url.clone()),
                url: found.as_ref().map(|c| c.url.clone()),
            })
            .collect();

        let rows = attributes
            .iter()
            .map(|attr| MatrixRow {
                key: attr.key.clone(),
                label: attr.label.clone(),
                cells: resolved
                    .iter()
                    .map(|found| match found {
                        None => Cell::Missing,
                        Some(item) => match item.attribute(&attr.key) {
                            Some(text) => Cell::Value {
                                text: text.to_string(),
                            },
                            None => Cell::Placeholder,
                        },
                    })
                    .collect(),
            })
            .collect();

        let actions = items
            .iter()
            .zip(resolved)
            .map(|(id, found)| ActionCell {
                item_id: *id,
                view_url: found.as_ref().map(|c| c.url.clone()),
            })
            .collect();

        Self {
            header,
            rows,
            actions,
        }
    }

    pub fn column_count(&self) -> usize {
        self.header.len()
    }

    /// Attribute row by key
    pub fn row(&self, key: &str) -> Option<&MatrixRow> {
        self.rows.iter().find(|r| r.key == key)
    }
}

/// Result of a projection
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Projection {
    /// Owner has nothing in comparison
    Empty,
    Matrix(ComparisonMatrix),
}

/// Read-only join of comparison lists against the catalog
#[derive(Clone)]
pub struct ComparisonProjector {
    store: ComparisonStore,
    catalog: Arc<dyn CatalogLookup>,
}

impl ComparisonProjector {
    pub fn new(store: ComparisonStore, catalog: Arc<dyn CatalogLookup>) -> Self {
        Self { store, catalog }
    }

    /// Project the owner's list against `attributes`
    ///
    /// Lookups run concurrently; failures only degrade their own column.
    pub async fn project(&self, owner: &Owner, attributes: &AttributeSet) -> Result<Projection> {
        let items = self.store.get(owner).await?;
        if items.is_empty() {
            return Ok(Projection::Empty);
        }

        let lookups = items.iter().map(|id| self.resolve(*id));
        let resolved: Vec<Option<CatalogItem>> = join_all(lookups).await;

        debug!(
            "Projected {} items x {} attributes for {}",
            items.len(),
            attributes.len(),
            owner
        );

        Ok(Projection::Matrix(ComparisonMatrix::build(
            &items, &resolved, attributes,
        )))
    }

    async fn resolve(&self, id: ItemId) -> Option<CatalogItem> {
        match self.catalog.lookup(id).await {
            Ok(Some(item)) => Some(item),
            Ok(None) => {
                warn!("Product {} not found in catalog", id);
                None
            }
            Err(e) => {
                warn!("Catalog lookup for product {} failed: {}", id, e);
                None
            }
        }
    }
}
