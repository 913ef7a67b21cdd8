//! Comparison list store
//!
//! State machine per owner:
//! `EMPTY → add → NONEMPTY (count < max) → add → FULL (count == max)`.
//! `FULL` only leaves through `remove`; `add` on `FULL` fails without writing.

use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

use super::{ItemId, Owner};
use crate::db::meta::MetaStore;
use crate::{Error, Result};

/// Meta key the list is stored under
pub const COMPARE_LIST_META_KEY: &str = "compare_list";

/// Sole mutator of comparison lists
#[derive(Clone)]
pub struct ComparisonStore {
    meta: Arc<dyn MetaStore>,
    max_items: usize,
}

impl ComparisonStore {
    pub fn new(meta: Arc<dyn MetaStore>, max_items: usize) -> Self {
        Self { meta, max_items }
    }

    pub fn max_items(&self) -> usize {
        self.max_items
    }

    /// Items in insertion order; empty when the owner has no list
    pub async fn get(&self, owner: &Owner) -> Result<Vec<ItemId>> {
        let raw = self
            .meta
            .get_meta(&owner.key(), COMPARE_LIST_META_KEY)
            .await?;

        Ok(match raw {
            Some(raw) => self.decode(owner, &raw),
            None => Vec::new(),
        })
    }

    /// Append `item` unless present; returns the resulting count
    pub async fn add(&self, owner: &Owner, item: ItemId) -> Result<usize> {
        let mut items = self.get(owner).await?;

        if items.contains(&item) {
            debug!("{} already in comparison list of {}", item, owner);
            return Ok(items.len());
        }

        if items.len() >= self.max_items {
            debug!("Comparison list of {} is full, rejecting {}", owner, item);
            return Err(Error::CapacityExceeded {
                max: self.max_items,
            });
        }

        items.push(item);
        self.put(owner, &items).await?;
        debug!("Added {} to comparison list of {} ({} items)", item, owner, items.len());
        Ok(items.len())
    }

    /// Drop `item` if present; returns the resulting count
    pub async fn remove(&self, owner: &Owner, item: ItemId) -> Result<usize> {
        let mut items = self.get(owner).await?;
        let before = items.len();
        items.retain(|i| *i != item);

        if items.len() == before {
            return Ok(before);
        }

        self.put(owner, &items).await?;
        debug!("Removed {} from comparison list of {} ({} items)", item, owner, items.len());
        Ok(items.len())
    }

    /// Remove every item
    pub async fn clear(&self, owner: &Owner) -> Result<()> {
        self.meta
            .delete_meta(&owner.key(), COMPARE_LIST_META_KEY)
            .await?;
        debug!("Cleared comparison list of {}", owner);
        Ok(())
    }

    /// Persist a full list; an empty list removes the entry
    pub(crate) async fn put(&self, owner: &Owner, items: &[ItemId]) -> Result<()> {
        debug_assert!(items.len() <= self.max_items);

        if items.is_empty() {
            return self.clear(owner).await;
        }

        let encoded = serde_json::to_string(items)?;
        self.meta
            .set_meta(&owner.key(), COMPARE_LIST_META_KEY, &encoded)
            .await
    }

    /// Decode a stored list, repairing anything that breaks the invariants
    fn decode(&self, owner: &Owner, raw: &str) -> Vec<ItemId> {
        let entries = match serde_json::from_str::<Value>(raw) {
            Ok(Value::Array(entries)) => entries,
            Ok(_) | Err(_) => {
                warn!("Discarding malformed comparison list of {}: {}", owner, raw);
                return Vec::new();
            }
        };

        let total = entries.len();
        let mut items: Vec<ItemId> = Vec::with_capacity(total.min(self.max_items));
        for entry in &entries {
            if let Ok(item) = ItemId::from_json(entry) {
                if !items.contains(&item) && items.len() < self.max_items {
                    items.push(item);
                }
            }
        }

        if items.len() != total {
            warn!(
                "Normalized comparison list of {}: {} stored entries, {} kept",
                owner,
                total,
                items.len()
            );
        }

        items
    }
}
