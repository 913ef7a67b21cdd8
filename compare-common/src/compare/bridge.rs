//! Login-time reconciliation of anonymous and account lists

use serde::Serialize;
use tracing::info;

use super::{ComparisonStore, ItemId, Owner};
use crate::Result;

/// Outcome of a merge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MergeReport {
    /// Items in the account list afterwards
    pub count: usize,
    /// Anonymous-only items that made it into the account list
    pub adopted: usize,
    /// Anonymous-only items cut by the capacity limit
    pub dropped: usize,
}

/// Folds an anonymous session's list into the account it logs in to
#[derive(Clone)]
pub struct SessionBridge {
    store: ComparisonStore,
}

impl SessionBridge {
    pub fn new(store: ComparisonStore) -> Self {
        Self { store }
    }

    /// Merge `anonymous` into `authenticated` and delete the anonymous list
    ///
    /// Account items keep their order and come first; anonymous-only items
    /// follow in their original order until capacity is reached. With an
    /// empty anonymous list nothing is written.
    pub async fn merge(&self, anonymous: &Owner, authenticated: &Owner) -> Result<MergeReport> {
        let anon_items = self.store.get(anonymous).await?;
        let account_items = self.store.get(authenticated).await?;

        if anon_items.is_empty() {
            return Ok(MergeReport {
                count: account_items.len(),
                adopted: 0,
                dropped: 0,
            });
        }

        let (merged, report) = merge_lists(&account_items, &anon_items, self.store.max_items());

        // Account list first: if the delete fails a retry merges the same items again
        self.store.put(authenticated, &merged).await?;
        self.store.clear(anonymous).await?;

        info!(
            "Merged comparison list of {} into {}: {} items ({} adopted, {} dropped)",
            anonymous, authenticated, report.count, report.adopted, report.dropped
        );

        Ok(report)
    }
}

/// Union of two lists, account order first, truncated to `max_items`
pub fn merge_lists(
    account: &[ItemId],
    anonymous: &[ItemId],
    max_items: usize,
) -> (Vec<ItemId>, MergeReport) {
    let mut merged: Vec<ItemId> = Vec::with_capacity(max_items);
    for item in account {
        if !merged.contains(item) && merged.len() < max_items {
            merged.push(*item);
        }
    }

    let mut adopted = 0;
    let mut dropped = 0;
    for item in anonymous {
        if merged.contains(item) {
            continue;
        }
        if merged.len() < max_items {
            merged.push(*item);
            adopted += 1;
        } else {
            dropped += 1;
        }
    }

    let report = MergeReport {
        count: merged.len(),
        adopted,
        dropped,
    };
    (merged, report)
}
