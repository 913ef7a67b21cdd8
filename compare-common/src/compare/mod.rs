//! Comparison list core
//!
//! - [`ComparisonStore`]: per-owner ordered, bounded, duplicate-free lists
//! - [`SessionBridge`]: folds an anonymous list into an account list at login
//! - [`ComparisonProjector`]: joins a list against the catalog into a matrix
//!
//! Owners live in two namespaces of the same keyed store: authenticated
//! users (`user:<guid>`) and anonymous sessions (`anon:<session_id>`).

use serde::Serialize;
use serde_json::Value;
use std::fmt;

use crate::{Error, Result};

pub mod attributes;
pub mod bridge;
pub mod projector;
pub mod store;

pub use attributes::{Attribute, AttributeSet};
pub use bridge::{MergeReport, SessionBridge};
pub use projector::{
    ActionCell, Cell, ColumnHeader, ComparisonMatrix, ComparisonProjector, MatrixRow, Projection,
    PLACEHOLDER,
};
pub use store::{ComparisonStore, COMPARE_LIST_META_KEY};

/// Default capacity of a comparison list
pub const DEFAULT_MAX_ITEMS: usize = 4;

/// Identity a comparison list belongs to
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Owner {
    /// Authenticated account, keyed by user guid
    User(String),
    /// Pre-login browser session, keyed by session id
    Anonymous(String),
}

impl Owner {
    /// Key under which this owner's meta entries are stored
    pub fn key(&self) -> String {
        match self {
            Owner::User(guid) => format!("user:{}", guid),
            Owner::Anonymous(session_id) => format!("anon:{}", session_id),
        }
    }
}

impl fmt::Display for Owner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key())
    }
}

/// Catalog item reference (always a positive integer)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ItemId(u64);

impl ItemId {
    /// Build from a raw integer, rejecting zero and negatives
    pub fn new(raw: i64) -> Result<Self> {
        if raw > 0 {
            Ok(Self(raw as u64))
        } else {
            Err(Error::InvalidInput(format!("Invalid product id: {}", raw)))
        }
    }

    /// Format check for an id arriving in a request body
    ///
    /// Accepts a positive JSON integer or a string holding one, the two
    /// shapes form and script clients send.
    pub fn from_json(value: &Value) -> Result<Self> {
        match value {
            Value::Number(n) => match n.as_i64() {
                Some(raw) => Self::new(raw),
                None => Err(Error::InvalidInput(format!("Invalid product id: {}", n))),
            },
            Value::String(s) => s
                .trim()
                .parse::<i64>()
                .map_err(|_| Error::InvalidInput(format!("Invalid product id: {:?}", s)))
                .and_then(Self::new),
            other => Err(Error::InvalidInput(format!("Invalid product id: {}", other))),
        }
    }

    pub fn get(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
