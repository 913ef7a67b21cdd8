//! Ordered attribute key → label mapping that drives the matrix rows

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// One comparable attribute
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
    pub key: String,
    pub label: String,
}

/// Ordered, key-unique list of comparable attributes
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct AttributeSet(Vec<Attribute>);

impl Default for AttributeSet {
    fn default() -> Self {
        Self::new()
            .with("price", "Price")
            .with("description", "Description")
            .with("sku", "SKU")
            .with("stock_status", "Stock Status")
            .with("weight", "Weight")
            .with("dimensions", "Dimensions")
    }
}

impl AttributeSet {
    /// Empty set
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Append an attribute; a key already present keeps its first label
    pub fn with(mut self, key: impl Into<String>, label: impl Into<String>) -> Self {
        let key = key.into();
        if !self.0.iter().any(|a| a.key == key) {
            self.0.push(Attribute {
                key,
                label: label.into(),
            });
        }
        self
    }

    /// Parse the `compare_attributes` setting: a JSON array of `{key, label}`
    pub fn from_json(raw: &str) -> Result<Self> {
        let entries: Vec<Attribute> = serde_json::from_str(raw)?;
        let mut set = Self::new();
        for entry in entries {
            if entry.key.trim().is_empty() {
                return Err(Error::Config("Attribute key must not be empty".to_string()));
            }
            set = set.with(entry.key, entry.label);
        }
        Ok(set)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.0)?)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Attribute> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
