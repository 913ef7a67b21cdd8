//! # Compare Common Library
//!
//! Shared code for the product comparison service:
//! - Comparison list store, session bridge and matrix projector
//! - Catalog lookup seam and its SQLite implementation
//! - Database initialization and the key-value meta store
//! - Session and anti-forgery token primitives
//! - Bootstrap and runtime configuration

pub mod api;
pub mod catalog;
pub mod compare;
pub mod config;
pub mod db;
pub mod error;

pub use catalog::{CatalogItem, CatalogLookup, SqliteCatalog};
pub use compare::{
    AttributeSet, ComparisonMatrix, ComparisonProjector, ComparisonStore, ItemId, MergeReport,
    Owner, Projection, SessionBridge, DEFAULT_MAX_ITEMS,
};
pub use error::{Error, Result};
