//! The remote item catalog.
//!
//! Loaded once at startup from the catalog feed and immutable for the
//! process lifetime; callers look items up by `(category, slug)`.

mod obfuscate;

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use obfuscate::reveal;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("malformed catalog document")]
    Malformed(#[from] serde_json::Error),

    #[error("malformed obfuscated endpoint")]
    Endpoint(#[from] base64::DecodeError),

    #[error("obfuscated endpoint is not valid UTF-8")]
    EndpointEncoding(#[from] std::string::FromUtf8Error),

    #[error("obfuscation key is empty")]
    EmptyKey,
}

pub type Result<T> = std::result::Result<T, CatalogError>;

/// One installable catalog entry, with the feed's field names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogItem {
    pub name: String,
    pub slug: String,
    pub category: String,
    #[serde(rename = "fileURL")]
    pub file_url: String,
    #[serde(rename = "imageURL")]
    pub image_url: String,
    #[serde(rename = "targetFile")]
    pub target_file: String,
}

/// In-memory catalog, keyed by category.
///
/// Constructed explicitly and handed to whoever needs lookups; there is
/// no process-global copy.
#[derive(Debug, Default)]
pub struct CatalogStore {
    categories: HashMap<String, Vec<CatalogItem>>,
}

impl CatalogStore {
    /// Deserialize the catalog feed (`category -> [item, ...]`).
    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        Ok(Self {
            categories: serde_json::from_slice(bytes)?,
        })
    }

    /// Look an item up by its unique `(category, slug)` pair.
    pub fn find(&self, category: &str, slug: &str) -> Option<&CatalogItem> {
        self.categories
            .get(category)?
            .iter()
            .find(|item| item.slug == slug)
    }

    /// All items in one category, in feed order.
    pub fn category(&self, name: &str) -> Option<&[CatalogItem]> {
        self.categories.get(name).map(Vec::as_slice)
    }

    /// Total number of items across all categories.
    pub fn len(&self) -> usize {
        self.categories.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
