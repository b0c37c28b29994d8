//! Archived asset reference

use super::Category;
use serde::{Deserialize, Serialize};

/// A staged file that was stored in object storage
///
/// The category is carried explicitly alongside the URL; it is never
/// re-derived from the key or URL path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UploadedAsset {
    /// Publicly resolvable URL returned by the gateway
    pub url: String,
    /// Object key used for the put, needed to delete the object
    pub key: String,
    pub category: Category,
}

impl UploadedAsset {
    /// Display name: the final key segment
    pub fn file_name(&self) -> &str {
        self.key.rsplit('/').next().unwrap_or(&self.key)
    }
}
