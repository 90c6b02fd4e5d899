//! Package catalog - the registry document listing every package.
//!
//! The catalog is persisted as one JSON document. Only the reconciler
//! writes it, and every write replaces the whole document atomically.

mod json_store;
mod types;

pub use json_store::JsonCatalogStore;
pub use types::*;

use thiserror::Error;

/// Errors that can occur in catalog operations.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Catalog I/O error at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse catalog document: {0}")]
    Parse(String),

    #[error("Failed to serialize catalog document: {0}")]
    Serialize(String),
}

/// Trait for catalog storage.
pub trait CatalogStore: Send + Sync {
    /// Load the whole catalog. A store with no document yields an empty one.
    fn load(&self) -> Result<Catalog, CatalogError>;

    /// Replace the whole catalog. Either every byte lands or none does.
    fn save(&self, catalog: &Catalog) -> Result<(), CatalogError>;
}

/// Encode a catalog the way it is persisted: pretty JSON, two-space indent,
/// trailing newline. Equal catalogs always encode to equal bytes.
pub fn encode_catalog(catalog: &Catalog) -> Result<Vec<u8>, CatalogError> {
    let mut encoded =
        serde_json::to_vec_pretty(catalog).map_err(|e| CatalogError::Serialize(e.to_string()))?;
    encoded.push(b'\n');
    Ok(encoded)
}
