//! In-memory catalog store for testing.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};

use crate::catalog::{encode_catalog, Catalog, CatalogError, CatalogStore};

/// Catalog store that keeps the encoded document in memory.
///
/// Stores bytes rather than the struct so byte-level idempotence can be
/// asserted, and counts saves so tests can check when nothing was written.
#[derive(Debug, Default)]
pub struct MemoryCatalogStore {
    document: Arc<RwLock<Option<Vec<u8>>>>,
    saves: AtomicUsize,
    fail_saves: RwLock<bool>,
}

impl MemoryCatalogStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store already holding `catalog`. Does not count as a save.
    pub fn with_catalog(catalog: &Catalog) -> Result<Self, CatalogError> {
        let store = Self::new();
        store.set_document(encode_catalog(catalog)?);
        Ok(store)
    }

    /// Replace the raw stored document.
    pub fn set_document(&self, bytes: impl Into<Vec<u8>>) {
        if let Ok(mut document) = self.document.write() {
            *document = Some(bytes.into());
        }
    }

    /// The raw stored document, if any.
    pub fn document(&self) -> Option<Vec<u8>> {
        self.document.read().ok().and_then(|d| d.clone())
    }

    /// Number of successful saves.
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    /// Make every subsequent save fail.
    pub fn fail_saves(&self, fail: bool) {
        if let Ok(mut f) = self.fail_saves.write() {
            *f = fail;
        }
    }
}

impl CatalogStore for MemoryCatalogStore {
    fn load(&self) -> Result<Catalog, CatalogError> {
        match self.document() {
            Some(bytes) => {
                serde_json::from_slice(&bytes).map_err(|e| CatalogError::Parse(e.to_string()))
            }
            None => Ok(Catalog::default()),
        }
    }

    fn save(&self, catalog: &Catalog) -> Result<(), CatalogError> {
        if self.fail_saves.read().map(|f| *f).unwrap_or(false) {
            return Err(CatalogError::Io {
                path: "memory".to_string(),
                source: std::io::Error::other("save failure injected"),
            });
        }
        self.set_document(encode_catalog(catalog)?);
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
