//! JSON file implementation of the catalog store.

use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::debug;

use super::{encode_catalog, Catalog, CatalogError, CatalogStore};

/// Catalog stored as a single JSON document on disk.
///
/// Saves go to a temporary file in the same directory which is then renamed
/// over the document, so readers observe either the old or the new catalog.
pub struct JsonCatalogStore {
    path: PathBuf,
}

impl JsonCatalogStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: std::io::Error) -> CatalogError {
        CatalogError::Io {
            path: self.path.display().to_string(),
            source,
        }
    }
}

impl CatalogStore for JsonCatalogStore {
    fn load(&self) -> Result<Catalog, CatalogError> {
        if !self.path.exists() {
            debug!(path = %self.path.display(), "Catalog document missing, starting empty");
            return Ok(Catalog::default());
        }

        let data = std::fs::read(&self.path).map_err(|e| self.io_error(e))?;
        serde_json::from_slice(&data).map_err(|e| CatalogError::Parse(e.to_string()))
    }

    fn save(&self, catalog: &Catalog) -> Result<(), CatalogError> {
        let encoded = encode_catalog(catalog)?;

        let parent = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&parent).map_err(|e| self.io_error(e))?;

        let mut tmp = NamedTempFile::new_in(&parent).map_err(|e| self.io_error(e))?;
        tmp.write_all(&encoded).map_err(|e| self.io_error(e))?;
        tmp.as_file().sync_all().map_err(|e| self.io_error(e))?;
        tmp.persist(&self.path).map_err(|e| self.io_error(e.error))?;

        debug!(
            path = %self.path.display(),
            packages = catalog.len(),
            "Catalog document written"
        );
        Ok(())
    }
}
