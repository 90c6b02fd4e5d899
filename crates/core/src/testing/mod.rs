//! Testing utilities and mock implementations.
//!
//! Provides an in-memory hosting platform and catalog store so the whole
//! engine can be exercised without network access or disk.
//!
//! # Example
//!
//! ```rust,ignore
//! use sopreg_core::testing::{fixtures, MemoryCatalogStore, MockHostingPlatform};
//!
//! let platform = MockHostingPlatform::new();
//! platform
//!     .publish_package(REPO, &fixtures::manifest_toml(REPO, "http", "1.0.0"))
//!     .await;
//! platform.set_unreachable(OTHER_REPO).await;
//! ```

mod memory_catalog;
mod mock_hosting;

pub use memory_catalog::MemoryCatalogStore;
pub use mock_hosting::{MockHostingPlatform, RecordedFetch};

/// Test fixtures and helper functions.
pub mod fixtures {
    use serde_json::{json, Value};

    use crate::catalog::{Catalog, Entry};

    /// A complete manifest for `repository` whose entry file is `main.sop`.
    pub fn manifest_toml(repository: &str, name: &str, version: &str) -> String {
        format!(
            r#"[package]
name = "{name}"
version = "{version}"
status = "stable"
license = "MIT"
author = "someone"
repository = "{repository}"
entry = "main.sop"
"#
        )
    }

    /// The valid catalog entry that [`manifest_toml`] resolves to.
    pub fn entry(repository: &str, name: &str, version: &str) -> Entry {
        Entry {
            name: name.to_string(),
            version: version.to_string(),
            status: "stable".to_string(),
            license: "MIT".to_string(),
            author: "someone".to_string(),
            repository: repository.to_string(),
            entry: "main.sop".to_string(),
            valid: true,
            ..Entry::default()
        }
    }

    /// Catalog documents before and after appending a bare submission.
    pub fn submission_documents(existing: &Catalog, repository: &str) -> (Vec<u8>, Vec<u8>) {
        let before = json!(existing);
        let mut after = before.clone();
        if let Some(Value::Array(packages)) = after.get_mut("packages") {
            packages.push(json!({ "repository": repository }));
        }
        (
            before.to_string().into_bytes(),
            serde_json::to_vec_pretty(&after).unwrap_or_default(),
        )
    }
}
