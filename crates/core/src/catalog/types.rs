//! Types for the package catalog document.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::manifest::Manifest;
use crate::repository::same_repository;

/// The catalog document: `{ "packages": [ ... ] }`.
///
/// Order only matters for append detection; it carries no ranking.
/// Top-level keys other than `packages` are carried through untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Catalog {
    #[serde(default)]
    pub packages: Vec<Entry>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Catalog {
    pub fn new(packages: Vec<Entry>) -> Self {
        Self {
            packages,
            extra: Map::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.packages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }

    /// Index of the entry for `repository` (case-insensitive).
    pub fn position(&self, repository: &str) -> Option<usize> {
        self.packages
            .iter()
            .position(|e| same_repository(&e.repository, repository))
    }

    pub fn contains(&self, repository: &str) -> bool {
        self.position(repository).is_some()
    }

    pub fn get(&self, repository: &str) -> Option<&Entry> {
        self.position(repository).map(|i| &self.packages[i])
    }

    pub fn valid_count(&self) -> usize {
        self.packages.iter().filter(|e| e.valid).count()
    }
}

/// The persisted record for one registered package.
///
/// Everything except `repository` mirrors the upstream manifest and is
/// overwritten wholesale on each successful reconciliation. Fields default
/// when absent so hand-seeded entries still load; keys this type does not
/// model land in `extra` and are written back as they were.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Entry {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub license: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub repository: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub homepage: Option<String>,
    #[serde(default)]
    pub entry: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keywords: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub categories: Option<Vec<String>>,
    /// Whether the most recent reconciliation succeeded.
    #[serde(default)]
    pub valid: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Entry {
    /// Build a valid entry for `repository` from its manifest.
    ///
    /// The catalog keeps the repository spelling it was registered with.
    pub fn from_manifest(repository: &str, manifest: &Manifest) -> Self {
        Self {
            name: manifest.name.clone(),
            version: manifest.version.clone(),
            status: manifest.status.clone(),
            description: manifest.description.clone(),
            license: manifest.license.clone(),
            author: manifest.author.clone(),
            repository: repository.to_string(),
            homepage: manifest.homepage.clone(),
            entry: manifest.entry.clone(),
            keywords: manifest.keywords.clone(),
            categories: manifest.categories.clone(),
            valid: true,
            extra: Map::new(),
        }
    }

    /// Mirror fields whose values differ between `self` and `other`.
    pub fn drifted_fields(&self, other: &Entry) -> Vec<&'static str> {
        let mut fields = Vec::new();
        if self.name != other.name {
            fields.push("name");
        }
        if self.version != other.version {
            fields.push("version");
        }
        if self.status != other.status {
            fields.push("status");
        }
        if self.description != other.description {
            fields.push("description");
        }
        if self.license != other.license {
            fields.push("license");
        }
        if self.author != other.author {
            fields.push("author");
        }
        if self.homepage != other.homepage {
            fields.push("homepage");
        }
        if self.entry != other.entry {
            fields.push("entry");
        }
        if self.keywords != other.keywords {
            fields.push("keywords");
        }
        if self.categories != other.categories {
            fields.push("categories");
        }
        fields
    }

    /// Label used in logs: the name when known, else the repository.
    pub fn label(&self) -> &str {
        if self.name.is_empty() {
            &self.repository
        } else {
            &self.name
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manifest() -> Manifest {
        Manifest {
            name: "http".to_string(),
            version: "1.0.0".to_string(),
            status: "stable".to_string(),
            license: "MIT".to_string(),
            author: "someone".to_string(),
            repository: "https://github.com/someone/http".to_string(),
            entry: "main.sop".to_string(),
            description: Some("HTTP".to_string()),
            homepage: None,
            keywords: None,
            categories: None,
        }
    }

    #[test]
    fn test_entry_from_manifest_copies_every_field() {
        let entry = Entry::from_manifest("https://github.com/Someone/http", &manifest());
        assert_eq!(entry.name, "http");
        assert_eq!(entry.description.as_deref(), Some("HTTP"));
        assert_eq!(entry.entry, "main.sop");
        assert_eq!(entry.repository, "https://github.com/Someone/http");
        assert!(entry.valid);
    }

    #[test]
    fn test_drifted_fields() {
        let a = Entry::from_manifest("r", &manifest());
        let mut b = a.clone();
        b.version = "1.1.0".to_string();
        b.keywords = Some(vec!["net".to_string()]);
        b.valid = false;
        assert_eq!(a.drifted_fields(&b), vec!["version", "keywords"]);
        assert!(a.drifted_fields(&a).is_empty());
    }

    #[test]
    fn test_catalog_lookup_is_case_insensitive() {
        let catalog = Catalog::new(vec![Entry {
            repository: "https://github.com/Someone/HTTP".to_string(),
            ..Entry::default()
        }]);
        assert_eq!(catalog.position("https://github.com/someone/http/"), Some(0));
        assert!(!catalog.contains("https://github.com/someone/other"));
    }

    #[test]
    fn test_deserialize_sparse_entry() {
        let catalog: Catalog =
            serde_json::from_str(r#"{"packages":[{"repository":"https://github.com/a/b"}]}"#)
                .unwrap();
        let entry = &catalog.packages[0];
        assert_eq!(entry.repository, "https://github.com/a/b");
        assert!(entry.name.is_empty());
        assert!(!entry.valid);
        assert_eq!(entry.label(), "https://github.com/a/b");
    }

    #[test]
    fn test_entry_without_repository_loads() {
        let catalog: Catalog =
            serde_json::from_str(r#"{"packages":[{"name":"orphan","valid":true}]}"#).unwrap();
        assert!(catalog.packages[0].repository.is_empty());
        assert_eq!(catalog.packages[0].label(), "orphan");
    }

    #[test]
    fn test_unknown_keys_survive_round_trip() {
        let raw = r#"{"schema":1,"packages":[{"repository":"https://github.com/a/b","maintainers":["x"]}]}"#;
        let catalog: Catalog = serde_json::from_str(raw).unwrap();
        assert_eq!(catalog.extra["schema"], 1);
        assert_eq!(catalog.packages[0].extra["maintainers"][0], "x");

        let back: Value = serde_json::to_value(&catalog).unwrap();
        assert_eq!(back["schema"], 1);
        assert_eq!(back["packages"][0]["maintainers"][0], "x");
    }

    #[test]
    fn test_optional_fields_omitted_when_absent() {
        let mut entry = Entry::from_manifest("r", &manifest());
        entry.description = None;
        let json = serde_json::to_string(&entry).unwrap();
        assert!(!json.contains("description"));
        assert!(!json.contains("keywords"));
        assert!(json.contains("\"valid\":true"));
    }
}
