//! Types for parsed package manifests.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Fields every manifest must carry as non-empty strings, in report order.
pub const REQUIRED_FIELDS: [&str; 7] = [
    "name",
    "version",
    "status",
    "license",
    "author",
    "repository",
    "entry",
];

/// A validated package manifest.
///
/// Transient: only the catalog [`Entry`](crate::catalog::Entry) derived from
/// it is persisted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Manifest {
    pub name: String,
    pub version: String,
    pub status: String,
    pub license: String,
    pub author: String,
    /// Repository URL as declared by the package author.
    pub repository: String,
    /// Path of the entry file, relative to the repository root.
    pub entry: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub homepage: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keywords: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub categories: Option<Vec<String>>,
}

/// One reason a manifest does not conform to the schema.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SchemaProblem {
    #[error("missing required field '{field}'")]
    Missing { field: String },

    #[error("required field '{field}' is empty")]
    Empty { field: String },

    #[error("field '{field}' must be {expected}")]
    WrongType { field: String, expected: String },

    #[error("repository mismatch: expected '{expected}', manifest declares '{actual}'")]
    RepositoryMismatch { expected: String, actual: String },
}

impl SchemaProblem {
    /// The manifest field this problem is about.
    pub fn field(&self) -> &str {
        match self {
            SchemaProblem::Missing { field }
            | SchemaProblem::Empty { field }
            | SchemaProblem::WrongType { field, .. } => field,
            SchemaProblem::RepositoryMismatch { .. } => "repository",
        }
    }
}
