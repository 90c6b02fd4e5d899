//! Repository references.
//!
//! Catalog entries identify packages by repository URL. Two URLs name the
//! same repository when they are equal ignoring ASCII case, surrounding
//! whitespace and a trailing `/`.

use std::fmt;

use reqwest::Url;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Invalid repository URL '{url}': {reason}")]
pub struct InvalidRepository {
    pub url: String,
    pub reason: String,
}

/// An `owner/name` pair identifying a repository on the hosting platform.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RepoRef {
    pub owner: String,
    pub name: String,
}

impl RepoRef {
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
        }
    }

    /// Parse a repository URL such as `https://github.com/owner/name`.
    ///
    /// The host is not interpreted; the first two path segments name the
    /// repository. A trailing `.git` on the name is dropped.
    pub fn parse_url(url: &str) -> Result<Self, InvalidRepository> {
        let invalid = |reason: &str| InvalidRepository {
            url: url.to_string(),
            reason: reason.to_string(),
        };

        let parsed = Url::parse(url.trim()).map_err(|e| invalid(&e.to_string()))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(invalid("scheme must be http or https"));
        }
        if parsed.host_str().is_none() {
            return Err(invalid("missing host"));
        }

        let mut segments = parsed
            .path_segments()
            .map(|s| s.filter(|seg| !seg.is_empty()).collect::<Vec<_>>())
            .unwrap_or_default()
            .into_iter();

        let owner = segments.next().ok_or_else(|| invalid("missing owner"))?;
        let name = segments.next().ok_or_else(|| invalid("missing name"))?;
        if segments.next().is_some() {
            return Err(invalid("expected exactly owner/name"));
        }
        let name = name.strip_suffix(".git").unwrap_or(name);
        if name.is_empty() {
            return Err(invalid("missing name"));
        }

        Ok(Self::new(owner, name))
    }

    /// Parse a `owner/name` slug.
    pub fn parse_slug(slug: &str) -> Result<Self, InvalidRepository> {
        match slug.trim().split_once('/') {
            Some((owner, name)) if !owner.is_empty() && !name.is_empty() && !name.contains('/') => {
                Ok(Self::new(owner, name))
            }
            _ => Err(InvalidRepository {
                url: slug.to_string(),
                reason: "expected owner/name".to_string(),
            }),
        }
    }
}

impl fmt::Display for RepoRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// Canonical comparison key for a repository URL.
pub fn repository_key(url: &str) -> String {
    url.trim().trim_end_matches('/').to_ascii_lowercase()
}

/// Whether two repository URLs name the same repository.
pub fn same_repository(a: &str, b: &str) -> bool {
    repository_key(a) == repository_key(b)
}
