//! Hosting platform abstraction.
//!
//! The engine never talks to the version-control host directly; it goes
//! through the narrow [`HostingPlatform`] trait. [`GitHubPlatform`] is the
//! HTTP implementation, `testing::MockHostingPlatform` the in-memory one.

mod github;

pub use github::GitHubPlatform;

use std::collections::BTreeSet;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::repository::RepoRef;

/// Errors returned by a hosting platform.
///
/// `NotFound` means the repository is reachable but the file is absent;
/// `Unreachable` covers everything that prevents looking at the repository
/// at all (deleted, private, rate limited, network failure, timeout).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum HostingError {
    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Repository unreachable: {0}")]
    Unreachable(String),
}

/// A proposed change against the registry repository (a pull request).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChangeRef {
    /// The registry repository the change targets.
    pub repository: RepoRef,
    /// Pull request number.
    pub number: u64,
}

impl ChangeRef {
    pub fn new(repository: RepoRef, number: u64) -> Self {
        Self { repository, number }
    }
}

impl std::fmt::Display for ChangeRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}#{}", self.repository, self.number)
    }
}

/// Trait for hosting platform backends.
#[async_trait]
pub trait HostingPlatform: Send + Sync {
    /// Fetch the content of a file at `path` on `branch`.
    ///
    /// Always reads current upstream state; implementations must not cache.
    async fn fetch_file_content(
        &self,
        repo: &RepoRef,
        path: &str,
        branch: &str,
    ) -> Result<Vec<u8>, HostingError>;

    /// List every path touched by a change.
    async fn list_changed_files(&self, change: &ChangeRef) -> Result<BTreeSet<String>, HostingError>;

    /// Fetch the document at `path` as it is before and after the change.
    async fn get_document_before_and_after(
        &self,
        change: &ChangeRef,
        path: &str,
    ) -> Result<(Vec<u8>, Vec<u8>), HostingError>;
}
