//! Manifest fetcher.
//!
//! Reads a package's manifest from the default branch of its repository,
//! parses it, and probes for the entry file the manifest declares. Nothing
//! is cached: every call observes the current upstream state.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::debug;

use crate::config::HostingConfig;
use crate::hosting::{HostingError, HostingPlatform};
use crate::manifest::{parse_manifest, Manifest, ManifestError};
use crate::metrics;
use crate::repository::RepoRef;

/// Errors that prevent reading the manifest at all.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    /// The repository is reachable but has no manifest.
    #[error("Manifest not found: {0}")]
    NotFound(String),

    /// The repository cannot be accessed.
    #[error("Repository unreachable: {0}")]
    Unreachable(String),
}

impl From<HostingError> for FetchError {
    fn from(e: HostingError) -> Self {
        match e {
            HostingError::NotFound(msg) => FetchError::NotFound(msg),
            HostingError::Unreachable(msg) => FetchError::Unreachable(msg),
        }
    }
}

/// A manifest as read from upstream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedManifest {
    /// Raw manifest bytes.
    pub raw: Vec<u8>,
    /// Parse and schema validation result.
    pub manifest: Result<Manifest, ManifestError>,
    /// Whether the declared entry file exists. Always false when the
    /// manifest did not validate, since there is no path to probe.
    pub entry_file_present: bool,
}

/// Fetches manifests through a hosting platform.
pub struct ManifestFetcher {
    platform: Arc<dyn HostingPlatform>,
    branch: String,
    manifest_path: String,
    timeout: Duration,
}

impl ManifestFetcher {
    pub fn new(platform: Arc<dyn HostingPlatform>, config: &HostingConfig) -> Self {
        Self {
            platform,
            branch: config.default_branch.clone(),
            manifest_path: config.manifest_path.clone(),
            timeout: config.fetch_timeout(),
        }
    }

    pub fn manifest_path(&self) -> &str {
        &self.manifest_path
    }

    /// Fetch, parse, and probe the manifest of `repository`.
    pub async fn fetch(&self, repository: &str) -> Result<FetchedManifest, FetchError> {
        let repo = RepoRef::parse_url(repository)
            .map_err(|e| FetchError::Unreachable(e.to_string()))?;

        let raw = self.fetch_file(&repo, &self.manifest_path).await?;
        let manifest = parse_manifest(&raw, repository);

        let entry_file_present = match &manifest {
            Ok(m) => self.probe(&repo, &m.entry).await?,
            Err(e) => {
                debug!(repository = %repository, error = %e, "Manifest invalid, skipping entry probe");
                false
            }
        };

        Ok(FetchedManifest {
            raw,
            manifest,
            entry_file_present,
        })
    }

    async fn probe(&self, repo: &RepoRef, path: &str) -> Result<bool, FetchError> {
        match self.fetch_file(repo, path).await {
            Ok(_) => Ok(true),
            Err(FetchError::NotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn fetch_file(&self, repo: &RepoRef, path: &str) -> Result<Vec<u8>, FetchError> {
        let path = path.trim_start_matches('/');
        debug!(repo = %repo, path = %path, branch = %self.branch, "Fetching file");

        let result = match tokio::time::timeout(
            self.timeout,
            self.platform.fetch_file_content(repo, path, &self.branch),
        )
        .await
        {
            Ok(result) => result.map_err(FetchError::from),
            Err(_) => Err(FetchError::Unreachable(format!(
                "fetching {} from {} timed out after {:?}",
                path, repo, self.timeout
            ))),
        };

        let label = match &result {
            Ok(_) => "ok",
            Err(FetchError::NotFound(_)) => "not_found",
            Err(FetchError::Unreachable(_)) => "unreachable",
        };
        metrics::FETCHES.with_label_values(&[label]).inc();

        result
    }
}
