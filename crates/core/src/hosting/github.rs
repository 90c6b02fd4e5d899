//! GitHub-flavoured hosting client.
//!
//! File content comes from the raw content host
//! (`{raw_base_url}/{owner}/{name}/{ref}/{path}`); pull request metadata
//! comes from the REST API. No authentication is performed.

use std::collections::BTreeSet;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::{debug, warn};

use super::{ChangeRef, HostingError, HostingPlatform};
use crate::config::HostingConfig;
use crate::repository::RepoRef;

/// Files requested per page of the pull request files endpoint.
const FILES_PER_PAGE: usize = 100;

/// GitHub hosting client.
pub struct GitHubPlatform {
    client: Client,
    raw_base_url: String,
    api_base_url: String,
}

impl GitHubPlatform {
    /// Create a new client from hosting configuration.
    pub fn new(config: &HostingConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.fetch_timeout())
            .build()?;

        Ok(Self {
            client,
            raw_base_url: config.raw_base_url.trim_end_matches('/').to_string(),
            api_base_url: config.api_base_url.trim_end_matches('/').to_string(),
        })
    }

    fn raw_url(&self, owner_and_name: &str, git_ref: &str, path: &str) -> String {
        format!(
            "{}/{}/{}/{}",
            self.raw_base_url,
            owner_and_name,
            git_ref,
            path.trim_start_matches('/')
        )
    }

    fn api_url(&self, path: &str) -> String {
        format!("{}/{}", self.api_base_url, path.trim_start_matches('/'))
    }

    async fn get_raw(&self, url: &str) -> Result<Option<Vec<u8>>, HostingError> {
        debug!(url = %url, "Fetching raw content");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| unreachable_from(url, e))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            warn!(url = %url, status = %status, "Raw content request failed");
            return Err(HostingError::Unreachable(format!("{} returned {}", url, status)));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| unreachable_from(url, e))?;
        Ok(Some(bytes.to_vec()))
    }

    async fn get_api<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T, HostingError> {
        debug!(url = %url, "API request");

        let response = self
            .client
            .get(url)
            .header("Accept", "application/vnd.github+json")
            .send()
            .await
            .map_err(|e| unreachable_from(url, e))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(HostingError::NotFound(url.to_string()));
        }
        if !status.is_success() {
            warn!(url = %url, status = %status, "API request failed");
            return Err(HostingError::Unreachable(format!("{} returned {}", url, status)));
        }

        response
            .json()
            .await
            .map_err(|e| HostingError::Unreachable(format!("Failed to parse {}: {}", url, e)))
    }

    /// The raw host answers 404 both for a missing file and a missing
    /// repository, so a 404 is disambiguated through the API.
    async fn repository_exists(&self, repo: &RepoRef) -> Result<bool, HostingError> {
        let url = self.api_url(&format!("repos/{}/{}", repo.owner, repo.name));
        match self.get_api::<serde::de::IgnoredAny>(&url).await {
            Ok(_) => Ok(true),
            Err(HostingError::NotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn pull_request(&self, change: &ChangeRef) -> Result<GhPullRequest, HostingError> {
        let url = self.api_url(&format!(
            "repos/{}/{}/pulls/{}",
            change.repository.owner, change.repository.name, change.number
        ));
        self.get_api(&url).await
    }
}

fn unreachable_from(url: &str, e: reqwest::Error) -> HostingError {
    if e.is_timeout() {
        HostingError::Unreachable(format!("{} timed out", url))
    } else {
        HostingError::Unreachable(format!("{}: {}", url, e))
    }
}

#[async_trait]
impl HostingPlatform for GitHubPlatform {
    async fn fetch_file_content(
        &self,
        repo: &RepoRef,
        path: &str,
        branch: &str,
    ) -> Result<Vec<u8>, HostingError> {
        let url = self.raw_url(&repo.to_string(), branch, path);
        match self.get_raw(&url).await? {
            Some(bytes) => Ok(bytes),
            None => {
                if self.repository_exists(repo).await? {
                    Err(HostingError::NotFound(format!("{} in {}", path, repo)))
                } else {
                    Err(HostingError::Unreachable(format!(
                        "repository {} does not exist or is private",
                        repo
                    )))
                }
            }
        }
    }

    async fn list_changed_files(&self, change: &ChangeRef) -> Result<BTreeSet<String>, HostingError> {
        let mut files = BTreeSet::new();
        let mut page = 1;

        loop {
            let url = self.api_url(&format!(
                "repos/{}/{}/pulls/{}/files?per_page={}&page={}",
                change.repository.owner, change.repository.name, change.number, FILES_PER_PAGE, page
            ));
            let batch: Vec<GhPullRequestFile> = self.get_api(&url).await?;
            let count = batch.len();

            for file in batch {
                files.extend(file.paths());
            }

            if count < FILES_PER_PAGE {
                break;
            }
            page += 1;
        }

        debug!(change = %change, files = files.len(), "Listed changed files");
        Ok(files)
    }

    async fn get_document_before_and_after(
        &self,
        change: &ChangeRef,
        path: &str,
    ) -> Result<(Vec<u8>, Vec<u8>), HostingError> {
        let pr = self.pull_request(change).await?;

        let base_repo = pr.base.repo.ok_or_else(|| {
            HostingError::Unreachable(format!("base repository of {} is gone", change))
        })?;
        let head_repo = pr.head.repo.ok_or_else(|| {
            HostingError::Unreachable(format!("head repository of {} is gone", change))
        })?;

        let before_url = self.raw_url(&base_repo.full_name, &pr.base.sha, path);
        let after_url = self.raw_url(&head_repo.full_name, &pr.head.sha, path);

        let before = self
            .get_raw(&before_url)
            .await?
            .ok_or_else(|| HostingError::NotFound(before_url.clone()))?;
        let after = self
            .get_raw(&after_url)
            .await?
            .ok_or_else(|| HostingError::NotFound(after_url.clone()))?;

        Ok((before, after))
    }
}

// ============================================================================
// GitHub API Response Types (private)
// ============================================================================

#[derive(Debug, Deserialize)]
struct GhPullRequest {
    base: GhRef,
    head: GhRef,
}

#[derive(Debug, Deserialize)]
struct GhRef {
    sha: String,
    #[serde(default)]
    repo: Option<GhRepositoryName>,
}

#[derive(Debug, Deserialize)]
struct GhRepositoryName {
    full_name: String,
}

#[derive(Debug, Deserialize)]
struct GhPullRequestFile {
    filename: String,
    #[serde(default)]
    previous_filename: Option<String>,
}

impl GhPullRequestFile {
    /// A rename touches both its old and its new path.
    fn paths(self) -> impl Iterator<Item = String> {
        std::iter::once(self.filename).chain(self.previous_filename)
    }
}
