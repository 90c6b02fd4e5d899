//! Mock hosting platform for testing.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::hosting::{ChangeRef, HostingError, HostingPlatform};
use crate::repository::{repository_key, RepoRef};

/// A recorded file fetch for test assertions.
#[derive(Debug, Clone)]
pub struct RecordedFetch {
    /// `owner/name` of the repository.
    pub repo: String,
    pub path: String,
    pub branch: String,
    /// When the fetch was made.
    pub timestamp: chrono::DateTime<Utc>,
}

#[derive(Debug, Clone)]
struct MockChange {
    files: BTreeSet<String>,
    before: Vec<u8>,
    after: Vec<u8>,
}

/// Decrements the in-flight counter even when a fetch is cancelled.
struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// In-memory implementation of the HostingPlatform trait.
///
/// Provides controllable behavior for testing:
/// - Repositories and their files, editable between calls
/// - Unreachable, hanging, and slow repositories
/// - Pull request change sets
/// - Recorded fetches and peak fetch concurrency
///
/// # Example
///
/// ```rust,ignore
/// let platform = MockHostingPlatform::new();
/// platform
///     .publish_package(REPO, &fixtures::manifest_toml(REPO, "http", "1.0.0"))
///     .await;
///
/// // Simulate the repository being deleted
/// platform.remove_repository(REPO).await;
/// ```
#[derive(Debug)]
pub struct MockHostingPlatform {
    /// Files by repository key, then path.
    repos: Arc<RwLock<HashMap<String, HashMap<String, Vec<u8>>>>>,
    unreachable: Arc<RwLock<HashSet<String>>>,
    hanging: Arc<RwLock<HashSet<String>>>,
    delays: Arc<RwLock<HashMap<String, Duration>>>,
    changes: Arc<RwLock<HashMap<(String, u64), MockChange>>>,
    fetches: Arc<RwLock<Vec<RecordedFetch>>>,
    /// If set, the next call fails with this error.
    next_error: Arc<RwLock<Option<HostingError>>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl Default for MockHostingPlatform {
    fn default() -> Self {
        Self::new()
    }
}

fn repo_key(repo: &RepoRef) -> String {
    repo.to_string().to_ascii_lowercase()
}

fn url_key(url: &str) -> String {
    RepoRef::parse_url(url)
        .map(|r| repo_key(&r))
        .unwrap_or_else(|_| repository_key(url))
}

fn change_key(change: &ChangeRef) -> (String, u64) {
    (repo_key(&change.repository), change.number)
}

impl MockHostingPlatform {
    /// Create an empty mock platform with no repositories.
    pub fn new() -> Self {
        Self {
            repos: Arc::new(RwLock::new(HashMap::new())),
            unreachable: Arc::new(RwLock::new(HashSet::new())),
            hanging: Arc::new(RwLock::new(HashSet::new())),
            delays: Arc::new(RwLock::new(HashMap::new())),
            changes: Arc::new(RwLock::new(HashMap::new())),
            fetches: Arc::new(RwLock::new(Vec::new())),
            next_error: Arc::new(RwLock::new(None)),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    /// Create a repository with no files.
    pub async fn add_repository(&self, repo: &RepoRef) {
        self.repos.write().await.entry(repo_key(repo)).or_default();
    }

    /// Delete a repository and all its files.
    pub async fn remove_repository(&self, url: &str) {
        self.repos.write().await.remove(&url_key(url));
    }

    /// Write a file, creating the repository if needed.
    pub async fn set_file(&self, repo: &RepoRef, path: &str, content: impl Into<Vec<u8>>) {
        self.repos
            .write()
            .await
            .entry(repo_key(repo))
            .or_default()
            .insert(path.to_string(), content.into());
    }

    /// Delete a file.
    pub async fn remove_file(&self, url: &str, path: &str) {
        if let Some(files) = self.repos.write().await.get_mut(&url_key(url)) {
            files.remove(path);
        }
    }

    /// Publish a package: writes `sop.toml` and the entry file it declares.
    pub async fn publish_package(&self, url: &str, manifest_toml: &str) {
        let key = url_key(url);
        let entry = toml::from_str::<toml::Table>(manifest_toml)
            .ok()
            .and_then(|t| {
                t.get("package")
                    .and_then(|p| p.get("entry"))
                    .and_then(|e| e.as_str())
                    .map(str::to_string)
            });

        let mut repos = self.repos.write().await;
        let files = repos.entry(key).or_default();
        files.insert("sop.toml".to_string(), manifest_toml.as_bytes().to_vec());
        if let Some(entry) = entry {
            files.insert(entry, b"// entry\n".to_vec());
        }
    }

    /// Make every fetch against `url` fail as unreachable.
    pub async fn set_unreachable(&self, url: &str) {
        self.unreachable.write().await.insert(url_key(url));
    }

    pub async fn clear_unreachable(&self, url: &str) {
        self.unreachable.write().await.remove(&url_key(url));
    }

    /// Make every fetch against `url` never complete.
    pub async fn set_hang(&self, url: &str) {
        self.hanging.write().await.insert(url_key(url));
    }

    pub async fn clear_hang(&self, url: &str) {
        self.hanging.write().await.remove(&url_key(url));
    }

    /// Delay every fetch against `url`.
    pub async fn set_delay(&self, url: &str, delay: Duration) {
        self.delays.write().await.insert(url_key(url), delay);
    }

    /// Register a change set for a pull request.
    pub async fn set_change(
        &self,
        change: &ChangeRef,
        files: &[&str],
        before: impl Into<Vec<u8>>,
        after: impl Into<Vec<u8>>,
    ) {
        self.changes.write().await.insert(
            change_key(change),
            MockChange {
                files: files.iter().map(|f| f.to_string()).collect(),
                before: before.into(),
                after: after.into(),
            },
        );
    }

    /// Make the next call fail with the given error.
    pub async fn set_next_error(&self, error: HostingError) {
        *self.next_error.write().await = Some(error);
    }

    /// Get all recorded file fetches.
    pub async fn recorded_fetches(&self) -> Vec<RecordedFetch> {
        self.fetches.read().await.clone()
    }

    /// Clear recorded fetches.
    pub async fn clear_recorded(&self) {
        self.fetches.write().await.clear();
    }

    /// Highest number of file fetches that were ever in flight at once.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    async fn take_error(&self) -> Option<HostingError> {
        self.next_error.write().await.take()
    }
}

#[async_trait]
impl HostingPlatform for MockHostingPlatform {
    async fn fetch_file_content(
        &self,
        repo: &RepoRef,
        path: &str,
        branch: &str,
    ) -> Result<Vec<u8>, HostingError> {
        let key = repo_key(repo);
        self.fetches.write().await.push(RecordedFetch {
            repo: repo.to_string(),
            path: path.to_string(),
            branch: branch.to_string(),
            timestamp: Utc::now(),
        });

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        let _guard = InFlight(&self.in_flight);

        if let Some(error) = self.take_error().await {
            return Err(error);
        }

        if self.hanging.read().await.contains(&key) {
            std::future::pending::<()>().await;
        }

        let delay = self.delays.read().await.get(&key).copied();
        match delay {
            Some(delay) => tokio::time::sleep(delay).await,
            // Let other fetches start so concurrency is observable.
            None => tokio::task::yield_now().await,
        }

        if self.unreachable.read().await.contains(&key) {
            return Err(HostingError::Unreachable(format!("{} is unreachable", repo)));
        }

        let repos = self.repos.read().await;
        let files = repos
            .get(&key)
            .ok_or_else(|| HostingError::Unreachable(format!("repository {} not found", repo)))?;
        files
            .get(path)
            .cloned()
            .ok_or_else(|| HostingError::NotFound(format!("{} not found in {}", path, repo)))
    }

    async fn list_changed_files(&self, change: &ChangeRef) -> Result<BTreeSet<String>, HostingError> {
        if let Some(error) = self.take_error().await {
            return Err(error);
        }
        self.changes
            .read()
            .await
            .get(&change_key(change))
            .map(|c| c.files.clone())
            .ok_or_else(|| HostingError::NotFound(format!("change {} not found", change)))
    }

    async fn get_document_before_and_after(
        &self,
        change: &ChangeRef,
        _path: &str,
    ) -> Result<(Vec<u8>, Vec<u8>), HostingError> {
        if let Some(error) = self.take_error().await {
            return Err(error);
        }
        self.changes
            .read()
            .await
            .get(&change_key(change))
            .map(|c| (c.before.clone(), c.after.clone()))
            .ok_or_else(|| HostingError::NotFound(format!("change {} not found", change)))
    }
}
