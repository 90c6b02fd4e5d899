//! Common test utilities for E2E testing with mocks.
//!
//! This module provides a test fixture that creates an in-process server
//! with a mock hosting platform and a temp catalog document, enabling
//! end-to-end testing without network access.

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use sopreg_core::{
    testing::MockHostingPlatform, Catalog, CatalogConfig, CatalogStore, ChangeRef, Config,
    JsonCatalogStore, RepoRef, Reconciler,
};
use sopreg_server::{api::create_router, state::AppState};

/// Re-export fixtures for test convenience
pub use sopreg_core::testing::fixtures;

/// Registry repository every test submission targets.
pub const REGISTRY: &str = "soplang/registry";

/// Test fixture for E2E testing with mock dependencies.
///
/// # Example
///
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_submission() {
///     let fixture = TestFixture::new().await;
///     fixture.open_submission(1, REPO).await;
///
///     let response = fixture.post("/api/v1/submissions", json!({
///         "repository": REGISTRY,
///         "number": 1
///     })).await;
///
///     assert_eq!(response.status, 200);
/// }
/// ```
pub struct TestFixture {
    /// The Axum router for testing
    pub router: Router,
    /// Mock hosting platform - publish packages and open pull requests
    pub platform: Arc<MockHostingPlatform>,
    /// Catalog store backing the server
    pub store: Arc<JsonCatalogStore>,
    /// Temporary directory holding the catalog document
    pub temp_dir: TempDir,
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
    pub text: String,
}

impl TestFixture {
    /// Create a new test fixture with an empty catalog.
    pub async fn new() -> Self {
        Self::with_catalog(&Catalog::default()).await
    }

    /// Create a test fixture whose catalog starts as `catalog`.
    pub async fn with_catalog(catalog: &Catalog) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let catalog_path: PathBuf = temp_dir.path().join("registry.json");

        let config = Config {
            catalog: CatalogConfig {
                path: catalog_path.clone(),
                ..CatalogConfig::default()
            },
            ..Config::default()
        };

        let store = Arc::new(JsonCatalogStore::new(catalog_path));
        store.save(catalog).expect("Failed to seed catalog");

        let platform = Arc::new(MockHostingPlatform::new());
        let reconciler = Arc::new(Reconciler::new(store.clone(), platform.clone(), &config));

        let state = Arc::new(AppState::new(config, reconciler));
        let router = create_router(state);

        Self {
            router,
            platform,
            store,
            temp_dir,
        }
    }

    /// Publish a complete package upstream.
    pub async fn publish(&self, repository: &str, name: &str, version: &str) {
        self.platform
            .publish_package(repository, &fixtures::manifest_toml(repository, name, version))
            .await;
    }

    /// Open pull request `number` appending `repository` to the current catalog.
    pub async fn open_submission(&self, number: u64, repository: &str) {
        let current = self.store.load().expect("Failed to load catalog");
        let (before, after) = fixtures::submission_documents(&current, repository);
        self.platform
            .set_change(&change(number), &["registry.json"], before, after)
            .await;
    }

    /// Send a GET request to the test server.
    pub async fn get(&self, path: &str) -> TestResponse {
        self.request("GET", path, None).await
    }

    /// Send a POST request with JSON body.
    pub async fn post(&self, path: &str, body: Value) -> TestResponse {
        self.request("POST", path, Some(body)).await
    }

    /// Send a POST request with no body.
    pub async fn post_empty(&self, path: &str) -> TestResponse {
        self.request("POST", path, None).await
    }

    /// Send a request to the test server.
    async fn request(&self, method: &str, path: &str, body: Option<Value>) -> TestResponse {
        let mut request_builder = Request::builder().method(method).uri(path);

        let body = if let Some(json_body) = body {
            request_builder = request_builder.header("Content-Type", "application/json");
            Body::from(serde_json::to_vec(&json_body).unwrap())
        } else {
            Body::empty()
        };

        let request = request_builder.body(body).unwrap();

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();

        let text = String::from_utf8_lossy(&body_bytes).to_string();
        let body: Value = if body_bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body_bytes).unwrap_or(Value::Null)
        };

        TestResponse { status, body, text }
    }
}

/// Pull request `number` against the test registry.
pub fn change(number: u64) -> ChangeRef {
    ChangeRef::new(RepoRef::parse_slug(REGISTRY).unwrap(), number)
}
