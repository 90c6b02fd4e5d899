//! Submission lifecycle integration tests.
//!
//! A pull request appending one repository runs through change-set
//! validation, manifest resolution, and registration into a catalog
//! document on disk.

use std::sync::Arc;

use tempfile::TempDir;

use sopreg_core::{
    testing::{fixtures, MockHostingPlatform},
    Catalog, CatalogStore, ChangeRef, Config, JsonCatalogStore, RepoRef, Reconciler,
    SubmissionOutcome,
};

const REGISTRY: &str = "https://github.com/soplang/registry";
const DOC: &str = "registry.json";

/// Test helper wiring a reconciler to a temp catalog and a mock platform.
struct TestHarness {
    platform: Arc<MockHostingPlatform>,
    store: Arc<JsonCatalogStore>,
    reconciler: Reconciler,
    next_number: std::cell::Cell<u64>,
    _temp_dir: TempDir,
}

impl TestHarness {
    fn new(existing: &Catalog) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let store = Arc::new(JsonCatalogStore::new(temp_dir.path().join(DOC)));
        store.save(existing).expect("Failed to seed catalog");

        let platform = Arc::new(MockHostingPlatform::new());
        let reconciler = Reconciler::new(store.clone(), platform.clone(), &Config::default());

        Self {
            platform,
            store,
            reconciler,
            next_number: std::cell::Cell::new(1),
            _temp_dir: temp_dir,
        }
    }

    fn next_change(&self) -> ChangeRef {
        let number = self.next_number.get();
        self.next_number.set(number + 1);
        ChangeRef::new(RepoRef::parse_url(REGISTRY).unwrap(), number)
    }

    /// Open a pull request with the given documents and process it.
    async fn submit_raw(&self, files: &[&str], before: Vec<u8>, after: Vec<u8>) -> SubmissionOutcome {
        let change = self.next_change();
        self.platform.set_change(&change, files, before, after).await;
        self.reconciler
            .on_submission(&change)
            .await
            .expect("Submission failed with infrastructure error")
    }

    /// Open a well-formed pull request appending `repository` to the current catalog.
    async fn submit(&self, repository: &str) -> SubmissionOutcome {
        let current = self.store.load().unwrap();
        let (before, after) = fixtures::submission_documents(&current, repository);
        self.submit_raw(&[DOC], before, after).await
    }

    async fn publish(&self, repository: &str, name: &str, version: &str) {
        self.platform
            .publish_package(repository, &fixtures::manifest_toml(repository, name, version))
            .await;
    }
}

fn seeded() -> Catalog {
    Catalog::new(vec![
        fixtures::entry("https://github.com/someone/json", "json", "0.3.0"),
        fixtures::entry("https://github.com/someone/yaml", "yaml", "1.2.0"),
    ])
}

#[tokio::test]
async fn test_valid_submission_appends_exactly_one_entry() {
    let harness = TestHarness::new(&seeded());
    let repo = "https://github.com/someone/http";
    harness.publish(repo, "http", "1.0.0").await;

    let outcome = harness.submit(repo).await;
    assert!(outcome.is_accepted(), "unexpected outcome: {:?}", outcome);

    let catalog = harness.store.load().unwrap();
    assert_eq!(catalog.len(), 3);
    assert_eq!(&catalog.packages[..2], &seeded().packages[..]);

    let added = &catalog.packages[2];
    assert_eq!(added.name, "http");
    assert_eq!(added.version, "1.0.0");
    assert_eq!(added.entry, "main.sop");
    assert!(added.valid);
}

#[tokio::test]
async fn test_sequential_submissions_keep_order() {
    let harness = TestHarness::new(&Catalog::default());
    for n in 1..=3 {
        let repo = format!("https://github.com/someone/pkg{}", n);
        harness.publish(&repo, &format!("pkg{}", n), "0.1.0").await;
        assert!(harness.submit(&repo).await.is_accepted());
    }

    let names: Vec<String> = harness
        .store
        .load()
        .unwrap()
        .packages
        .into_iter()
        .map(|e| e.name)
        .collect();
    assert_eq!(names, vec!["pkg1", "pkg2", "pkg3"]);
}

#[tokio::test]
async fn test_touching_another_file_is_rejected() {
    let harness = TestHarness::new(&seeded());
    let repo = "https://github.com/someone/http";
    harness.publish(repo, "http", "1.0.0").await;
    let (before, after) = fixtures::submission_documents(&seeded(), repo);

    let outcome = harness.submit_raw(&[DOC, "README.md"], before, after).await;
    assert!(matches!(outcome, SubmissionOutcome::RejectedScope { .. }));
    assert_eq!(harness.store.load().unwrap(), seeded());
}

#[tokio::test]
async fn test_editing_existing_entry_is_rejected() {
    let harness = TestHarness::new(&seeded());
    let repo = "https://github.com/someone/http";
    harness.publish(repo, "http", "1.0.0").await;

    let mut tampered = seeded();
    tampered.packages[0].valid = false;
    let (_, after) = fixtures::submission_documents(&tampered, repo);
    let (before, _) = fixtures::submission_documents(&seeded(), repo);

    let outcome = harness.submit_raw(&[DOC], before, after).await;
    assert!(matches!(outcome, SubmissionOutcome::RejectedStructure { .. }));
    assert_eq!(harness.store.load().unwrap(), seeded());
}

#[tokio::test]
async fn test_reordering_existing_entries_is_rejected() {
    let harness = TestHarness::new(&seeded());
    let repo = "https://github.com/someone/http";
    harness.publish(repo, "http", "1.0.0").await;

    let mut reordered = seeded();
    reordered.packages.reverse();
    let (_, after) = fixtures::submission_documents(&reordered, repo);
    let (before, _) = fixtures::submission_documents(&seeded(), repo);

    let outcome = harness.submit_raw(&[DOC], before, after).await;
    assert!(matches!(outcome, SubmissionOutcome::RejectedStructure { .. }));
}

#[tokio::test]
async fn test_duplicate_repository_is_rejected() {
    let harness = TestHarness::new(&seeded());
    let outcome = harness.submit("https://github.com/SomeOne/JSON").await;

    let SubmissionOutcome::RejectedPayload { message } = outcome else {
        panic!("expected payload rejection, got {:?}", outcome);
    };
    assert!(message.contains("already registered"));
    assert_eq!(harness.store.load().unwrap().len(), 2);
}

#[tokio::test]
async fn test_extra_fields_in_submission_are_rejected() {
    let harness = TestHarness::new(&Catalog::default());
    let before = br#"{ "packages": [] }"#.to_vec();
    let after =
        br#"{ "packages": [ { "repository": "https://github.com/a/b", "valid": true } ] }"#.to_vec();

    let outcome = harness.submit_raw(&[DOC], before, after).await;
    assert!(matches!(outcome, SubmissionOutcome::RejectedPayload { .. }));
}

#[tokio::test]
async fn test_manifest_missing_license_and_author() {
    let harness = TestHarness::new(&Catalog::default());
    let repo = "https://github.com/someone/http";
    let manifest = fixtures::manifest_toml(repo, "http", "1.0.0")
        .lines()
        .filter(|l| !l.starts_with("license") && !l.starts_with("author"))
        .collect::<Vec<_>>()
        .join("\n");
    harness.platform.publish_package(repo, &manifest).await;

    let outcome = harness.submit(repo).await;
    let SubmissionOutcome::RejectedManifest { reasons, .. } = outcome else {
        panic!("expected manifest rejection, got {:?}", outcome);
    };
    assert_eq!(reasons.len(), 2);
    assert!(reasons.iter().any(|r| r.contains("license")));
    assert!(reasons.iter().any(|r| r.contains("author")));
    assert!(harness.store.load().unwrap().is_empty());
}

#[tokio::test]
async fn test_malformed_manifest_is_rejected() {
    let harness = TestHarness::new(&Catalog::default());
    let repo = "https://github.com/someone/http";
    harness.platform.publish_package(repo, "[package\nname = ").await;

    let outcome = harness.submit(repo).await;
    assert!(matches!(outcome, SubmissionOutcome::RejectedManifest { .. }));
}

#[tokio::test]
async fn test_missing_entry_file_is_rejected() {
    let harness = TestHarness::new(&Catalog::default());
    let repo = "https://github.com/someone/http";
    harness.publish(repo, "http", "1.0.0").await;
    harness.platform.remove_file(repo, "main.sop").await;

    let outcome = harness.submit(repo).await;
    assert!(matches!(outcome, SubmissionOutcome::RejectedMissingEntryFile { .. }));
    assert!(harness.store.load().unwrap().is_empty());
}

#[tokio::test]
async fn test_manifest_pointing_elsewhere_is_rejected() {
    let harness = TestHarness::new(&Catalog::default());
    let repo = "https://github.com/someone/http";
    harness
        .platform
        .publish_package(
            repo,
            &fixtures::manifest_toml("https://github.com/impostor/http", "http", "1.0.0"),
        )
        .await;

    let outcome = harness.submit(repo).await;
    let SubmissionOutcome::RejectedManifest { reasons, .. } = outcome else {
        panic!("expected manifest rejection, got {:?}", outcome);
    };
    assert!(reasons.iter().any(|r| r.contains("impostor")));
}
