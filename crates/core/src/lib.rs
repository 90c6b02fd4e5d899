pub mod catalog;
pub mod changeset;
pub mod config;
pub mod fetcher;
pub mod hosting;
pub mod manifest;
pub mod metrics;
pub mod reconciler;
pub mod repository;
pub mod synth;
pub mod testing;

pub use catalog::{encode_catalog, Catalog, CatalogError, CatalogStore, Entry, JsonCatalogStore};
pub use changeset::{check_scope, validate_change_set, ChangeSetError};
pub use config::{
    load_config, load_config_from_str, validate_config, CatalogConfig, Config, ConfigError,
    HostingConfig, ServerConfig, SweepConfig,
};
pub use fetcher::{FetchError, FetchedManifest, ManifestFetcher};
pub use hosting::{ChangeRef, GitHubPlatform, HostingError, HostingPlatform};
pub use manifest::{parse_manifest, Manifest, ManifestError, SchemaProblem};
pub use reconciler::{
    EntryReport, ReconcileError, Reconciler, Reconciliation, SubmissionOutcome, SweepReport,
    SweepScheduler,
};
pub use repository::{repository_key, same_repository, InvalidRepository, RepoRef};
pub use synth::{synthesize, ResolveFailure, Synthesis};
