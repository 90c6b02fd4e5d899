//! Catalog reconciler.
//!
//! The only writer of the catalog document. Two paths lead here:
//!
//! - a submission (a pull request appending one repository) runs the
//!   change-set validator, resolves the manifest, and registers the new
//!   entry;
//! - a sweep re-derives every existing entry from upstream and writes the
//!   whole catalog back once.
//!
//! Both take the same writer lock, so at most one of them holds a loaded
//! catalog with the intent to save it.

mod scheduler;
mod sweep;
mod types;

pub use scheduler::SweepScheduler;
pub use types::*;

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{error, info, warn};

use crate::catalog::{Catalog, CatalogStore, Entry};
use crate::changeset::{check_scope, validate_change_set};
use crate::config::Config;
use crate::fetcher::ManifestFetcher;
use crate::hosting::{ChangeRef, HostingPlatform};
use crate::metrics;
use crate::synth::{synthesize, ResolveFailure, Synthesis};

/// Applies synthesized entries to the catalog and persists it.
pub struct Reconciler {
    store: Arc<dyn CatalogStore>,
    platform: Arc<dyn HostingPlatform>,
    fetcher: ManifestFetcher,
    document_name: String,
    max_concurrent_fetches: usize,
    writer: Mutex<()>,
}

impl Reconciler {
    pub fn new(
        store: Arc<dyn CatalogStore>,
        platform: Arc<dyn HostingPlatform>,
        config: &Config,
    ) -> Self {
        Self {
            fetcher: ManifestFetcher::new(Arc::clone(&platform), &config.hosting),
            store,
            platform,
            document_name: config.catalog.document_name.clone(),
            max_concurrent_fetches: config.sweep.max_concurrent_fetches.max(1),
            writer: Mutex::new(()),
        }
    }

    /// Current catalog as persisted.
    pub fn catalog(&self) -> Result<Catalog, ReconcileError> {
        Ok(self.store.load()?)
    }

    /// Process a submission end to end.
    ///
    /// Returns `Ok` with a rejection outcome when the submitted content is at
    /// fault, and `Err` only when the platform or the catalog store failed.
    pub async fn on_submission(&self, change: &ChangeRef) -> Result<SubmissionOutcome, ReconcileError> {
        let outcome = self.process_submission(change).await;

        match &outcome {
            Ok(outcome) => {
                metrics::SUBMISSIONS.with_label_values(&[outcome.label()]).inc();
                if outcome.is_accepted() {
                    info!(change = %change, "{}", outcome.message());
                } else {
                    info!(change = %change, outcome = outcome.label(), "Submission rejected: {}", outcome.message());
                }
            }
            Err(e) => {
                metrics::SUBMISSIONS.with_label_values(&["error"]).inc();
                warn!(change = %change, error = %e, "Submission could not be processed");
            }
        }

        outcome
    }

    async fn process_submission(&self, change: &ChangeRef) -> Result<SubmissionOutcome, ReconcileError> {
        let changed_files = self.platform.list_changed_files(change).await?;
        if let Err(e) = check_scope(&self.document_name, &changed_files) {
            return Ok(e.into());
        }

        let (before, after) = self
            .platform
            .get_document_before_and_after(change, &self.document_name)
            .await?;

        let repository = match validate_change_set(&self.document_name, &changed_files, &before, &after) {
            Ok(repository) => repository,
            Err(e) => return Ok(e.into()),
        };

        info!(change = %change, repository = %repository, "Change set valid, resolving manifest");
        let fetched = self.fetcher.fetch(&repository).await;

        let entry = match synthesize(&repository, &fetched, None) {
            Synthesis::Valid(entry) => entry,
            Synthesis::Rejected(failure) | Synthesis::Degraded { failure, .. } => {
                return Ok(failure.into())
            }
        };

        let _guard = self.writer.lock().await;
        let mut catalog = self.store.load()?;
        self.register_new(&mut catalog, &repository, entry.clone())?;
        self.store.save(&catalog)?;
        metrics::set_catalog_health(catalog.len(), catalog.valid_count());

        Ok(SubmissionOutcome::accepted(entry))
    }

    /// Append `entry` for a repository not yet in the catalog.
    pub fn register_new(
        &self,
        catalog: &mut Catalog,
        repository: &str,
        entry: Entry,
    ) -> Result<(), ReconcileError> {
        if let Some(index) = catalog.position(repository) {
            error!(
                repository = %repository,
                index,
                "Invariant violated: repository passed validation but is already registered"
            );
            return Err(ReconcileError::DuplicateRepository(repository.to_string()));
        }
        catalog.packages.push(entry);
        Ok(())
    }

    /// Re-derive one existing entry from current upstream state.
    ///
    /// Never removes anything: a failure keeps the prior metadata and clears
    /// `valid`, a success refreshes every mirror field.
    pub async fn reconcile_existing(&self, prior: &Entry) -> Reconciliation {
        let synthesis = if prior.repository.trim().is_empty() {
            Synthesis::Degraded {
                entry: Entry {
                    valid: false,
                    ..prior.clone()
                },
                failure: ResolveFailure::Unreachable {
                    detail: "entry has no repository".to_string(),
                },
            }
        } else {
            let fetched = self.fetcher.fetch(&prior.repository).await;
            synthesize(&prior.repository, &fetched, Some(prior))
        };

        match synthesis {
            Synthesis::Valid(entry) => Reconciliation {
                drifted_fields: prior.drifted_fields(&entry),
                entry,
                failure: None,
            },
            Synthesis::Degraded { entry, failure } => Reconciliation {
                entry,
                drifted_fields: Vec::new(),
                failure: Some(failure),
            },
            // A prior entry always exists here, so this only guards the type.
            Synthesis::Rejected(failure) => Reconciliation {
                entry: Entry {
                    valid: false,
                    ..prior.clone()
                },
                drifted_fields: Vec::new(),
                failure: Some(failure),
            },
        }
    }
}
