//! Catalog sweep: re-derive every entry with bounded concurrency.

use std::time::Instant;

use chrono::Utc;
use futures::stream::{self, StreamExt};
use tracing::{debug, info, warn};

use crate::catalog::Catalog;
use crate::metrics;

use super::{Reconciler, ReconcileError, Reconciliation, EntryReport, SweepReport};

impl Reconciler {
    /// Entry point for the scheduling collaborator.
    pub async fn on_scheduled_sweep(&self) -> Result<SweepReport, ReconcileError> {
        self.sweep().await
    }

    /// Reconcile every catalog entry and write the catalog back once.
    ///
    /// At most `max_concurrent_fetches` entries are in flight. Results are
    /// tagged with their catalog index and reassembled in order, so the
    /// written catalog keeps the input order whatever the completion order.
    /// Nothing is written when no entry changed.
    pub async fn sweep(&self) -> Result<SweepReport, ReconcileError> {
        let _guard = self.writer.lock().await;
        let started_at = Utc::now();
        let timer = Instant::now();

        let catalog = self.store.load()?;
        info!(
            packages = catalog.len(),
            concurrency = self.max_concurrent_fetches,
            "Starting catalog sweep"
        );

        // Owned entries keep the stream free of borrows from `catalog`, which
        // the spawned scheduler task needs for `Send`.
        let mut results: Vec<(usize, Reconciliation)> =
            stream::iter(catalog.packages.clone().into_iter().enumerate())
                .map(|(index, prior)| async move {
                    (index, self.reconcile_existing(&prior).await)
                })
                .buffer_unordered(self.max_concurrent_fetches)
                .collect()
                .await;
        results.sort_by_key(|(index, _)| *index);

        let mut updated = Catalog {
            packages: Vec::with_capacity(results.len()),
            extra: catalog.extra.clone(),
        };
        let mut entries = Vec::with_capacity(results.len());
        for (index, result) in results {
            let prior = &catalog.packages[index];
            let report = EntryReport {
                index,
                repository: prior.repository.clone(),
                name: result.entry.name.clone(),
                valid: result.entry.valid,
                previously_valid: prior.valid,
                drifted_fields: result.drifted_fields,
                failure: result.failure,
            };
            log_entry(&report);
            metrics::ENTRIES_RECONCILED
                .with_label_values(&[if report.valid { "valid" } else { "invalid" }])
                .inc();

            updated.packages.push(result.entry);
            entries.push(report);
        }

        let written = updated != catalog;
        if written {
            self.store.save(&updated)?;
        } else {
            debug!("Catalog unchanged, skipping write");
        }

        let valid = updated.valid_count();
        metrics::set_catalog_health(updated.len(), valid);
        metrics::SWEEPS_TOTAL.inc();
        metrics::SWEEP_DURATION.observe(timer.elapsed().as_secs_f64());

        let report = SweepReport {
            started_at,
            finished_at: Utc::now(),
            checked: updated.len(),
            valid,
            invalid: updated.len() - valid,
            written,
            entries,
        };
        info!(
            checked = report.checked,
            valid = report.valid,
            invalid = report.invalid,
            flipped = report.flipped().count(),
            written = report.written,
            "Catalog sweep finished"
        );
        Ok(report)
    }
}

fn log_entry(report: &EntryReport) {
    match (&report.failure, report.flipped()) {
        (Some(failure), true) => warn!(
            index = report.index,
            repository = %report.repository,
            reason = %failure,
            "Package is no longer valid"
        ),
        (Some(failure), false) => debug!(
            index = report.index,
            repository = %report.repository,
            reason = %failure,
            "Package still invalid"
        ),
        (None, true) => info!(
            index = report.index,
            repository = %report.repository,
            "Package is valid again"
        ),
        (None, false) if !report.drifted_fields.is_empty() => info!(
            index = report.index,
            repository = %report.repository,
            fields = ?report.drifted_fields,
            "Package metadata refreshed"
        ),
        (None, false) => debug!(index = report.index, repository = %report.repository, "Package unchanged"),
    }
}
