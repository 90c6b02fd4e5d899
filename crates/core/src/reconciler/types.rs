//! Types for the catalog reconciler.

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::catalog::{CatalogError, Entry};
use crate::changeset::ChangeSetError;
use crate::hosting::HostingError;
use crate::synth::ResolveFailure;

/// Errors that stop a submission or sweep from completing.
///
/// Rejections of the submitted content are not errors; they are
/// [`SubmissionOutcome`] variants.
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// The hosting platform failed while reading the change itself.
    #[error("hosting platform error: {0}")]
    Hosting(#[from] HostingError),

    /// Catalog could not be loaded or saved.
    #[error("catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// A repository was about to be registered twice.
    #[error("repository already registered: {0}")]
    DuplicateRepository(String),
}

/// Result of processing one submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SubmissionOutcome {
    Accepted { entry: Entry, message: String },
    RejectedScope { message: String },
    RejectedStructure { message: String },
    RejectedPayload { message: String },
    RejectedManifest { message: String, reasons: Vec<String> },
    RejectedMissingEntryFile { message: String },
}

impl SubmissionOutcome {
    pub fn accepted(entry: Entry) -> Self {
        let message = format!(
            "Package '{}' {} registered from {}",
            entry.name, entry.version, entry.repository
        );
        SubmissionOutcome::Accepted { entry, message }
    }

    pub fn is_accepted(&self) -> bool {
        matches!(self, SubmissionOutcome::Accepted { .. })
    }

    /// Human-readable explanation, suitable for posting back to the submitter.
    pub fn message(&self) -> &str {
        match self {
            SubmissionOutcome::Accepted { message, .. }
            | SubmissionOutcome::RejectedScope { message }
            | SubmissionOutcome::RejectedStructure { message }
            | SubmissionOutcome::RejectedPayload { message }
            | SubmissionOutcome::RejectedManifest { message, .. }
            | SubmissionOutcome::RejectedMissingEntryFile { message } => message,
        }
    }

    /// Short label for metrics and logs.
    pub fn label(&self) -> &'static str {
        match self {
            SubmissionOutcome::Accepted { .. } => "accepted",
            SubmissionOutcome::RejectedScope { .. } => "rejected_scope",
            SubmissionOutcome::RejectedStructure { .. } => "rejected_structure",
            SubmissionOutcome::RejectedPayload { .. } => "rejected_payload",
            SubmissionOutcome::RejectedManifest { .. } => "rejected_manifest",
            SubmissionOutcome::RejectedMissingEntryFile { .. } => "rejected_missing_entry_file",
        }
    }
}

impl From<ChangeSetError> for SubmissionOutcome {
    fn from(e: ChangeSetError) -> Self {
        let message = e.to_string();
        match e {
            ChangeSetError::ScopeViolation { .. } => SubmissionOutcome::RejectedScope { message },
            ChangeSetError::StructuralViolation(_) => {
                SubmissionOutcome::RejectedStructure { message }
            }
            ChangeSetError::PayloadViolation(_) => SubmissionOutcome::RejectedPayload { message },
        }
    }
}

impl From<ResolveFailure> for SubmissionOutcome {
    fn from(failure: ResolveFailure) -> Self {
        match failure {
            ResolveFailure::MissingEntryFile { .. } => SubmissionOutcome::RejectedMissingEntryFile {
                message: failure.to_string(),
            },
            other => SubmissionOutcome::RejectedManifest {
                message: format!("Manifest could not be resolved: {}", other),
                reasons: other.reasons(),
            },
        }
    }
}

/// Result of re-deriving one existing entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconciliation {
    /// The entry to store in place of the prior one.
    pub entry: Entry,
    /// Mirror fields refreshed from upstream.
    pub drifted_fields: Vec<&'static str>,
    pub failure: Option<ResolveFailure>,
}

impl Reconciliation {
    /// Whether the stored entry differs from `prior`.
    pub fn changed(&self, prior: &Entry) -> bool {
        self.entry != *prior
    }
}

/// What a sweep did to one entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntryReport {
    /// Position in the catalog.
    pub index: usize,
    pub repository: String,
    pub name: String,
    pub valid: bool,
    pub previously_valid: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub drifted_fields: Vec<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<ResolveFailure>,
}

impl EntryReport {
    pub fn flipped(&self) -> bool {
        self.valid != self.previously_valid
    }
}

/// Summary of one sweep over the catalog.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SweepReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub checked: usize,
    pub valid: usize,
    pub invalid: usize,
    /// Whether the catalog document was rewritten.
    pub written: bool,
    /// Per-entry results in catalog order.
    pub entries: Vec<EntryReport>,
}

impl SweepReport {
    /// Entries whose validity flipped in this sweep.
    pub fn flipped(&self) -> impl Iterator<Item = &EntryReport> {
        self.entries.iter().filter(|e| e.flipped())
    }
}
