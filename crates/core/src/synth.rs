//! Entry synthesis.
//!
//! One pure function decides what a fetch outcome means for the catalog.
//! The caller states whether an entry already exists; the merge policy
//! lives here and nowhere else:
//!
//! | outcome                              | no prior entry | prior entry                 |
//! |--------------------------------------|----------------|-----------------------------|
//! | manifest valid, entry file present   | `Valid`        | `Valid` (fields refreshed)  |
//! | anything else                        | `Rejected`     | `Degraded` (fields kept)    |

use serde::Serialize;
use thiserror::Error;

use crate::catalog::Entry;
use crate::fetcher::{FetchError, FetchedManifest};
use crate::manifest::{ManifestError, SchemaProblem};

/// Why a repository did not resolve into a valid entry.
#[derive(Debug, Clone, Error, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResolveFailure {
    #[error("manifest not found: {detail}")]
    NotFound { detail: String },

    #[error("repository unreachable: {detail}")]
    Unreachable { detail: String },

    #[error("malformed manifest: {detail}")]
    MalformedManifest { detail: String },

    #[error("manifest schema violation: {}", join(.problems))]
    SchemaViolation { problems: Vec<SchemaProblem> },

    #[error("entry file '{path}' not found in repository")]
    MissingEntryFile { path: String },
}

fn join(problems: &[SchemaProblem]) -> String {
    problems
        .iter()
        .map(|p| p.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

impl ResolveFailure {
    /// Reasons to report to a submitter, one line each.
    pub fn reasons(&self) -> Vec<String> {
        match self {
            ResolveFailure::SchemaViolation { problems } => {
                problems.iter().map(|p| p.to_string()).collect()
            }
            other => vec![other.to_string()],
        }
    }

    /// Short label for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            ResolveFailure::NotFound { .. } => "not_found",
            ResolveFailure::Unreachable { .. } => "unreachable",
            ResolveFailure::MalformedManifest { .. } => "malformed_manifest",
            ResolveFailure::SchemaViolation { .. } => "schema_violation",
            ResolveFailure::MissingEntryFile { .. } => "missing_entry_file",
        }
    }
}

impl From<&FetchError> for ResolveFailure {
    fn from(e: &FetchError) -> Self {
        match e {
            FetchError::NotFound(detail) => ResolveFailure::NotFound {
                detail: detail.clone(),
            },
            FetchError::Unreachable(detail) => ResolveFailure::Unreachable {
                detail: detail.clone(),
            },
        }
    }
}

impl From<&ManifestError> for ResolveFailure {
    fn from(e: &ManifestError) -> Self {
        match e {
            ManifestError::Malformed(detail) => ResolveFailure::MalformedManifest {
                detail: detail.clone(),
            },
            ManifestError::SchemaViolation(problems) => ResolveFailure::SchemaViolation {
                problems: problems.clone(),
            },
        }
    }
}

/// Result of synthesizing an entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Synthesis {
    /// Upstream resolved completely; the entry mirrors the manifest.
    Valid(Entry),
    /// Upstream failed for an existing entry; prior metadata kept,
    /// `valid` cleared.
    Degraded { entry: Entry, failure: ResolveFailure },
    /// Upstream failed and there is no prior entry to fall back on.
    Rejected(ResolveFailure),
}

impl Synthesis {
    pub fn entry(&self) -> Option<&Entry> {
        match self {
            Synthesis::Valid(entry) | Synthesis::Degraded { entry, .. } => Some(entry),
            Synthesis::Rejected(_) => None,
        }
    }

    pub fn failure(&self) -> Option<&ResolveFailure> {
        match self {
            Synthesis::Valid(_) => None,
            Synthesis::Degraded { failure, .. } | Synthesis::Rejected(failure) => Some(failure),
        }
    }
}

/// Combine a fetch outcome for `repository` with the prior entry, if any.
pub fn synthesize(
    repository: &str,
    outcome: &Result<FetchedManifest, FetchError>,
    prior: Option<&Entry>,
) -> Synthesis {
    let failure = match outcome {
        Err(e) => ResolveFailure::from(e),
        Ok(fetched) => match &fetched.manifest {
            Err(e) => ResolveFailure::from(e),
            Ok(manifest) if !fetched.entry_file_present => ResolveFailure::MissingEntryFile {
                path: manifest.entry.clone(),
            },
            Ok(manifest) => {
                // The stored spelling of the repository wins over the
                // manifest's; they only differ in case or a trailing '/'.
                let repository = prior.map_or(repository, |p| p.repository.as_str());
                let mut entry = Entry::from_manifest(repository, manifest);
                if let Some(prior) = prior {
                    entry.extra = prior.extra.clone();
                }
                return Synthesis::Valid(entry);
            }
        },
    };

    match prior {
        Some(prior) => Synthesis::Degraded {
            entry: Entry {
                valid: false,
                ..prior.clone()
            },
            failure,
        },
        None => Synthesis::Rejected(failure),
    }
}
