//! Change-set validation for new package submissions.
//!
//! A submission may only append one `{ "repository": "..." }` element to the
//! end of the catalog's `packages` array. Both catalog snapshots are fully
//! materialized and compared structurally, so formatting and key order do
//! not matter while any change to an existing element does.

use std::collections::BTreeSet;

use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::repository::{same_repository, RepoRef};

/// Why a change set was rejected.
#[derive(Debug, Clone, Error, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum ChangeSetError {
    /// The change touches files other than the catalog document.
    #[error("Scope violation: only {allowed} may be changed, but the change also touches {}", .files.join(", "))]
    ScopeViolation { allowed: String, files: Vec<String> },

    /// The new catalog is not the old one plus exactly one appended element.
    #[error("Structural violation: {0}")]
    StructuralViolation(String),

    /// The appended element is not an acceptable submission.
    #[error("Payload violation: {0}")]
    PayloadViolation(String),
}

const PACKAGES: &str = "packages";
const REPOSITORY: &str = "repository";

/// Validate a proposed change to the catalog document.
///
/// `document_name` is the catalog's path inside the registry repository,
/// `changed_files` every path the change touches, and `before`/`after` the
/// document's bytes on either side of the change. On success returns the
/// repository URL being submitted, trimmed.
pub fn validate_change_set(
    document_name: &str,
    changed_files: &BTreeSet<String>,
    before: &[u8],
    after: &[u8],
) -> Result<String, ChangeSetError> {
    check_scope(document_name, changed_files)?;

    let (before_rest, before_packages) = materialize(before, "base")?;
    let (after_rest, after_packages) = materialize(after, "proposed")?;

    if before_rest != after_rest {
        return Err(ChangeSetError::StructuralViolation(format!(
            "only the '{}' array may change",
            PACKAGES
        )));
    }

    if after_packages.len() != before_packages.len() + 1 {
        return Err(ChangeSetError::StructuralViolation(format!(
            "exactly one new package must be appended, found a difference of {}",
            after_packages.len() as i64 - before_packages.len() as i64
        )));
    }

    if let Some(index) = before_packages
        .iter()
        .zip(after_packages.iter())
        .position(|(old, new)| old != new)
    {
        return Err(ChangeSetError::StructuralViolation(format!(
            "existing package at index {} was modified, moved, or removed",
            index
        )));
    }

    // Length checked above: after has at least one element.
    let appended = &after_packages[after_packages.len() - 1];
    check_payload(appended, &before_packages)
}

fn normalize_path(path: &str) -> &str {
    path.trim().trim_start_matches("./").trim_start_matches('/')
}

/// Check only that every touched file is the catalog document.
///
/// Cheap enough to run before fetching either document snapshot.
pub fn check_scope(
    document_name: &str,
    changed_files: &BTreeSet<String>,
) -> Result<(), ChangeSetError> {
    let allowed = normalize_path(document_name);
    let outside: Vec<String> = changed_files
        .iter()
        .filter(|f| normalize_path(f) != allowed)
        .cloned()
        .collect();

    if outside.is_empty() {
        Ok(())
    } else {
        Err(ChangeSetError::ScopeViolation {
            allowed: allowed.to_string(),
            files: outside,
        })
    }
}

/// Split a catalog document into its `packages` array and everything else.
fn materialize(raw: &[u8], which: &str) -> Result<(Map<String, Value>, Vec<Value>), ChangeSetError> {
    let value: Value = serde_json::from_slice(raw).map_err(|e| {
        ChangeSetError::StructuralViolation(format!("{} catalog is not valid JSON: {}", which, e))
    })?;

    let Value::Object(mut object) = value else {
        return Err(ChangeSetError::StructuralViolation(format!(
            "{} catalog must be a JSON object",
            which
        )));
    };

    match object.remove(PACKAGES) {
        Some(Value::Array(packages)) => Ok((object, packages)),
        _ => Err(ChangeSetError::StructuralViolation(format!(
            "{} catalog has no '{}' array",
            which, PACKAGES
        ))),
    }
}

fn check_payload(appended: &Value, existing: &[Value]) -> Result<String, ChangeSetError> {
    let Value::Object(fields) = appended else {
        return Err(ChangeSetError::PayloadViolation(
            "the new package must be a JSON object".to_string(),
        ));
    };

    let extra: Vec<&str> = fields
        .keys()
        .map(String::as_str)
        .filter(|k| *k != REPOSITORY)
        .collect();
    if !extra.is_empty() {
        return Err(ChangeSetError::PayloadViolation(format!(
            "the new package may only contain '{}', found extra fields: {}",
            REPOSITORY,
            extra.join(", ")
        )));
    }

    let repository = match fields.get(REPOSITORY) {
        None => {
            return Err(ChangeSetError::PayloadViolation(format!(
                "'{}' is missing",
                REPOSITORY
            )))
        }
        Some(Value::String(s)) => s.trim(),
        Some(_) => {
            return Err(ChangeSetError::PayloadViolation(format!(
                "'{}' must be a string",
                REPOSITORY
            )))
        }
    };

    if repository.is_empty() {
        return Err(ChangeSetError::PayloadViolation(format!(
            "'{}' is empty",
            REPOSITORY
        )));
    }

    RepoRef::parse_url(repository).map_err(|e| ChangeSetError::PayloadViolation(e.to_string()))?;

    let duplicate = existing
        .iter()
        .filter_map(|p| p.get(REPOSITORY).and_then(Value::as_str))
        .any(|existing| same_repository(existing, repository));
    if duplicate {
        return Err(ChangeSetError::PayloadViolation(format!(
            "repository '{}' is already registered",
            repository
        )));
    }

    Ok(repository.to_string())
}
