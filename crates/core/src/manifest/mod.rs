//! Manifest parsing and schema validation.
//!
//! Package authors publish a TOML manifest at the root of their repository:
//!
//! ```toml
//! [package]
//! name = "http"
//! version = "1.0.0"
//! status = "stable"
//! license = "MIT"
//! author = "someone"
//! repository = "https://github.com/someone/http"
//! entry = "src/main.sop"
//! ```
//!
//! Parsing is pure: identical bytes always produce the identical result.

mod types;

pub use types::*;

use thiserror::Error;
use toml::{Table, Value};

use crate::repository::same_repository;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ManifestError {
    /// The manifest is not valid UTF-8 TOML.
    #[error("Malformed manifest: {0}")]
    Malformed(String),

    /// The manifest parsed but does not conform to the schema.
    #[error("Manifest schema violation: {}", join_problems(.0))]
    SchemaViolation(Vec<SchemaProblem>),
}

impl ManifestError {
    /// Human-readable reasons, one per problem.
    pub fn reasons(&self) -> Vec<String> {
        match self {
            ManifestError::Malformed(msg) => vec![format!("malformed manifest: {}", msg)],
            ManifestError::SchemaViolation(problems) => {
                problems.iter().map(|p| p.to_string()).collect()
            }
        }
    }
}

fn join_problems(problems: &[SchemaProblem]) -> String {
    problems
        .iter()
        .map(|p| p.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Parse raw manifest bytes and validate them against the schema.
///
/// `expected_repository` is the repository the manifest was fetched from;
/// the manifest's own `repository` field must name the same one.
/// Every problem is collected before failing.
pub fn parse_manifest(raw: &[u8], expected_repository: &str) -> Result<Manifest, ManifestError> {
    let text = std::str::from_utf8(raw)
        .map_err(|e| ManifestError::Malformed(format!("invalid UTF-8: {}", e)))?;
    let document: Table =
        toml::from_str(text).map_err(|e| ManifestError::Malformed(e.to_string()))?;

    let mut problems = Vec::new();

    let empty = Table::new();
    let package = match document.get("package") {
        Some(Value::Table(table)) => table,
        Some(_) => {
            problems.push(SchemaProblem::WrongType {
                field: "package".to_string(),
                expected: "a table".to_string(),
            });
            &empty
        }
        None => &empty,
    };

    let mut required = REQUIRED_FIELDS
        .iter()
        .map(|field| required_string(package, field, &mut problems))
        .collect::<Vec<_>>()
        .into_iter();

    let description = optional_string(package, "description", &mut problems);
    let homepage = optional_string(package, "homepage", &mut problems);
    let keywords = optional_string_list(package, "keywords", &mut problems);
    let categories = optional_string_list(package, "categories", &mut problems);

    // Order matches REQUIRED_FIELDS.
    let (name, version, status, license, author, repository, entry) = (
        required.next().flatten(),
        required.next().flatten(),
        required.next().flatten(),
        required.next().flatten(),
        required.next().flatten(),
        required.next().flatten(),
        required.next().flatten(),
    );

    if let Some(actual) = &repository {
        if !same_repository(actual, expected_repository) {
            problems.push(SchemaProblem::RepositoryMismatch {
                expected: expected_repository.to_string(),
                actual: actual.clone(),
            });
        }
    }

    match (name, version, status, license, author, repository, entry) {
        (
            Some(name),
            Some(version),
            Some(status),
            Some(license),
            Some(author),
            Some(repository),
            Some(entry),
        ) if problems.is_empty() => Ok(Manifest {
            name,
            version,
            status,
            license,
            author,
            repository,
            entry,
            description,
            homepage,
            keywords,
            categories,
        }),
        _ => Err(ManifestError::SchemaViolation(problems)),
    }
}

fn required_string(
    package: &Table,
    field: &str,
    problems: &mut Vec<SchemaProblem>,
) -> Option<String> {
    match package.get(field) {
        None => {
            problems.push(SchemaProblem::Missing {
                field: field.to_string(),
            });
            None
        }
        Some(Value::String(s)) if s.trim().is_empty() => {
            problems.push(SchemaProblem::Empty {
                field: field.to_string(),
            });
            None
        }
        Some(Value::String(s)) => Some(s.clone()),
        Some(_) => {
            problems.push(SchemaProblem::WrongType {
                field: field.to_string(),
                expected: "a string".to_string(),
            });
            None
        }
    }
}

fn optional_string(
    package: &Table,
    field: &str,
    problems: &mut Vec<SchemaProblem>,
) -> Option<String> {
    match package.get(field) {
        None => None,
        Some(Value::String(s)) => Some(s.clone()),
        Some(_) => {
            problems.push(SchemaProblem::WrongType {
                field: field.to_string(),
                expected: "a string".to_string(),
            });
            None
        }
    }
}

fn optional_string_list(
    package: &Table,
    field: &str,
    problems: &mut Vec<SchemaProblem>,
) -> Option<Vec<String>> {
    let wrong_type = || SchemaProblem::WrongType {
        field: field.to_string(),
        expected: "an array of strings".to_string(),
    };

    match package.get(field) {
        None => None,
        Some(Value::Array(items)) => {
            let strings: Option<Vec<String>> = items
                .iter()
                .map(|item| item.as_str().map(str::to_string))
                .collect();
            if strings.is_none() {
                problems.push(wrong_type());
            }
            strings
        }
        Some(_) => {
            problems.push(wrong_type());
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const REPO: &str = "https://github.com/someone/http";

    fn full_manifest() -> String {
        format!(
            r#"
[package]
name = "http"
version = "1.2.0"
status = "stable"
license = "MIT"
author = "someone"
repository = "{REPO}"
entry = "src/main.sop"
"#
        )
    }

    #[test]
    fn test_parse_full_manifest() {
        let manifest = parse_manifest(full_manifest().as_bytes(), REPO).unwrap();
        assert_eq!(manifest.name, "http");
        assert_eq!(manifest.version, "1.2.0");
        assert_eq!(manifest.entry, "src/main.sop");
        assert!(manifest.description.is_none());
        assert!(manifest.keywords.is_none());
    }

    #[test]
    fn test_parse_optional_fields() {
        let raw = format!(
            "{}description = \"HTTP client\"\nhomepage = \"https://http.example\"\nkeywords = [\"net\", \"http\"]\ncategories = [\"network\"]\n",
            full_manifest()
        );
        let manifest = parse_manifest(raw.as_bytes(), REPO).unwrap();
        assert_eq!(manifest.description.as_deref(), Some("HTTP client"));
        assert_eq!(manifest.homepage.as_deref(), Some("https://http.example"));
        assert_eq!(
            manifest.keywords,
            Some(vec!["net".to_string(), "http".to_string()])
        );
        assert_eq!(manifest.categories, Some(vec!["network".to_string()]));
    }

    #[test]
    fn test_syntax_error_is_malformed() {
        let err = parse_manifest(b"[package\nname = ", REPO).unwrap_err();
        assert!(matches!(err, ManifestError::Malformed(_)));
    }

    #[test]
    fn test_invalid_utf8_is_malformed() {
        let err = parse_manifest(&[0xff, 0xfe, 0x00], REPO).unwrap_err();
        assert!(matches!(err, ManifestError::Malformed(_)));
    }

    #[test]
    fn test_missing_license_and_author_reports_both() {
        let raw = full_manifest()
            .lines()
            .filter(|l| !l.starts_with("license") && !l.starts_with("author"))
            .collect::<Vec<_>>()
            .join("\n");

        let err = parse_manifest(raw.as_bytes(), REPO).unwrap_err();
        let ManifestError::SchemaViolation(problems) = err else {
            panic!("expected schema violation");
        };
        assert_eq!(
            problems,
            vec![
                SchemaProblem::Missing {
                    field: "license".to_string()
                },
                SchemaProblem::Missing {
                    field: "author".to_string()
                },
            ]
        );
    }

    #[test]
    fn test_missing_package_table_reports_every_required_field() {
        let err = parse_manifest(b"title = \"nothing here\"\n", REPO).unwrap_err();
        let ManifestError::SchemaViolation(problems) = err else {
            panic!("expected schema violation");
        };
        let fields: Vec<&str> = problems.iter().map(|p| p.field()).collect();
        assert_eq!(fields, REQUIRED_FIELDS.to_vec());
    }

    #[test]
    fn test_empty_and_wrong_type_fields() {
        let raw = full_manifest()
            .replace("name = \"http\"", "name = \"  \"")
            .replace("version = \"1.2.0\"", "version = 12");

        let err = parse_manifest(raw.as_bytes(), REPO).unwrap_err();
        let ManifestError::SchemaViolation(problems) = err else {
            panic!("expected schema violation");
        };
        assert!(problems.contains(&SchemaProblem::Empty {
            field: "name".to_string()
        }));
        assert!(problems.contains(&SchemaProblem::WrongType {
            field: "version".to_string(),
            expected: "a string".to_string()
        }));
    }

    #[test]
    fn test_repository_mismatch_names_both_values() {
        let err = parse_manifest(full_manifest().as_bytes(), "https://github.com/other/http")
            .unwrap_err();
        assert_eq!(
            err,
            ManifestError::SchemaViolation(vec![SchemaProblem::RepositoryMismatch {
                expected: "https://github.com/other/http".to_string(),
                actual: REPO.to_string(),
            }])
        );
        assert!(err.to_string().contains("other/http"));
    }

    #[test]
    fn test_repository_match_is_case_insensitive() {
        let manifest =
            parse_manifest(full_manifest().as_bytes(), "https://GITHUB.com/Someone/HTTP/").unwrap();
        assert_eq!(manifest.repository, REPO);
    }

    #[test]
    fn test_keywords_must_be_strings() {
        let raw = format!("{}keywords = [1, 2]\n", full_manifest());
        let err = parse_manifest(raw.as_bytes(), REPO).unwrap_err();
        assert_eq!(err.reasons(), vec!["field 'keywords' must be an array of strings"]);
    }

    #[test]
    fn test_parse_is_deterministic() {
        let raw = full_manifest();
        assert_eq!(
            parse_manifest(raw.as_bytes(), REPO),
            parse_manifest(raw.as_bytes(), REPO)
        );
    }
}
