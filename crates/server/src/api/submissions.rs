//! Submission API handlers.

use axum::{extract::State, http::StatusCode, Json};
use serde::Deserialize;
use std::sync::Arc;
use sopreg_core::{ChangeRef, RepoRef, SubmissionOutcome};

use super::{reconcile_error, ErrorResponse};
use crate::state::AppState;

// ============================================================================
// Request Types
// ============================================================================

/// Request body identifying a pull request against the registry repository
#[derive(Debug, Deserialize)]
pub struct SubmissionBody {
    /// Registry repository as `owner/name`
    pub repository: String,
    /// Pull request number
    pub number: u64,
}

// ============================================================================
// Handlers
// ============================================================================

/// Process a submission.
///
/// Accepted submissions return 200, rejected ones 422 with the reason in the
/// body. Infrastructure failures map to 5xx.
pub async fn submit(
    State(state): State<Arc<AppState>>,
    Json(body): Json<SubmissionBody>,
) -> Result<(StatusCode, Json<SubmissionOutcome>), (StatusCode, Json<ErrorResponse>)> {
    let repository = RepoRef::parse_slug(&body.repository)
        .map_err(|e| (StatusCode::BAD_REQUEST, Json(ErrorResponse::new(e.to_string()))))?;
    let change = ChangeRef::new(repository, body.number);

    let outcome = state
        .reconciler()
        .on_submission(&change)
        .await
        .map_err(reconcile_error)?;

    let status = if outcome.is_accepted() {
        StatusCode::OK
    } else {
        StatusCode::UNPROCESSABLE_ENTITY
    };
    Ok((status, Json(outcome)))
}
