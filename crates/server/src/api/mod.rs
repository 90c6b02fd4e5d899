pub mod catalog;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod submissions;
pub mod sweep;

pub use routes::create_router;

use axum::{http::StatusCode, Json};
use serde::Serialize;
use sopreg_core::ReconcileError;

/// Error body shared by every endpoint.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

/// Map an engine error to an HTTP status and body.
pub fn reconcile_error(e: ReconcileError) -> (StatusCode, Json<ErrorResponse>) {
    let status = match &e {
        ReconcileError::Hosting(_) => StatusCode::BAD_GATEWAY,
        ReconcileError::Catalog(_) => StatusCode::INTERNAL_SERVER_ERROR,
        ReconcileError::DuplicateRepository(_) => StatusCode::CONFLICT,
    };
    (status, Json(ErrorResponse::new(e.to_string())))
}
