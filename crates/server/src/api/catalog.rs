//! Catalog API handlers.

use axum::{extract::State, http::StatusCode, Json};
use std::sync::Arc;
use sopreg_core::Catalog;

use super::{reconcile_error, ErrorResponse};
use crate::state::AppState;

/// Return the catalog document as currently persisted.
pub async fn get_catalog(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Catalog>, (StatusCode, Json<ErrorResponse>)> {
    state.reconciler().catalog().map(Json).map_err(reconcile_error)
}
