//! Sweep trigger handler.

use axum::{extract::State, http::StatusCode, Json};
use std::sync::Arc;
use sopreg_core::SweepReport;
use tracing::info;

use super::{reconcile_error, ErrorResponse};
use crate::state::AppState;

/// Run a sweep now and return its report.
///
/// Waits for any in-progress submission or sweep to release the catalog.
pub async fn trigger_sweep(
    State(state): State<Arc<AppState>>,
) -> Result<Json<SweepReport>, (StatusCode, Json<ErrorResponse>)> {
    info!("Sweep triggered via API");
    state
        .reconciler()
        .on_scheduled_sweep()
        .await
        .map(Json)
        .map_err(reconcile_error)
}
