use crate::{server::SharedState, state::StatusSnapshot};
use axum::{extract::State, response::Json};
use serde::Deserialize;
use tracing::instrument;

#[derive(Debug, Deserialize)]
pub struct AutoRefreshRequest {
    pub enabled: bool,
}

#[instrument(skip(state))]
pub async fn auto_refresh(
    State(state): State<SharedState>,
    Json(request): Json<AutoRefreshRequest>,
) -> Json<StatusSnapshot> {
    state.metrics.record_request("auto_refresh");
    Json(state.scheduler.set_auto_refresh(request.enabled))
}
