use crate::server::SharedState;
use axum::{extract::State, http::StatusCode, response::Json};
use serde::{Deserialize, Serialize};
use tracing::instrument;

#[derive(Serialize, Deserialize)]
pub struct TriggerResponse {
    pub triggered: bool,
}

/// Manual trigger. 202 when accepted, 409 while a run is in flight
/// (no queueing, the client retries after the current run).
#[instrument(skip(state))]
pub async fn refresh(State(state): State<SharedState>) -> (StatusCode, Json<TriggerResponse>) {
    state.metrics.record_request("refresh");

    if state.scheduler.trigger_refresh() {
        (StatusCode::ACCEPTED, Json(TriggerResponse { triggered: true }))
    } else {
        (StatusCode::CONFLICT, Json(TriggerResponse { triggered: false }))
    }
}
