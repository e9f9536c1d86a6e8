use crate::{server::SharedState, state::StatusSnapshot};
use axum::{extract::State, response::Json};
use tracing::instrument;

#[instrument(skip(state))]
pub async fn status(State(state): State<SharedState>) -> Json<StatusSnapshot> {
    state.metrics.record_request("status");
    Json(state.scheduler.snapshot())
}
