use crate::{history::HistoryError, record::PredictionRecord, server::SharedState};
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Deserialize;
use tracing::instrument;

#[derive(Debug, Deserialize)]
pub struct HistoryParams {
    limit: Option<usize>,
}

impl IntoResponse for HistoryError {
    fn into_response(self) -> Response {
        (StatusCode::BAD_GATEWAY, self.to_string()).into_response()
    }
}

#[instrument(skip(state))]
pub async fn history(
    State(state): State<SharedState>,
    Query(params): Query<HistoryParams>,
) -> Result<Json<Vec<PredictionRecord>>, HistoryError> {
    state.metrics.record_request("history");
    let limit = params.limit.unwrap_or(state.history_fetch_limit);

    let records = state.history.fetch_recent(limit).await?;

    Ok(Json(records))
}
