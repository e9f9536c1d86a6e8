use crate::{server::SharedState, stream::StatusStream, stream::StatusStreamError};
use axum::{
    body::Body,
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use tracing::instrument;

const CONTENT_TYPE: &str = "text/event-stream";

#[instrument(skip(state))]
pub async fn events(State(state): State<SharedState>) -> Result<Response, EventsError> {
    state.metrics.record_request("events");
    let stream =
        StatusStream::new(state.scheduler.clone(), state.countdown_tick_ms).generate_stream();

    let body = Body::from_stream(stream);

    let response = Response::builder()
        .header(header::CONTENT_TYPE, CONTENT_TYPE)
        .header(header::CACHE_CONTROL, "no-cache")
        .body(body)
        .map_err(|e| EventsError::HttpBuilder(e.to_string()))?;

    Ok(response)
}

#[derive(thiserror::Error, Debug)]
pub enum EventsError {
    #[error("Status stream error: {0}")]
    Stream(#[from] StatusStreamError),
    #[error("Http builder error: {0}")]
    HttpBuilder(String),
}

impl IntoResponse for EventsError {
    fn into_response(self) -> Response {
        (StatusCode::INTERNAL_SERVER_ERROR, self.to_string()).into_response()
    }
}
