mod auto_refresh;
mod events;
mod health;
mod history;
mod metrics;
mod refresh;
mod status;

use crate::server::SharedState;
use axum::{
    routing::{get, post, put},
    Router,
};

pub fn api_routes() -> Router<SharedState> {
    Router::new()
        .route("/health", get(health::healthcheck))
        .route("/metrics", get(metrics::metrics_handler))
        .route("/status", get(status::status))
        .route("/history", get(history::history))
        .route("/refresh", post(refresh::refresh))
        .route("/auto-refresh", put(auto_refresh::auto_refresh))
        .route("/events", get(events::events))
}
