mod classifier;
mod history;
mod record;
mod routes;
mod scheduler;
mod server;
mod state;
mod stream;
mod telemetry;

pub mod app;
pub mod config;

pub use app::start_app;
