use crate::classifier::{Classifier, HttpClassifier};
use crate::config::Config;
use crate::history::{HistoryStore, HttpHistoryStore, MemoryHistoryStore};
use crate::scheduler::RefreshScheduler;
use crate::server::HttpServer;
use crate::telemetry::Metrics;

use std::{error::Error, sync::Arc};
use tokio::{signal, sync::broadcast};

pub async fn start_app(config: Config) -> Result<(), Box<dyn Error>> {
    let classifier: Arc<dyn Classifier> = Arc::new(HttpClassifier::new(&config.classifier));

    // Backend chosen once here; the adapter contract stays backend-agnostic.
    let history: Arc<dyn HistoryStore> = if config.history.use_sample_data {
        tracing::info!("History backed by in-memory sample data");
        Arc::new(MemoryHistoryStore::with_sample_data())
    } else {
        Arc::new(HttpHistoryStore::new(&config.history))
    };

    let metrics = Arc::new(Metrics::new());

    let (scheduler, scheduler_handle) = RefreshScheduler::new(
        classifier,
        history.clone(),
        metrics.clone(),
        &config.monitor,
        &config.refresh,
    );

    let server = HttpServer::new(scheduler_handle, history, metrics, &config).await?;

    let (shutdown_tx, _) = broadcast::channel(1);
    let scheduler_shutdown_rx = shutdown_tx.subscribe();
    let server_shutdown_rx = shutdown_tx.subscribe();

    tokio::spawn(scheduler.run(scheduler_shutdown_rx));

    let server_handle = server.run(server_shutdown_rx).await?;

    shutdown_signal().await;
    tracing::info!("Shutdown signal received, starting graceful shutdown.");

    let _ = shutdown_tx.send(());
    let _ = server_handle.await;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
