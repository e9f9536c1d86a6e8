use crate::{
    config::Config, history::HistoryStore, routes::api_routes, scheduler::SchedulerHandle,
    telemetry::Metrics,
};
use axum::Router;
use axum_otel_metrics::HttpMetricsLayerBuilder;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::{net::TcpListener, sync::broadcast::Receiver, task::JoinHandle};

#[derive(Clone)]
pub struct SharedState {
    pub scheduler: SchedulerHandle,
    pub history: Arc<dyn HistoryStore>,
    pub metrics: Arc<Metrics>,
    pub history_fetch_limit: usize,
    pub countdown_tick_ms: u64,
}

pub struct HttpServer {
    router: Router,
    listener: TcpListener,
}

impl HttpServer {
    pub async fn new(
        scheduler: SchedulerHandle,
        history: Arc<dyn HistoryStore>,
        metrics: Arc<Metrics>,
        config: &Config,
    ) -> anyhow::Result<Self> {
        let addr = config.server.get_address();

        let metrics_layer = HttpMetricsLayerBuilder::new().build();

        let app_state = SharedState {
            scheduler,
            history,
            metrics,
            history_fetch_limit: config.history.fetch_limit,
            countdown_tick_ms: config.refresh.countdown_tick_ms,
        };

        let router = Router::new()
            .merge(api_routes())
            .with_state(app_state)
            .layer(metrics_layer);

        let listener = TcpListener::bind(addr).await?;

        Ok(Self { router, listener })
    }

    pub fn local_addr(&self) -> anyhow::Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    pub async fn run(
        self,
        mut shutdown_rx: Receiver<()>,
    ) -> anyhow::Result<JoinHandle<anyhow::Result<()>>> {
        tracing::info!("Starting app on {}", self.local_addr()?);

        let listener = self.listener;
        let router = self.router;
        let server_handle = tokio::spawn(async move {
            let server = axum::serve(listener, router);
            server
                .with_graceful_shutdown(async move {
                    shutdown_rx.recv().await.ok();
                })
                .await?;
            Ok(())
        });

        Ok(server_handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::{Classifier, ClassifierError};
    use crate::config::{
        ClassifierConfig, HistoryConfig, LogLevel, MonitorConfig, RefreshConfig, ServerConfig,
    };
    use crate::history::MemoryHistoryStore;
    use crate::record::Prediction;
    use crate::scheduler::RefreshScheduler;
    use async_trait::async_trait;
    use std::time::Duration;
    use tokio::sync::broadcast;

    struct StubClassifier;

    #[async_trait]
    impl Classifier for StubClassifier {
        async fn classify(
            &self,
            _image_url: &str,
            _filename: &str,
        ) -> Result<Prediction, ClassifierError> {
            Ok(Prediction {
                pattern: "Erratic Movement".to_string(),
                confidence: 87,
            })
        }
    }

    fn test_config() -> Config {
        Config {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 0,
            },
            log_level: LogLevel::Debug,
            classifier: ClassifierConfig {
                endpoint: "http://127.0.0.1:1/classify".to_string(),
                labels: vec![
                    "Normal Swarm".to_string(),
                    "Erratic Movement".to_string(),
                    "Clustering".to_string(),
                ],
            },
            monitor: MonitorConfig {
                image_url: "https://img.example.com/tank.jpg".to_string(),
                filename: "tank.jpg".to_string(),
            },
            history: HistoryConfig {
                base_url: "http://127.0.0.1:1".to_string(),
                collection: "predictions".to_string(),
                use_sample_data: true,
                fetch_limit: 20,
            },
            refresh: RefreshConfig {
                interval_ms: 300_000,
                enabled_on_start: true,
                countdown_tick_ms: 10,
            },
        }
    }

    async fn spawn_app() -> (String, broadcast::Sender<()>) {
        let config = test_config();
        let history: Arc<dyn HistoryStore> = Arc::new(MemoryHistoryStore::with_sample_data());
        let metrics = Arc::new(Metrics::new());

        let (scheduler, handle) = RefreshScheduler::new(
            Arc::new(StubClassifier),
            history.clone(),
            metrics.clone(),
            &config.monitor,
            &config.refresh,
        );
        let server = HttpServer::new(handle, history, metrics, &config)
            .await
            .unwrap();
        let addr = server.local_addr().unwrap();

        let (shutdown_tx, _) = broadcast::channel(1);
        tokio::spawn(scheduler.run(shutdown_tx.subscribe()));
        server.run(shutdown_tx.subscribe()).await.unwrap();

        (format!("http://{}", addr), shutdown_tx)
    }

    async fn wait_for_first_prediction(base_url: &str) -> serde_json::Value {
        for _ in 0..50 {
            let snapshot: serde_json::Value = reqwest::get(format!("{}/status", base_url))
                .await
                .unwrap()
                .json()
                .await
                .unwrap();
            if !snapshot["prediction"].is_null() {
                return snapshot;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("no prediction published in time");
    }

    #[tokio::test]
    async fn test_healthcheck_is_available() {
        let (base_url, _shutdown_tx) = spawn_app().await;

        let response = reqwest::get(format!("{}/health", base_url)).await.unwrap();

        assert!(response.status().is_success());
        let body: serde_json::Value = response.json().await.unwrap();
        assert_eq!(body["status"], "Available");
    }

    #[tokio::test]
    async fn test_status_reports_prediction_and_countdown() {
        let (base_url, _shutdown_tx) = spawn_app().await;

        let snapshot = wait_for_first_prediction(&base_url).await;

        assert_eq!(snapshot["prediction"]["pattern"], "Erratic Movement");
        assert_eq!(snapshot["prediction"]["confidence"], 87);
        assert_eq!(snapshot["phase"], "scheduled");
        assert_eq!(snapshot["auto_refresh"], true);
        let remaining = snapshot["next_refresh_ms"].as_u64().unwrap();
        assert!(remaining <= 300_000);
    }

    #[tokio::test]
    async fn test_history_respects_limit_and_order() {
        let (base_url, _shutdown_tx) = spawn_app().await;
        wait_for_first_prediction(&base_url).await;

        let records: Vec<serde_json::Value> =
            reqwest::get(format!("{}/history?limit=2", base_url))
                .await
                .unwrap()
                .json()
                .await
                .unwrap();

        assert_eq!(records.len(), 2);
        // Newest first: the stub prediction appended on start leads.
        assert_eq!(records[0]["pattern"], "Erratic Movement");
        assert!(records[0]["imageUrl"].is_string());
    }

    #[tokio::test]
    async fn test_manual_refresh_is_accepted_when_not_running() {
        let (base_url, _shutdown_tx) = spawn_app().await;
        wait_for_first_prediction(&base_url).await;

        let client = reqwest::Client::new();
        let response = client
            .post(format!("{}/refresh", base_url))
            .send()
            .await
            .unwrap();

        assert_eq!(response.status(), reqwest::StatusCode::ACCEPTED);
        let body: serde_json::Value = response.json().await.unwrap();
        assert_eq!(body["triggered"], true);
    }

    #[tokio::test]
    async fn test_auto_refresh_toggle_returns_updated_snapshot() {
        let (base_url, _shutdown_tx) = spawn_app().await;
        wait_for_first_prediction(&base_url).await;

        let client = reqwest::Client::new();
        let snapshot: serde_json::Value = client
            .put(format!("{}/auto-refresh", base_url))
            .json(&serde_json::json!({"enabled": false}))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();

        assert_eq!(snapshot["auto_refresh"], false);
        assert_eq!(snapshot["phase"], "idle");
        assert!(snapshot["next_refresh_ms"].is_null());
    }

    #[tokio::test]
    async fn test_events_streams_sse_frames() {
        let (base_url, _shutdown_tx) = spawn_app().await;

        let mut response = reqwest::get(format!("{}/events", base_url)).await.unwrap();

        assert_eq!(
            response.headers()["content-type"].to_str().unwrap(),
            "text/event-stream"
        );
        let chunk = response.chunk().await.unwrap().unwrap();
        let text = std::str::from_utf8(&chunk).unwrap();
        assert!(text.starts_with("data: "));
    }
}
