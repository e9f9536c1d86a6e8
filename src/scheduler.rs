use crate::classifier::Classifier;
use crate::config::{MonitorConfig, RefreshConfig};
use crate::history::HistoryStore;
use crate::record::{Prediction, PredictionRecord};
use crate::state::{MonitorState, Phase, StatusSnapshot};
use crate::telemetry::Metrics;
use chrono::Utc;
use parking_lot::RwLock;
use std::sync::Arc;
use tokio::{
    sync::{broadcast, mpsc, watch},
    time::{sleep_until, Duration, Instant},
};

#[derive(Debug)]
enum Command {
    Trigger,
    Recompute,
}

struct Control {
    phase: Phase,
    auto_refresh: bool,
    deadline: Option<Instant>,
}

struct Inner {
    classifier: Arc<dyn Classifier>,
    history: Arc<dyn HistoryStore>,
    metrics: Arc<Metrics>,
    image_url: String,
    filename: String,
    interval: Duration,
    control: RwLock<Control>,
    state_tx: watch::Sender<MonitorState>,
}

/// Owner of the refresh lifecycle: one deadline, one classification in
/// flight at most, every state change published to the watch channel.
pub struct RefreshScheduler {
    inner: Arc<Inner>,
    command_rx: mpsc::Receiver<Command>,
}

/// Cheap clone handed to the HTTP surface. Reads are lock-then-copy;
/// the only mutations are the auto-refresh flag and command sends.
#[derive(Clone)]
pub struct SchedulerHandle {
    inner: Arc<Inner>,
    command_tx: mpsc::Sender<Command>,
    state_rx: watch::Receiver<MonitorState>,
}

impl RefreshScheduler {
    pub fn new(
        classifier: Arc<dyn Classifier>,
        history: Arc<dyn HistoryStore>,
        metrics: Arc<Metrics>,
        monitor_config: &MonitorConfig,
        refresh_config: &RefreshConfig,
    ) -> (Self, SchedulerHandle) {
        let (state_tx, state_rx) = watch::channel(MonitorState::initial(
            monitor_config.image_url.clone(),
            monitor_config.filename.clone(),
        ));
        let (command_tx, command_rx) = mpsc::channel(8);

        let inner = Arc::new(Inner {
            classifier,
            history,
            metrics,
            image_url: monitor_config.image_url.clone(),
            filename: monitor_config.filename.clone(),
            interval: Duration::from_millis(refresh_config.interval_ms),
            control: RwLock::new(Control {
                phase: Phase::Idle,
                auto_refresh: refresh_config.enabled_on_start,
                deadline: None,
            }),
            state_tx,
        });

        let scheduler = Self {
            inner: inner.clone(),
            command_rx,
        };
        let handle = SchedulerHandle {
            inner,
            command_tx,
            state_rx,
        };

        (scheduler, handle)
    }

    pub async fn run(mut self, mut shutdown_rx: broadcast::Receiver<()>) {
        let inner = self.inner.clone();

        // One immediate classification on start, then arm per the flag.
        tokio::select! {
            _ = shutdown_rx.recv() => {
                tracing::info!("Refresh scheduler received shutdown signal");
                return;
            }
            _ = Self::run_once(&inner) => {}
        }
        Self::arm_after_run(&inner, &mut self.command_rx);

        loop {
            let deadline = inner.control.read().deadline;

            let fire = tokio::select! {
                _ = shutdown_rx.recv() => {
                    tracing::info!("Refresh scheduler received shutdown signal");
                    break;
                }
                command = self.command_rx.recv() => match command {
                    Some(Command::Trigger) => true,
                    Some(Command::Recompute) => false,
                    None => break,
                },
                _ = Self::wait_for_deadline(deadline) => true,
            };

            if fire {
                tokio::select! {
                    _ = shutdown_rx.recv() => {
                        tracing::info!("Refresh scheduler received shutdown signal");
                        break;
                    }
                    _ = Self::run_once(&inner) => {}
                }
                Self::arm_after_run(&inner, &mut self.command_rx);
            }
        }
        tracing::info!("Refresh scheduler stopped");
    }

    async fn wait_for_deadline(deadline: Option<Instant>) {
        match deadline {
            Some(deadline) => sleep_until(deadline).await,
            None => std::future::pending().await,
        }
    }

    async fn run_once(inner: &Arc<Inner>) {
        {
            let mut control = inner.control.write();
            control.phase = Phase::Running;
            control.deadline = None;
        }

        let started = Instant::now();
        let result = inner
            .classifier
            .classify(&inner.image_url, &inner.filename)
            .await;
        let duration_ms = started.elapsed().as_millis() as u64;

        match result {
            Ok(prediction) => {
                inner.metrics.record_classification(duration_ms, "success");
                let now = Utc::now();
                inner.state_tx.send_modify(|state| {
                    state.prediction = Some(prediction.clone());
                    state.last_updated = Some(now);
                    state.status = None;
                });

                let record = PredictionRecord {
                    timestamp: now,
                    filename: inner.filename.clone(),
                    pattern: prediction.pattern,
                    confidence: prediction.confidence,
                    image_url: inner.image_url.clone(),
                };
                if let Err(e) = inner.history.append(&record).await {
                    inner.metrics.record_history_failure();
                    tracing::warn!("Failed to persist prediction: {:?}", e);
                    inner.state_tx.send_modify(|state| {
                        state.status = Some("History save failed".to_string());
                    });
                }
            }
            Err(e) => {
                inner.metrics.record_classification(duration_ms, "failure");
                tracing::error!("Classification failed: {:?}", e);
                inner.state_tx.send_modify(|state| {
                    state.prediction = Some(Prediction::error());
                    state.last_updated = Some(Utc::now());
                    state.status = Some(format!("Prediction failed: {}", e));
                });
            }
        }
    }

    fn arm_after_run(inner: &Arc<Inner>, command_rx: &mut mpsc::Receiver<Command>) {
        // Triggers queued while the run was in flight are stale; drop them.
        while command_rx.try_recv().is_ok() {}

        let mut control = inner.control.write();
        if control.auto_refresh {
            control.phase = Phase::Scheduled;
            control.deadline = Some(Instant::now() + inner.interval);
        } else {
            control.phase = Phase::Idle;
            control.deadline = None;
        }
    }
}

impl SchedulerHandle {
    pub fn snapshot(&self) -> StatusSnapshot {
        let control = self.inner.control.read();
        StatusSnapshot {
            monitor: self.state_rx.borrow().clone(),
            auto_refresh: control.auto_refresh,
            phase: control.phase,
            next_refresh_ms: control
                .deadline
                .map(|deadline| deadline.saturating_duration_since(Instant::now()).as_millis() as u64),
        }
    }

    /// Requests a refresh now. Returns false while a run is in flight:
    /// no queueing, no cancellation of the current run.
    pub fn trigger_refresh(&self) -> bool {
        if self.inner.control.read().phase == Phase::Running {
            return false;
        }
        self.command_tx.try_send(Command::Trigger).is_ok()
    }

    /// Toggles auto-refresh. Enabling arms a fresh deadline from now; a
    /// stale countdown is never resumed. Toggling to the current value
    /// is a no-op.
    pub fn set_auto_refresh(&self, enabled: bool) -> StatusSnapshot {
        {
            let mut control = self.inner.control.write();
            if control.auto_refresh != enabled {
                control.auto_refresh = enabled;
                if control.phase != Phase::Running {
                    if enabled {
                        control.phase = Phase::Scheduled;
                        control.deadline = Some(Instant::now() + self.inner.interval);
                    } else {
                        control.phase = Phase::Idle;
                        control.deadline = None;
                    }
                }
                let _ = self.command_tx.try_send(Command::Recompute);
            }
        }
        self.snapshot()
    }
}
