use crate::scheduler::SchedulerHandle;
use bytes::Bytes;
use futures::stream;
use std::time::Duration;
use thiserror::Error;
use tokio::time::sleep;
use tracing::instrument;

/// Re-emits the status snapshot as a server-sent-events frame on a fixed
/// tick, so the countdown stays live without the client polling.
#[derive(Clone)]
pub struct StatusStream {
    pub scheduler: SchedulerHandle,
    pub tick_ms: u64,
}

#[derive(Error, Debug)]
pub enum StatusStreamError {
    #[error("Status serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl StatusStream {
    pub fn new(scheduler: SchedulerHandle, tick_ms: u64) -> Self {
        Self { scheduler, tick_ms }
    }

    #[instrument(skip(self))]
    pub fn generate_stream(self) -> impl futures::Stream<Item = Result<Bytes, StatusStreamError>> {
        let tick = Duration::from_millis(self.tick_ms);

        stream::unfold(self.scheduler, move |scheduler| async move {
            sleep(tick).await;
            let snapshot = scheduler.snapshot();
            match serde_json::to_vec(&snapshot) {
                Ok(json) => {
                    let mut frame = b"data: ".to_vec();
                    frame.extend_from_slice(&json);
                    frame.extend_from_slice(b"\n\n");
                    Some((Ok::<_, StatusStreamError>(Bytes::from(frame)), scheduler))
                }
                Err(e) => {
                    tracing::error!("Error serializing status snapshot: {:?}", e);
                    Some((Err(StatusStreamError::from(e)), scheduler))
                }
            }
        })
    }
}
