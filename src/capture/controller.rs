use std::sync::{Arc, Mutex as StdMutex};

use anyhow::{bail, Context, Result};
use chrono::Utc;
use log::info;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::Duration;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::api::{CaptureApi, MaskRegion};
use crate::camera::FrameSourceProvider;
use crate::feed::ActivityFeed;
use crate::overlay::project_masks;
use crate::settings::Settings;

use super::loop_worker::{capture_loop, CaptureWorker};
use super::state::{SessionState, SessionStatus};

struct WorkerHandle {
    handle: JoinHandle<()>,
    cancel_token: CancellationToken,
}

/// Owns the capture session lifecycle: camera acquisition, mask-region
/// fetch, and the worker task driving periodic capture-and-send.
pub struct CaptureController {
    settings: Settings,
    api: Arc<dyn CaptureApi>,
    provider: Arc<dyn FrameSourceProvider>,
    feed: ActivityFeed,
    state: Arc<Mutex<SessionState>>,
    /// Last successfully fetched mask regions; a failed fetch at session
    /// start keeps the previous list.
    regions: Mutex<Vec<MaskRegion>>,
    worker: Mutex<Option<WorkerHandle>>,
}

impl CaptureController {
    pub fn new(
        settings: Settings,
        api: Arc<dyn CaptureApi>,
        provider: Arc<dyn FrameSourceProvider>,
        feed: ActivityFeed,
    ) -> Self {
        Self {
            settings,
            api,
            provider,
            feed,
            state: Arc::new(Mutex::new(SessionState::new())),
            regions: Mutex::new(Vec::new()),
            worker: Mutex::new(None),
        }
    }

    pub async fn snapshot(&self) -> SessionState {
        self.state.lock().await.clone()
    }

    /// Acquire the camera, refresh mask regions, perform one immediate
    /// capture-and-send, and schedule repeats every capture interval.
    /// Camera failure leaves the session Idle so the caller can retry.
    pub async fn start(&self) -> Result<()> {
        {
            let state = self.state.lock().await;
            if state.status == SessionStatus::Active {
                bail!("capture session already active");
            }
        }

        self.feed.info("starting camera...");
        let provider = Arc::clone(&self.provider);
        let settings = self.settings.clone();
        let acquired = tokio::task::spawn_blocking(move || provider.acquire(&settings))
            .await
            .context("camera acquisition worker join failed")?;

        let source = match acquired {
            Ok(source) => source,
            Err(err) => {
                self.feed.error(format!("camera unavailable: {err:#}"));
                return Err(err);
            }
        };
        let (width, height) = source.resolution();

        let masks = {
            let mut regions = self.regions.lock().await;
            match self.api.fetch_mask_regions().await {
                Ok(fetched) => {
                    self.feed
                        .success(format!("fetched {} mask regions", fetched.len()));
                    *regions = fetched;
                }
                Err(err) => {
                    self.feed
                        .error(format!("mask region fetch failed: {err:#}"));
                }
            }
            project_masks(&regions, width, height)
        };

        let session_id = Uuid::new_v4().to_string();
        {
            let mut state = self.state.lock().await;
            state.begin(session_id.clone(), Utc::now());
        }

        let cancel_token = CancellationToken::new();
        let worker = CaptureWorker {
            session_id: session_id.clone(),
            source: Arc::new(StdMutex::new(source)),
            masks,
            api: Arc::clone(&self.api),
            feed: self.feed.clone(),
            state: Arc::clone(&self.state),
            interval: Duration::from_secs(self.settings.capture_interval_secs),
            jpeg_quality: self.settings.jpeg_quality,
        };
        let handle = tokio::spawn(capture_loop(worker, cancel_token.clone()));
        *self.worker.lock().await = Some(WorkerHandle { handle, cancel_token });

        self.feed.info(format!(
            "capture started (sending every {}s)",
            self.settings.capture_interval_secs
        ));
        info!("capture session {session_id} started at {width}x{height}");
        Ok(())
    }

    /// Cancel the worker and release the camera. Idempotent: stopping an
    /// idle (or never started) controller is a no-op.
    pub async fn stop(&self) -> Result<()> {
        let Some(WorkerHandle { handle, cancel_token }) = self.worker.lock().await.take() else {
            return Ok(());
        };

        cancel_token.cancel();
        handle
            .await
            .context("capture loop task failed to join")?;

        self.state.lock().await.reset();
        self.feed.info("capture stopped");
        Ok(())
    }
}
