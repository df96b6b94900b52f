use std::sync::{Arc, Mutex as StdMutex};

use anyhow::{Context, Result};
use image::codecs::jpeg::JpegEncoder;
use image::RgbImage;
use log::{debug, info};
use tokio::sync::Mutex;
use tokio::time::{Duration, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::api::{CaptureApi, UploadOutcome};
use crate::camera::FrameSource;
use crate::feed::ActivityFeed;
use crate::overlay::{draw_overlay, PlacedMask};

use super::state::SessionState;

const CAPTURE_TIMEOUT_SECS: u64 = 30;

pub(crate) struct CaptureWorker {
    pub session_id: String,
    pub source: Arc<StdMutex<Box<dyn FrameSource>>>,
    pub masks: Vec<PlacedMask>,
    pub api: Arc<dyn CaptureApi>,
    pub feed: ActivityFeed,
    pub state: Arc<Mutex<SessionState>>,
    pub interval: Duration,
    pub jpeg_quality: u8,
}

/// Periodic capture-and-send driver. The first tick fires immediately; later
/// ticks are delayed rather than overlapped, so captures never run
/// concurrently. Cancellation is observed between captures, which lets a
/// capture that is already in flight finish and report its outcome.
pub(crate) async fn capture_loop(worker: CaptureWorker, cancel_token: CancellationToken) {
    let mut ticker = tokio::time::interval(worker.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = cancel_token.cancelled() => {
                info!("capture loop shutting down for session {}", worker.session_id);
                break;
            }
            _ = ticker.tick() => {
                let fut = perform_capture(&worker);
                match tokio::time::timeout(Duration::from_secs(CAPTURE_TIMEOUT_SECS), fut).await {
                    Ok(Ok(())) => {}
                    Ok(Err(err)) => worker.feed.error(format!("capture failed: {err:#}")),
                    Err(_) => worker.feed.warning(format!(
                        "capture timed out (> {CAPTURE_TIMEOUT_SECS}s), skipping this tick"
                    )),
                }
            }
        }
    }

    worker.source.lock().unwrap().release();
}

/// One capture-and-send unit: grab frame, overlay masks, encode JPEG,
/// upload, report the outcome to the feed. Per-tick failures are fed and
/// swallowed; only worker-pool join failures propagate.
async fn perform_capture(worker: &CaptureWorker) -> Result<()> {
    let source = Arc::clone(&worker.source);
    let grabbed = tokio::task::spawn_blocking(move || {
        let mut guard = source.lock().unwrap();
        if !guard.is_ready() {
            return Ok(None);
        }
        guard.grab().map(Some)
    })
    .await
    .context("frame grab worker join failed")?;

    let frame = match grabbed {
        Ok(Some(frame)) => frame,
        Ok(None) => {
            debug!("frame source not ready, skipping capture");
            return Ok(());
        }
        Err(err) => {
            worker.feed.error(format!("frame capture failed: {err:#}"));
            return Ok(());
        }
    };

    let masks = worker.masks.clone();
    let quality = worker.jpeg_quality;
    let encoded = tokio::task::spawn_blocking(move || encode_annotated_jpeg(frame, &masks, quality))
        .await
        .context("encode worker join failed")?;

    let jpeg = match encoded {
        Ok(bytes) => bytes,
        Err(err) => {
            worker.feed.error(format!("frame encode failed: {err:#}"));
            return Ok(());
        }
    };

    match worker.api.upload_capture(jpeg).await {
        Ok(UploadOutcome::Accepted(result)) => {
            worker.feed.success(result.feed_message());
            worker.state.lock().await.frames_sent += 1;
        }
        Ok(UploadOutcome::Rejected { status, message }) => {
            worker.feed.warning(format!("upload rejected ({status}): {message}"));
            worker.state.lock().await.frames_sent += 1;
        }
        Err(err) => {
            worker.feed.error(format!("network error: {err:#}"));
        }
    }

    Ok(())
}

fn encode_annotated_jpeg(mut frame: RgbImage, masks: &[PlacedMask], quality: u8) -> Result<Vec<u8>> {
    draw_overlay(&mut frame, masks);

    let mut bytes = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(&mut bytes, quality);
    encoder
        .encode_image(&frame)
        .context("jpeg encoding failed")?;
    Ok(bytes)
}
