use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::thread;

use anyhow::{anyhow, bail, Context, Result};
use image::RgbImage;
use log::{info, warn};
use nokhwa::pixel_format::RgbFormat;
use nokhwa::utils::{ApiBackend, CameraIndex, RequestedFormat, RequestedFormatType};
use nokhwa::{query, Camera};

use crate::settings::Settings;

/// Device names suggesting a rear/environment-facing camera.
const ENVIRONMENT_FACING_HINTS: [&str; 4] = ["back", "rear", "environment", "world"];

/// Live frame source for the capture loop. Grabbing is synchronous; callers
/// route it through the blocking pool.
pub trait FrameSource: Send {
    /// Native resolution of the source, in pixels.
    fn resolution(&self) -> (u32, u32);

    /// Whether the source is currently delivering frames.
    fn is_ready(&self) -> bool;

    fn grab(&mut self) -> Result<RgbImage>;

    /// Stop the underlying stream. Called once when the session ends.
    fn release(&mut self);
}

/// Acquires a frame source at session start. The production implementation
/// opens a webcam; tests substitute a fake.
pub trait FrameSourceProvider: Send + Sync {
    fn acquire(&self, settings: &Settings) -> Result<Box<dyn FrameSource>>;
}

enum DeviceCommand {
    Grab(mpsc::Sender<Result<RgbImage>>),
    Release,
}

/// Webcam-backed frame source. The nokhwa device is confined to its own
/// thread and driven over a command channel, so the source itself can move
/// freely between tasks.
pub struct CameraSource {
    resolution: (u32, u32),
    commands: mpsc::Sender<DeviceCommand>,
    ready: Arc<AtomicBool>,
}

impl CameraSource {
    pub fn open(index: CameraIndex) -> Result<Self> {
        let (commands, command_rx) = mpsc::channel();
        let (startup_tx, startup_rx) = mpsc::channel();
        let ready = Arc::new(AtomicBool::new(false));

        let thread_ready = Arc::clone(&ready);
        thread::Builder::new()
            .name("camera-device".into())
            .spawn(move || device_thread(index, startup_tx, command_rx, thread_ready))
            .context("failed to spawn camera thread")?;

        match startup_rx.recv() {
            Ok(Ok(resolution)) => Ok(Self { resolution, commands, ready }),
            Ok(Err(err)) => Err(err),
            Err(_) => Err(anyhow!("camera thread exited during startup")),
        }
    }
}

impl FrameSource for CameraSource {
    fn resolution(&self) -> (u32, u32) {
        self.resolution
    }

    fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    fn grab(&mut self) -> Result<RgbImage> {
        let (reply_tx, reply_rx) = mpsc::channel();
        self.commands
            .send(DeviceCommand::Grab(reply_tx))
            .map_err(|_| anyhow!("camera thread is gone"))?;
        reply_rx
            .recv()
            .map_err(|_| anyhow!("camera thread dropped the frame request"))?
    }

    fn release(&mut self) {
        self.ready.store(false, Ordering::SeqCst);
        let _ = self.commands.send(DeviceCommand::Release);
    }
}

/// Owns the nokhwa device for its whole lifetime. Exits (stopping the
/// stream) on Release or when the command channel closes.
fn device_thread(
    index: CameraIndex,
    startup_tx: mpsc::Sender<Result<(u32, u32)>>,
    commands: mpsc::Receiver<DeviceCommand>,
    ready: Arc<AtomicBool>,
) {
    let mut camera = match open_device(index) {
        Ok(camera) => camera,
        Err(err) => {
            let _ = startup_tx.send(Err(err));
            return;
        }
    };

    let resolution = camera.resolution();
    ready.store(true, Ordering::SeqCst);
    if startup_tx
        .send(Ok((resolution.width(), resolution.height())))
        .is_err()
    {
        let _ = camera.stop_stream();
        return;
    }

    while let Ok(command) = commands.recv() {
        match command {
            DeviceCommand::Grab(reply) => {
                let frame = camera
                    .frame()
                    .context("failed to read camera frame")
                    .and_then(|buffer| {
                        buffer
                            .decode_image::<RgbFormat>()
                            .context("failed to decode camera frame")
                    });
                let _ = reply.send(frame);
            }
            DeviceCommand::Release => break,
        }
    }

    ready.store(false, Ordering::SeqCst);
    if let Err(err) = camera.stop_stream() {
        warn!("failed to stop camera stream: {err}");
    }
}

fn open_device(index: CameraIndex) -> Result<Camera> {
    let requested =
        RequestedFormat::new::<RgbFormat>(RequestedFormatType::AbsoluteHighestResolution);
    let mut camera = Camera::new(index, requested).context("failed to open camera device")?;
    camera
        .open_stream()
        .context("failed to start camera stream")?;
    Ok(camera)
}

/// Opens the configured camera, or enumerates devices and prefers a
/// rear/environment-facing one where the name reveals it.
pub struct SystemCameraProvider;

impl FrameSourceProvider for SystemCameraProvider {
    fn acquire(&self, settings: &Settings) -> Result<Box<dyn FrameSource>> {
        let index = match settings.camera_index {
            Some(index) => CameraIndex::Index(index),
            None => {
                let devices = query(ApiBackend::Auto).context("camera enumeration failed")?;
                if devices.is_empty() {
                    bail!("no camera devices available");
                }
                let names: Vec<String> = devices.iter().map(|d| d.human_name()).collect();
                let chosen = pick_device(&names);
                info!("using camera device \"{}\"", names[chosen]);
                devices[chosen].index().clone()
            }
        };

        let source = CameraSource::open(index)?;
        Ok(Box::new(source))
    }
}

/// Position of the preferred device in the enumerated list: the first whose
/// name hints at a rear/environment-facing camera, else the first device.
fn pick_device(names: &[String]) -> usize {
    names
        .iter()
        .position(|name| {
            let lowered = name.to_lowercase();
            ENVIRONMENT_FACING_HINTS
                .iter()
                .any(|hint| lowered.contains(hint))
        })
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefers_environment_facing_device_by_name() {
        let names = vec![
            "FaceTime HD Camera".to_string(),
            "USB Rear Camera".to_string(),
        ];
        assert_eq!(pick_device(&names), 1);
    }

    #[test]
    fn falls_back_to_first_device() {
        let names = vec!["Integrated Webcam".to_string(), "Capture Card".to_string()];
        assert_eq!(pick_device(&names), 0);
    }
}
