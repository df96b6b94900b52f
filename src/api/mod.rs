pub mod client;
pub mod types;

use anyhow::Result;
use async_trait::async_trait;

pub use client::ApiClient;
pub use types::{CaptureResult, MaskRegion, UploadOutcome};

/// Backend seam used by the capture worker. Production code talks to
/// [`ApiClient`]; tests substitute a fake.
#[async_trait]
pub trait CaptureApi: Send + Sync {
    /// One-shot fetch of the calendar mask regions.
    async fn fetch_mask_regions(&self) -> Result<Vec<MaskRegion>>;

    /// Upload one JPEG capture. `Ok` means the server answered, success or
    /// not; `Err` is a network/decode failure.
    async fn upload_capture(&self, jpeg: Vec<u8>) -> Result<UploadOutcome>;
}
