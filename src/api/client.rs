use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use std::time::Duration;

use crate::settings::Settings;

use super::types::{rejection_message, CaptureResult, MaskCoordinatesResponse, MaskRegion, UploadOutcome};
use super::CaptureApi;

const REQUEST_TIMEOUT_SECS: u64 = 30;
const UPLOAD_FIELD: &str = "file";
const UPLOAD_FILENAME: &str = "capture.jpg";

/// HTTP client for the Cranberry backend.
pub struct ApiClient {
    http: reqwest::Client,
    capture_endpoint: String,
    mask_endpoint: String,
}

impl ApiClient {
    pub fn new(settings: &Settings) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .context("failed to build http client")?;

        Ok(Self {
            http,
            capture_endpoint: settings.capture_endpoint.clone(),
            mask_endpoint: settings.mask_endpoint.clone(),
        })
    }
}

#[async_trait]
impl CaptureApi for ApiClient {
    async fn fetch_mask_regions(&self) -> Result<Vec<MaskRegion>> {
        let response = self
            .http
            .get(&self.mask_endpoint)
            .send()
            .await
            .context("mask coordinates request failed")?;

        if !response.status().is_success() {
            bail!("HTTP {}", response.status().as_u16());
        }

        let body: MaskCoordinatesResponse = response
            .json()
            .await
            .context("mask coordinates response was not valid JSON")?;
        Ok(body.coordinates)
    }

    async fn upload_capture(&self, jpeg: Vec<u8>) -> Result<UploadOutcome> {
        let part = Part::bytes(jpeg)
            .file_name(UPLOAD_FILENAME)
            .mime_str("image/jpeg")
            .context("failed to build multipart body")?;
        let form = Form::new().part(UPLOAD_FIELD, part);

        let response = self
            .http
            .post(&self.capture_endpoint)
            .multipart(form)
            .send()
            .await
            .context("capture upload request failed")?;

        let status = response.status();
        if status.is_success() {
            let result: CaptureResult = response
                .json()
                .await
                .context("capture response was not valid JSON")?;
            Ok(UploadOutcome::Accepted(result))
        } else {
            let body = response.text().await.unwrap_or_default();
            Ok(UploadOutcome::Rejected {
                status: status.as_u16(),
                message: rejection_message(&body),
            })
        }
    }
}
