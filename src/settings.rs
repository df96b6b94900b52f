use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{env, fs, path::Path, path::PathBuf};

const SETTINGS_PATH_ENV: &str = "CRANBERRY_CAPTURE_SETTINGS";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Settings {
    /// Endpoint receiving the multipart capture upload.
    pub capture_endpoint: String,
    /// Endpoint serving the calendar mask coordinates.
    pub mask_endpoint: String,
    /// Seconds between capture-and-send ticks.
    pub capture_interval_secs: u64,
    /// JPEG encoder quality (1-100).
    pub jpeg_quality: u8,
    /// Explicit camera device index; `None` picks a device automatically,
    /// preferring a rear/environment-facing one where the name reveals it.
    pub camera_index: Option<u32>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            capture_endpoint: "http://127.0.0.1:8000/api/call-cranberry".into(),
            mask_endpoint: "http://127.0.0.1:8000/api/cranberry/mask_coords".into(),
            capture_interval_secs: 10,
            jpeg_quality: 90,
            camera_index: None,
        }
    }
}

impl Settings {
    /// Load settings from an optional JSON file. A missing file yields the
    /// defaults; a malformed file falls back to the defaults as well.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let settings = match path {
            Some(path) if path.exists() => {
                let contents = fs::read_to_string(path)
                    .with_context(|| format!("Failed to read settings from {}", path.display()))?;
                serde_json::from_str(&contents).unwrap_or_default()
            }
            _ => Settings::default(),
        };

        Ok(settings.normalized())
    }

    /// Settings file path from argv[1], falling back to the environment.
    pub fn resolve_path() -> Option<PathBuf> {
        env::args()
            .nth(1)
            .map(PathBuf::from)
            .or_else(|| env::var(SETTINGS_PATH_ENV).ok().map(PathBuf::from))
    }

    fn normalized(mut self) -> Self {
        self.capture_interval_secs = self.capture_interval_secs.max(1);
        self.jpeg_quality = self.jpeg_quality.clamp(1, 100);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_settings_file(contents: &str) -> PathBuf {
        let path = env::temp_dir().join(format!("capture-settings-{}.json", uuid::Uuid::new_v4()));
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn defaults_when_no_path_given() {
        let settings = Settings::load(None).unwrap();
        assert_eq!(settings.capture_interval_secs, 10);
        assert_eq!(settings.jpeg_quality, 90);
        assert!(settings.capture_endpoint.ends_with("/call-cranberry"));
        assert!(settings.camera_index.is_none());
    }

    #[test]
    fn partial_file_keeps_remaining_defaults() {
        let path = temp_settings_file(r#"{ "captureIntervalSecs": 5, "cameraIndex": 2 }"#);
        let settings = Settings::load(Some(path.as_path())).unwrap();
        fs::remove_file(&path).unwrap();

        assert_eq!(settings.capture_interval_secs, 5);
        assert_eq!(settings.camera_index, Some(2));
        assert_eq!(settings.jpeg_quality, 90);
    }

    #[test]
    fn malformed_file_falls_back_to_defaults() {
        let path = temp_settings_file("not json at all");
        let settings = Settings::load(Some(path.as_path())).unwrap();
        fs::remove_file(&path).unwrap();

        assert_eq!(settings.capture_interval_secs, 10);
    }

    #[test]
    fn normalization_clamps_degenerate_values() {
        let path = temp_settings_file(r#"{ "captureIntervalSecs": 0, "jpegQuality": 0 }"#);
        let settings = Settings::load(Some(path.as_path())).unwrap();
        fs::remove_file(&path).unwrap();

        assert_eq!(settings.capture_interval_secs, 1);
        assert_eq!(settings.jpeg_quality, 1);
    }
}
