use chrono::{DateTime, NaiveDateTime};
use serde::{Deserialize, Deserializer};

/// Calendar-grid cell: normalized bounding box plus the day number
/// rendered inside it.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MaskRegion {
    /// `[x_min, y_min, x_max, y_max]`, each in 0.0..=1.0.
    #[serde(rename = "box")]
    pub bounds: [f32; 4],
    /// The backend sends `day` as either a JSON string or a number.
    #[serde(rename = "day", deserialize_with = "label_from_string_or_number")]
    pub label: String,
}

fn label_from_string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    match value {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "day label must be a string or number, got {other}"
        ))),
    }
}

/// Response of the mask-coordinates endpoint. A missing `coordinates`
/// field is tolerated and yields an empty list.
#[derive(Debug, Default, Deserialize)]
pub struct MaskCoordinatesResponse {
    #[serde(default)]
    pub coordinates: Vec<MaskRegion>,
}

const OCR_PREVIEW_CHARS: usize = 30;

/// Successful OCR/calendar result for one uploaded capture.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CaptureResult {
    pub parsed_summary: Option<String>,
    pub start_time: Option<String>,
    pub calendar_status: Option<String>,
    pub event_id: Option<String>,
    pub cranberry_ocr_text: Option<String>,
}

impl CaptureResult {
    /// One-line summary for the activity feed: event title, normalized start
    /// time, calendar status with event id, and a truncated OCR preview.
    pub fn feed_message(&self) -> String {
        let summary = self.parsed_summary.as_deref().unwrap_or("(none)");
        let start = self
            .start_time
            .as_deref()
            .map(normalize_start_time)
            .unwrap_or_else(|| "unknown".into());
        let status = self.calendar_status.as_deref().unwrap_or("unknown");
        let event_id = self.event_id.as_deref().unwrap_or("n/a");
        let ocr = self
            .cranberry_ocr_text
            .as_deref()
            .map(ocr_preview)
            .unwrap_or_default();

        format!(
            "calendar event processed: {summary}; start {start}; status {status} (id {event_id}); ocr \"{ocr}\""
        )
    }
}

/// Render an ISO-ish timestamp as `YYYY-MM-DD HH:MM`; unparseable input is
/// passed through unchanged.
fn normalize_start_time(raw: &str) -> String {
    const OUT: &str = "%Y-%m-%d %H:%M";

    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return parsed.format(OUT).to_string();
    }
    for layout in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M"] {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(raw, layout) {
            return parsed.format(OUT).to_string();
        }
    }
    raw.to_string()
}

/// First characters of the OCR text with newlines flattened, marked with an
/// ellipsis when truncated.
fn ocr_preview(text: &str) -> String {
    let flattened: String = text
        .chars()
        .map(|c| if c == '\n' || c == '\r' { ' ' } else { c })
        .collect();

    if flattened.chars().count() <= OCR_PREVIEW_CHARS {
        flattened
    } else {
        let mut preview: String = flattened.chars().take(OCR_PREVIEW_CHARS).collect();
        preview.push_str("...");
        preview
    }
}

/// Error payload the backend attaches to non-2xx responses.
#[derive(Debug, Default, Deserialize)]
pub struct ErrorBody {
    pub detail: Option<String>,
    pub error: Option<String>,
}

impl ErrorBody {
    pub fn message(self) -> String {
        self.detail
            .or(self.error)
            .unwrap_or_else(|| "unknown error".into())
    }
}

/// Extract the server-provided message from a non-2xx response body.
pub fn rejection_message(body: &str) -> String {
    serde_json::from_str::<ErrorBody>(body)
        .unwrap_or_default()
        .message()
}

/// Outcome of a capture upload that reached the server.
#[derive(Debug)]
pub enum UploadOutcome {
    Accepted(CaptureResult),
    Rejected { status: u16, message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn day_label_accepts_number_and_string() {
        let numeric: MaskRegion =
            serde_json::from_str(r#"{ "box": [0.1, 0.1, 0.5, 0.5], "day": 1 }"#).unwrap();
        let stringly: MaskRegion =
            serde_json::from_str(r#"{ "box": [0.1, 0.1, 0.5, 0.5], "day": "1" }"#).unwrap();

        assert_eq!(numeric.label, "1");
        assert_eq!(numeric, stringly);
    }

    #[test]
    fn missing_coordinates_field_is_tolerated() {
        let response: MaskCoordinatesResponse = serde_json::from_str("{}").unwrap();
        assert!(response.coordinates.is_empty());
    }

    #[test]
    fn rejection_message_prefers_detail_over_error() {
        assert_eq!(
            rejection_message(r#"{ "detail": "bad file", "error": "other" }"#),
            "bad file"
        );
        assert_eq!(rejection_message(r#"{ "error": "invalid image" }"#), "invalid image");
        assert_eq!(rejection_message("{}"), "unknown error");
        assert_eq!(rejection_message("<html>nope</html>"), "unknown error");
    }

    #[test]
    fn feed_message_includes_all_fields() {
        let result = CaptureResult {
            parsed_summary: Some("Dentist".into()),
            start_time: Some("2026-08-06T09:30:00".into()),
            calendar_status: Some("created".into()),
            event_id: Some("evt-42".into()),
            cranberry_ocr_text: Some("AUG 6\nDentist 9:30".into()),
        };

        let message = result.feed_message();
        assert!(message.contains("Dentist"));
        assert!(message.contains("2026-08-06 09:30"));
        assert!(message.contains("created"));
        assert!(message.contains("evt-42"));
        assert!(message.contains("AUG 6 Dentist 9:30"));
    }

    #[test]
    fn feed_message_survives_missing_fields() {
        let message = CaptureResult::default().feed_message();
        assert!(message.contains("(none)"));
        assert!(message.contains("n/a"));
    }

    #[test]
    fn ocr_preview_truncates_on_char_boundaries() {
        let long: String = "あ".repeat(40);
        let preview = ocr_preview(&long);
        assert_eq!(preview.chars().count(), OCR_PREVIEW_CHARS + 3);
        assert!(preview.ends_with("..."));

        assert_eq!(ocr_preview("short"), "short");
        assert_eq!(ocr_preview("two\nlines"), "two lines");
    }

    #[test]
    fn start_time_normalization_accepts_common_layouts() {
        assert_eq!(
            normalize_start_time("2026-08-06T09:30:00+09:00"),
            "2026-08-06 09:30"
        );
        assert_eq!(normalize_start_time("2026-08-06T09:30:00"), "2026-08-06 09:30");
        assert_eq!(normalize_start_time("not a date"), "not a date");
    }
}
