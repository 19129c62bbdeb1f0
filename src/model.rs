//! Wire payloads and derived types.
//!
//! [`AttendanceResult`] is exactly what the backend returns. Everything else
//! here is derived on the client: [`AttendanceRow`]s are recomputed from the
//! summary whenever they are needed and never stored.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Success payload of the upload endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceResult {
    /// Human-readable status line, e.g. "Processing complete!".
    #[serde(default)]
    pub message: String,

    /// Raw multi-line summary, one line per time period.
    #[serde(default)]
    pub summary: String,

    /// Hour label (or hour number) → image identifier.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub images: BTreeMap<String, String>,
}

impl AttendanceResult {
    /// Image identifier for a row, if the backend supplied one.
    ///
    /// Tries the full hour label first, then the row's short key
    /// (`"Hour 3"` → `"3"`).
    pub fn image_for(&self, row: &AttendanceRow) -> Option<&str> {
        self.images
            .get(&row.hour)
            .or_else(|| row.image_key().and_then(|k| self.images.get(k)))
            .map(String::as_str)
    }

    pub fn has_images(&self) -> bool {
        !self.images.is_empty()
    }
}

/// Body of a failed request. Only `error` is interesting.
#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct ErrorBody {
    #[serde(default)]
    pub error: Option<String>,
}

/// One parsed summary line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceRow {
    /// Trimmed label before the first `:`.
    pub hour: String,

    /// Headcount, or `None` when the line had no integer after the `:`.
    pub count: Option<i64>,
}

impl AttendanceRow {
    pub fn new(hour: impl Into<String>, count: Option<i64>) -> Self {
        Self {
            hour: hour.into(),
            count,
        }
    }

    /// Second word of the label, used as the short image key.
    pub fn image_key(&self) -> Option<&str> {
        self.hour.split_whitespace().nth(1)
    }

    /// Count as displayed in the table.
    pub fn count_display(&self) -> String {
        match self.count {
            Some(n) => n.to_string(),
            None => "NaN".to_string(),
        }
    }
}

/// Outcome of one upload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadReport {
    /// File name sent in the multipart part.
    pub file_name: String,
    /// Number of video bytes sent.
    pub bytes_sent: u64,
    /// Wall-clock time from first byte to parsed response.
    pub duration_ms: u64,
    /// The backend's answer.
    pub result: AttendanceResult,
}

/// Container format detected from preview bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageKind {
    Png,
    Jpeg,
    Other,
}

/// A downloaded row preview.
#[derive(Debug, Clone, Serialize)]
pub struct PreviewImage {
    pub id: String,
    pub url: String,
    pub content_type: Option<String>,
    pub kind: ImageKind,
    /// `(width, height)` when the header could be decoded.
    pub dimensions: Option<(u32, u32)>,
    #[serde(skip)]
    pub bytes: Vec<u8>,
}

impl PreviewImage {
    /// File extension matching the detected format.
    pub fn extension(&self) -> &'static str {
        match self.kind {
            ImageKind::Png => "png",
            ImageKind::Jpeg => "jpg",
            ImageKind::Other => "bin",
        }
    }
}
