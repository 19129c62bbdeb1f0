//! HTTP client for the attendance backend.
//!
//! Two requests exist: the multipart upload that returns an
//! [`AttendanceResult`], and a plain GET for a row's preview image. Both go
//! through one [`reqwest::Client`] so connection pooling and timeouts are
//! shared.
//!
//! Failures are never retried. The backend does the expensive work (frame
//! sampling and head detection) synchronously inside the upload request,
//! so a blind retry would redo minutes of processing.

use crate::config::ClientConfig;
use crate::error::{GintiError, GENERIC_FAILURE_MESSAGE};
use crate::model::{AttendanceResult, AttendanceRow, ErrorBody, ImageKind, PreviewImage, UploadReport};
use crate::pipeline::{input, upload};
use crate::summary;
use std::io::Cursor;
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Talks to one attendance backend, as described by a [`ClientConfig`].
#[derive(Debug, Clone)]
pub struct AttendanceClient {
    http: reqwest::Client,
    config: ClientConfig,
}

impl AttendanceClient {
    /// Build a client with the configured timeouts.
    pub fn new(config: ClientConfig) -> Result<Self, GintiError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .build()
            .map_err(|e| GintiError::Internal(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self { http, config })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Upload a video and return the backend's attendance result.
    ///
    /// # Errors
    /// - input errors (`FileNotFound`, `NotAFile`, `EmptyFile`, …) before
    ///   any request is made
    /// - `Backend` when the server answers non-2xx
    /// - `Timeout` / `Transport` for network failures
    /// - `InvalidResponse` when a 2xx body is not the expected JSON
    /// - `MalformedSummary` when the configured policy is
    ///   [`Reject`](crate::config::MalformedLinePolicy::Reject) and a summary line has no count
    pub async fn process_video(&self, path: impl AsRef<Path>) -> Result<UploadReport, GintiError> {
        let outcome = match self.upload(path.as_ref()).await {
            Ok(report) => self.rows(&report.result).map(|rows| (report, rows.len())),
            Err(e) => Err(e),
        };

        if let Some(cb) = &self.config.progress_callback {
            match &outcome {
                Ok((_, rows)) => cb.on_complete(*rows),
                Err(e) => cb.on_error(&e.user_message()),
            }
        }
        if let Err(GintiError::MalformedSummary { line, .. }) = &outcome {
            warn!("Summary rejected at line {}", line);
        }
        outcome.map(|(report, _)| report)
    }

    /// Rows of `result`, parsed with the configured malformed-line policy.
    pub fn rows(&self, result: &AttendanceResult) -> Result<Vec<AttendanceRow>, GintiError> {
        summary::parse_summary_with(Some(&result.summary), self.config.malformed_lines)
    }

    async fn upload(&self, path: &Path) -> Result<UploadReport, GintiError> {
        let video = input::resolve_video(path).await?;
        let url = self.config.upload_url();
        let start = Instant::now();

        info!(
            "Uploading {} ({} bytes) to {}",
            video.file_name, video.size, url
        );
        if let Some(cb) = &self.config.progress_callback {
            cb.on_upload_start(&video.file_name, video.size);
        }

        let form = upload::video_form(
            &video,
            &self.config.field_name,
            self.config.upload_chunk_bytes,
            self.config.progress_callback.clone(),
        )
        .await?;

        let response = self
            .http
            .post(&url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| self.transport_error(&url, e))?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| self.transport_error(&url, e))?;
        debug!("{} → HTTP {} ({} bytes)", url, status, body.len());

        if !status.is_success() {
            let err = backend_error(status.as_u16(), &body);
            warn!("Backend rejected {}: {}", video.file_name, err);
            return Err(err);
        }

        let result: AttendanceResult =
            serde_json::from_slice(&body).map_err(|e| GintiError::InvalidResponse {
                url: url.clone(),
                detail: e.to_string(),
            })?;

        let duration_ms = start.elapsed().as_millis() as u64;
        info!(
            "Processed {} in {}ms: {}",
            video.file_name, duration_ms, result.message
        );

        Ok(UploadReport {
            file_name: video.file_name,
            bytes_sent: video.size,
            duration_ms,
            result,
        })
    }

    /// URL of the preview image with the given id.
    pub fn image_url(&self, id: &str) -> Result<String, GintiError> {
        self.config.image_url(id)
    }

    /// Download the preview image with the given id.
    pub async fn fetch_image(&self, id: &str) -> Result<PreviewImage, GintiError> {
        let url = self.image_url(id)?;
        debug!("Fetching preview {}", url);

        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| self.transport_error(&url, e))?;

        let status = response.status();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let bytes = response
            .bytes()
            .await
            .map_err(|e| self.transport_error(&url, e))?
            .to_vec();

        if !status.is_success() {
            return Err(backend_error(status.as_u16(), &bytes));
        }

        let (kind, dimensions) = inspect_image(&bytes);
        Ok(PreviewImage {
            id: id.to_string(),
            url,
            content_type,
            kind,
            dimensions,
            bytes,
        })
    }

    /// Download the preview for `row` if `result` references one.
    pub async fn fetch_row_image(
        &self,
        result: &AttendanceResult,
        row: &AttendanceRow,
    ) -> Result<PreviewImage, GintiError> {
        let id = result
            .image_for(row)
            .ok_or_else(|| GintiError::ImageNotFound {
                hour: row.hour.clone(),
            })?;
        self.fetch_image(id).await
    }

    fn transport_error(&self, url: &str, e: reqwest::Error) -> GintiError {
        if e.is_timeout() {
            GintiError::Timeout {
                url: url.to_string(),
                secs: self.config.timeout_secs,
            }
        } else {
            GintiError::Transport {
                url: url.to_string(),
                reason: e.to_string(),
            }
        }
    }
}

/// Synchronous wrapper around [`AttendanceClient::process_video`].
///
/// Creates a temporary tokio runtime internally.
pub fn process_video_sync(
    path: impl AsRef<Path>,
    config: &ClientConfig,
) -> Result<UploadReport, GintiError> {
    let client = AttendanceClient::new(config.clone())?;
    tokio::runtime::Runtime::new()
        .map_err(|e| GintiError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(client.process_video(path))
}

/// Write a preview image to disk.
///
/// Uses atomic write (temp file + rename) to prevent partial files.
pub async fn save_image(image: &PreviewImage, path: impl AsRef<Path>) -> Result<(), GintiError> {
    let path = path.as_ref();
    let write_err = |source| GintiError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
    }

    let mut tmp_name = path.as_os_str().to_os_string();
    tmp_name.push(".tmp");
    let tmp_path = std::path::PathBuf::from(tmp_name);

    tokio::fs::write(&tmp_path, &image.bytes)
        .await
        .map_err(write_err)?;
    if let Err(e) = tokio::fs::rename(&tmp_path, path).await {
        let _ = tokio::fs::remove_file(&tmp_path).await;
        return Err(write_err(e));
    }

    info!("Saved preview {} to {}", image.id, path.display());
    Ok(())
}

// ── Internal helpers ─────────────────────────────────────────────────────

/// Message from a failure body: its `error` field, else the generic text.
fn backend_error(status: u16, body: &[u8]) -> GintiError {
    let message = serde_json::from_slice::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.error)
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| GENERIC_FAILURE_MESSAGE.to_string());
    GintiError::Backend { status, message }
}

/// Detect PNG/JPEG and read dimensions from the header when possible.
fn inspect_image(bytes: &[u8]) -> (ImageKind, Option<(u32, u32)>) {
    let kind = match image::guess_format(bytes) {
        Ok(image::ImageFormat::Png) => ImageKind::Png,
        Ok(image::ImageFormat::Jpeg) => ImageKind::Jpeg,
        _ => return (ImageKind::Other, None),
    };
    let dimensions = image::ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .ok()
        .and_then(|r| r.into_dimensions().ok());
    (kind, dimensions)
}
