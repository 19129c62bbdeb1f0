//! Configuration types for talking to the attendance backend.
//!
//! All client behaviour is controlled through [`ClientConfig`], built via its
//! [`ClientConfigBuilder`]. The request contract (base URL, upload path,
//! multipart field name, image path) lives here so that one struct fully
//! describes which backend a client talks to.
//!
//! Two contracts exist in the wild. [`ApiContract::Current`] is the
//! canonical one; [`ApiContract::Legacy`] matches older Flask deployments
//! that expose `/upload` with a `video` field.

use crate::error::GintiError;
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Default backend base URL.
pub const DEFAULT_BASE_URL: &str = "http://localhost:5000";

/// Configuration for an [`crate::client::AttendanceClient`].
///
/// # Example
/// ```rust
/// use smartginti::{ClientConfig, MalformedLinePolicy};
///
/// let config = ClientConfig::builder()
///     .base_url("http://attendance.local:8080")
///     .timeout_secs(900)
///     .malformed_lines(MalformedLinePolicy::Skip)
///     .build()
///     .unwrap();
/// assert_eq!(config.upload_url(), "http://attendance.local:8080/api/process-video");
/// ```
#[derive(Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Scheme + host (+ optional port and path prefix) of the backend.
    /// Default: `http://localhost:5000`. A trailing `/` is stripped.
    pub base_url: String,

    /// Path of the upload endpoint, appended to `base_url`.
    /// Default: `/api/process-video`.
    pub upload_path: String,

    /// Multipart field name carrying the video. Default: `file`.
    pub field_name: String,

    /// Path prefix for preview images; the image id is appended as one
    /// more segment. Default: `/api/images`.
    pub images_path: String,

    /// Whole-request timeout in seconds. Default: 600.
    ///
    /// The backend processes the video synchronously before it answers,
    /// so this has to cover upload plus processing time.
    pub timeout_secs: u64,

    /// TCP connect timeout in seconds. Default: 10.
    pub connect_timeout_secs: u64,

    /// Size of each streamed upload chunk in bytes. Default: 256 KiB.
    pub upload_chunk_bytes: usize,

    /// What to do with summary lines that carry no count. Default: `Keep`.
    pub malformed_lines: MalformedLinePolicy,

    /// Optional upload progress observer.
    #[serde(skip)]
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::for_contract(ApiContract::Current)
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("base_url", &self.base_url)
            .field("upload_path", &self.upload_path)
            .field("field_name", &self.field_name)
            .field("images_path", &self.images_path)
            .field("timeout_secs", &self.timeout_secs)
            .field("connect_timeout_secs", &self.connect_timeout_secs)
            .field("upload_chunk_bytes", &self.upload_chunk_bytes)
            .field("malformed_lines", &self.malformed_lines)
            .field(
                "progress_callback",
                &self
                    .progress_callback
                    .as_ref()
                    .map(|_| "<dyn UploadProgressCallback>"),
            )
            .finish()
    }
}

impl ClientConfig {
    /// Create a new builder for `ClientConfig`, starting from the current contract.
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder {
            config: Self::default(),
        }
    }

    /// Defaults for the given request contract.
    pub fn for_contract(contract: ApiContract) -> Self {
        let (upload_path, field_name) = match contract {
            ApiContract::Current => ("/api/process-video", "file"),
            ApiContract::Legacy => ("/upload", "video"),
        };
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            upload_path: upload_path.to_string(),
            field_name: field_name.to_string(),
            images_path: "/api/images".to_string(),
            timeout_secs: 600,
            connect_timeout_secs: 10,
            upload_chunk_bytes: 256 * 1024,
            malformed_lines: MalformedLinePolicy::default(),
            progress_callback: None,
        }
    }

    /// Full URL of the upload endpoint.
    pub fn upload_url(&self) -> String {
        join_url(&self.base_url, &self.upload_path)
    }

    /// Full URL of the preview image with the given id.
    ///
    /// The id is pushed as a single path segment, so `/` and spaces in it
    /// are percent-encoded.
    pub fn image_url(&self, id: &str) -> Result<String, GintiError> {
        let prefix = join_url(&self.base_url, &self.images_path);
        let mut url = reqwest::Url::parse(&prefix)
            .map_err(|e| GintiError::InvalidConfig(format!("bad images URL '{prefix}': {e}")))?;
        url.path_segments_mut()
            .map_err(|_| GintiError::InvalidConfig(format!("'{prefix}' cannot take a path")))?
            .pop_if_empty()
            .push(id);
        Ok(url.into())
    }
}

/// Builder for [`ClientConfig`].
pub struct ClientConfigBuilder {
    config: ClientConfig,
}

impl fmt::Debug for ClientConfigBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfigBuilder")
            .field("config", &self.config)
            .finish()
    }
}

impl ClientConfigBuilder {
    /// Reset the contract-dependent fields (paths, field name) to a preset.
    /// Call before overriding individual paths.
    pub fn contract(mut self, contract: ApiContract) -> Self {
        let preset = ClientConfig::for_contract(contract);
        self.config.upload_path = preset.upload_path;
        self.config.field_name = preset.field_name;
        self.config.images_path = preset.images_path;
        self
    }

    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn upload_path(mut self, path: impl Into<String>) -> Self {
        self.config.upload_path = path.into();
        self
    }

    pub fn field_name(mut self, name: impl Into<String>) -> Self {
        self.config.field_name = name.into();
        self
    }

    pub fn images_path(mut self, path: impl Into<String>) -> Self {
        self.config.images_path = path.into();
        self
    }

    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.config.timeout_secs = secs;
        self
    }

    pub fn connect_timeout_secs(mut self, secs: u64) -> Self {
        self.config.connect_timeout_secs = secs;
        self
    }

    pub fn upload_chunk_bytes(mut self, n: usize) -> Self {
        self.config.upload_chunk_bytes = n;
        self
    }

    pub fn malformed_lines(mut self, policy: MalformedLinePolicy) -> Self {
        self.config.malformed_lines = policy;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ClientConfig, GintiError> {
        let c = &self.config;
        let parsed = reqwest::Url::parse(&c.base_url).map_err(|e| {
            GintiError::InvalidConfig(format!("base URL '{}' is not a URL: {}", c.base_url, e))
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(GintiError::InvalidConfig(format!(
                "base URL must be http or https, got '{}'",
                parsed.scheme()
            )));
        }
        if c.field_name.trim().is_empty() {
            return Err(GintiError::InvalidConfig(
                "multipart field name must not be empty".into(),
            ));
        }
        if c.timeout_secs == 0 || c.connect_timeout_secs == 0 {
            return Err(GintiError::InvalidConfig("timeouts must be ≥ 1 second".into()));
        }
        if c.upload_chunk_bytes == 0 {
            return Err(GintiError::InvalidConfig(
                "upload chunk size must be ≥ 1 byte".into(),
            ));
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Which request contract the backend speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ApiContract {
    /// `POST /api/process-video`, field `file`. (default)
    #[default]
    Current,
    /// `POST /upload`, field `video`.
    Legacy,
}

/// What the summary parser does with a line that yields no count.
///
/// | Policy | Result |
/// |--------|--------|
/// | `Keep` | row kept, count rendered as `NaN` (default) |
/// | `Skip` | row dropped |
/// | `Zero` | row kept with count 0 |
/// | `Reject` | whole parse fails with [`GintiError::MalformedSummary`] |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MalformedLinePolicy {
    #[default]
    Keep,
    Skip,
    Zero,
    Reject,
}

// ── URL helpers ──────────────────────────────────────────────────────────

fn join_url(base: &str, path: &str) -> String {
    let base = base.trim_end_matches('/');
    if path.is_empty() {
        return base.to_string();
    }
    if path.starts_with('/') {
        format!("{base}{path}")
    } else {
        format!("{base}/{path}")
    }
}
