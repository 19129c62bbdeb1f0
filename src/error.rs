//! Error types for the smartginti library.
//!
//! Everything that can go wrong during one attendance attempt is a variant of
//! [`GintiError`]. The variants fall into three groups:
//!
//! * **Local** — the request never leaves the machine (no file selected,
//!   unreadable video, invalid configuration, a request already in flight).
//! * **Backend** — the upload or image fetch failed on the wire or the
//!   backend answered with an error.
//! * **Summary** — a summary line could not be parsed and the configured
//!   [`crate::config::MalformedLinePolicy`] is `Reject`.
//!
//! Every error is terminal for the current attempt. Nothing is retried.

use std::path::PathBuf;
use thiserror::Error;

/// Message shown when the backend fails without an `error` field.
pub const GENERIC_FAILURE_MESSAGE: &str = "Failed to process video. Please try again.";

/// Message shown when the user submits without choosing a video.
pub const NO_FILE_MESSAGE: &str = "Please select a video file";

/// All errors returned by the smartginti library.
#[derive(Debug, Error)]
pub enum GintiError {
    // ── Local validation ──────────────────────────────────────────────────
    /// Submit was requested with no video selected.
    #[error("{}", NO_FILE_MESSAGE)]
    NoFileSelected,

    /// A previous submission is still waiting for the backend.
    #[error("A video is already being processed; wait for it to finish.")]
    RequestInFlight,

    /// Video file was not found at the given path.
    #[error("Video file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The path exists but is a directory or another non-regular file.
    #[error("'{path}' is not a regular file")]
    NotAFile { path: PathBuf },

    /// The video file has zero bytes.
    #[error("Video file '{path}' is empty")]
    EmptyFile { path: PathBuf },

    // ── Backend ───────────────────────────────────────────────────────────
    /// The backend answered with a non-success status.
    ///
    /// `message` is the body's `error` field when present, otherwise
    /// [`GENERIC_FAILURE_MESSAGE`].
    #[error("{message}")]
    Backend { status: u16, message: String },

    /// The request could not be sent or the connection broke.
    #[error("Request to '{url}' failed: {reason}")]
    Transport { url: String, reason: String },

    /// The request exceeded the configured timeout.
    #[error("Request to '{url}' timed out after {secs}s\nIncrease --timeout for long videos.")]
    Timeout { url: String, secs: u64 },

    /// A success response did not carry the expected JSON payload.
    #[error("Unexpected response from '{url}': {detail}")]
    InvalidResponse { url: String, detail: String },

    /// The result has no preview image for the selected row.
    #[error("No preview image for '{hour}'")]
    ImageNotFound { hour: String },

    // ── Summary ───────────────────────────────────────────────────────────
    /// A summary line has no usable count and malformed lines are rejected.
    #[error("Malformed summary line {line}: {content:?}")]
    MalformedSummary { line: usize, content: String },

    // ── I/O ───────────────────────────────────────────────────────────────
    /// Could not write an output file (preview image, JSON report).
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config ────────────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl GintiError {
    /// The text a form would show inline for this error.
    ///
    /// Backend errors show only the extracted message; everything else uses
    /// the full `Display` text.
    pub fn user_message(&self) -> String {
        match self {
            GintiError::Backend { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}
