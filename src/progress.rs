//! Progress-callback trait for upload events.
//!
//! Inject an [`Arc<dyn UploadProgressCallback>`] via
//! [`crate::config::ClientConfigBuilder::progress_callback`] to observe an
//! upload while it runs: bytes streamed, the wait for the backend, and the
//! outcome.
//!
//! # Example
//!
//! ```rust
//! use smartginti::{ClientConfig, UploadProgressCallback};
//! use std::sync::{Arc, atomic::{AtomicU64, Ordering}};
//!
//! struct BytesSeen(AtomicU64);
//!
//! impl UploadProgressCallback for BytesSeen {
//!     fn on_upload_progress(&self, sent: u64, _total: u64) {
//!         self.0.store(sent, Ordering::SeqCst);
//!     }
//! }
//!
//! let config = ClientConfig::builder()
//!     .progress_callback(Arc::new(BytesSeen(AtomicU64::new(0))))
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by [`crate::client::AttendanceClient`] while a video is processed.
///
/// All methods have default no-op implementations. `on_upload_progress` is
/// called from inside the request body stream, possibly on another runtime
/// worker thread, so implementations must be `Send + Sync`.
pub trait UploadProgressCallback: Send + Sync {
    /// Called once before the first byte is sent.
    ///
    /// # Arguments
    /// * `file_name`   — name of the video as sent in the multipart part
    /// * `total_bytes` — size of the video
    fn on_upload_start(&self, file_name: &str, total_bytes: u64) {
        let _ = (file_name, total_bytes);
    }

    /// Called after each chunk of the video has been handed to the transport.
    fn on_upload_progress(&self, sent_bytes: u64, total_bytes: u64) {
        let _ = (sent_bytes, total_bytes);
    }

    /// Called when the whole body is sent and the client is waiting for the
    /// backend to finish processing.
    fn on_processing(&self) {}

    /// Called when the backend returned a result.
    ///
    /// # Arguments
    /// * `rows` — number of summary rows the result parses into
    fn on_complete(&self, rows: usize) {
        let _ = rows;
    }

    /// Called when the attempt failed, with the message a user would see.
    fn on_error(&self, message: &str) {
        let _ = message;
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl UploadProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ClientConfig`].
pub type ProgressCallback = Arc<dyn UploadProgressCallback>;
