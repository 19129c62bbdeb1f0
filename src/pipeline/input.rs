//! Input resolution: validate the selected video before anything is sent.
//!
//! A bad path should fail here with a precise message instead of surfacing
//! as a confusing transport error halfway through a multi-gigabyte upload.

use crate::error::GintiError;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// MIME type used when the extension is not a known video container.
pub const FALLBACK_MIME: &str = "application/octet-stream";

/// A validated, readable video file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoFile {
    pub path: PathBuf,
    /// File name sent in the multipart part.
    pub file_name: String,
    pub mime_type: &'static str,
    pub size: u64,
}

/// Validate `path` and describe the video it points at.
pub async fn resolve_video(path: impl AsRef<Path>) -> Result<VideoFile, GintiError> {
    let path = path.as_ref().to_path_buf();

    let meta = tokio::fs::metadata(&path)
        .await
        .map_err(|e| map_io_error(e.kind(), &path))?;
    if !meta.is_file() {
        return Err(GintiError::NotAFile { path });
    }
    if meta.len() == 0 {
        return Err(GintiError::EmptyFile { path });
    }

    // Metadata succeeds on unreadable files; opening does not.
    tokio::fs::File::open(&path)
        .await
        .map_err(|e| map_io_error(e.kind(), &path))?;

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "video".to_string());

    let mime_type = mime_for(&path).unwrap_or_else(|| {
        warn!(
            "'{}' does not look like a video; sending as {}",
            path.display(),
            FALLBACK_MIME
        );
        FALLBACK_MIME
    });

    debug!(
        "Resolved video: {} ({} bytes, {})",
        path.display(),
        meta.len(),
        mime_type
    );

    Ok(VideoFile {
        path,
        file_name,
        mime_type,
        size: meta.len(),
    })
}

fn map_io_error(kind: ErrorKind, path: &Path) -> GintiError {
    match kind {
        ErrorKind::PermissionDenied => GintiError::PermissionDenied {
            path: path.to_path_buf(),
        },
        _ => GintiError::FileNotFound {
            path: path.to_path_buf(),
        },
    }
}

/// MIME type of a known video container, by extension.
pub fn mime_for(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    let mime = match ext.as_str() {
        "mp4" | "m4v" => "video/mp4",
        "mov" => "video/quicktime",
        "avi" => "video/x-msvideo",
        "mkv" => "video/x-matroska",
        "webm" => "video/webm",
        "mpeg" | "mpg" => "video/mpeg",
        "wmv" => "video/x-ms-wmv",
        "3gp" => "video/3gpp",
        _ => return None,
    };
    Some(mime)
}
