//! Request body: a single-part `multipart/form-data` form carrying the video.
//!
//! The file is streamed in fixed-size chunks rather than read into memory,
//! so classroom recordings of several gigabytes upload with constant memory
//! and the progress callback sees each chunk as it is handed to reqwest.

use crate::error::GintiError;
use crate::pipeline::input::VideoFile;
use crate::progress::ProgressCallback;
use futures::stream::{self, Stream};
use reqwest::multipart::{Form, Part};
use reqwest::Body;
use tokio::io::AsyncReadExt;
use tracing::debug;

/// Build the upload form for `video`, using `field_name` for the file part.
pub async fn video_form(
    video: &VideoFile,
    field_name: &str,
    chunk_bytes: usize,
    progress: Option<ProgressCallback>,
) -> Result<Form, GintiError> {
    let chunks = video_chunks(video, chunk_bytes, progress).await?;

    let part = Part::stream_with_length(Body::wrap_stream(chunks), video.size)
        .file_name(video.file_name.clone())
        .mime_str(video.mime_type)
        .map_err(|e| GintiError::Internal(format!("invalid MIME type: {e}")))?;

    debug!(
        "Multipart field '{}' ← {} ({} bytes, chunks of {})",
        field_name, video.file_name, video.size, chunk_bytes
    );

    Ok(Form::new().part(field_name.to_string(), part))
}

/// Stream the file's bytes in chunks of at most `chunk_bytes`, reporting the
/// running total after each one and `on_processing` after the last.
pub async fn video_chunks(
    video: &VideoFile,
    chunk_bytes: usize,
    progress: Option<ProgressCallback>,
) -> Result<impl Stream<Item = std::io::Result<Vec<u8>>> + Send + 'static, GintiError> {
    let file = tokio::fs::File::open(&video.path)
        .await
        .map_err(|_| GintiError::FileNotFound {
            path: video.path.clone(),
        })?;
    let total = video.size;
    let chunk_bytes = chunk_bytes.max(1);

    Ok(stream::try_unfold((file, 0u64), move |(mut file, sent)| {
        let progress = progress.clone();
        async move {
            let mut buf = vec![0u8; chunk_bytes];
            let n = file.read(&mut buf).await?;
            if n == 0 {
                return Ok(None);
            }
            buf.truncate(n);
            let sent = sent + n as u64;
            if let Some(cb) = progress {
                cb.on_upload_progress(sent, total);
                if sent >= total {
                    cb.on_processing();
                }
            }
            Ok::<_, std::io::Error>(Some((buf, (file, sent))))
        }
    }))
}
