//! Form state: the selected video, the loading flag, the last result, the
//! inline error and the open preview.
//!
//! A [`Session`] is what a front end binds to. Every method takes `&self`,
//! so a session can sit behind an `Arc` and be read by a renderer while a
//! submission is awaiting the backend. The loading flag admits one
//! submission at a time; a second `submit` while one is outstanding fails
//! with [`GintiError::RequestInFlight`] and sends nothing.

use crate::client::AttendanceClient;
use crate::config::MalformedLinePolicy;
use crate::error::{GintiError, NO_FILE_MESSAGE};
use crate::model::{AttendanceResult, AttendanceRow, UploadReport};
use crate::summary;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};
use tracing::debug;

#[derive(Debug, Default)]
struct State {
    file: Option<PathBuf>,
    result: Option<AttendanceResult>,
    error: Option<String>,
    selected_image: Option<String>,
}

/// State of one attendance form.
#[derive(Debug, Default)]
pub struct Session {
    state: Mutex<State>,
    loading: AtomicBool,
    policy: MalformedLinePolicy,
}

/// Clears the loading flag however the submission ends.
struct LoadingGuard<'a>(&'a AtomicBool);

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl Session {
    /// A session whose rows follow `client`'s malformed-line policy.
    pub fn for_client(client: &AttendanceClient) -> Self {
        Self {
            policy: client.config().malformed_lines,
            ..Self::default()
        }
    }

    fn state(&self) -> MutexGuard<'_, State> {
        // State is only ever replaced wholesale, so a poisoned lock is still consistent.
        self.state.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// Choose the video to submit. Clears any inline error.
    pub fn select_file(&self, path: impl Into<PathBuf>) {
        let mut st = self.state();
        st.file = Some(path.into());
        st.error = None;
    }

    pub fn clear_file(&self) {
        self.state().file = None;
    }

    pub fn file(&self) -> Option<PathBuf> {
        self.state().file.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.loading.load(Ordering::SeqCst)
    }

    /// Whether the submit button is enabled.
    pub fn can_submit(&self) -> bool {
        !self.is_loading() && self.state().file.is_some()
    }

    pub fn result(&self) -> Option<AttendanceResult> {
        self.state().result.clone()
    }

    /// The inline error message, if the last action failed.
    pub fn error(&self) -> Option<String> {
        self.state().error.clone()
    }

    pub fn selected_image(&self) -> Option<String> {
        self.state().selected_image.clone()
    }

    /// Upload the selected video through `client`.
    ///
    /// On success the result replaces the previous one; on failure the
    /// user-facing message is stored as the inline error and the previous
    /// result stays visible.
    pub async fn submit(&self, client: &AttendanceClient) -> Result<UploadReport, GintiError> {
        let path = {
            let mut st = self.state();
            match st.file.clone() {
                Some(p) => p,
                None => {
                    st.error = Some(NO_FILE_MESSAGE.to_string());
                    return Err(GintiError::NoFileSelected);
                }
            }
        };

        if self.loading.swap(true, Ordering::SeqCst) {
            return Err(GintiError::RequestInFlight);
        }
        let _guard = LoadingGuard(&self.loading);

        {
            let mut st = self.state();
            st.error = None;
            st.selected_image = None;
        }
        debug!("Submitting {}", path.display());

        let outcome = client.process_video(&path).await;

        let mut st = self.state();
        match &outcome {
            Ok(report) => st.result = Some(report.result.clone()),
            Err(e) => st.error = Some(e.user_message()),
        }
        outcome
    }

    /// Rows of the current result, parsed with the client's policy.
    pub fn rows(&self) -> Result<Vec<AttendanceRow>, GintiError> {
        let st = self.state();
        let summary = st.result.as_ref().map(|r| r.summary.as_str());
        summary::parse_summary_with(summary, self.policy)
    }

    /// Open the preview for the row at `index` (0-based).
    ///
    /// Returns the preview URL, or `None` when the row has no image. Rows
    /// without an image leave the current preview untouched.
    pub fn select_row(
        &self,
        index: usize,
        client: &AttendanceClient,
    ) -> Result<Option<String>, GintiError> {
        let rows = self.rows()?;
        let mut st = self.state();
        let url = match (st.result.as_ref(), rows.get(index)) {
            (Some(result), Some(row)) => result
                .image_for(row)
                .map(|id| client.image_url(id))
                .transpose()?,
            _ => None,
        };
        if url.is_some() {
            st.selected_image = url.clone();
        }
        Ok(url)
    }

    pub fn close_preview(&self) {
        self.state().selected_image = None;
    }

    /// Whether `path` is the currently selected file.
    pub fn is_selected(&self, path: &Path) -> bool {
        self.state().file.as_deref() == Some(path)
    }
}
