//! Stages that turn a path on disk into an outgoing request.
//!
//! ```text
//! path ──▶ input ──▶ upload ──▶ client (POST)
//!         (validate)  (multipart stream)
//! ```
//!
//! 1. [`input`]  — check the video exists, is readable and non-empty, and
//!    pick its MIME type
//! 2. [`upload`] — wrap the file in a streamed multipart form

pub mod input;
pub mod upload;
