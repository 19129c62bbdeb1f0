//! # smartginti
//!
//! Client for the SmartGinti attendance backend: upload a classroom video,
//! get back an hourly headcount summary, and turn it into a table.
//!
//! ## Flow
//!
//! ```text
//! video
//!  │
//!  ├─ 1. Input    validate the file, pick a MIME type
//!  ├─ 2. Upload   streamed multipart POST to the backend
//!  ├─ 3. Result   { message, summary, images? } JSON
//!  ├─ 4. Parse    summary text → ordered AttendanceRows
//!  └─ 5. Render   bordered table; rows with an image can be previewed
//! ```
//!
//! The backend does all the video work. This crate never decodes video.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use smartginti::{parse_summary, AttendanceClient, ClientConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = AttendanceClient::new(ClientConfig::default())?;
//!     let report = client.process_video("lecture.mp4").await?;
//!     for row in parse_summary(Some(&report.result.summary)) {
//!         println!("{}: {}", row.hour, row.count_display());
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `ginti` binary (clap + anyhow + tracing-subscriber + indicatif) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod client;
pub mod config;
pub mod error;
pub mod model;
pub mod pipeline;
pub mod progress;
pub mod render;
pub mod session;
pub mod summary;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use client::{process_video_sync, save_image, AttendanceClient};
pub use config::{ApiContract, ClientConfig, ClientConfigBuilder, MalformedLinePolicy};
pub use error::GintiError;
pub use model::{AttendanceResult, AttendanceRow, ImageKind, PreviewImage, UploadReport};
pub use progress::{NoopProgressCallback, ProgressCallback, UploadProgressCallback};
pub use render::{render_report, render_table, TableStyle};
pub use session::Session;
pub use summary::{parse_summary, parse_summary_with, totals, SummaryTotals};
