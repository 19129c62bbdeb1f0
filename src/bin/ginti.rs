//! CLI binary for smartginti.
//!
//! A thin shim over the library crate: maps CLI flags to `ClientConfig`,
//! drives a `Session` through one submission, and prints the table.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use smartginti::{
    render_report, save_image, totals, ApiContract, AttendanceClient, AttendanceRow, ClientConfig,
    GintiError, MalformedLinePolicy, ProgressCallback, Session, SummaryTotals, TableStyle,
    UploadProgressCallback,
};
use std::collections::BTreeMap;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Byte-counting bar while the video uploads, then a spinner while the
/// backend processes it.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(TICKS),
        );
        bar.set_prefix("Preparing");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self { bar })
    }
}

impl UploadProgressCallback for CliProgressCallback {
    fn on_upload_start(&self, file_name: &str, total_bytes: u64) {
        self.bar.set_style(
            ProgressStyle::with_template(
                "{spinner:.cyan} {prefix:.bold}  \
                 [{bar:42.green/238}] {bytes}/{total_bytes}  ETA {eta_precise}",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▉▊▋▌▍▎▏  ")
            .tick_strings(TICKS),
        );
        self.bar.set_length(total_bytes);
        self.bar.set_prefix("Uploading");
        self.bar.reset_eta();
        self.bar.println(format!("{} {}", bold("◆"), bold(file_name)));
    }

    fn on_upload_progress(&self, sent_bytes: u64, _total_bytes: u64) {
        self.bar.set_position(sent_bytes);
    }

    fn on_processing(&self) {
        self.bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}  ⏱ {elapsed_precise}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(TICKS),
        );
        self.bar.set_prefix("Processing");
        self.bar.set_message("counting heads…");
    }

    fn on_complete(&self, rows: usize) {
        self.bar.finish_and_clear();
        eprintln!("{} {} time periods", green("✔"), bold(&rows.to_string()));
    }

    fn on_error(&self, message: &str) {
        self.bar.finish_and_clear();
        eprintln!("{} {}", red("✘"), red(message));
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Process a recording against a local backend
  ginti lecture.mp4

  # Remote backend, give it 20 minutes
  ginti --base-url https://attendance.example.edu --timeout 1200 lecture.mp4

  # Older backends: POST /upload with a `video` field
  ginti --legacy lecture.mp4

  # Show the detection image behind row 3
  ginti lecture.mp4 --preview 3 --image-out hour3.jpg

  # Machine-readable output, dropping lines without a count
  ginti --json --on-malformed skip lecture.mp4 > attendance.json

ENVIRONMENT VARIABLES:
  GINTI_BASE_URL      Backend base URL (default http://localhost:5000)
  GINTI_LEGACY        Use the legacy /upload contract
  GINTI_TIMEOUT       Request timeout in seconds
  RUST_LOG            Log filter, e.g. smartginti=debug
"#;

/// Upload a classroom video and print its attendance table.
#[derive(Parser, Debug)]
#[command(
    name = "ginti",
    version,
    about = "Upload a classroom video and print its attendance table",
    long_about = "Upload a classroom video to a SmartGinti backend, which counts the \
students present in each hour, then print the returned summary as a table. Rows that \
come with a detection image can be previewed with --preview.",
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Video file to process.
    video: Option<PathBuf>,

    /// Backend base URL.
    #[arg(long, env = "GINTI_BASE_URL", default_value = smartginti::config::DEFAULT_BASE_URL)]
    base_url: String,

    /// Use the legacy contract (POST /upload, field `video`).
    #[arg(long, env = "GINTI_LEGACY")]
    legacy: bool,

    /// Override the multipart field name.
    #[arg(long, env = "GINTI_FIELD_NAME")]
    field_name: Option<String>,

    /// Override the upload path.
    #[arg(long, env = "GINTI_UPLOAD_PATH")]
    upload_path: Option<String>,

    /// Override the preview image path prefix.
    #[arg(long, env = "GINTI_IMAGES_PATH")]
    images_path: Option<String>,

    /// Whole-request timeout in seconds (upload + processing).
    #[arg(long, env = "GINTI_TIMEOUT", default_value_t = 600)]
    timeout: u64,

    /// TCP connect timeout in seconds.
    #[arg(long, env = "GINTI_CONNECT_TIMEOUT", default_value_t = 10)]
    connect_timeout: u64,

    /// What to do with summary lines that have no count.
    #[arg(long, env = "GINTI_ON_MALFORMED", value_enum, default_value = "keep")]
    on_malformed: MalformedArg,

    /// Output structured JSON instead of a table.
    #[arg(long, env = "GINTI_JSON")]
    json: bool,

    /// Draw the table with plain ASCII borders.
    #[arg(long, env = "GINTI_ASCII")]
    ascii: bool,

    /// Fetch the preview image of this row (1-based).
    #[arg(long, value_name = "ROW")]
    preview: Option<usize>,

    /// Where to save the preview image. Default: the image id in the current directory.
    #[arg(long, requires = "preview")]
    image_out: Option<PathBuf>,

    /// Disable progress bar.
    #[arg(long, env = "GINTI_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "GINTI_VERBOSE")]
    verbose: bool,

    /// Suppress all output except the result and errors.
    #[arg(short, long, env = "GINTI_QUIET")]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Debug)]
enum MalformedArg {
    Keep,
    Skip,
    Zero,
    Reject,
}

impl From<MalformedArg> for MalformedLinePolicy {
    fn from(v: MalformedArg) -> Self {
        match v {
            MalformedArg::Keep => MalformedLinePolicy::Keep,
            MalformedArg::Skip => MalformedLinePolicy::Skip,
            MalformedArg::Zero => MalformedLinePolicy::Zero,
            MalformedArg::Reject => MalformedLinePolicy::Reject,
        }
    }
}

/// Shape of `--json` output.
#[derive(Serialize)]
struct JsonOutput<'a> {
    file_name: &'a str,
    bytes_sent: u64,
    duration_ms: u64,
    message: &'a str,
    rows: &'a [AttendanceRow],
    totals: SummaryTotals,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    images: &'a BTreeMap<String, String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar replaces INFO logs; verbose mode brings them back.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Build config ─────────────────────────────────────────────────────
    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as ProgressCallback)
    } else {
        None
    };
    let config = build_config(&cli, cli.on_malformed.clone().into(), progress_cb)?;
    tracing::debug!(
        "Client config: {}",
        serde_json::to_string(&config).unwrap_or_default()
    );
    let client = AttendanceClient::new(config).context("Failed to create HTTP client")?;

    // ── Submit ───────────────────────────────────────────────────────────
    let session = Session::for_client(&client);
    if let Some(ref video) = cli.video {
        session.select_file(video);
    }

    let report = match session.submit(&client).await {
        Ok(report) => report,
        Err(GintiError::NoFileSelected) => {
            anyhow::bail!("{}", GintiError::NoFileSelected)
        }
        Err(e) => return Err(anyhow::Error::new(e).context("Processing failed")),
    };

    let rows = session.rows().context("Could not read the attendance summary")?;
    let summary_totals = totals(&rows);

    // ── Output ───────────────────────────────────────────────────────────
    if cli.json {
        let out = JsonOutput {
            file_name: &report.file_name,
            bytes_sent: report.bytes_sent,
            duration_ms: report.duration_ms,
            message: &report.result.message,
            rows: &rows,
            totals: summary_totals,
            images: &report.result.images,
        };
        println!(
            "{}",
            serde_json::to_string_pretty(&out).context("Failed to serialise output")?
        );
    } else {
        let style = if cli.ascii {
            TableStyle::Ascii
        } else {
            TableStyle::Unicode
        };
        print!("{}", render_report(&report.result, &rows, style));
        if !cli.quiet {
            eprintln!(
                "{}  {}",
                dim(&smartginti::render::render_totals(&summary_totals)),
                dim(&format!("{}ms", report.duration_ms)),
            );
        }
    }

    // ── Preview ──────────────────────────────────────────────────────────
    if let Some(row_num) = cli.preview {
        let index = row_num
            .checked_sub(1)
            .context("Rows are 1-indexed, minimum is 1")?;
        let row = rows
            .get(index)
            .with_context(|| format!("Row {} does not exist ({} rows)", row_num, rows.len()))?;

        if session.select_row(index, &client)?.is_none() {
            anyhow::bail!(GintiError::ImageNotFound {
                hour: row.hour.clone()
            });
        }
        let image = client
            .fetch_row_image(&report.result, row)
            .await
            .context("Failed to fetch preview image")?;

        let target = cli
            .image_out
            .clone()
            .unwrap_or_else(|| default_image_path(&image.id, image.extension()));
        save_image(&image, &target).await?;

        if !cli.quiet {
            let dims = image
                .dimensions
                .map(|(w, h)| format!("{w}×{h}"))
                .unwrap_or_else(|| "unknown size".to_string());
            eprintln!(
                "{} preview for {} ({})  →  {}",
                green("✔"),
                bold(&row.hour),
                dims,
                bold(&target.display().to_string()),
            );
        }
    }

    Ok(())
}

/// Map CLI args to `ClientConfig`.
fn build_config(
    cli: &Cli,
    policy: MalformedLinePolicy,
    progress: Option<ProgressCallback>,
) -> Result<ClientConfig> {
    let contract = if cli.legacy {
        ApiContract::Legacy
    } else {
        ApiContract::Current
    };

    let mut builder = ClientConfig::builder()
        .contract(contract)
        .base_url(&cli.base_url)
        .timeout_secs(cli.timeout)
        .connect_timeout_secs(cli.connect_timeout)
        .malformed_lines(policy);

    if let Some(ref name) = cli.field_name {
        builder = builder.field_name(name);
    }
    if let Some(ref path) = cli.upload_path {
        builder = builder.upload_path(path);
    }
    if let Some(ref path) = cli.images_path {
        builder = builder.images_path(path);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

/// Image ids usually carry an extension already; add one when they don't.
///
/// Only the last `/`-separated component is used. An id ending in `.`,
/// `..` or nothing falls back to `preview.<ext>` in the working directory.
fn default_image_path(id: &str, ext: &str) -> PathBuf {
    let name = id.rsplit('/').next().unwrap_or(id);
    if matches!(name, "" | "." | "..") {
        return PathBuf::from(format!("preview.{ext}"));
    }
    let path = PathBuf::from(name);
    if path.extension().is_some() {
        path
    } else {
        path.with_extension(ext)
    }
}
