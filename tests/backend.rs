//! Integration tests against a mocked attendance backend.
//!
//! Every test starts its own `wiremock` server, so nothing here needs a real
//! backend or network access.

use smartginti::{
    parse_summary, process_video_sync, save_image, ApiContract, AttendanceClient, AttendanceRow,
    ClientConfig, GintiError, ImageKind, MalformedLinePolicy, Session, UploadProgressCallback,
};
use std::io::Cursor;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ── Test helpers ─────────────────────────────────────────────────────────────

const SUMMARY: &str = "Hour 1: 3 heads detected\nHour 2: 12 heads detected\n\nHour 3: 0 heads detected\n";

/// Write a small ASCII "video" so multipart bodies stay valid UTF-8 for matching.
fn video_fixture(dir: &tempfile::TempDir, name: &str) -> PathBuf {
    let p = dir.path().join(name);
    std::fs::write(&p, "pretend-this-is-an-mp4-stream".repeat(8)).unwrap();
    p
}

fn client_for(server: &MockServer) -> AttendanceClient {
    let config = ClientConfig::builder()
        .base_url(server.uri())
        .upload_chunk_bytes(64)
        .build()
        .expect("valid config");
    AttendanceClient::new(config).expect("client")
}

fn success_body() -> serde_json::Value {
    serde_json::json!({
        "message": "Processing complete!",
        "summary": SUMMARY,
        "images": { "2": "hour_2_heads_12.jpg" }
    })
}

fn png_bytes(w: u32, h: u32) -> Vec<u8> {
    let mut buf = Vec::new();
    image::DynamicImage::new_rgb8(w, h)
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .unwrap();
    buf
}

// ── Upload ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn upload_returns_result_and_rows() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/process-video"))
        .and(body_string_contains(r#"name="file"; filename="lecture.mp4""#))
        .and(body_string_contains("Content-Type: video/mp4"))
        .respond_with(ResponseTemplate::new(200).set_body_json(success_body()))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let video = video_fixture(&dir, "lecture.mp4");

    let report = client_for(&server)
        .process_video(&video)
        .await
        .expect("upload ok");

    assert_eq!(report.file_name, "lecture.mp4");
    assert_eq!(report.bytes_sent, std::fs::metadata(&video).unwrap().len());
    assert_eq!(report.result.message, "Processing complete!");

    let rows = parse_summary(Some(&report.result.summary));
    assert_eq!(
        rows,
        vec![
            AttendanceRow::new("Hour 1", Some(3)),
            AttendanceRow::new("Hour 2", Some(12)),
            AttendanceRow::new("Hour 3", Some(0)),
        ]
    );
    assert_eq!(report.result.image_for(&rows[1]), Some("hour_2_heads_12.jpg"));
}

#[tokio::test]
async fn legacy_contract_uses_upload_path_and_video_field() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/upload"))
        .and(body_string_contains(r#"name="video""#))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "message": "ok",
            "summary": "9 AM: Present 12\n10 AM: Present 15"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let config = ClientConfig::builder()
        .contract(ApiContract::Legacy)
        .base_url(server.uri())
        .build()
        .unwrap();
    let dir = tempfile::tempdir().unwrap();
    let video = video_fixture(&dir, "class.mov");

    let report = AttendanceClient::new(config)
        .unwrap()
        .process_video(&video)
        .await
        .expect("legacy upload ok");

    assert_eq!(
        parse_summary(Some(&report.result.summary)),
        vec![
            AttendanceRow::new("9 AM", Some(12)),
            AttendanceRow::new("10 AM", Some(15)),
        ]
    );
}

#[tokio::test]
async fn backend_error_field_is_surfaced() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/process-video"))
        .respond_with(
            ResponseTemplate::new(400).set_body_json(serde_json::json!({"error": "No file selected"})),
        )
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let video = video_fixture(&dir, "lecture.mp4");

    let err = client_for(&server).process_video(&video).await.unwrap_err();
    match err {
        GintiError::Backend { status, ref message } => {
            assert_eq!(status, 400);
            assert_eq!(message, "No file selected");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn backend_failure_without_error_field_uses_generic_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(502).set_body_string("<html>Bad Gateway</html>"))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let video = video_fixture(&dir, "lecture.mp4");

    let err = client_for(&server).process_video(&video).await.unwrap_err();
    assert_eq!(
        err.user_message(),
        "Failed to process video. Please try again."
    );
}

#[tokio::test]
async fn non_json_success_is_invalid_response() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("done"))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let video = video_fixture(&dir, "lecture.mp4");

    let err = client_for(&server).process_video(&video).await.unwrap_err();
    assert!(matches!(err, GintiError::InvalidResponse { .. }), "got {err:?}");
}

#[tokio::test]
async fn slow_backend_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(success_body())
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&server)
        .await;

    let config = ClientConfig::builder()
        .base_url(server.uri())
        .timeout_secs(1)
        .build()
        .unwrap();
    let dir = tempfile::tempdir().unwrap();
    let video = video_fixture(&dir, "lecture.mp4");

    let err = AttendanceClient::new(config)
        .unwrap()
        .process_video(&video)
        .await
        .unwrap_err();
    assert!(
        matches!(err, GintiError::Timeout { secs: 1, .. }),
        "got {err:?}"
    );
}

// ── Progress ─────────────────────────────────────────────────────────────────

#[derive(Default)]
struct Events {
    started: Mutex<Option<(String, u64)>>,
    last_sent: AtomicU64,
    processing: AtomicUsize,
    rows: AtomicUsize,
    errors: Mutex<Vec<String>>,
}

impl UploadProgressCallback for Events {
    fn on_upload_start(&self, file_name: &str, total_bytes: u64) {
        *self.started.lock().unwrap() = Some((file_name.to_string(), total_bytes));
    }
    fn on_upload_progress(&self, sent_bytes: u64, _total_bytes: u64) {
        self.last_sent.store(sent_bytes, Ordering::SeqCst);
    }
    fn on_processing(&self) {
        self.processing.fetch_add(1, Ordering::SeqCst);
    }
    fn on_complete(&self, rows: usize) {
        self.rows.store(rows, Ordering::SeqCst);
    }
    fn on_error(&self, message: &str) {
        self.errors.lock().unwrap().push(message.to_string());
    }
}

#[tokio::test]
async fn progress_callback_sees_whole_upload() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(success_body()))
        .mount(&server)
        .await;

    let events = Arc::new(Events::default());
    let config = ClientConfig::builder()
        .base_url(server.uri())
        .upload_chunk_bytes(16)
        .progress_callback(events.clone())
        .build()
        .unwrap();
    let dir = tempfile::tempdir().unwrap();
    let video = video_fixture(&dir, "lecture.mp4");
    let size = std::fs::metadata(&video).unwrap().len();

    AttendanceClient::new(config)
        .unwrap()
        .process_video(&video)
        .await
        .expect("upload ok");

    assert_eq!(
        events.started.lock().unwrap().clone(),
        Some(("lecture.mp4".to_string(), size))
    );
    assert_eq!(events.last_sent.load(Ordering::SeqCst), size);
    assert_eq!(events.processing.load(Ordering::SeqCst), 1);
    assert_eq!(events.rows.load(Ordering::SeqCst), 3);
    assert!(events.errors.lock().unwrap().is_empty());
}

#[tokio::test]
async fn progress_callback_sees_failure_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_json(serde_json::json!({"error": "cv2 exploded"})))
        .mount(&server)
        .await;

    let events = Arc::new(Events::default());
    let config = ClientConfig::builder()
        .base_url(server.uri())
        .progress_callback(events.clone())
        .build()
        .unwrap();
    let dir = tempfile::tempdir().unwrap();
    let video = video_fixture(&dir, "lecture.mp4");

    let _ = AttendanceClient::new(config).unwrap().process_video(&video).await;
    assert_eq!(*events.errors.lock().unwrap(), vec!["cv2 exploded".to_string()]);
}

const RAGGED_SUMMARY: &str = "Hour 1: 3 heads\nbroken line\nHour 2: nobody";

async fn ragged_backend() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "message": "Processing complete!",
            "summary": RAGGED_SUMMARY,
        })))
        .mount(&server)
        .await;
    server
}

fn config_with(server: &MockServer, policy: MalformedLinePolicy, events: Arc<Events>) -> ClientConfig {
    ClientConfig::builder()
        .base_url(server.uri())
        .malformed_lines(policy)
        .progress_callback(events)
        .build()
        .unwrap()
}

#[tokio::test]
async fn configured_reject_policy_fails_ragged_summary() {
    let server = ragged_backend().await;
    let events = Arc::new(Events::default());
    let client =
        AttendanceClient::new(config_with(&server, MalformedLinePolicy::Reject, events.clone()))
            .unwrap();
    let dir = tempfile::tempdir().unwrap();
    let video = video_fixture(&dir, "lecture.mp4");

    let err = client.process_video(&video).await.unwrap_err();
    match &err {
        GintiError::MalformedSummary { line, content } => {
            assert_eq!(*line, 2);
            assert_eq!(content, "broken line");
        }
        other => panic!("unexpected: {other:?}"),
    }
    assert_eq!(events.rows.load(Ordering::SeqCst), 0);
    assert_eq!(*events.errors.lock().unwrap(), vec![err.user_message()]);

    let session = Session::for_client(&client);
    session.select_file(&video);
    assert!(session.submit(&client).await.is_err());
    assert!(session.result().is_none());
    assert!(session.error().unwrap().contains("line 2"));
}

#[tokio::test]
async fn configured_skip_policy_drops_ragged_lines() {
    let server = ragged_backend().await;
    let events = Arc::new(Events::default());
    let client =
        AttendanceClient::new(config_with(&server, MalformedLinePolicy::Skip, events.clone()))
            .unwrap();
    let dir = tempfile::tempdir().unwrap();
    let video = video_fixture(&dir, "lecture.mp4");

    let report = client.process_video(&video).await.expect("upload ok");
    assert_eq!(events.rows.load(Ordering::SeqCst), 1);
    assert_eq!(client.rows(&report.result).unwrap(), vec![AttendanceRow::new("Hour 1", Some(3))]);

    let session = Session::for_client(&client);
    session.select_file(&video);
    session.submit(&client).await.expect("submit ok");
    assert_eq!(session.rows().unwrap().len(), 1);
}

// ── Session ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn submit_without_file_sends_nothing() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(success_body()))
        .expect(0)
        .mount(&server)
        .await;

    let session = Session::default();
    let err = session.submit(&client_for(&server)).await.unwrap_err();

    assert!(matches!(err, GintiError::NoFileSelected));
    assert_eq!(session.error().as_deref(), Some("Please select a video file"));
    server.verify().await;
}

#[tokio::test]
async fn session_submit_then_preview_row() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/process-video"))
        .respond_with(ResponseTemplate::new(200).set_body_json(success_body()))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/images/hour_2_heads_12.jpg"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(png_bytes(8, 6), "image/png"))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let dir = tempfile::tempdir().unwrap();
    let session = Session::for_client(&client);
    session.select_file(video_fixture(&dir, "lecture.mp4"));
    assert!(session.can_submit());

    session.submit(&client).await.expect("submit ok");
    assert!(!session.is_loading());
    assert!(session.error().is_none());

    let rows = session.rows().unwrap();
    assert_eq!(rows.len(), 3);

    assert_eq!(session.select_row(0, &client).unwrap(), None);
    let url = session.select_row(1, &client).unwrap().expect("row 2 has a preview");
    assert_eq!(url, format!("{}/api/images/hour_2_heads_12.jpg", server.uri()));
    assert_eq!(session.selected_image(), Some(url));

    let result = session.result().unwrap();
    let image = client.fetch_row_image(&result, &rows[1]).await.expect("image ok");
    assert_eq!(image.kind, ImageKind::Png);
    assert_eq!(image.dimensions, Some((8, 6)));
    assert_eq!(image.content_type.as_deref(), Some("image/png"));

    let out = dir.path().join("preview.png");
    save_image(&image, &out).await.unwrap();
    assert_eq!(std::fs::read(&out).unwrap(), image.bytes);

    let missing = client.fetch_row_image(&result, &rows[0]).await.unwrap_err();
    assert!(matches!(missing, GintiError::ImageNotFound { .. }));
}

#[tokio::test]
async fn failed_submit_keeps_previous_result() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(success_body()))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let dir = tempfile::tempdir().unwrap();
    let session = Session::default();
    session.select_file(video_fixture(&dir, "lecture.mp4"));

    session.submit(&client).await.expect("first submit ok");
    session.submit(&client).await.expect_err("second submit fails");

    assert_eq!(
        session.error().as_deref(),
        Some("Failed to process video. Please try again.")
    );
    assert!(session.result().is_some());
    assert!(!session.is_loading());
}

// ── Sync wrapper ─────────────────────────────────────────────────────────────

#[test]
fn sync_wrapper_outside_runtime() {
    let server = tokio_test::block_on(MockServer::start());
    tokio_test::block_on(
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(success_body()))
            .mount(&server),
    );

    let config = ClientConfig::builder().base_url(server.uri()).build().unwrap();
    let dir = tempfile::tempdir().unwrap();
    let video = video_fixture(&dir, "lecture.mp4");

    let report = process_video_sync(&video, &config).expect("sync upload ok");
    assert_eq!(report.result.message, "Processing complete!");
}
