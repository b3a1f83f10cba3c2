//! End-to-end tests for the upload endpoints, run against the full router
//! with an isolated media root per test.

use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration;

use axum_test::multipart::{MultipartForm, Part};
use axum_test::TestServer;
use encore_api::jobs::JobRegistry;
use encore_api::router;
use encore_api::state::AppState;
use encore_core::Config;
use encore_storage::LocalStorage;
use tempfile::TempDir;

struct TestApp {
    server: TestServer,
    media_root: TempDir,
}

async fn spawn_app() -> TestApp {
    spawn_app_with_video_ceiling(100 * 1024 * 1024).await
}

async fn spawn_app_with_video_ceiling(video_max_file_size: usize) -> TestApp {
    let media_root = TempDir::new().expect("tempdir");
    let config = Config {
        server_host: "127.0.0.1".into(),
        server_port: 0,
        media_root: media_root.path().to_string_lossy().into_owned(),
        public_base_url: "http://localhost/media".into(),
        ffmpeg_path: "ffmpeg".into(),
        ffprobe_path: "ffprobe".into(),
        video_max_file_size,
        job_retention_secs: 900,
        job_sweep_interval_secs: 60,
        environment: "test".into(),
    };
    let storage = LocalStorage::new(media_root.path(), config.public_base_url.clone())
        .await
        .expect("storage");
    let state = Arc::new(AppState::new(config, Arc::new(storage), JobRegistry::new()));
    let server = TestServer::new(router(state)).expect("test server");
    TestApp { server, media_root }
}

impl TestApp {
    /// Names of all files currently in the media root.
    fn stored_files(&self) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(self.media_root.path())
            .expect("read media root")
            .map(|e| e.expect("dir entry").file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }
}

/// A real PNG of the given dimensions, encoded in memory.
fn png_fixture(width: u32, height: u32) -> Vec<u8> {
    let img = image::DynamicImage::new_rgb8(width, height);
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, image::ImageFormat::Png)
        .expect("encode png");
    buf.into_inner()
}

fn image_form(bytes: Vec<u8>) -> MultipartForm {
    MultipartForm::new().add_part(
        "file",
        Part::bytes(bytes).file_name("cover.png").mime_type("image/png"),
    )
}

#[tokio::test]
async fn test_image_upload_without_compression_stores_original() {
    let app = spawn_app().await;
    let png = png_fixture(64, 64);
    let original_len = png.len() as u64;

    let response = app.server.post("/upload").multipart(image_form(png)).await;

    response.assert_status(axum::http::StatusCode::CREATED);
    let body: serde_json::Value = response.json();
    assert!(body["url"].as_str().unwrap().starts_with("http://localhost/media/"));
    let filename = body["filename"].as_str().unwrap();
    assert!(filename.ends_with(".png"));
    assert!(body.get("originalSize").is_none());
    assert!(body.get("compressedSize").is_none());

    // Stored byte-for-byte, no re-encode.
    let stored = std::fs::metadata(app.media_root.path().join(filename)).unwrap();
    assert_eq!(stored.len(), original_len);
}

#[tokio::test]
async fn test_image_upload_rejects_text_file() {
    let app = spawn_app().await;
    let form = MultipartForm::new().add_part(
        "file",
        Part::bytes(b"hello".to_vec())
            .file_name("notes.txt")
            .mime_type("text/plain"),
    );

    let response = app.server.post("/upload").multipart(form).await;

    response.assert_status(axum::http::StatusCode::UNSUPPORTED_MEDIA_TYPE);
    let body: serde_json::Value = response.json();
    assert_eq!(body["code"], "UNSUPPORTED_MEDIA_TYPE");
    assert!(app.stored_files().is_empty());
}

#[tokio::test]
async fn test_image_upload_rejects_mismatched_content_type() {
    let app = spawn_app().await;
    let form = MultipartForm::new().add_part(
        "file",
        Part::bytes(png_fixture(8, 8))
            .file_name("cover.png")
            .mime_type("image/jpeg"),
    );

    let response = app.server.post("/upload").multipart(form).await;

    response.assert_status(axum::http::StatusCode::UNSUPPORTED_MEDIA_TYPE);
    assert!(app.stored_files().is_empty());
}

#[tokio::test]
async fn test_image_upload_missing_file_field_is_bad_request() {
    let app = spawn_app().await;
    let form = MultipartForm::new().add_text("compressQuality", "80");

    let response = app.server.post("/upload").multipart(form).await;

    response.assert_status(axum::http::StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_image_compression_resizes_and_replaces_original() {
    let app = spawn_app().await;
    let form = image_form(png_fixture(400, 200)).add_text("compressMaxWidth", "100");

    let response = app.server.post("/upload").multipart(form).await;

    response.assert_status(axum::http::StatusCode::CREATED);
    let body: serde_json::Value = response.json();
    let filename = body["filename"].as_str().unwrap();
    assert!(filename.ends_with(".jpg"));
    assert!(body["originalSize"].as_u64().unwrap() > 0);
    assert!(body["compressedSize"].as_u64().unwrap() > 0);

    // Exactly one artifact survives, and it carries the requested geometry.
    let files = app.stored_files();
    assert_eq!(files, vec![filename.to_string()]);
    let stored = image::open(app.media_root.path().join(filename)).unwrap();
    use image::GenericImageView;
    assert_eq!(stored.dimensions(), (100, 50));
}

#[tokio::test]
async fn test_image_compression_quality_only() {
    let app = spawn_app().await;
    let form = image_form(png_fixture(32, 32)).add_text("compressQuality", "60");

    let response = app.server.post("/upload").multipart(form).await;

    response.assert_status(axum::http::StatusCode::CREATED);
    let body: serde_json::Value = response.json();
    assert!(body["filename"].as_str().unwrap().ends_with(".jpg"));
    assert_eq!(app.stored_files().len(), 1);
}

#[tokio::test]
async fn test_zero_max_width_compresses_without_resize() {
    let app = spawn_app().await;
    let form = image_form(png_fixture(120, 60))
        .add_text("compressQuality", "60")
        .add_text("compressMaxWidth", "0");

    let response = app.server.post("/upload").multipart(form).await;

    response.assert_status(axum::http::StatusCode::CREATED);
    let body: serde_json::Value = response.json();
    let filename = body["filename"].as_str().unwrap();
    assert!(filename.ends_with(".jpg"));
    assert!(body["compressedSize"].as_u64().unwrap() > 0);

    // Quality-only compression: geometry untouched.
    let stored = image::open(app.media_root.path().join(filename)).unwrap();
    use image::GenericImageView;
    assert_eq!(stored.dimensions(), (120, 60));
}

#[tokio::test]
async fn test_invalid_quality_is_bad_request() {
    let app = spawn_app().await;
    let form = image_form(png_fixture(8, 8)).add_text("compressQuality", "150");

    let response = app.server.post("/upload").multipart(form).await;

    response.assert_status(axum::http::StatusCode::BAD_REQUEST);
    assert!(app.stored_files().is_empty());
}

#[tokio::test]
async fn test_corrupt_image_with_compression_keeps_original() {
    let app = spawn_app().await;
    let garbage = b"definitely not a png".to_vec();
    let form = MultipartForm::new()
        .add_part(
            "file",
            Part::bytes(garbage.clone())
                .file_name("broken.png")
                .mime_type("image/png"),
        )
        .add_text("compressQuality", "80");

    let response = app.server.post("/upload").multipart(form).await;

    response.assert_status(axum::http::StatusCode::UNPROCESSABLE_ENTITY);
    let body: serde_json::Value = response.json();
    assert_eq!(body["code"], "COMPRESSION_FAILED");

    // The undecodable original stays in storage untouched.
    let files = app.stored_files();
    assert_eq!(files.len(), 1);
    let stored = std::fs::read(app.media_root.path().join(&files[0])).unwrap();
    assert_eq!(stored, garbage);
}

#[tokio::test]
async fn test_video_upload_without_preset_stores_as_is() {
    let app = spawn_app().await;
    let form = MultipartForm::new().add_part(
        "file",
        Part::bytes(vec![0u8; 2048])
            .file_name("tour.mp4")
            .mime_type("video/mp4"),
    );

    let response = app.server.post("/upload/video").multipart(form).await;

    response.assert_status(axum::http::StatusCode::CREATED);
    let body: serde_json::Value = response.json();
    assert!(body["url"].as_str().unwrap().starts_with("http://localhost/media/"));
    assert!(body["filename"].as_str().unwrap().ends_with(".mp4"));
    assert!(body.get("jobId").is_none());
    assert_eq!(app.stored_files().len(), 1);
}

#[tokio::test]
async fn test_video_upload_rejects_oversized_file() {
    // Shrink the ceiling so the test payload stays small.
    let app = spawn_app_with_video_ceiling(1024).await;

    let form = MultipartForm::new().add_part(
        "file",
        Part::bytes(vec![0u8; 4096])
            .file_name("big.mp4")
            .mime_type("video/mp4"),
    );

    let response = app.server.post("/upload/video").multipart(form).await;

    response.assert_status(axum::http::StatusCode::PAYLOAD_TOO_LARGE);
    assert!(app.stored_files().is_empty());
}

#[tokio::test]
async fn test_video_upload_rejects_unknown_preset() {
    let app = spawn_app().await;
    let form = MultipartForm::new()
        .add_part(
            "file",
            Part::bytes(vec![0u8; 64])
                .file_name("tour.mp4")
                .mime_type("video/mp4"),
        )
        .add_text("compressPreset", "ultra");

    let response = app.server.post("/upload/video").multipart(form).await;

    response.assert_status(axum::http::StatusCode::BAD_REQUEST);
    assert!(app.stored_files().is_empty());
}

#[tokio::test]
async fn test_unknown_job_id_is_not_found() {
    let app = spawn_app().await;

    let response = app
        .server
        .get("/upload/video/status/00000000-0000-4000-8000-000000000000")
        .await;
    response.assert_status(axum::http::StatusCode::NOT_FOUND);

    let response = app.server.get("/upload/video/status/not-a-uuid").await;
    response.assert_status(axum::http::StatusCode::NOT_FOUND);
}

/// An undecodable payload makes the transcode fail no matter whether ffmpeg
/// is installed: the probe rejects it, or spawning fails entirely. Either way
/// the job must land in a terminal `error` state and the original must stay
/// in storage.
#[tokio::test]
async fn test_failed_video_compression_reaches_terminal_error() {
    let app = spawn_app().await;
    let form = MultipartForm::new()
        .add_part(
            "file",
            Part::bytes(b"not a real video".to_vec())
                .file_name("tour.mp4")
                .mime_type("video/mp4"),
        )
        .add_text("compressPreset", "heavy");

    let response = app.server.post("/upload/video").multipart(form).await;

    response.assert_status(axum::http::StatusCode::CREATED);
    let body: serde_json::Value = response.json();
    let job_id = body["jobId"].as_str().unwrap().to_string();
    assert_eq!(body["compressing"], true);

    let mut status = serde_json::Value::Null;
    for _ in 0..100 {
        let poll = app
            .server
            .get(&format!("/upload/video/status/{}", job_id))
            .await;
        poll.assert_status_ok();
        status = poll.json();
        if status["status"] != "compressing" {
            break;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }

    assert_eq!(status["status"], "error");
    assert!(status["error"].as_str().is_some());
    assert!(status.get("result").is_none());

    // Cleanup invariant: the original upload is still the stored artifact.
    let files = app.stored_files();
    assert_eq!(files.len(), 1);
    assert!(files[0].ends_with(".mp4"));
}

#[tokio::test]
async fn test_health_endpoint() {
    let app = spawn_app().await;
    let response = app.server.get("/health").await;
    response.assert_status_ok();
    response.assert_text("ok");
}
