//! HTTP surface of the encore media service: upload endpoints, the video
//! compression job registry and status endpoint, and static serving of the
//! public media root.

pub mod error;
pub mod handlers;
pub mod jobs;
pub mod state;
pub mod telemetry;
pub mod workers;

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Headroom on top of the video ceiling for multipart framing and the
/// non-file form fields.
const BODY_LIMIT_OVERHEAD: usize = 1024 * 1024;

/// Build the application router. Extracted from `main` so tests can run the
/// full stack against isolated state.
pub fn router(state: Arc<AppState>) -> Router {
    let media_root = state.config.media_root.clone();
    let body_limit = state.config.video_max_file_size + BODY_LIMIT_OVERHEAD;

    Router::new()
        .route("/health", get(health))
        .route("/upload", post(handlers::image_upload::upload_image))
        .route("/upload/video", post(handlers::video_upload::upload_video))
        .route(
            "/upload/video/status/{job_id}",
            get(handlers::job_status::job_status),
        )
        .nest_service("/media", ServeDir::new(media_root))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}
