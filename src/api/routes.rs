use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use super::handlers;
use crate::AppState;

/// Room for multipart boundaries and the text fields next to the file.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

pub fn create_router(state: Arc<AppState>) -> Router {
    let upload_limit = state.config.max_upload_size as usize + MULTIPART_OVERHEAD;

    let mut router = Router::new()
        // Summaries
        .route("/summaries", get(handlers::list_summaries))
        .route(
            "/summaries",
            post(handlers::create_summary).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route("/summaries/:id", get(handlers::get_summary))
        .route(
            "/summaries/:id",
            put(handlers::update_summary).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route("/summaries/:id", delete(handlers::delete_summary))
        .route("/summaries/:id/download", get(handlers::download_summary))
        // Courses
        .route("/courses", get(handlers::list_courses))
        .route("/courses", post(handlers::create_course))
        .route("/courses/:id", get(handlers::get_course))
        .route("/courses/:id", put(handlers::update_course))
        .route("/courses/:id", delete(handlers::delete_course))
        .route("/courses/:id/summaries", get(handlers::list_course_summaries))
        // Authors
        .route("/authors", get(handlers::list_authors))
        .route("/authors", post(handlers::create_author))
        .route("/authors/:id", put(handlers::update_author))
        .route("/authors/:id/summaries", get(handlers::list_author_summaries))
        // Version log
        .route("/commits/recent", get(handlers::recent_commits))
        // Session
        .route("/login", post(handlers::login))
        // Internal
        .route("/_internal/health", get(handlers::health));

    // Test-only routes
    if state.config.test_mode {
        tracing::warn!("Test mode enabled, purge route is available.");
        router = router.route("/admin/purge", delete(handlers::admin_purge));
    }

    router.layer(TraceLayer::new_for_http()).with_state(state)
}
