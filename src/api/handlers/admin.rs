use axum::extract::State;
use axum::Json;
use serde::Serialize;
use std::sync::Arc;

use crate::api::response::{ApiError, JSend};
use crate::AppState;

// ============================================================================
// Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

#[derive(Debug, Serialize)]
pub struct PurgeResponse {
    pub authors_deleted: u64,
    pub commits_deleted: u64,
    pub courses_deleted: u64,
    pub summaries_deleted: u64,
}

// ============================================================================
// Handlers
// ============================================================================

pub async fn health() -> Json<JSend<HealthResponse>> {
    JSend::success(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

pub async fn admin_purge(
    State(state): State<Arc<AppState>>,
) -> Result<Json<JSend<PurgeResponse>>, ApiError> {
    let stats = state.catalog.purge().await?;

    tracing::warn!(
        authors = stats.authors,
        courses = stats.courses,
        summaries = stats.summaries,
        commits = stats.commits,
        "Purged all data"
    );

    Ok(JSend::success(PurgeResponse {
        authors_deleted: stats.authors,
        commits_deleted: stats.commits,
        courses_deleted: stats.courses,
        summaries_deleted: stats.summaries,
    }))
}
