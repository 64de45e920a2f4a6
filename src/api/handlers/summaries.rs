use std::collections::HashMap;
use std::sync::Arc;

use axum::body::Body;
use axum::extract::{Multipart, Path, State};
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use tokio_util::io::ReaderStream;

use crate::api::extract::Admin;
use crate::api::response::{ApiError, AppQuery, JSend, JSendPaginated, Pagination};
use crate::catalog::{RecentChange, SummaryDetail, SummaryDraft, Upload};
use crate::storage::models::{Commit, Summary, SummaryFilter};
use crate::AppState;

// ============================================================================
// Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct SummaryResponse {
    pub author_id: u64,
    pub course_id: u64,
    pub created_at: String,
    pub description: String,
    pub downloads: u64,
    pub filename: String,
    pub id: u64,
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct CommitResponse {
    pub created_at: String,
    pub description: String,
    pub id: u64,
    pub summary_id: u64,
}

#[derive(Debug, Serialize)]
pub struct SummaryDetailResponse {
    pub commits: Vec<CommitResponse>,
    #[serde(flatten)]
    pub summary: SummaryResponse,
}

#[derive(Debug, Serialize)]
pub struct RecentChangeResponse {
    pub commit: CommitResponse,
    pub course_id: u64,
    pub summary_name: String,
}

#[derive(Debug, Deserialize)]
pub struct ListSummariesParams {
    #[serde(default = "default_limit")]
    pub limit: u32,
    #[serde(default)]
    pub offset: u32,
    #[serde(default)]
    pub course_id: Option<u64>,
    #[serde(default)]
    pub author_id: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct RecentCommitsParams {
    #[serde(default = "default_recent_limit")]
    pub limit: u32,
}

fn default_limit() -> u32 {
    20
}

fn default_recent_limit() -> u32 {
    10
}

const MAX_RECENT_LIMIT: u32 = 100;

/// A parsed multipart body: the optional `file` part plus every text part.
struct UploadForm {
    file: Option<Upload>,
    fields: HashMap<String, String>,
}

impl UploadForm {
    fn take(&mut self, name: &str) -> Option<String> {
        self.fields.remove(name)
    }

    fn require(&mut self, name: &str) -> Result<String, ApiError> {
        self.take(name)
            .ok_or_else(|| ApiError::bad_request(format!("{name} field is required")))
    }
}

// ============================================================================
// Handlers
// ============================================================================

pub async fn create_summary(
    State(state): State<Arc<AppState>>,
    Admin(ctx): Admin,
    multipart: Multipart,
) -> Result<Json<JSend<SummaryResponse>>, ApiError> {
    let mut form = read_upload_form(multipart, state.config.max_upload_size).await?;
    let upload = form
        .file
        .take()
        .ok_or_else(|| ApiError::bad_request("file field is required"))?;
    let name = form.require("name")?;
    let description = form.take("description").unwrap_or_default();
    let course_id = parse_id("course_id", &form.require("course_id")?)?;

    let draft = SummaryDraft {
        name,
        description,
        author_id: ctx.author_id(),
        course_id,
    };
    let summary = state.catalog.create_summary(&ctx, draft, upload).await?;

    Ok(JSend::success(summary_to_response(&summary)))
}

pub async fn update_summary(
    State(state): State<Arc<AppState>>,
    Admin(ctx): Admin,
    Path(id): Path<u64>,
    multipart: Multipart,
) -> Result<Json<JSend<SummaryResponse>>, ApiError> {
    let mut form = read_upload_form(multipart, state.config.max_upload_size).await?;
    let upload = form
        .file
        .take()
        .ok_or_else(|| ApiError::bad_request("file field is required"))?;
    let description = form.require("description")?;

    let summary = state
        .catalog
        .update_summary(&ctx, id, &description, upload)
        .await?;

    Ok(JSend::success(summary_to_response(&summary)))
}

pub async fn delete_summary(
    State(state): State<Arc<AppState>>,
    Admin(ctx): Admin,
    Path(id): Path<u64>,
) -> Result<Json<JSend<()>>, ApiError> {
    state.catalog.delete_summary(&ctx, id).await?;
    Ok(JSend::success(()))
}

pub async fn get_summary(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
) -> Result<Json<JSend<SummaryDetailResponse>>, ApiError> {
    let detail = state.catalog.get_summary(id)?;
    Ok(JSend::success(detail_to_response(&detail)))
}

pub async fn list_summaries(
    State(state): State<Arc<AppState>>,
    AppQuery(params): AppQuery<ListSummariesParams>,
) -> Result<Json<JSendPaginated<SummaryResponse>>, ApiError> {
    if params.limit == 0 {
        return Err(ApiError::bad_request("limit must be greater than 0"));
    }

    let summaries = state.catalog.list_summaries(SummaryFilter {
        course_id: params.course_id,
        author_id: params.author_id,
    })?;

    Ok(paginate(&summaries, params.limit, params.offset))
}

/// Count the download and stream the backing file as an attachment.
/// Route: GET /summaries/:id/download
pub async fn download_summary(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
) -> Result<Response, ApiError> {
    let path = state.catalog.record_download(id).await?;

    let file = tokio::fs::File::open(&path)
        .await
        .map_err(|e| ApiError::internal(format!("Failed to open file: {e}")))?;
    let byte_size = file.metadata().await.ok().map(|m| m.len());

    let mut response = (StatusCode::OK, Body::from_stream(ReaderStream::new(file))).into_response();
    let headers = response.headers_mut();

    let mime = mime_guess::from_path(&path).first_or_octet_stream();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_str(mime.essence_str())
            .unwrap_or(HeaderValue::from_static("application/octet-stream")),
    );

    if let Some(byte_size) = byte_size {
        headers.insert(header::CONTENT_LENGTH, HeaderValue::from(byte_size));
    }

    // Stored names are plain ASCII, safe to quote as-is
    let filename = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("download");
    if let Ok(value) = format!("attachment; filename=\"{filename}\"").parse() {
        headers.insert(header::CONTENT_DISPOSITION, value);
    }

    Ok(response)
}

pub async fn recent_commits(
    State(state): State<Arc<AppState>>,
    AppQuery(params): AppQuery<RecentCommitsParams>,
) -> Result<Json<JSend<Vec<RecentChangeResponse>>>, ApiError> {
    if params.limit == 0 || params.limit > MAX_RECENT_LIMIT {
        return Err(ApiError::bad_request(format!(
            "limit must be between 1 and {MAX_RECENT_LIMIT}"
        )));
    }

    let changes = state.catalog.list_recent_commits(params.limit as usize)?;
    Ok(JSend::success(
        changes.iter().map(recent_change_to_response).collect(),
    ))
}

// ============================================================================
// Helpers
// ============================================================================

async fn read_upload_form(mut multipart: Multipart, max_size: u64) -> Result<UploadForm, ApiError> {
    let mut form = UploadForm {
        file: None,
        fields: HashMap::new(),
    };

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("Invalid multipart data: {e}")))?
    {
        let field_name = field.name().unwrap_or("").to_string();

        if field_name == "file" {
            let file_name = field
                .file_name()
                .map(|s| s.to_string())
                .ok_or_else(|| ApiError::bad_request("file field must carry a filename"))?;

            let data = field
                .bytes()
                .await
                .map_err(|e| ApiError::bad_request(format!("Failed to read file: {e}")))?;

            if data.len() as u64 > max_size {
                return Err(ApiError::payload_too_large(format!(
                    "File exceeds maximum upload size of {max_size} bytes"
                )));
            }

            form.file = Some(Upload { file_name, data });
        } else {
            let text = field
                .text()
                .await
                .map_err(|e| ApiError::bad_request(format!("Invalid {field_name}: {e}")))?;
            form.fields.insert(field_name, text);
        }
    }

    Ok(form)
}

pub(super) fn parse_id(field: &str, value: &str) -> Result<u64, ApiError> {
    value
        .trim()
        .parse()
        .map_err(|_| ApiError::bad_request(format!("{field} must be a non-negative integer")))
}

pub(super) fn paginate(
    summaries: &[Summary],
    limit: u32,
    offset: u32,
) -> Json<JSendPaginated<SummaryResponse>> {
    let items = summaries
        .iter()
        .skip(offset as usize)
        .take(limit as usize)
        .map(summary_to_response)
        .collect();

    JSendPaginated::success(
        items,
        Pagination {
            limit,
            offset,
            total: summaries.len() as u64,
        },
    )
}

pub(super) fn summary_to_response(summary: &Summary) -> SummaryResponse {
    SummaryResponse {
        author_id: summary.author_id,
        course_id: summary.course_id,
        created_at: summary.created_at.to_rfc3339(),
        description: summary.description.clone(),
        downloads: summary.downloads,
        filename: summary.filename.clone(),
        id: summary.id,
        name: summary.name.clone(),
    }
}

fn commit_to_response(commit: &Commit) -> CommitResponse {
    CommitResponse {
        created_at: commit.created_at.to_rfc3339(),
        description: commit.description.clone(),
        id: commit.id,
        summary_id: commit.summary_id,
    }
}

fn detail_to_response(detail: &SummaryDetail) -> SummaryDetailResponse {
    SummaryDetailResponse {
        commits: detail.commits.iter().map(commit_to_response).collect(),
        summary: summary_to_response(&detail.summary),
    }
}

fn recent_change_to_response(change: &RecentChange) -> RecentChangeResponse {
    RecentChangeResponse {
        commit: commit_to_response(&change.commit),
        course_id: change.summary.course_id,
        summary_name: change.summary.name.clone(),
    }
}
