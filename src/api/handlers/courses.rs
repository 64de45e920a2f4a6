use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::summaries::{paginate, SummaryResponse};
use crate::api::extract::Admin;
use crate::api::response::{ApiError, AppJson, AppQuery, JSend, JSendPaginated};
use crate::catalog::CascadeReport;
use crate::storage::models::{Course, CourseFields};
use crate::AppState;

// ============================================================================
// Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct CourseResponse {
    pub branch: String,
    pub id: u64,
    pub instructor: String,
    pub name: String,
    pub semester: u8,
    pub year: i32,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct CourseRequest {
    pub branch: String,
    pub instructor: String,
    pub name: String,
    pub semester: u8,
    pub year: i32,
}

#[derive(Debug, Deserialize)]
pub struct PageParams {
    #[serde(default = "default_limit")]
    pub limit: u32,
    #[serde(default)]
    pub offset: u32,
}

fn default_limit() -> u32 {
    20
}

impl From<CourseRequest> for CourseFields {
    fn from(req: CourseRequest) -> Self {
        CourseFields {
            name: req.name,
            instructor: req.instructor,
            branch: req.branch,
            year: req.year,
            semester: req.semester,
        }
    }
}

// ============================================================================
// Handlers
// ============================================================================

pub async fn list_courses(
    State(state): State<Arc<AppState>>,
) -> Result<Json<JSend<Vec<CourseResponse>>>, ApiError> {
    let courses = state.catalog.list_courses()?;
    Ok(JSend::success(courses.iter().map(course_to_response).collect()))
}

pub async fn get_course(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
) -> Result<Json<JSend<CourseResponse>>, ApiError> {
    let course = state.catalog.get_course(id)?;
    Ok(JSend::success(course_to_response(&course)))
}

pub async fn create_course(
    State(state): State<Arc<AppState>>,
    Admin(ctx): Admin,
    AppJson(req): AppJson<CourseRequest>,
) -> Result<Json<JSend<CourseResponse>>, ApiError> {
    let course = state.catalog.create_course(&ctx, req.into())?;
    Ok(JSend::success(course_to_response(&course)))
}

pub async fn update_course(
    State(state): State<Arc<AppState>>,
    Admin(ctx): Admin,
    Path(id): Path<u64>,
    AppJson(req): AppJson<CourseRequest>,
) -> Result<Json<JSend<CourseResponse>>, ApiError> {
    let course = state.catalog.update_course(&ctx, id, req.into())?;
    Ok(JSend::success(course_to_response(&course)))
}

pub async fn delete_course(
    State(state): State<Arc<AppState>>,
    Admin(ctx): Admin,
    Path(id): Path<u64>,
) -> Result<Json<JSend<CascadeReport>>, ApiError> {
    let report = state.catalog.delete_course(&ctx, id).await?;
    Ok(JSend::success(report))
}

pub async fn list_course_summaries(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
    AppQuery(params): AppQuery<PageParams>,
) -> Result<Json<JSendPaginated<SummaryResponse>>, ApiError> {
    if params.limit == 0 {
        return Err(ApiError::bad_request("limit must be greater than 0"));
    }
    let summaries = state.catalog.list_summaries_by_course(id)?;
    Ok(paginate(&summaries, params.limit, params.offset))
}

// ============================================================================
// Helpers
// ============================================================================

fn course_to_response(course: &Course) -> CourseResponse {
    CourseResponse {
        branch: course.branch.clone(),
        id: course.id,
        instructor: course.instructor.clone(),
        name: course.name.clone(),
        semester: course.semester,
        year: course.year,
    }
}
