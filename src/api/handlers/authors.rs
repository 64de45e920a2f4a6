use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::courses::PageParams;
use super::summaries::{paginate, SummaryResponse};
use crate::api::extract::Admin;
use crate::api::response::{ApiError, AppJson, AppQuery, JSend, JSendPaginated};
use crate::catalog::AuthorFields;
use crate::storage::models::Author;
use crate::AppState;

// ============================================================================
// Types
// ============================================================================

/// Public view of an author. The password hash never leaves the catalog.
#[derive(Debug, Serialize)]
pub struct AuthorResponse {
    pub email: String,
    pub id: u64,
    pub name: String,
    pub surname: String,
}

#[derive(Debug, Deserialize)]
pub struct AuthorRequest {
    pub email: String,
    pub name: String,
    pub password: String,
    pub surname: String,
}

impl From<AuthorRequest> for AuthorFields {
    fn from(req: AuthorRequest) -> Self {
        AuthorFields {
            name: req.name,
            surname: req.surname,
            email: req.email,
            password: req.password,
        }
    }
}

// ============================================================================
// Handlers
// ============================================================================

pub async fn list_authors(
    State(state): State<Arc<AppState>>,
) -> Result<Json<JSend<Vec<AuthorResponse>>>, ApiError> {
    let authors = state.catalog.list_authors()?;
    Ok(JSend::success(authors.iter().map(author_to_response).collect()))
}

pub async fn create_author(
    State(state): State<Arc<AppState>>,
    Admin(ctx): Admin,
    AppJson(req): AppJson<AuthorRequest>,
) -> Result<Json<JSend<AuthorResponse>>, ApiError> {
    let author = state.catalog.create_author(&ctx, req.into()).await?;
    Ok(JSend::success(author_to_response(&author)))
}

pub async fn update_author(
    State(state): State<Arc<AppState>>,
    Admin(ctx): Admin,
    Path(id): Path<u64>,
    AppJson(req): AppJson<AuthorRequest>,
) -> Result<Json<JSend<AuthorResponse>>, ApiError> {
    let author = state.catalog.update_author(&ctx, id, req.into()).await?;
    Ok(JSend::success(author_to_response(&author)))
}

pub async fn list_author_summaries(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
    AppQuery(params): AppQuery<PageParams>,
) -> Result<Json<JSendPaginated<SummaryResponse>>, ApiError> {
    if params.limit == 0 {
        return Err(ApiError::bad_request("limit must be greater than 0"));
    }
    let summaries = state.catalog.list_summaries_by_author(id)?;
    Ok(paginate(&summaries, params.limit, params.offset))
}

pub(super) fn author_to_response(author: &Author) -> AuthorResponse {
    AuthorResponse {
        email: author.email.clone(),
        id: author.id,
        name: author.name.clone(),
        surname: author.surname.clone(),
    }
}
