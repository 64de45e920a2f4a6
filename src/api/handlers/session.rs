use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::api::response::{ApiError, AppJson, JSend};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub author_id: u64,
    pub email: String,
}

/// Check credentials without mutating anything. Clients then send the same
/// pair as Basic credentials on every mutating request.
pub async fn login(
    State(state): State<Arc<AppState>>,
    AppJson(req): AppJson<LoginRequest>,
) -> Result<Json<JSend<LoginResponse>>, ApiError> {
    let ctx = state
        .catalog
        .authenticate(&req.email, &req.password)
        .await?
        .ok_or_else(|| ApiError::forbidden("Invalid credentials"))?;

    tracing::debug!(author_id = ctx.author_id(), "Login succeeded");

    Ok(JSend::success(LoginResponse {
        author_id: ctx.author_id(),
        email: ctx.email().to_string(),
    }))
}
