use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

use crate::api::response::ApiError;
use crate::auth::AuthContext;
use crate::AppState;

/// An administrator authenticated through HTTP Basic credentials on this request.
pub struct Admin(pub AuthContext);

#[axum::async_trait]
impl FromRequestParts<Arc<AppState>> for Admin {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, ApiError> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| ApiError::unauthorized("Authentication required"))?;

        let (email, password) = parse_basic(header)
            .ok_or_else(|| ApiError::unauthorized("Malformed Basic credentials"))?;

        match state.catalog.authenticate(&email, &password).await? {
            Some(ctx) => Ok(Admin(ctx)),
            None => Err(ApiError::forbidden("Invalid credentials")),
        }
    }
}

/// Split an `Authorization: Basic <base64(email:password)>` header value.
pub fn parse_basic(header: &str) -> Option<(String, String)> {
    let (scheme, encoded) = header.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("basic") {
        return None;
    }
    let decoded = STANDARD.decode(encoded.trim()).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (email, password) = decoded.split_once(':')?;
    Some((email.to_string(), password.to_string()))
}
